//! Async driver for suggestion lookups.
//!
//! `EditorSession` wraps a [`FormulaEditor`] and runs every issued
//! [`QueryTicket`] against a [`SuggestionProvider`] on the `smol` executor.
//! Results come back over a channel and are applied on the caller's thread,
//! where the editor drops anything stale.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use smol::channel::{self, Receiver, Sender};
use smol::future::FutureExt;

use crate::autocomplete::QueryTicket;
use crate::editor::{EditInput, EditOutcome, FormulaEditor};
use crate::suggest::{SuggestError, SuggestResult, SuggestionProvider};

struct Lookup {
    ticket: QueryTicket,
    /// `None` when the lookup was superseded during the debounce delay.
    result: Option<SuggestResult>,
}

pub struct EditorSession {
    editor: FormulaEditor,
    provider: Arc<dyn SuggestionProvider>,
    debounce: Duration,
    latest: Arc<AtomicU64>,
    tx: Sender<Lookup>,
    rx: Receiver<Lookup>,
    in_flight: usize,
}

impl EditorSession {
    pub fn new(editor: FormulaEditor, provider: Arc<dyn SuggestionProvider>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            editor,
            provider,
            debounce: Duration::ZERO,
            latest: Arc::new(AtomicU64::new(0)),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Delay each lookup; lookups superseded during the delay never reach
    /// the provider.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn editor(&self) -> &FormulaEditor {
        &self.editor
    }

    /// Lookups dispatched but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply finished lookups, then handle `input`, dispatching any new one.
    pub fn handle(&mut self, input: EditInput) -> EditOutcome {
        self.pump();
        let outcome = self.editor.handle(input);
        if let Some(ticket) = &outcome.query {
            self.dispatch(ticket.clone());
        }
        outcome
    }

    /// Apply every lookup that has already finished. Never blocks.
    /// Returns how many results were accepted.
    pub fn pump(&mut self) -> usize {
        let mut accepted = 0;
        while let Ok(lookup) = self.rx.try_recv() {
            if self.apply(lookup) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Wait until every dispatched lookup has come back.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv().await {
                Ok(lookup) => {
                    self.apply(lookup);
                }
                Err(_) => break,
            }
        }
    }

    fn dispatch(&mut self, ticket: QueryTicket) {
        self.latest.store(ticket.generation, Ordering::SeqCst);
        self.in_flight += 1;

        let provider = Arc::clone(&self.provider);
        let latest = Arc::clone(&self.latest);
        let tx = self.tx.clone();
        let debounce = self.debounce;

        smol::spawn(async move {
            if !debounce.is_zero() {
                smol::Timer::after(debounce).await;
                if latest.load(Ordering::SeqCst) != ticket.generation {
                    let _ = tx.send(Lookup { ticket, result: None }).await;
                    return;
                }
            }
            // Every dispatched lookup must report back or `settle` never returns
            let result = AssertUnwindSafe(async { provider.suggest(&ticket.query).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!("suggestion provider panicked on {:?}", ticket.query);
                    Err(SuggestError::Unavailable("provider panicked".into()))
                });
            let _ = tx.send(Lookup { ticket, result: Some(result) }).await;
        })
        .detach();
    }

    fn apply(&mut self, lookup: Lookup) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        match lookup.result {
            Some(result) => self.editor.resolve_suggestions(&lookup.ticket, result),
            None => {
                debug!("lookup #{} skipped after debounce", lookup.ticket.generation);
                false
            }
        }
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("editor", &self.editor)
            .field("debounce", &self.debounce)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
