//! Event types for formula change notifications.
//!
//! Emitted by [`crate::store::FormulaStore`] to its subscribers. The test
//! collector lets tests assert on ordering and revision numbers.

use crate::token::TokenId;

/// Events emitted by the formula store.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaEvent {
    /// The token sequence changed. Exactly one per mutation.
    TokensChanged(TokensChangedEvent),

    /// The evaluated result was recomputed after a token change.
    ResultChanged(ResultChangedEvent),
}

/// What happened to the token sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenChange {
    Appended(TokenId),
    Removed(TokenId),
    Updated(TokenId),
    /// Bulk load replaced the whole sequence.
    Replaced { count: usize },
    Cleared,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokensChangedEvent {
    /// Revision after the change.
    pub revision: u64,
    pub change: TokenChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultChangedEvent {
    /// Revision the result was computed from.
    pub revision: u64,
    /// Display result (a number or `Invalid Expression`).
    pub result: String,
}

/// Callback type for receiving formula events.
pub type EventCallback = Box<dyn FnMut(FormulaEvent) + Send>;

/// Simple event collector for testing.
#[derive(Default)]
pub struct EventCollector {
    events: Vec<FormulaEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: FormulaEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[FormulaEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only TokensChanged events.
    pub fn tokens_changed(&self) -> Vec<&TokensChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FormulaEvent::TokensChanged(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Filter to only ResultChanged events.
    pub fn results(&self) -> Vec<&ResultChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FormulaEvent::ResultChanged(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Most recent result, if any was published.
    pub fn last_result(&self) -> Option<&str> {
        self.results().last().map(|r| r.result.as_str())
    }
}
