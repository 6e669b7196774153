//! Tag autocomplete coordinator.
//!
//! Watches pending text, decides when a suggestion lookup is needed, and
//! tracks the candidate list and selection. Lookups are identified by a
//! monotonically increasing generation; only the result for the most recently
//! issued query is accepted, regardless of arrival order.

use log::{debug, warn};

use crate::classify::{parse_number, Classifier};
use crate::suggest::{Candidate, SuggestResult};
use crate::token::Operator;

/// A lookup the caller must run and report back via
/// [`AutocompleteCoordinator::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AutocompleteState {
    #[default]
    Hidden,
    /// Lookup in flight for `query`.
    Querying { query: String, generation: u64 },
    Showing {
        query: String,
        candidates: Vec<Candidate>,
        active: usize,
    },
}

/// Flat view of the autocomplete popup for rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutocompleteSnapshot {
    pub visible: bool,
    pub query: String,
    pub candidates: Vec<Candidate>,
    pub active_index: usize,
    pub loading: bool,
}

/// Where the query sits inside the pending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpan {
    /// Byte offset where the query (including its tag prefix, if any) starts.
    pub start: usize,
    pub query: String,
}

/// An accepted suggestion, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Pending text in front of the query, trimmed. May be empty.
    pub preceding: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct AutocompleteCoordinator {
    classifier: Classifier,
    state: AutocompleteState,
    generation: u64,
    max_candidates: Option<usize>,
}

impl AutocompleteCoordinator {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            state: AutocompleteState::Hidden,
            generation: 0,
            max_candidates: None,
        }
    }

    pub fn with_max_candidates(mut self, max: Option<usize>) -> Self {
        self.max_candidates = max;
        self
    }

    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self.state, AutocompleteState::Hidden)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AutocompleteState::Querying { .. })
    }

    pub fn snapshot(&self) -> AutocompleteSnapshot {
        match &self.state {
            AutocompleteState::Hidden => AutocompleteSnapshot::default(),
            AutocompleteState::Querying { query, .. } => AutocompleteSnapshot {
                visible: true,
                query: query.clone(),
                candidates: Vec::new(),
                active_index: 0,
                loading: true,
            },
            AutocompleteState::Showing { query, candidates, active } => AutocompleteSnapshot {
                visible: true,
                query: query.clone(),
                candidates: candidates.clone(),
                active_index: *active,
                loading: false,
            },
        }
    }

    /// Locate the lookup query in `pending`.
    ///
    /// With a tag prefix present the query is whatever follows the last
    /// prefix; otherwise it is the whole trimmed text. Returns `None` when
    /// there is nothing worth looking up: blank text, or text that would
    /// classify as an operator or a number.
    pub fn query_span(&self, pending: &str) -> Option<QuerySpan> {
        let prefix = self.classifier.tag_prefix;
        let (start, query) = match pending.rfind(prefix) {
            Some(idx) => (idx, pending[idx + prefix.len_utf8()..].trim()),
            None => (pending.len() - pending.trim_start().len(), pending.trim()),
        };

        if query.is_empty() || Operator::from_text(query).is_some() || parse_number(query).is_some() {
            return None;
        }

        Some(QuerySpan { start, query: query.to_string() })
    }

    /// React to a pending-text change. Returns a ticket when a new lookup
    /// must be issued.
    pub fn observe(&mut self, pending: &str) -> Option<QueryTicket> {
        let Some(span) = self.query_span(pending) else {
            self.hide();
            return None;
        };

        let unchanged = match &self.state {
            AutocompleteState::Querying { query, .. } | AutocompleteState::Showing { query, .. } => {
                *query == span.query
            }
            AutocompleteState::Hidden => false,
        };
        if unchanged {
            return None;
        }

        self.generation += 1;
        let ticket = QueryTicket {
            generation: self.generation,
            query: span.query,
        };
        debug!("autocomplete query #{} {:?}", ticket.generation, ticket.query);
        self.state = AutocompleteState::Querying {
            query: ticket.query.clone(),
            generation: ticket.generation,
        };
        Some(ticket)
    }

    /// Re-open for the current pending text even if the query did not change.
    pub fn reopen(&mut self, pending: &str) -> Option<QueryTicket> {
        self.hide();
        self.observe(pending)
    }

    /// Apply a lookup result. Returns `false` if the ticket is stale.
    pub fn resolve(&mut self, ticket: &QueryTicket, result: SuggestResult) -> bool {
        let current = match &self.state {
            AutocompleteState::Querying { query, generation } => {
                *generation == ticket.generation && *query == ticket.query
            }
            _ => false,
        };
        if !current {
            debug!(
                "discarding stale suggestions #{} for {:?}",
                ticket.generation, ticket.query
            );
            return false;
        }

        let mut candidates: Vec<Candidate> = match result {
            Ok(candidates) => candidates
                .into_iter()
                .filter_map(|c| {
                    let label = c.label.trim();
                    (!label.is_empty()).then(|| Candidate::new(label))
                })
                .collect(),
            Err(e) => {
                warn!("suggestion lookup for {:?} failed: {}", ticket.query, e);
                Vec::new()
            }
        };
        if let Some(max) = self.max_candidates {
            candidates.truncate(max);
        }

        self.state = AutocompleteState::Showing {
            query: ticket.query.clone(),
            candidates,
            active: 0,
        };
        true
    }

    pub fn hide(&mut self) {
        self.state = AutocompleteState::Hidden;
    }

    pub fn next(&mut self) -> bool {
        match &mut self.state {
            AutocompleteState::Showing { candidates, active, .. } if !candidates.is_empty() => {
                *active = (*active + 1) % candidates.len();
                true
            }
            _ => false,
        }
    }

    pub fn previous(&mut self) -> bool {
        match &mut self.state {
            AutocompleteState::Showing { candidates, active, .. } if !candidates.is_empty() => {
                *active = (*active + candidates.len() - 1) % candidates.len();
                true
            }
            _ => false,
        }
    }

    /// Pointer hover: select `index` directly. Out-of-range is ignored.
    pub fn hover(&mut self, index: usize) -> bool {
        match &mut self.state {
            AutocompleteState::Showing { candidates, active, .. } if index < candidates.len() => {
                *active = index;
                true
            }
            _ => false,
        }
    }

    pub fn active_candidate(&self) -> Option<&Candidate> {
        match &self.state {
            AutocompleteState::Showing { candidates, active, .. } => candidates.get(*active),
            _ => None,
        }
    }

    /// Take the candidate at `index` (or the active one) and hide.
    ///
    /// Returns `None`, leaving state untouched, when nothing is selectable.
    pub fn take_selection(&mut self, pending: &str, index: Option<usize>) -> Option<Selection> {
        let label = match &self.state {
            AutocompleteState::Showing { candidates, active, .. } => {
                candidates.get(index.unwrap_or(*active))?.label.clone()
            }
            _ => return None,
        };

        let preceding = self
            .query_span(pending)
            .map(|span| pending[..span.start].trim().to_string())
            .unwrap_or_default();

        self.hide();
        Some(Selection { preceding, label })
    }
}

impl Default for AutocompleteCoordinator {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}
