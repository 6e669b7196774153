//! Suggestion provider contract.
//!
//! The engine never performs lookups itself: it hands a [`QueryTicket`] to the
//! caller, which runs a [`SuggestionProvider`] and reports the result back.
//! [`crate::session::EditorSession`] does this on the `smol` executor.
//!
//! [`QueryTicket`]: crate::autocomplete::QueryTicket

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A suggested tag label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CandidateRepr")]
pub struct Candidate {
    pub label: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl From<&str> for Candidate {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Candidate {
    fn from(label: String) -> Self {
        Self { label }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

// Providers answer with bare strings, `{label}` or `{name}` objects
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateRepr {
    Bare(String),
    Label { label: String },
    Name { name: String },
}

impl From<CandidateRepr> for Candidate {
    fn from(repr: CandidateRepr) -> Self {
        match repr {
            CandidateRepr::Bare(label)
            | CandidateRepr::Label { label }
            | CandidateRepr::Name { name: label } => Self { label },
        }
    }
}

/// Lookup failure. Always degrades to "no candidates".
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestError {
    Unavailable(String),
    Timeout,
}

impl fmt::Display for SuggestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "suggestion provider unavailable: {msg}"),
            Self::Timeout => write!(f, "suggestion lookup timed out"),
        }
    }
}

impl std::error::Error for SuggestError {}

pub type SuggestResult = Result<Vec<Candidate>, SuggestError>;

/// Boxed lookup future.
pub type SuggestFuture = Pin<Box<dyn Future<Output = SuggestResult> + Send + 'static>>;

/// Asynchronous source of tag-name candidates.
///
/// Implementations must answer a blank query with an empty list.
pub trait SuggestionProvider: Send + Sync {
    fn suggest(&self, query: &str) -> SuggestFuture;
}

/// In-memory provider: case-insensitive substring match over a fixed label
/// list, with optional simulated latency.
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestions {
    labels: Vec<String>,
    latency: Option<Duration>,
}

impl StaticSuggestions {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Synchronous match, in catalog order.
    pub fn matches(&self, query: &str) -> Vec<Candidate> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.labels
            .iter()
            .filter(|label| label.to_lowercase().contains(&query))
            .map(|label| Candidate::new(label.as_str()))
            .collect()
    }
}

impl SuggestionProvider for StaticSuggestions {
    fn suggest(&self, query: &str) -> SuggestFuture {
        let matches = self.matches(query);
        let latency = self.latency;
        Box::pin(async move {
            if let Some(latency) = latency {
                smol::Timer::after(latency).await;
            }
            Ok(matches)
        })
    }
}
