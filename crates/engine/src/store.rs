//! Observable token store.
//!
//! Owns the committed [`TokenSequence`], bumps a revision on every real
//! change and notifies subscribers. No-op mutations (unknown id, empty
//! sequence, non-editable token) emit nothing.

use crate::events::{EventCallback, FormulaEvent, ResultChangedEvent, TokenChange, TokensChangedEvent};
use crate::token::{Token, TokenData, TokenError, TokenId, TokenSequence};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct FormulaStore {
    tokens: TokenSequence,
    revision: u64,
    subscribers: Vec<(SubscriptionId, EventCallback)>,
    next_subscription: u64,
}

impl FormulaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the committed tokens.
    pub fn tokens(&self) -> &TokenSequence {
        &self.tokens
    }

    /// Owned snapshot for export.
    pub fn snapshot(&self) -> Vec<Token> {
        self.tokens.tokens().to_vec()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn append(&mut self, data: TokenData) -> TokenId {
        let id = self.tokens.append(data);
        self.changed(TokenChange::Appended(id));
        id
    }

    pub fn remove_by_id(&mut self, id: TokenId) -> bool {
        if !self.tokens.remove_by_id(id) {
            return false;
        }
        self.changed(TokenChange::Removed(id));
        true
    }

    pub fn remove_last(&mut self) -> Option<Token> {
        let token = self.tokens.remove_last()?;
        self.changed(TokenChange::Removed(token.id));
        Some(token)
    }

    pub fn update_by_id(&mut self, id: TokenId, label: &str) -> bool {
        if !self.tokens.update_by_id(id, label) {
            return false;
        }
        self.changed(TokenChange::Updated(id));
        true
    }

    /// Bulk load. On error the current sequence is left untouched.
    pub fn replace_all(&mut self, tokens: Vec<Token>) -> Result<(), TokenError> {
        let tokens = TokenSequence::from_tokens(tokens)?;
        let count = tokens.len();
        self.tokens = tokens;
        self.changed(TokenChange::Replaced { count });
        Ok(())
    }

    pub fn clear(&mut self) -> bool {
        if !self.tokens.clear() {
            return false;
        }
        self.changed(TokenChange::Cleared);
        true
    }

    /// Publish a recomputed result for the current revision.
    pub fn publish_result(&mut self, result: &str) {
        let event = FormulaEvent::ResultChanged(ResultChangedEvent {
            revision: self.revision,
            result: result.to_string(),
        });
        self.emit(event);
    }

    fn changed(&mut self, change: TokenChange) {
        self.revision += 1;
        let event = FormulaEvent::TokensChanged(TokensChangedEvent {
            revision: self.revision,
            change,
        });
        self.emit(event);
    }

    fn emit(&mut self, event: FormulaEvent) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event.clone());
        }
    }
}

impl std::fmt::Debug for FormulaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaStore")
            .field("tokens", &self.tokens)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
