//! Edit controller.
//!
//! [`FormulaEditor`] turns discrete input events into token commits,
//! pending-text edits and autocomplete transitions. It is the only writer of
//! the token store; every token change triggers a re-evaluation that is
//! published to store subscribers.

use log::debug;

use crate::autocomplete::{AutocompleteCoordinator, AutocompleteSnapshot, QueryTicket};
use crate::classify::Classifier;
use crate::events::EventCallback;
use crate::formula::eval::{evaluate, Bindings};
use crate::store::{FormulaStore, SubscriptionId};
use crate::suggest::SuggestResult;
use crate::token::{Operator, Token, TokenData, TokenError, TokenId, TokenSequence, DEFAULT_TAG_PREFIX};

/// Input events understood by the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditInput {
    /// A printable key. Operator and parenthesis characters commit.
    Char(char),
    /// The edit surface reports its full pending text (paste, IME, ...).
    SetText(String),
    /// Enter.
    Confirm,
    /// Tab: accepts the active suggestion, otherwise ignored.
    Advance,
    Backspace,
    /// Escape: hides autocomplete only.
    Cancel,
    /// Arrow down.
    Next,
    /// Arrow up.
    Previous,
    /// Pointer over candidate `i`.
    Hover(usize),
    /// Click on candidate `i`.
    Accept(usize),
    /// Pointer interaction outside the surface and the candidate list.
    OutsideInteraction,
    Focus,
    /// Delete a token from its menu.
    DeleteToken(TokenId),
    /// Relabel a tag token in place.
    EditTag { id: TokenId, label: String },
}

/// What an input did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    pub tokens_changed: bool,
    /// Lookup the caller must run and feed back through
    /// [`FormulaEditor::resolve_suggestions`].
    pub query: Option<QueryTicket>,
}

/// One-way sink for pending text. The editor never reads back from it.
pub trait EditSurface: Send {
    fn render_pending(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    pub tag_prefix: char,
    pub max_candidates: Option<usize>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX,
            max_candidates: None,
        }
    }
}

pub struct FormulaEditor {
    store: FormulaStore,
    classifier: Classifier,
    autocomplete: AutocompleteCoordinator,
    bindings: Bindings,
    pending: String,
    result: String,
    surface: Option<Box<dyn EditSurface>>,
}

impl FormulaEditor {
    pub fn new(bindings: Bindings) -> Self {
        Self::with_options(bindings, EditorOptions::default())
    }

    pub fn with_options(bindings: Bindings, options: EditorOptions) -> Self {
        let classifier = Classifier::new(options.tag_prefix);
        let store = FormulaStore::new();
        let result = evaluate(store.tokens().tokens(), &bindings);
        Self {
            store,
            classifier,
            autocomplete: AutocompleteCoordinator::new(classifier)
                .with_max_candidates(options.max_candidates),
            bindings,
            pending: String::new(),
            result,
            surface: None,
        }
    }

    pub fn set_surface(&mut self, surface: Box<dyn EditSurface>) {
        self.surface = Some(surface);
        self.render();
    }

    pub fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn tokens(&self) -> &TokenSequence {
        self.store.tokens()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Current display result.
    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn autocomplete(&self) -> AutocompleteSnapshot {
        self.autocomplete.snapshot()
    }

    pub fn tag_prefix(&self) -> char {
        self.classifier.tag_prefix
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn set_bindings(&mut self, bindings: Bindings) {
        self.bindings = bindings;
        self.refresh_result();
    }

    /// Export the committed tokens.
    pub fn export(&self) -> Vec<Token> {
        self.store.snapshot()
    }

    /// Replace the whole token sequence. Pending text is left alone.
    pub fn load(&mut self, tokens: Vec<Token>) -> Result<(), TokenError> {
        self.store.replace_all(tokens)?;
        self.refresh_result();
        Ok(())
    }

    /// Drop all tokens and pending text.
    pub fn clear(&mut self) {
        self.autocomplete.hide();
        self.set_pending(String::new());
        if self.store.clear() {
            self.refresh_result();
        }
    }

    /// Feed a lookup result back. Returns `false` for stale tickets.
    pub fn resolve_suggestions(&mut self, ticket: &QueryTicket, result: SuggestResult) -> bool {
        self.autocomplete.resolve(ticket, result)
    }

    pub fn handle(&mut self, input: EditInput) -> EditOutcome {
        let revision = self.store.revision();
        let query = match input {
            EditInput::Char(c) => self.on_char(c),
            EditInput::SetText(text) => {
                if text == self.pending {
                    None
                } else {
                    self.set_pending(text);
                    self.autocomplete.observe(&self.pending)
                }
            }
            EditInput::Confirm => {
                if self.autocomplete.active_candidate().is_some() {
                    self.accept_suggestion(None);
                } else {
                    self.commit_pending();
                }
                None
            }
            EditInput::Advance => {
                if self.autocomplete.active_candidate().is_some() {
                    self.accept_suggestion(None);
                }
                None
            }
            EditInput::Backspace => self.on_backspace(),
            EditInput::Cancel | EditInput::OutsideInteraction => {
                self.autocomplete.hide();
                None
            }
            EditInput::Next => {
                self.autocomplete.next();
                None
            }
            EditInput::Previous => {
                self.autocomplete.previous();
                None
            }
            EditInput::Hover(index) => {
                self.autocomplete.hover(index);
                None
            }
            EditInput::Accept(index) => {
                self.accept_suggestion(Some(index));
                None
            }
            EditInput::Focus => {
                if self.pending.trim().is_empty() {
                    None
                } else {
                    self.autocomplete.reopen(&self.pending)
                }
            }
            EditInput::DeleteToken(id) => {
                self.store.remove_by_id(id);
                None
            }
            EditInput::EditTag { id, label } => {
                self.store.update_by_id(id, &label);
                None
            }
        };

        let tokens_changed = self.store.revision() != revision;
        if tokens_changed {
            self.refresh_result();
        }
        EditOutcome { tokens_changed, query }
    }

    fn on_char(&mut self, c: char) -> Option<QueryTicket> {
        if let Some(op) = Operator::from_char(c) {
            self.on_operator(op);
            return None;
        }
        if c.is_control() {
            return None;
        }
        let mut text = std::mem::take(&mut self.pending);
        text.push(c);
        self.set_pending(text);
        self.autocomplete.observe(&self.pending)
    }

    fn on_operator(&mut self, op: Operator) {
        self.commit_pending();
        self.store.append(TokenData::operand(op));
    }

    fn on_backspace(&mut self) -> Option<QueryTicket> {
        if !self.pending.is_empty() {
            let mut text = std::mem::take(&mut self.pending);
            text.pop();
            self.set_pending(text);
            return self.autocomplete.observe(&self.pending);
        }

        // Undo the last token back into editable text
        let token = self.store.remove_last()?;
        debug!("restoring {} into pending text", token.data);
        self.set_pending(token.data.to_text(self.classifier.tag_prefix));
        self.autocomplete.reopen(&self.pending)
    }

    /// Classify and append the pending text, then clear it. Blank pending
    /// text is cleared without appending.
    fn commit_pending(&mut self) {
        let text = std::mem::take(&mut self.pending);
        if let Some(data) = self.classifier.classify(&text) {
            debug!("committing {:?} as {:?}", text, data.kind());
            self.store.append(data);
        }
        self.autocomplete.hide();
        self.render();
    }

    fn accept_suggestion(&mut self, index: Option<usize>) {
        let Some(selection) = self.autocomplete.take_selection(&self.pending, index) else {
            return;
        };
        let label = selection.label.trim();
        if label.is_empty() {
            debug!("refusing blank suggestion");
            return;
        }
        if let Some(data) = self.classifier.classify(&selection.preceding) {
            self.store.append(data);
        }
        debug!("accepted suggestion {:?}", label);
        self.store.append(TokenData::tag(label));
        self.set_pending(String::new());
    }

    fn set_pending(&mut self, text: String) {
        self.pending = text;
        self.render();
    }

    fn render(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.render_pending(&self.pending);
        }
    }

    fn refresh_result(&mut self) {
        self.result = evaluate(self.store.tokens().tokens(), &self.bindings);
        self.store.publish_result(&self.result);
    }
}

impl Default for FormulaEditor {
    fn default() -> Self {
        Self::new(Bindings::new())
    }
}

impl std::fmt::Debug for FormulaEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaEditor")
            .field("store", &self.store)
            .field("pending", &self.pending)
            .field("result", &self.result)
            .field("autocomplete", self.autocomplete.state())
            .finish()
    }
}
