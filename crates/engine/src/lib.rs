pub mod autocomplete;
pub mod classify;
pub mod editor;
pub mod events;
pub mod formula;
pub mod session;
pub mod store;
pub mod suggest;
pub mod token;

pub use autocomplete::{AutocompleteCoordinator, AutocompleteSnapshot, AutocompleteState, QueryTicket};
pub use classify::{classify, Classifier};
pub use editor::{EditInput, EditOutcome, EditSurface, EditorOptions, FormulaEditor};
pub use formula::{evaluate, Bindings, INVALID_EXPRESSION};
pub use session::EditorSession;
pub use store::FormulaStore;
pub use suggest::{Candidate, StaticSuggestions, SuggestError, SuggestionProvider};
pub use token::{Operator, Token, TokenData, TokenId, TokenKind, TokenSequence};
