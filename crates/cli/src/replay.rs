//! Replays a key script through an [`EditorSession`].

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::Serialize;
use tagcalc_engine::{EditInput, EditorSession, FormulaEditor, SuggestionProvider, Token};

use crate::script::Key;

/// Final editor state after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub tokens: Vec<Token>,
    /// Tokens rendered as typed text, space separated.
    pub expression: String,
    pub result: String,
    pub pending: String,
    pub candidates: Vec<String>,
}

impl Report {
    pub fn from_editor(editor: &FormulaEditor) -> Self {
        let prefix = editor.tag_prefix();
        let expression = editor
            .tokens()
            .iter()
            .map(|t| t.data.to_text(prefix))
            .collect::<Vec<_>>()
            .join(" ");
        let snapshot = editor.autocomplete();
        Self {
            tokens: editor.export(),
            expression,
            result: editor.result().to_string(),
            pending: editor.pending().to_string(),
            candidates: if snapshot.visible {
                snapshot.candidates.into_iter().map(|c| c.label).collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub debounce: Duration,
    /// Leave trailing pending text uncommitted.
    pub keep_pending: bool,
}

pub fn replay(
    editor: FormulaEditor,
    provider: Arc<dyn SuggestionProvider>,
    keys: &[Key],
    options: &ReplayOptions,
) -> Report {
    let mut session = EditorSession::new(editor, provider).with_debounce(options.debounce);

    for key in keys {
        if key.reads_candidates() && session.in_flight() > 0 {
            debug!("waiting for {} lookup(s) before {:?}", session.in_flight(), key);
            smol::block_on(session.settle());
        }
        session.handle(key.to_input());
    }

    if !options.keep_pending && !session.editor().pending().trim().is_empty() {
        // Commit as typed, not as the active suggestion
        session.handle(EditInput::Cancel);
        session.handle(EditInput::Confirm);
    }
    smol::block_on(session.settle());

    Report::from_editor(session.editor())
}
