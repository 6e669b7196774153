// Async lookup tests: stale discard, failure handling, debounce, panics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tagcalc_engine::suggest::{SuggestFuture, SuggestResult, SuggestionProvider};
use tagcalc_engine::{
    Bindings, Candidate, EditInput, EditorSession, FormulaEditor, StaticSuggestions, SuggestError,
    TokenData,
};

const CATALOG: &[&str] = &[
    "Sales", "Revenue", "Expenses", "Profit", "COGS", "Marketing Spend", "Salaries", "Rent",
];

/// Provider whose latency depends on the query, so tests can force
/// out-of-order completion.
struct DelayedProvider {
    inner: StaticSuggestions,
    delays: Vec<(&'static str, Duration)>,
    calls: Arc<AtomicUsize>,
}

impl DelayedProvider {
    fn new(delays: Vec<(&'static str, Duration)>) -> Self {
        Self {
            inner: StaticSuggestions::new(CATALOG.iter().copied()),
            delays,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SuggestionProvider for DelayedProvider {
    fn suggest(&self, query: &str) -> SuggestFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .delays
            .iter()
            .find(|(q, _)| *q == query)
            .map(|(_, d)| *d)
            .unwrap_or(Duration::ZERO);
        let matches = self.inner.matches(query);
        Box::pin(async move {
            smol::Timer::after(delay).await;
            Ok(matches)
        })
    }
}

struct FailingProvider;

impl SuggestionProvider for FailingProvider {
    fn suggest(&self, _query: &str) -> SuggestFuture {
        Box::pin(async { Err(SuggestError::Unavailable("offline".into())) })
    }
}

/// Panics either while building the future or while it is polled.
struct PanickingProvider {
    eager: bool,
}

impl SuggestionProvider for PanickingProvider {
    fn suggest(&self, query: &str) -> SuggestFuture {
        if self.eager {
            panic!("lookup for {query} blew up");
        }
        Box::pin(async {
            smol::Timer::after(Duration::from_millis(5)).await;
            blow_up()
        })
    }
}

fn blow_up() -> SuggestResult {
    panic!("lookup blew up mid-flight")
}

/// Returns padded and blank labels.
struct UntidyProvider;

impl SuggestionProvider for UntidyProvider {
    fn suggest(&self, _query: &str) -> SuggestFuture {
        let labels = [" ", " Sales ", ""];
        Box::pin(async move { Ok(labels.into_iter().map(Candidate::new).collect::<Vec<_>>()) })
    }
}

fn labels(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.label.as_str()).collect()
}

#[test]
fn stale_query_result_is_never_shown() {
    // "Rev" is slow, "Re" is fast: the newer answer lands first and the
    // older one must not overwrite it.
    let provider = DelayedProvider::new(vec![
        ("Rev", Duration::from_millis(150)),
        ("Re", Duration::from_millis(5)),
    ]);
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(provider));

    session.handle(EditInput::SetText("Rev".into()));
    session.handle(EditInput::SetText("Re".into()));
    smol::block_on(session.settle());

    let snap = session.editor().autocomplete();
    assert_eq!(snap.query, "Re");
    assert!(!snap.loading);
    assert_eq!(labels(&snap.candidates), vec!["Revenue", "Rent"]);
}

#[test]
fn stale_query_discarded_when_it_arrives_first() {
    let provider = DelayedProvider::new(vec![
        ("Rev", Duration::ZERO),
        ("Re", Duration::from_millis(80)),
    ]);
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(provider));

    session.handle(EditInput::SetText("Rev".into()));
    session.handle(EditInput::SetText("Re".into()));
    smol::block_on(session.settle());

    let snap = session.editor().autocomplete();
    assert_eq!(snap.query, "Re");
    assert_eq!(labels(&snap.candidates), vec!["Revenue", "Rent"]);
}

#[test]
fn accepted_suggestion_becomes_tag() {
    let provider = StaticSuggestions::new(CATALOG.iter().copied())
        .with_latency(Duration::from_millis(5));
    let bindings: Bindings = [("Revenue", 1500.0), ("Rent", 200.0)].into_iter().collect();
    let mut session = EditorSession::new(FormulaEditor::new(bindings), Arc::new(provider));

    for c in "@rev".chars() {
        session.handle(EditInput::Char(c));
    }
    smol::block_on(session.settle());
    session.handle(EditInput::Advance);
    session.handle(EditInput::Char('-'));
    for c in "Ren".chars() {
        session.handle(EditInput::Char(c));
    }
    smol::block_on(session.settle());
    session.handle(EditInput::Confirm);

    let editor = session.editor();
    let data: Vec<_> = editor.tokens().iter().map(|t| t.data.clone()).collect();
    assert_eq!(
        data,
        vec![
            TokenData::tag("Revenue"),
            TokenData::operand(tagcalc_engine::Operator::Sub),
            TokenData::tag("Rent"),
        ]
    );
    assert_eq!(editor.result(), "1300");
}

#[test]
fn provider_failure_degrades_to_no_candidates() {
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(FailingProvider));
    session.handle(EditInput::SetText("Sal".into()));
    smol::block_on(session.settle());

    let snap = session.editor().autocomplete();
    assert!(snap.visible);
    assert!(!snap.loading);
    assert!(snap.candidates.is_empty());

    // Confirm still commits the typed text
    session.handle(EditInput::Confirm);
    assert_eq!(session.editor().tokens().len(), 1);
}

#[test]
fn debounce_skips_superseded_lookups() {
    let provider = DelayedProvider::new(Vec::new());
    let calls = Arc::clone(&provider.calls);
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(provider))
        .with_debounce(Duration::from_millis(60));

    for c in "Sal".chars() {
        session.handle(EditInput::Char(c));
    }
    assert_eq!(session.in_flight(), 3);
    smol::block_on(session.settle());

    assert_eq!(session.in_flight(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let snap = session.editor().autocomplete();
    assert_eq!(snap.query, "Sal");
    assert_eq!(labels(&snap.candidates), vec!["Sales", "Salaries"]);
}

#[test]
fn operator_input_never_dispatches() {
    let provider = DelayedProvider::new(Vec::new());
    let calls = Arc::clone(&provider.calls);
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(provider));

    session.handle(EditInput::SetText("+".into()));
    session.handle(EditInput::SetText("12".into()));
    assert_eq!(session.in_flight(), 0);
    smol::block_on(session.settle());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn commit_before_lookup_returns_hides_popup() {
    let provider = DelayedProvider::new(vec![("Sal", Duration::from_millis(40))]);
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(provider));

    session.handle(EditInput::SetText("Sal".into()));
    session.handle(EditInput::Confirm);
    smol::block_on(session.settle());

    assert!(!session.editor().autocomplete().visible);
    assert_eq!(session.editor().tokens().len(), 1);
}

#[test]
fn panicking_provider_does_not_hang_settle() {
    for eager in [true, false] {
        let mut session =
            EditorSession::new(FormulaEditor::default(), Arc::new(PanickingProvider { eager }));
        session.handle(EditInput::SetText("Sal".into()));
        assert_eq!(session.in_flight(), 1);
        smol::block_on(session.settle());

        assert_eq!(session.in_flight(), 0);
        let snap = session.editor().autocomplete();
        assert!(snap.visible);
        assert!(!snap.loading);
        assert!(snap.candidates.is_empty());

        session.handle(EditInput::Confirm);
        assert_eq!(session.editor().tokens().len(), 1);
    }
}

#[test]
fn blank_labels_never_reach_the_token_list() {
    let mut session = EditorSession::new(FormulaEditor::default(), Arc::new(UntidyProvider));
    session.handle(EditInput::SetText("Sal".into()));
    smol::block_on(session.settle());

    assert_eq!(labels(&session.editor().autocomplete().candidates), vec!["Sales"]);
    session.handle(EditInput::Advance);
    let data: Vec<_> = session.editor().tokens().iter().map(|t| t.data.clone()).collect();
    assert_eq!(data, vec![TokenData::tag("Sales")]);
}
