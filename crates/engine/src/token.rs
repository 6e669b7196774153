//! Token model.
//!
//! A formula is an ordered list of [`Token`]s. Each token owns a stable
//! [`TokenId`] so the editing layer can delete or relabel a token that is not
//! at the end of the sequence.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::formula::eval::format_number;

/// Default character that marks the start of a tag reference (`@Sales`).
pub const DEFAULT_TAG_PREFIX: char = '@';

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a token.
///
/// Allocated from a process-wide counter, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Make sure ids allocated later never collide with `self`.
    /// Called when tokens are loaded from outside.
    fn reserve(&self) {
        NEXT_TOKEN_ID.fetch_max(self.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The fixed operator / parenthesis set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    LParen,
    RParen,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Pow,
        Operator::LParen,
        Operator::RParen,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '^' => Some(Operator::Pow),
            '(' => Some(Operator::LParen),
            ')' => Some(Operator::RParen),
            _ => None,
        }
    }

    /// Parse a whole string; only a single operator character matches.
    pub fn from_text(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
            Operator::LParen => '(',
            Operator::RParen => ')',
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for Operator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Operator::from_text(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown operator: {s:?}")))
    }
}

/// Token payload, one variant per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenData {
    Number { value: f64 },
    Operand { value: Operator },
    Tag { label: String },
}

impl TokenData {
    pub fn number(value: f64) -> Self {
        TokenData::Number { value }
    }

    pub fn operand(op: Operator) -> Self {
        TokenData::Operand { value: op }
    }

    pub fn tag(label: impl Into<String>) -> Self {
        TokenData::Tag { label: label.into() }
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            TokenData::Number { .. } => TokenKind::Number,
            TokenData::Operand { .. } => TokenKind::Operand,
            TokenData::Tag { .. } => TokenKind::Tag,
        }
    }

    /// Editable text for this payload: tags get the prefix back, numbers and
    /// operators print their literal value.
    pub fn to_text(&self, tag_prefix: char) -> String {
        match self {
            TokenData::Number { value } => format_number(*value),
            TokenData::Operand { value } => value.as_char().to_string(),
            TokenData::Tag { label } => format!("{tag_prefix}{label}"),
        }
    }

    fn check(&self) -> Result<(), TokenError> {
        match self {
            TokenData::Number { value } if !value.is_finite() => {
                Err(TokenError::NonFiniteNumber(*value))
            }
            TokenData::Tag { label } if label.trim().is_empty() => Err(TokenError::EmptyTag),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenData::Number { value } => write!(f, "{}", format_number(*value)),
            TokenData::Operand { value } => write!(f, "{value}"),
            TokenData::Tag { label } => write!(f, "{label}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    Operand,
    Tag,
}

/// A committed formula token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    #[serde(flatten)]
    pub data: TokenData,
}

impl Token {
    /// Create a token with a freshly allocated id.
    pub fn new(data: TokenData) -> Self {
        Self { id: TokenId::next(), data }
    }

    pub fn kind(&self) -> TokenKind {
        self.data.kind()
    }
}

/// Rejected bulk load.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    DuplicateId(TokenId),
    /// `u64::MAX` is never allocated; accepting it would exhaust the counter.
    IdOutOfRange(TokenId),
    NonFiniteNumber(f64),
    EmptyTag,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate token id {id}"),
            Self::IdOutOfRange(id) => write!(f, "token id {id} is out of range"),
            Self::NonFiniteNumber(n) => write!(f, "number token is not finite: {n}"),
            Self::EmptyTag => write!(f, "tag token has an empty label"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Ordered token list in left-to-right reading order.
///
/// Mutators return `true` when the sequence actually changed; unknown ids,
/// empty sequences and non-editable kinds are silent no-ops.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Build a sequence from externally supplied tokens, checking invariants.
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, TokenError> {
        let mut seen = FxHashSet::default();
        for token in &tokens {
            if !seen.insert(token.id) {
                return Err(TokenError::DuplicateId(token.id));
            }
            if token.id.0 == u64::MAX {
                return Err(TokenError::IdOutOfRange(token.id));
            }
            token.data.check()?;
        }
        for token in &tokens {
            token.id.reserve();
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Append a new token and return its id.
    pub fn append(&mut self, data: TokenData) -> TokenId {
        let token = Token::new(data);
        let id = token.id;
        self.tokens.push(token);
        id
    }

    pub fn remove_by_id(&mut self, id: TokenId) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t.id != id);
        self.tokens.len() != before
    }

    pub fn remove_last(&mut self) -> Option<Token> {
        self.tokens.pop()
    }

    /// Replace a tag's label. Numbers and operators are not editable after
    /// commit, and a blank label is ignored.
    pub fn update_by_id(&mut self, id: TokenId, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        match self.tokens.iter_mut().find(|t| t.id == id) {
            Some(Token { data: TokenData::Tag { label: current }, .. }) => {
                if current == label {
                    return false;
                }
                *current = label.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.tokens.is_empty();
        self.tokens.clear();
        changed
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TokenSequence {
        let mut seq = TokenSequence::new();
        seq.append(TokenData::number(2.0));
        seq.append(TokenData::operand(Operator::Add));
        seq.append(TokenData::tag("Sales"));
        seq
    }

    #[test]
    fn test_append_assigns_unique_ids() {
        let seq = sample();
        let ids: FxHashSet<_> = seq.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_append_then_remove_last_roundtrip() {
        let mut seq = sample();
        let before = seq.clone();
        seq.append(TokenData::number(7.0));
        seq.remove_last();
        assert_eq!(seq, before);
    }

    #[test]
    fn test_remove_last_on_empty_is_noop() {
        let mut seq = TokenSequence::new();
        assert!(seq.remove_last().is_none());
        assert!(seq.is_empty());
    }

    #[test]
    fn test_remove_by_unknown_id_is_noop() {
        let mut seq = sample();
        let before = seq.clone();
        assert!(!seq.remove_by_id(TokenId::from_raw(u64::MAX)));
        assert_eq!(seq, before);
    }

    #[test]
    fn test_remove_by_id_from_middle() {
        let mut seq = sample();
        let middle = seq.tokens()[1].id;
        assert!(seq.remove_by_id(middle));
        assert_eq!(seq.len(), 2);
        assert!(seq.get(middle).is_none());
    }

    #[test]
    fn test_update_number_is_noop() {
        let mut seq = sample();
        let before = seq.clone();
        let number_id = seq.tokens()[0].id;
        assert!(!seq.update_by_id(number_id, "Revenue"));
        assert_eq!(seq, before);
    }

    #[test]
    fn test_update_tag_label() {
        let mut seq = sample();
        let tag_id = seq.tokens()[2].id;
        assert!(seq.update_by_id(tag_id, "  Revenue "));
        assert_eq!(seq.get(tag_id).unwrap().data, TokenData::tag("Revenue"));
        assert!(!seq.update_by_id(tag_id, "   "), "blank label must be ignored");
    }

    #[test]
    fn test_from_tokens_rejects_duplicates() {
        let id = TokenId::next();
        let tokens = vec![
            Token { id, data: TokenData::number(1.0) },
            Token { id, data: TokenData::number(2.0) },
        ];
        assert_eq!(TokenSequence::from_tokens(tokens), Err(TokenError::DuplicateId(id)));
    }

    #[test]
    fn test_from_tokens_rejects_bad_payloads() {
        let nan = vec![Token::new(TokenData::number(f64::NAN))];
        assert!(matches!(
            TokenSequence::from_tokens(nan),
            Err(TokenError::NonFiniteNumber(_))
        ));
        let empty = vec![Token::new(TokenData::tag(""))];
        assert_eq!(TokenSequence::from_tokens(empty), Err(TokenError::EmptyTag));
    }

    #[test]
    fn test_from_tokens_rejects_max_id() {
        let before = NEXT_TOKEN_ID.load(Ordering::Relaxed);
        let max = TokenId::from_raw(u64::MAX);
        let tokens = vec![Token { id: max, data: TokenData::number(1.0) }];
        assert_eq!(TokenSequence::from_tokens(tokens), Err(TokenError::IdOutOfRange(max)));

        // The counter was not pushed to the top, so fresh ids still work
        assert!(NEXT_TOKEN_ID.load(Ordering::Relaxed) < u64::MAX);
        assert!(TokenId::next().raw() >= before);
    }

    #[test]
    fn test_loaded_ids_are_reserved() {
        let high = TokenId::from_raw(NEXT_TOKEN_ID.load(Ordering::Relaxed) + 1_000);
        let mut seq = TokenSequence::from_tokens(vec![Token { id: high, data: TokenData::tag("x") }])
            .unwrap();
        let fresh = seq.append(TokenData::number(1.0));
        assert!(fresh > high);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(TokenData::tag("Sales").to_text('@'), "@Sales");
        assert_eq!(TokenData::number(12.5).to_text('@'), "12.5");
        assert_eq!(TokenData::number(3.0).to_text('@'), "3");
        assert_eq!(TokenData::operand(Operator::Pow).to_text('@'), "^");
    }

    #[test]
    fn test_serde_shape() {
        let token = Token { id: TokenId::from_raw(4), data: TokenData::operand(Operator::Mul) };
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"id":4,"kind":"operand","value":"*"}"#);

        let back: Token = serde_json::from_str(r#"{"id":9,"kind":"tag","label":"Rent"}"#).unwrap();
        assert_eq!(back.id, TokenId::from_raw(9));
        assert_eq!(back.data, TokenData::tag("Rent"));

        let bad = serde_json::from_str::<Token>(r#"{"id":1,"kind":"operand","value":"%"}"#);
        assert!(bad.is_err());
    }
}
