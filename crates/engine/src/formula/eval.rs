// Formula evaluator - substitutes tag values into the token list and evaluates
// the assembled arithmetic string with the sandboxed parser.

use rustc_hash::FxHashMap;

use super::parser::{self, EvalError, Expr, Op};
use crate::token::{Token, TokenData};

/// Display value for an expression that cannot be evaluated.
pub const INVALID_EXPRESSION: &str = "Invalid Expression";

/// Display value for an empty formula.
pub const ZERO_RESULT: &str = "0";

/// Variable bindings: tag label -> value.
///
/// Labels are matched exactly (case-sensitive). Unbound labels evaluate to 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: FxHashMap<String, f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(label.into(), value)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Value used for a tag during evaluation.
    pub fn resolve(&self, label: &str) -> f64 {
        self.get(label).unwrap_or(0.0)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Evaluate a token list to its display string.
///
/// Never fails: any evaluation error becomes [`INVALID_EXPRESSION`].
pub fn evaluate(tokens: &[Token], bindings: &Bindings) -> String {
    if tokens.is_empty() {
        return ZERO_RESULT.to_string();
    }
    match try_evaluate(tokens, bindings) {
        Ok(value) => format_number(value),
        Err(_) => INVALID_EXPRESSION.to_string(),
    }
}

/// Evaluate a token list, keeping the failure reason.
pub fn try_evaluate(tokens: &[Token], bindings: &Bindings) -> Result<f64, EvalError> {
    let source = expression_source(tokens, bindings);
    let expr = parser::parse(&source)?;
    eval_expr(&expr)
}

/// Assemble the arithmetic source string: one substitution per token,
/// separated by single spaces.
pub fn expression_source(tokens: &[Token], bindings: &Bindings) -> String {
    tokens
        .iter()
        .map(|token| match &token.data {
            TokenData::Number { value } => format_number(*value),
            TokenData::Operand { value } => value.as_char().to_string(),
            TokenData::Tag { label } => format_number(bindings.resolve(label)),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn eval_expr(expr: &Expr) -> Result<f64, EvalError> {
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Neg(inner) => -eval_expr(inner)?,
        Expr::BinaryOp { op, left, right } => {
            let l = eval_expr(left)?;
            let r = eval_expr(right)?;
            match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => l / r,
                Op::Pow => l.powf(r),
            }
        }
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

/// Format a number for display and for re-parsing.
///
/// Integral values print without a fraction, negative zero prints as `0`, and
/// everything else uses the shortest decimal that round-trips. Never emits an
/// exponent, so the output always passes the sandboxed tokenizer.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return ZERO_RESULT.to_string();
    }
    format!("{}", n)
}
