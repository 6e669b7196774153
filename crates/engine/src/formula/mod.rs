// Formula evaluation: sandboxed arithmetic parser and token evaluator

pub mod eval;
pub mod parser;

pub use eval::{evaluate, try_evaluate, Bindings, INVALID_EXPRESSION, ZERO_RESULT};
pub use parser::EvalError;
