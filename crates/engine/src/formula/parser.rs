// Arithmetic parser - converts an assembled expression string into an AST
// Accepts only numbers, + - * / ^, parentheses and whitespace. Anything else
// is rejected during tokenization, before any parsing happens.

use std::fmt;

/// Deepest nesting of parentheses and signs the parser will descend into.
pub const MAX_DEPTH: usize = 256;

/// Longest token stream accepted. Bounds the height of the AST, which is
/// walked recursively.
pub const MAX_TOKENS: usize = 4096;

/// Expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow, // ^
}

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Empty,
    UnexpectedCharacter(char),
    InvalidNumber(String),
    UnexpectedEnd,
    UnexpectedToken(usize),
    MissingClosingParen,
    TrailingInput(usize),
    NonFinite,
    TooDeep,
    TooLong(usize),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::InvalidNumber(s) => write!(f, "invalid number: {s}"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::UnexpectedToken(pos) => write!(f, "unexpected token at position {pos}"),
            Self::MissingClosingParen => write!(f, "missing closing parenthesis"),
            Self::TrailingInput(pos) => write!(f, "unexpected input after position {pos}"),
            Self::NonFinite => write!(f, "result is not a finite number"),
            Self::TooDeep => write!(f, "expression nested deeper than {MAX_DEPTH} levels"),
            Self::TooLong(n) => write!(f, "expression has {n} tokens, limit is {MAX_TOKENS}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Parse an arithmetic expression.
pub fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EvalError::TooLong(tokens.len()));
    }
    let (expr, pos) = parse_add_sub(&tokens, 0, 0)?;
    if pos < tokens.len() {
        return Err(match tokens[pos] {
            Token::RParen => EvalError::UnexpectedToken(pos),
            _ => EvalError::TrailingInput(pos),
        });
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '^' => { tokens.push(Token::Caret); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| EvalError::InvalidNumber(num_str.clone()))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(EvalError::UnexpectedCharacter(c)),
        }
    }

    Ok(tokens)
}

fn parse_add_sub(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), EvalError> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos, depth)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1, depth)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), EvalError> {
    let (mut left, mut pos) = parse_unary(tokens, pos, depth)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1, depth)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Unary sign binds looser than ^, so -2^2 is -(2^2)
fn parse_unary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), EvalError> {
    if depth > MAX_DEPTH {
        return Err(EvalError::TooDeep);
    }
    match tokens.get(pos) {
        Some(Token::Plus) => parse_unary(tokens, pos + 1, depth + 1),
        Some(Token::Minus) => {
            let (expr, pos) = parse_unary(tokens, pos + 1, depth + 1)?;
            Ok((Expr::Neg(Box::new(expr)), pos))
        }
        _ => parse_power(tokens, pos, depth),
    }
}

// Exponentiation (^) - right-associative; the exponent may carry its own sign
fn parse_power(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), EvalError> {
    let (base, pos) = parse_primary(tokens, pos, depth)?;

    if let Some(Token::Caret) = tokens.get(pos) {
        let (exponent, new_pos) = parse_unary(tokens, pos + 1, depth + 1)?;
        return Ok((
            Expr::BinaryOp {
                op: Op::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            },
            new_pos,
        ));
    }

    Ok((base, pos))
}

fn parse_primary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), EvalError> {
    match tokens.get(pos) {
        None => Err(EvalError::UnexpectedEnd),
        Some(Token::Number(n)) => Ok((Expr::Number(*n), pos + 1)),
        Some(Token::LParen) => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1, depth + 1)?;
            match tokens.get(pos) {
                Some(Token::RParen) => Ok((expr, pos + 1)),
                None => Err(EvalError::MissingClosingParen),
                Some(_) => Err(EvalError::UnexpectedToken(pos)),
            }
        }
        Some(_) => Err(EvalError::UnexpectedToken(pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 => 1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: Op::Add,
                left: num(1.0),
                right: Box::new(Expr::BinaryOp { op: Op::Mul, left: num(2.0), right: num(3.0) }),
            }
        );
    }

    #[test]
    fn test_parse_power_right_associative() {
        // 2 ^ 3 ^ 2 => 2 ^ (3 ^ 2)
        let expr = parse("2 ^ 3 ^ 2").unwrap();
        match expr {
            Expr::BinaryOp { op: Op::Pow, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: Op::Pow, .. }));
            }
            _ => panic!("Expected Pow, got {:?}", expr),
        }
    }

    #[test]
    fn test_parse_unary_minus_wraps_power() {
        let expr = parse("- 2 ^ 2").unwrap();
        match expr {
            Expr::Neg(inner) => assert!(matches!(*inner, Expr::BinaryOp { op: Op::Pow, .. })),
            _ => panic!("Expected Neg, got {:?}", expr),
        }
    }

    #[test]
    fn test_rejects_foreign_characters() {
        assert_eq!(parse("1 + x"), Err(EvalError::UnexpectedCharacter('x')));
        assert_eq!(parse("alert(1)"), Err(EvalError::UnexpectedCharacter('a')));
        assert_eq!(parse("1; 2"), Err(EvalError::UnexpectedCharacter(';')));
        assert_eq!(parse("1 % 2"), Err(EvalError::UnexpectedCharacter('%')));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(parse(""), Err(EvalError::Empty));
        assert_eq!(parse("   "), Err(EvalError::Empty));
        assert_eq!(parse("+ +"), Err(EvalError::UnexpectedEnd));
        assert_eq!(parse("(1 + 2"), Err(EvalError::MissingClosingParen));
        assert_eq!(parse("1 + 2)"), Err(EvalError::UnexpectedToken(3)));
        assert_eq!(parse("1 2"), Err(EvalError::TrailingInput(1)));
        assert_eq!(parse("()"), Err(EvalError::UnexpectedToken(1)));
        assert!(matches!(parse("1.2.3"), Err(EvalError::InvalidNumber(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(parse(&ok).is_ok());

        let parens = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&parens), Err(EvalError::TooDeep));

        let signs = format!("{}1", "- ".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&signs), Err(EvalError::TooDeep));

        let exponents = format!("2{}", " ^ -2".repeat(MAX_DEPTH));
        assert_eq!(parse(&exponents), Err(EvalError::TooDeep));
    }

    #[test]
    fn test_token_limit() {
        // 200k tokens would overflow the stack if parsed
        let unclosed = "(".repeat(200_000);
        assert_eq!(parse(&unclosed), Err(EvalError::TooLong(200_000)));

        let chain = format!("1{}", " + 1".repeat(MAX_TOKENS / 2));
        assert_eq!(parse(&chain), Err(EvalError::TooLong(MAX_TOKENS + 1)));

        let chain = format!("1{}", " + 1".repeat(MAX_TOKENS / 2 - 1));
        assert!(parse(&chain).is_ok());
    }
}
