//! Symbolic expression parsing and simplification.
//!
//! OCR output is handed to this module as free text; when it parses as a
//! mathematical expression, the expression is normalized (constants folded,
//! like terms collected, powers combined) and rendered back using `**` for
//! exponentiation. When it does not parse, the caller receives a
//! [`SolveError`] to embed in the response - unparseable text is an
//! expected outcome, not an exceptional one.
//!
//! Supported syntax: `+ - * /`, `**` (or `^`) for powers, parentheses,
//! decimal numbers, free variables, and the functions `sqrt`, `sin`,
//! `cos`, `tan`, `log`, `exp` (folded when their argument is constant).

mod ast;
mod parser;
mod simplify;

pub type Result<T> = std::result::Result<T, SolveError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("empty expression")]
    EmptyExpression,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number '{text}' at position {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("unexpected token '{token}' at position {pos}")]
    UnexpectedToken { token: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow")]
    NotFinite,
}

/// Trait for symbolic math backends
pub trait SymbolicEngine: Send + Sync {
    /// Parse `input` as a mathematical expression and return the
    /// simplified form rendered as a string.
    fn parse_and_simplify(&self, input: &str) -> Result<String>;
}

/// The built-in simplifier.
#[derive(Debug, Default, Clone)]
pub struct Simplifier;

impl SymbolicEngine for Simplifier {
    fn parse_and_simplify(&self, input: &str) -> Result<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SolveError::EmptyExpression);
        }

        let expr = parser::parse(trimmed)?;
        let simplified = simplify::simplify(expr)?;
        Ok(simplified.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(input: &str) -> Result<String> {
        Simplifier.parse_and_simplify(input)
    }

    #[test]
    fn folds_constant_arithmetic() {
        assert_eq!(solve("2 + 2").unwrap(), "4");
        assert_eq!(solve("2 * 3 + 4").unwrap(), "10");
        assert_eq!(solve("2 ** 10").unwrap(), "1024");
        assert_eq!(solve("10 / 4").unwrap(), "2.5");
        assert_eq!(solve("sqrt(16)").unwrap(), "4");
    }

    #[test]
    fn already_simplified_polynomials_are_fixed_points() {
        assert_eq!(solve("x**2 + 2*x + 1").unwrap(), "x**2 + 2*x + 1");
        assert_eq!(solve("x + 1").unwrap(), "x + 1");
    }

    #[test]
    fn collects_like_terms() {
        assert_eq!(solve("x + x").unwrap(), "2*x");
        assert_eq!(solve("3*x - x + 2 - 1").unwrap(), "2*x + 1");
        assert_eq!(solve("x*x").unwrap(), "x**2");
        assert_eq!(solve("x - x").unwrap(), "0");
    }

    #[test]
    fn whitespace_and_caret_are_accepted() {
        assert_eq!(solve("  2+2  ").unwrap(), "4");
        assert_eq!(solve("x^2 + x^2").unwrap(), "2*x**2");
    }

    #[test]
    fn ocr_noise_is_a_solve_error() {
        assert!(solve("hello world!").is_err());
        assert!(solve("").is_err());
        assert!(solve("2 +").is_err());
        assert!(solve("x?y").is_err());
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(solve("1/0"), Err(SolveError::DivisionByZero));
    }

    #[test]
    fn error_messages_are_presentable() {
        let err = solve("2 $ 2").unwrap_err();
        assert_eq!(err.to_string(), "unexpected character '$' at position 2");
    }
}
