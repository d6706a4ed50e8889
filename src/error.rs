//! Error types for compiling and evaluating expressions

use thiserror::Error;

use crate::{lexer::LexError, parser::ParseError};

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while evaluating a compiled expression.
///
/// `NotFound` doubles as a control-flow signal: most nodes absorb it as null,
/// only navigation chains (`a.b`, `a[0]`) let it escape to the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// Field absent from an object
    #[error("Unknown key \"{key}\" in path")]
    NotFound { key: String },

    /// Operand kinds not accepted by an operation
    #[error("{operation}: types mismatch ({detail})")]
    TypeMismatch { operation: String, detail: String },

    /// Division or modulo by zero
    #[error("{operation}: zero divisor passed")]
    ZeroDivision { operation: String },

    /// Modulo of a non-integral operand
    #[error("modulo: non-integer argument(s) passed")]
    NonIntegerModulo,

    /// `round` with a non-integral or negative digit count
    #[error("round: the number of digits must be a non-negative integer")]
    NonIntegerRound,

    /// An operand was neither a number, a quantity nor a duration
    #[error("{operation}: invalid operands")]
    InvalidOperands { operation: String },

    /// Wrong number of function arguments
    #[error("Invalid arity for {function}(): expected {expected}, got {actual}")]
    InvalidArity {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Function argument of the wrong kind
    #[error("Invalid type for {function}() argument {position}: expected {expected}, got {actual}")]
    InvalidArgument {
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    /// Call to a function the registry does not hold
    #[error("Unknown function: {name}()")]
    UnknownFunction { name: String },

    /// Reference to a variable no let expression bound
    #[error("Undefined variable: ${name}")]
    UndefinedVariable { name: String },

    /// A node in a position its kind cannot be evaluated in
    #[error("Unknown AST node: {kind}")]
    UnknownNode { kind: &'static str },

    /// Failure inside a function body (bad regex, unparsable timestamp, ...)
    #[error("Function {function}(): {message}")]
    Function { function: String, message: String },
}

impl EvalError {
    pub(crate) fn type_mismatch(operation: &str, detail: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            operation: operation.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        EvalError::Function {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// True for the field-absent signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EvalError::NotFound { .. })
    }
}

/// Error returned by the one-shot `search` helpers, which both compile and
/// evaluate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<LexError> for Error {
    fn from(e: LexError) -> Self {
        Error::Compile(ParseError::from(e))
    }
}
