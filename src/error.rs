use thiserror::Error;

/// Errors produced while parsing or rendering a template.
#[derive(Error, Debug)]
pub enum TplError {
    #[error("unterminated tag starting at byte {offset}")]
    UnterminatedTag { offset: usize },
    #[error("unbalanced `{construct}` block opened at byte {offset}")]
    UnbalancedBlock { construct: String, offset: usize },
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("unknown method `{method}` on {variant}")]
    UnknownMethod { variant: &'static str, method: String },
    #[error("method `{method}` takes {expected} argument(s), got {got}")]
    ArityMismatch {
        method: String,
        expected: usize,
        got: usize,
    },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("tuple index {index} out of range, length is {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown global function: {0}")]
    UnknownGlobalFunction(String),
    #[error("partial not found: `{path}` (referenced at byte {offset})")]
    PartialNotFound { path: String, offset: usize },
    #[error("failed to parse partial `{path}` (referenced at byte {offset}): {source}")]
    PartialParse {
        path: String,
        offset: usize,
        #[source]
        source: Box<TplError>,
    },
    #[error("failed to load `{path}`: {message}")]
    Load { path: String, message: String },
    #[error("partial recursion limit ({limit}) reached while rendering `{path}`")]
    RecursionLimit { path: String, limit: usize },
    #[error("context serialization error: {0}")]
    Serialize(String),
}

impl serde::ser::Error for TplError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        TplError::Serialize(msg.to_string())
    }
}
