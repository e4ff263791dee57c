use thiserror::Error;

// Unified error type for allreduce-bench

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("missing required input '{0}'")]
    MissingInput(String),
    #[error("invalid value '{value}' for input '{key}': {reason}")]
    InvalidInput {
        key: String,
        value: String,
        reason: String,
    },
    #[error("malformed inputs line {line}: {text}")]
    MalformedInputs { line: usize, text: String },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("buffer length mismatch: send has {send} elements, recv has {recv}")]
    LengthMismatch { send: usize, recv: usize },
    #[error("communicator error: {0}")]
    Comm(String),
    #[error("device error in {op}: {reason}")]
    Device { op: &'static str, reason: String },
    #[error("collective error in {op}: {reason}")]
    Collective { op: &'static str, reason: String },
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BenchError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        BenchError::InvalidInput {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
