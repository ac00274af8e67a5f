use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{what} mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;

impl KernelError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        KernelError::InvalidConfig(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        KernelError::InvariantViolation(msg.into())
    }
}
