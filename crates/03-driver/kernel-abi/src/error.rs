use thiserror::Error;

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Failure to address a kernel, session or terminal that does not exist.
///
/// This is the only failure that propagates to callers; every other
/// operation on a missing or disposed instance is a silent no-op.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ManagerError {
    #[error("no running kernel with id: {0}")]
    KernelNotFound(String),

    #[error("no running session with id: {0}")]
    SessionNotFound(String),

    #[error("no running terminal with name: {0}")]
    TerminalNotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid kernel config: {0}")]
    Parse(#[from] serde_json::Error),
}
