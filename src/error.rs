use thiserror::Error;

/// The error taxonomy for the storage core.
///
/// Internal APIs return `Result<T, DbError>` instead of `anyhow::Error` so callers at
/// a transaction boundary can match on the kind of failure (transaction-fatal vs.
/// client-visible) rather than downcasting an opaque error.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no buffer available within timeout")]
    BufferAbort,

    #[error("lock acquisition timed out")]
    LockAbort,

    #[error("syntax error: {0}")]
    BadSyntax(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("programmer error: {0}")]
    ProgrammerError(String),

    #[error("a shared lock/mutex was poisoned by a panicking thread")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DbError::Poisoned
    }
}
