use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("No journal found for tag '{0}'")]
    MissingJournal(String),

    #[error("Malformed journal for tag '{tag}': {detail}")]
    MalformedJournal { tag: String, detail: String },

    #[error("Invalid run tag '{0}'")]
    InvalidTag(String),

    #[error("Migration plan error: {0}")]
    Plan(String),

    #[error("Invalid update instruction: {0}")]
    InvalidUpdate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

impl<T> From<std::sync::PoisonError<T>> for MigrateError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
