use thiserror::Error;

/// Errors surfaced by the entity store and the layers built on it.
#[derive(Debug, Error)]
pub enum DbError {
    /// A referenced user, event or entity id does not resolve.
    #[error("{0} not found")]
    NotFound(String),

    /// A cascade delete removed some records and failed on others.
    /// Already-deleted records stay deleted.
    #[error("cascade delete failed for {} of {attempted} records ({deleted} deleted)", .failed.len())]
    PartialFailure {
        attempted: usize,
        deleted: usize,
        failed: Vec<String>,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
