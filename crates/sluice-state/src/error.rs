//! State backend error types.

/// Errors produced by [`StateBackend`](crate::StateBackend) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `SQLite` failure annotated with the operation that hit it.
    #[error("{context}: {source}")]
    Backend {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored state blob is not valid JSON.
    #[error("corrupt state blob for '{submodule}': {source}")]
    Corrupt {
        submodule: String,
        #[source]
        source: serde_json::Error,
    },

    /// Internal mutex was poisoned by a panicked thread.
    #[error("state backend lock poisoned")]
    LockPoisoned,
}

impl StateError {
    pub(crate) fn backend(source: rusqlite::Error) -> Self {
        Self::Sqlite(source)
    }

    pub(crate) fn backend_context(context: &'static str, source: rusqlite::Error) -> Self {
        Self::Backend { context, source }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
