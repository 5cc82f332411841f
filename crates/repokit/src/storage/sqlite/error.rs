//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `RepositoryError` from `repokit_core::storage`.
//! Specific errors are mapped to semantic variants (e.g., PRIMARY KEY constraint to AlreadyExists).

use repokit_core::storage::RepositoryError;

fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Maps a rusqlite error to a RepositoryError.
///
/// # Error Mapping
///
/// - `SQLITE_CONSTRAINT_UNIQUE` / `SQLITE_CONSTRAINT_PRIMARYKEY` → `RepositoryError::AlreadyExists`
/// - Connection errors → `RepositoryError::ConnectionFailed`
/// - All other errors → `RepositoryError::QueryFailed`
pub fn map_rusqlite_error(err: &rusqlite::Error, table: &str) -> RepositoryError {
    map_rusqlite_error_with_key(err, table, "unknown")
}

/// Maps a rusqlite error with a known row key to a RepositoryError.
pub fn map_rusqlite_error_with_key(
    err: &rusqlite::Error,
    table: &str,
    key: &str,
) -> RepositoryError {
    match err {
        _ if is_duplicate_key(err) => RepositoryError::AlreadyExists {
            table: table.to_string(),
            key: key.to_string(),
        },

        // Connection-related errors
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen =>
        {
            RepositoryError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
            table: table.to_string(),
            key: key.to_string(),
        },

        // All other errors
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a RepositoryError.
///
/// This is the main entry point for error mapping in async code. Errors
/// raised inside a connection closure as `tokio_rusqlite::Error::Other`
/// carrying a `RepositoryError` are passed through unchanged.
pub fn map_tokio_rusqlite_error(err: tokio_rusqlite::Error, table: &str) -> RepositoryError {
    match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(&rusqlite_err, table),
        tokio_rusqlite::Error::Close(_) | tokio_rusqlite::Error::ConnectionClosed => {
            RepositoryError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        tokio_rusqlite::Error::Other(inner) => match inner.downcast::<RepositoryError>() {
            Ok(repository_err) => *repository_err,
            Err(other) => RepositoryError::QueryFailed(other.to_string()),
        },
        other => RepositoryError::QueryFailed(other.to_string()),
    }
}

/// Carries a `RepositoryError` out of a connection closure.
pub fn raise(err: RepositoryError) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(err))
}
