use rusqlite::ffi::{SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_CONSTRAINT_NOTNULL};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the content store. Constraint violations are reported
/// synchronously at the offending write and never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("required column {table}.{column} was not provided")]
    NotNull { table: String, column: String },

    #[error("referential integrity violation: {0}")]
    ForeignKey(String),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            match code.extended_code {
                SQLITE_CONSTRAINT_FOREIGNKEY => {
                    let detail = message
                        .clone()
                        .unwrap_or_else(|| "FOREIGN KEY constraint failed".to_string());
                    return StoreError::ForeignKey(detail);
                }
                SQLITE_CONSTRAINT_NOTNULL => {
                    // SQLite reports "NOT NULL constraint failed: table.column".
                    if let Some((table, column)) = message
                        .as_deref()
                        .and_then(|m| m.rsplit(' ').next())
                        .and_then(|qualified| qualified.split_once('.'))
                    {
                        return StoreError::NotNull {
                            table: table.to_string(),
                            column: column.to_string(),
                        };
                    }
                }
                _ => {}
            }
        }
        StoreError::Sqlite(err)
    }
}

impl StoreError {
    /// Maps a no-rows lookup onto the entity the caller asked for.
    pub(crate) fn for_missing(err: rusqlite::Error, entity: &'static str, id: i64) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound { entity, id },
            other => other.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn sqlite_failure(extended_code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: ffi::ErrorCode::ConstraintViolation,
                extended_code,
            },
            Some(message.to_string()),
        )
    }

    #[test]
    fn classifies_not_null_failures() {
        let err: StoreError =
            sqlite_failure(SQLITE_CONSTRAINT_NOTNULL, "NOT NULL constraint failed: tracks.title")
                .into();
        match err {
            StoreError::NotNull { table, column } => {
                assert_eq!(table, "tracks");
                assert_eq!(column, "title");
            }
            other => panic!("expected NotNull, got {other:?}"),
        }
    }

    #[test]
    fn classifies_foreign_key_failures() {
        let err: StoreError =
            sqlite_failure(SQLITE_CONSTRAINT_FOREIGNKEY, "FOREIGN KEY constraint failed").into();
        assert!(matches!(err, StoreError::ForeignKey(_)));
    }

    #[test]
    fn other_failures_stay_sqlite() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
