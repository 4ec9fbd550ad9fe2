use core_types::CoreError;
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database configuration: {0}")]
    Config(String),

    #[error("Database not initialized. Call ConnectionManager::initialize() first.")]
    NotInitialized,

    #[error("Database already initialized.")]
    AlreadyInitialized,

    #[error("Check constraint '{constraint}' violated.")]
    CheckViolation { constraint: String },

    #[error("Unique constraint '{constraint}' violated.")]
    UniqueViolation { constraint: String },

    #[error("Foreign key constraint '{constraint}' violated.")]
    ForeignKeyViolation { constraint: String },

    #[error("Column '{column}' must not be null.")]
    NotNullViolation { column: String },

    #[error("The requested data was not found in the database.")]
    NotFound,

    #[error("Invalid booking status change: {0}")]
    InvalidTransition(#[source] CoreError),

    #[error("Stored row could not be decoded: {0}")]
    Decode(#[source] CoreError),

    #[error("Timed out waiting for a pooled connection.")]
    PoolTimedOut,

    #[error("Database error: {0}")]
    Sqlx(#[source] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// True for check, unique, foreign key and not-null violations raised by the store.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::CheckViolation { .. }
                | DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::NotNullViolation { .. }
        )
    }

    /// Name of the violated constraint, when the store reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DbError::CheckViolation { constraint }
            | DbError::UniqueViolation { constraint }
            | DbError::ForeignKeyViolation { constraint } => Some(constraint.as_str()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::RowNotFound => Some(DbError::NotFound),
            sqlx::Error::PoolTimedOut => Some(DbError::PoolTimedOut),
            sqlx::Error::Database(db_err) => classify(&**db_err),
            _ => None,
        };
        classified.unwrap_or(DbError::Sqlx(err))
    }
}

fn classify(db_err: &dyn DatabaseError) -> Option<DbError> {
    let constraint = db_err.constraint().unwrap_or_default().to_string();
    match db_err.kind() {
        ErrorKind::CheckViolation => Some(DbError::CheckViolation { constraint }),
        ErrorKind::UniqueViolation => Some(DbError::UniqueViolation { constraint }),
        ErrorKind::ForeignKeyViolation => Some(DbError::ForeignKeyViolation { constraint }),
        ErrorKind::NotNullViolation => {
            let column = db_err
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| pg.column())
                .unwrap_or_default()
                .to_string();
            Some(DbError::NotNullViolation { column })
        }
        _ => None,
    }
}
