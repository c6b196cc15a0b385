//! Errors raised while setting up the database

use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The pool could not open a connection
    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// An embedded migration failed to apply
    #[error("Database migration error: {0}")]
    Migration(#[from] MigrateError),

    /// Invalid pool settings or connection URL
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
