use crate::models::db_operations::DbError;
use crate::DbPool;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

pub mod admin_helpers;
pub mod auth_helpers;
pub mod public_helpers;
pub mod topic_helpers;

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Record not found")]
    NotFound,
}

pub type HelperResult<T> = Result<T, HelperError>;

pub(crate) fn get_conn(pool: &DbPool) -> HelperResult<PooledConnection<SqliteConnectionManager>> {
    pool.get().map_err(HelperError::Pool)
}
