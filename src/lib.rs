use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tera::Tera;

use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything a request handler needs, built once in `main` and shared
/// through `web::Data`.
pub struct AppState {
    pub pool: DbPool,
    pub tera: Tera,
    pub config: Config,
}

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
