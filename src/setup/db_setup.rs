use crate::models::db_operations::{users_db_operations, DbError};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Creates the archive tables. Safe to run against an existing database.
pub fn setup_archive_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::debug!("Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE CHECK(length(username) BETWEEN 1 AND 80),
            password_hash TEXT NOT NULL,
            last_login_time TEXT
        )",
        [],
    )?;

    log::debug!("Creating 'timeline_event' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS timeline_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            section TEXT NOT NULL CHECK(length(section) <= 50),
            sub_section TEXT CHECK(sub_section IS NULL OR length(sub_section) <= 50),
            year INTEGER,
            title TEXT NOT NULL CHECK(length(title) <= 255),
            text TEXT NOT NULL,
            images_json TEXT,
            corroboration TEXT
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_timeline_event_section ON timeline_event (section COLLATE NOCASE, year)",
        [],
    )?;

    log::debug!("Creating 'gallery_image' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS gallery_image (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chronological_order INTEGER NOT NULL DEFAULT 0,
            file_name TEXT NOT NULL UNIQUE CHECK(length(file_name) <= 255),
            title TEXT CHECK(title IS NULL OR length(title) <= 255),
            corroboration_text TEXT,
            admin_assigned_section TEXT DEFAULT 'Geral' CHECK(admin_assigned_section IS NULL OR length(admin_assigned_section) <= 100),
            tags TEXT CHECK(tags IS NULL OR length(tags) <= 500)
        )",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

/// Creates the `admin` account with the given password unless it already exists.
/// Returns whether a user was created.
pub fn ensure_admin_user(conn: &Connection, password: &str) -> Result<bool, SetupError> {
    if users_db_operations::read_user_by_username(conn, "admin")?.is_some() {
        return Ok(false);
    }
    users_db_operations::create_user(conn, "admin", password)?;
    Ok(true)
}
