use crate::models::db_operations::DbError;
use crate::models::User;
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::OnceLock;

const USER_COLUMNS: &str = "id, username, last_login_time";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        last_login_time: row.get(2)?,
    })
}

pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<i64, DbError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST)?;
    conn.execute(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
        params![username, hashed_password],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_all_users(conn: &Connection) -> Result<Vec<User>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn read_user(conn: &Connection, user_id: i64) -> Result<Option<User>, DbError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [user_id],
            row_to_user,
        )
        .optional()?)
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DbError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            [username],
            row_to_user,
        )
        .optional()?)
}

/// Renames a user and, when a non-empty password is given, replaces its hash.
pub fn update_user(
    conn: &Connection,
    user_id: i64,
    username: &str,
    new_password: Option<&str>,
) -> Result<(), DbError> {
    let changed = match new_password.filter(|p| !p.is_empty()) {
        Some(password) => {
            let hashed_password = hash(password, bcrypt::DEFAULT_COST)?;
            conn.execute(
                "UPDATE users SET username = ?1, password_hash = ?2 WHERE id = ?3",
                params![username, hashed_password, user_id],
            )?
        }
        None => conn.execute(
            "UPDATE users SET username = ?1 WHERE id = ?2",
            params![username, user_id],
        )?,
    };

    if changed == 0 {
        return Err(DbError::NotFound(format!("user {}", user_id)));
    }
    Ok(())
}

pub fn delete_user(conn: &Connection, user_id: i64) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?)
}

pub fn count_users(conn: &Connection) -> Result<i64, DbError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

// Hash checked for unknown usernames, so a miss costs the same as a bad password.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| match hash("unknown-user-placeholder", bcrypt::DEFAULT_COST) {
            Ok(hashed) => Some(hashed),
            Err(e) => {
                log::error!("Could not build the placeholder password hash: {}", e);
                None
            }
        })
        .as_deref()
}

/// Builds the placeholder hash up front so the first unknown-user login
/// does not also pay for hashing. Call once at startup.
pub fn prepare_dummy_hash() -> bool {
    dummy_hash().is_some()
}

/// Returns the user when `password` matches its stored hash. Unknown users and
/// wrong passwords are indistinguishable to the caller.
pub fn verify_credentials(conn: &Connection, username: &str, password: &str) -> Option<User> {
    let res: rusqlite::Result<(String, User)> = conn.query_row(
        &format!("SELECT password_hash, {} FROM users WHERE username = ?1", USER_COLUMNS),
        [username],
        |row| {
            Ok((
                row.get(0)?,
                User {
                    id: row.get(1)?,
                    username: row.get(2)?,
                    last_login_time: row.get(3)?,
                },
            ))
        },
    );

    match res {
        Ok((stored_hash, user)) => {
            if verify(password, &stored_hash).unwrap_or(false) {
                Some(user)
            } else {
                None
            }
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            if let Some(placeholder) = dummy_hash() {
                let _ = verify(password, placeholder);
            }
            None
        }
        Err(e) => {
            log::error!("Credential lookup failed for '{}': {}", username, e);
            None
        }
    }
}

pub fn update_last_login_time(conn: &Connection, user_id: i64) -> Result<(), DbError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_time = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}
