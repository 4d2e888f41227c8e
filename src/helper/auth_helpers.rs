use crate::helper::{get_conn, HelperResult};
use crate::models::db_operations::users_db_operations;
use crate::models::User;
use crate::DbPool;
use actix_session::Session;
use url::Url;

pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_USERNAME: &str = "username";

/// Where a successful login lands when no usable `next` was given.
pub const DEFAULT_LOGIN_DESTINATION: &str = "/admin";
pub const LOGIN_PATH: &str = "/login";

/// Shown for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";

/// Checks a username/password pair and records the login time on success.
pub fn verify_user_credentials(pool: &DbPool, username: &str, password: &str) -> Option<User> {
    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Could not get DB connection for login: {}", e);
            return None;
        }
    };

    let user = users_db_operations::verify_credentials(&conn, username, password)?;
    if let Err(e) = users_db_operations::update_last_login_time(&conn, user.id) {
        log::warn!("Could not record login time for '{}': {}", user.username, e);
    }
    Some(user)
}

/// Accepts `next` only when it is a path on this site. Absolute URLs,
/// scheme-relative `//host` forms and backslash tricks are rejected.
pub fn safe_redirect_target(next: Option<&str>) -> Option<String> {
    let candidate = next?.trim();
    if candidate.is_empty() || !candidate.starts_with('/') || candidate.starts_with("//") {
        return None;
    }
    if candidate.chars().any(|c| c == '\\' || c.is_control()) {
        return None;
    }

    let base = Url::parse("http://same-origin.invalid/").ok()?;
    let resolved = base.join(candidate).ok()?;
    if resolved.origin() != base.origin() {
        return None;
    }
    Some(candidate.to_string())
}

pub fn post_login_destination(next: Option<&str>) -> String {
    safe_redirect_target(next).unwrap_or_else(|| DEFAULT_LOGIN_DESTINATION.to_string())
}

/// `/login?next=<encoded>` for an anonymous request to `requested`.
pub fn login_url_with_next(requested: &str) -> String {
    match safe_redirect_target(Some(requested)) {
        Some(target) => {
            let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
            format!("{}?next={}", LOGIN_PATH, encoded)
        }
        None => LOGIN_PATH.to_string(),
    }
}

pub fn current_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(SESSION_USER_ID).unwrap_or(None)
}

/// Re-reads the session's account from the store. A deleted account ends the
/// session; a renamed one refreshes the stored username.
pub fn refresh_session_user(pool: &DbPool, session: &Session) -> HelperResult<Option<User>> {
    let Some(user_id) = current_user_id(session) else {
        return Ok(None);
    };

    let conn = get_conn(pool)?;
    match users_db_operations::read_user(&conn, user_id)? {
        Some(user) => {
            let stored_name = session.get::<String>(SESSION_USERNAME).unwrap_or(None);
            if stored_name.as_deref() != Some(user.username.as_str()) {
                if let Err(e) = session.insert(SESSION_USERNAME, &user.username) {
                    log::warn!("Could not refresh session username for user {}: {}", user.id, e);
                }
            }
            Ok(Some(user))
        }
        None => {
            log::info!("Session of deleted user {} ended.", user_id);
            session.purge();
            Ok(None)
        }
    }
}

/// Moves the session to the authenticated state under a fresh session key.
pub fn start_session(session: &Session, user: &User) -> Result<(), actix_session::SessionInsertError> {
    session.renew();
    session.insert(SESSION_USER_ID, user.id)?;
    session.insert(SESSION_USERNAME, &user.username)?;
    Ok(())
}
