#![allow(dead_code)]
#![allow(unused_macros)]

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test::{self, TestRequest};
use actix_web::web;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use regex::Regex;
use std::collections::HashMap;
use tera::Tera;
use textile_archive::config::{Config, WebConfig};
use textile_archive::models::db_operations::users_db_operations;
use textile_archive::setup::db_setup;
use textile_archive::{AppState, DbPool};

pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// One shared in-memory connection, so schema changes made by a test are
/// seen by the handlers.
pub fn memory_pool() -> DbPool {
    let pool = Pool::builder()
        .max_size(1)
        .build(SqliteConnectionManager::memory())
        .unwrap();
    let mut conn = pool.get().unwrap();
    db_setup::setup_archive_db(&mut conn).unwrap();
    drop(conn);
    pool
}

pub fn test_config() -> Config {
    Config {
        web: WebConfig { host: "127.0.0.1".to_string(), port: 0 },
        database_path: "target/test-data".to_string(),
        media_path: "target/test-data/media".to_string(),
        allowed_origins: "*".to_string(),
        log_level: "debug".to_string(),
        session_secret_key: "ab".repeat(64),
        use_secure_cookies: false,
        seed_file: None,
        admin_password: None,
    }
}

pub fn test_state(pool: DbPool) -> web::Data<AppState> {
    let tera = Tera::new("templates/**/*.html").unwrap();
    web::Data::new(AppState { pool, tera, config: test_config() })
}

/// State with a ready `admin` account.
pub fn state_with_admin() -> web::Data<AppState> {
    let pool = memory_pool();
    {
        let conn = pool.get().unwrap();
        users_db_operations::create_user(&conn, "admin", ADMIN_PASSWORD).unwrap();
    }
    test_state(pool)
}

/// Builds the full application around `state`, the same way `main` does.
macro_rules! init_app {
    ($state:expr) => {{
        let state = $state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(textile_archive::routes::security_headers())
                .app_data(state)
                .configure(|cfg| {
                    textile_archive::routes::config_app(
                        cfg,
                        "target/test-data/media",
                        actix_web::cookie::Key::from(&[7u8; 64][..]),
                        false,
                    )
                }),
        )
        .await
    }};
}

/// Minimal browser-like cookie store.
#[derive(Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    pub fn absorb<B>(&mut self, resp: &ServiceResponse<B>) {
        for cookie in resp.response().cookies() {
            let expired = cookie.max_age().map_or(false, |age| age.is_zero());
            if cookie.value().is_empty() || expired {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }

    pub fn attach(&self, req: TestRequest) -> TestRequest {
        if self.cookies.is_empty() {
            return req;
        }
        let header_value = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        req.insert_header((header::COOKIE, header_value))
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn unescape_html(value: &str) -> String {
    value
        .replace("&#x2F;", "/")
        .replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Pulls the hidden CSRF token out of a rendered form.
pub fn csrf_token_from(html: &str) -> String {
    let re = Regex::new(r#"name="csrf_token" value="([^"]*)""#).unwrap();
    let captures = re.captures(html).expect("page has no csrf_token field");
    unescape_html(&captures[1])
}

pub async fn body_string<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

/// GET with the jar's cookies, keeping whatever the response sets.
macro_rules! get {
    ($app:expr, $jar:expr, $uri:expr) => {{
        let req = $jar.attach(actix_web::test::TestRequest::get().uri($uri));
        let resp = actix_web::test::call_service(&$app, req.to_request()).await;
        $jar.absorb(&resp);
        resp
    }};
}

/// Loads a form page and posts `$fields` back with its CSRF token.
macro_rules! submit {
    ($app:expr, $jar:expr, $form_page:expr, $action:expr, $fields:expr) => {{
        let page = get!($app, $jar, $form_page);
        assert_eq!(page.status(), actix_web::http::StatusCode::OK, "form page {}", $form_page);
        let token = $crate::common::csrf_token_from(&$crate::common::body_string(page).await);
        let mut form: Vec<(String, String)> = vec![("csrf_token".to_string(), token)];
        for (name, value) in $fields {
            form.push((name.to_string(), value.to_string()));
        }
        let req = $jar.attach(actix_web::test::TestRequest::post().uri($action)).set_form(&form);
        let resp = actix_web::test::call_service(&$app, req.to_request()).await;
        $jar.absorb(&resp);
        resp
    }};
}

/// Runs the whole login form round trip.
macro_rules! login {
    ($app:expr, $jar:expr, $username:expr, $password:expr) => {{
        let fields: Vec<(&str, &str)> = vec![("username", $username), ("password", $password)];
        submit!($app, $jar, "/login", "/login", fields)
    }};
}
