use crate::helper::auth_helpers::LOGIN_PATH;
use crate::middleware::RequireLogin;
use actix_csrf::CsrfMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::web;
use rand::rngs::StdRng;

pub mod admin;
pub mod auth;
pub mod public;

/// Headers attached to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
}

/// Registers every route of the archive. Public API, pages and media are
/// stateless; login and the admin area live behind the cookie session and
/// CSRF middleware.
pub fn config_app(cfg: &mut web::ServiceConfig, media_path: &str, session_key: Key, secure_cookies: bool) {
    let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key)
        .cookie_secure(secure_cookies)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .build();

    let csrf_mw = admin::CSRF_FORM_PAGES
        .iter()
        .fold(
            CsrfMiddleware::<StdRng>::new().set_cookie(Method::GET, LOGIN_PATH),
            |mw, page| mw.set_cookie(Method::GET, *page),
        );

    cfg.configure(public::config_api)
        .configure(public::config_pages)
        .service(actix_files::Files::new("/media", media_path))
        .service(
            web::scope("")
                .wrap(csrf_mw)
                .wrap(session_mw)
                .configure(auth::config_login)
                .service(web::scope("/admin").wrap(RequireLogin).configure(admin::config_admin)),
        );
}
