use crate::helper::auth_helpers::{self, INVALID_CREDENTIALS_MESSAGE, LOGIN_PATH, SESSION_USERNAME};
use crate::AppState;
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{http::header, web, HttpResponse, Responder};
use serde::Deserialize;
use tera::Context;

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    username: String,
    password: String,
    next: Option<String>,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
struct NextQuery {
    next: Option<String>,
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route(LOGIN_PATH, web::get().to(show_login_form))
        .route(LOGIN_PATH, web::post().to(handle_login))
        .route("/logout", web::get().to(handle_logout));
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().append_header((header::LOCATION, location)).finish()
}

async fn show_login_form(
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
    query: web::Query<NextQuery>,
) -> impl Responder {
    if auth_helpers::current_user_id(&session).is_some() {
        return redirect(&auth_helpers::post_login_destination(query.next.as_deref()));
    }

    let mut ctx = Context::new();
    ctx.insert("csrf_token", token.get());
    if let Some(next) = auth_helpers::safe_redirect_target(query.next.as_deref()) {
        ctx.insert("next", &next);
    }
    if let Ok(Some(error)) = session.get::<String>("error") {
        ctx.insert("error", &error);
        session.remove("error");
    }

    match state.tera.render("login.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error: {}", err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn handle_login(
    session: Session,
    state: web::Data<AppState>,
    form: Csrf<web::Form<LoginForm>>,
    query: web::Query<NextQuery>,
) -> impl Responder {
    let login_data = form.into_inner();
    let next = login_data
        .next
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or(query.next.as_deref());

    match auth_helpers::verify_user_credentials(&state.pool, &login_data.username, &login_data.password) {
        Some(user) => {
            if let Err(e) = auth_helpers::start_session(&session, &user) {
                log::error!("Could not store session for '{}': {}", user.username, e);
                return HttpResponse::InternalServerError().body("Session error");
            }
            log::info!("User '{}' logged in.", user.username);
            redirect(&auth_helpers::post_login_destination(next))
        }
        None => {
            log::warn!("Failed login attempt for user '{}'.", login_data.username);
            if let Err(e) = session.insert("error", INVALID_CREDENTIALS_MESSAGE) {
                log::error!("Could not store login error in session: {}", e);
            }
            let retry_url = next.map_or_else(|| LOGIN_PATH.to_string(), auth_helpers::login_url_with_next);
            redirect(&retry_url)
        }
    }
}

async fn handle_logout(session: Session) -> impl Responder {
    if let Ok(Some(username)) = session.get::<String>(SESSION_USERNAME) {
        log::info!("User '{}' logged out.", username);
    }
    session.purge();
    redirect(LOGIN_PATH)
}
