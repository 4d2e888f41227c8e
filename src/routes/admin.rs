use crate::helper::admin_helpers::{self, GalleryImageFields, TimelineEventFields};
use crate::helper::HelperError;
use crate::middleware::AuthenticatedUser;
use crate::models::{encode_images, Notification};
use crate::AppState;
use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{http::header, web, HttpResponse, Responder};
use serde::Deserialize;
use tera::Context;

const DASHBOARD_URL: &str = "/admin";

#[derive(Deserialize)]
struct TimelineEventForm {
    csrf_token: CsrfToken,
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    sub_section: String,
    #[serde(default)]
    year: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    images_json: String,
    #[serde(default)]
    corroboration: String,
}

#[derive(Deserialize)]
struct GalleryImageForm {
    csrf_token: CsrfToken,
    #[serde(default)]
    image_id: String,
    #[serde(default)]
    chronological_order: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    corroboration_text: String,
    #[serde(default)]
    admin_assigned_section: String,
    #[serde(default)]
    tags: String,
}

#[derive(Deserialize)]
struct UserForm {
    csrf_token: CsrfToken,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct DeleteForm {
    csrf_token: CsrfToken,
}

impl CsrfGuarded for TimelineEventForm {
    fn csrf_token(&self) -> &CsrfToken { &self.csrf_token }
}

impl CsrfGuarded for GalleryImageForm {
    fn csrf_token(&self) -> &CsrfToken { &self.csrf_token }
}

impl CsrfGuarded for UserForm {
    fn csrf_token(&self) -> &CsrfToken { &self.csrf_token }
}

impl CsrfGuarded for DeleteForm {
    fn csrf_token(&self) -> &CsrfToken { &self.csrf_token }
}

pub fn config_admin(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(show_dashboard))
        .route("/timeline/new", web::get().to(show_timeline_form))
        .route("/timeline/save", web::post().to(save_timeline_action))
        .route("/timeline/{id}/edit", web::get().to(show_timeline_edit_form))
        .route("/timeline/{id}/delete", web::post().to(delete_timeline_action))
        .route("/gallery/new", web::get().to(show_gallery_form))
        .route("/gallery/save", web::post().to(save_gallery_action))
        .route("/gallery/{id}/edit", web::get().to(show_gallery_edit_form))
        .route("/gallery/{id}/delete", web::post().to(delete_gallery_action))
        .route("/users/new", web::get().to(show_user_form))
        .route("/users/save", web::post().to(save_user_action))
        .route("/users/{id}/edit", web::get().to(show_user_edit_form))
        .route("/users/{id}/delete", web::post().to(delete_user_action));
}

/// Admin GET pages that hand out a fresh CSRF cookie.
pub const CSRF_FORM_PAGES: &[&str] = &[
    "/admin",
    "/admin/timeline/new",
    "/admin/timeline/{id}/edit",
    "/admin/gallery/new",
    "/admin/gallery/{id}/edit",
    "/admin/users/new",
    "/admin/users/{id}/edit",
];

fn set_notification(session: &Session, message: &str, r#type: &str) {
    let notification = Notification { message: message.to_string(), r#type: r#type.to_string() };
    if let Err(e) = session.insert("notification", &notification) {
        log::error!("Could not store notification in session: {}", e);
    }
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().append_header((header::LOCATION, location)).finish()
}

fn parse_optional_id(raw: &str) -> Result<Option<i64>, HelperError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| HelperError::Validation("Invalid record id.".to_string()))
}

/// Form page to return to after a rejected submission.
fn form_url(kind: &str, id: Option<i64>) -> String {
    match id {
        Some(id) => format!("{}/{}/{}/edit", DASHBOARD_URL, kind, id),
        None => format!("{}/{}/new", DASHBOARD_URL, kind),
    }
}

/// Turns a helper failure into a notification and logs what the operator
/// does not need to see.
fn report_failure(session: &Session, action: &str, err: &HelperError) {
    match err {
        HelperError::Validation(message) => set_notification(session, message, "error"),
        HelperError::NotFound => set_notification(session, "Record not found.", "error"),
        other => {
            log::error!("Failed to {}: {}", action, other);
            set_notification(session, "A database error occurred.", "error");
        }
    }
}

fn render(state: &AppState, template: &str, ctx: &Context) -> HttpResponse {
    match state.tera.render(template, ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error for '{}': {}", template, err);
            HttpResponse::InternalServerError().body("Error rendering admin page.")
        }
    }
}

fn base_context(session: &Session, auth_user: &AuthenticatedUser, token: &CsrfToken) -> Context {
    let mut ctx = Context::new();
    ctx.insert("user", auth_user);
    ctx.insert("csrf_token", token.get());
    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }
    ctx
}

async fn show_dashboard(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    let mut ctx = base_context(&session, &auth_user, &token);

    match admin_helpers::fetch_all_events(&state.pool) {
        Ok(events) => ctx.insert("events", &events),
        Err(e) => {
            log::error!("Failed to fetch timeline events for admin dashboard: {}", e);
            ctx.insert("events", &Vec::<String>::new());
        }
    }

    match admin_helpers::fetch_all_images(&state.pool) {
        Ok(images) => {
            let rows: Vec<_> = images.iter().map(|image| image.to_response()).collect();
            ctx.insert("images", &rows);
        }
        Err(e) => {
            log::error!("Failed to fetch gallery images for admin dashboard: {}", e);
            ctx.insert("images", &Vec::<String>::new());
        }
    }

    match admin_helpers::fetch_all_users(&state.pool) {
        Ok(users) => ctx.insert("users", &users),
        Err(e) => {
            log::error!("Failed to fetch users for admin dashboard: {}", e);
            ctx.insert("users", &Vec::<String>::new());
        }
    }

    render(&state, "admin/dashboard.html", &ctx)
}

// --- Timeline events ---

async fn show_timeline_form(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    timeline_form_page(&auth_user, &session, &state, &token, None)
}

async fn show_timeline_edit_form(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
    path: web::Path<i64>,
) -> impl Responder {
    timeline_form_page(&auth_user, &session, &state, &token, Some(path.into_inner()))
}

fn timeline_form_page(
    auth_user: &AuthenticatedUser,
    session: &Session,
    state: &AppState,
    token: &CsrfToken,
    event_id: Option<i64>,
) -> HttpResponse {
    let mut ctx = base_context(session, auth_user, token);

    if let Some(event_id) = event_id {
        match admin_helpers::fetch_event(&state.pool, event_id) {
            Ok(event) => {
                ctx.insert("images_json", &encode_images(&event.images()));
                ctx.insert("event", &event);
            }
            Err(e) => {
                report_failure(session, "load timeline event", &e);
                return redirect(DASHBOARD_URL);
            }
        }
    }

    render(state, "admin/timeline_form.html", &ctx)
}

async fn save_timeline_action(
    session: Session,
    state: web::Data<AppState>,
    form: Csrf<web::Form<TimelineEventForm>>,
) -> impl Responder {
    let form = form.into_inner();
    let event_id = match parse_optional_id(&form.event_id) {
        Ok(id) => id,
        Err(e) => {
            report_failure(&session, "save timeline event", &e);
            return redirect(DASHBOARD_URL);
        }
    };

    let fields = TimelineEventFields {
        section: &form.section,
        sub_section: &form.sub_section,
        year: &form.year,
        title: &form.title,
        text: &form.text,
        images_json: &form.images_json,
        corroboration: &form.corroboration,
    };

    let result = admin_helpers::validate_timeline_event(&fields, event_id)
        .and_then(|draft| admin_helpers::save_event(&state.pool, event_id, &draft).map(|id| (id, draft)));

    match result {
        Ok((id, draft)) => {
            log::info!("Timeline event {} saved ('{}').", id, draft.title);
            set_notification(&session, &format!("Event '{}' saved successfully.", draft.title), "success");
            redirect(DASHBOARD_URL)
        }
        Err(e) => {
            report_failure(&session, "save timeline event", &e);
            redirect(&form_url("timeline", event_id))
        }
    }
}

async fn delete_timeline_action(
    session: Session,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    _form: Csrf<web::Form<DeleteForm>>,
) -> impl Responder {
    let event_id = path.into_inner();
    match admin_helpers::delete_event(&state.pool, event_id) {
        Ok(()) => {
            log::info!("Timeline event {} deleted.", event_id);
            set_notification(&session, "Event deleted successfully.", "success");
        }
        Err(e) => report_failure(&session, "delete timeline event", &e),
    }
    redirect(DASHBOARD_URL)
}

// --- Gallery images ---

async fn show_gallery_form(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    gallery_form_page(&auth_user, &session, &state, &token, None)
}

async fn show_gallery_edit_form(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
    path: web::Path<i64>,
) -> impl Responder {
    gallery_form_page(&auth_user, &session, &state, &token, Some(path.into_inner()))
}

fn gallery_form_page(
    auth_user: &AuthenticatedUser,
    session: &Session,
    state: &AppState,
    token: &CsrfToken,
    image_id: Option<i64>,
) -> HttpResponse {
    let mut ctx = base_context(session, auth_user, token);

    if let Some(image_id) = image_id {
        match admin_helpers::fetch_image(&state.pool, image_id) {
            Ok(image) => {
                ctx.insert("detected_topics", &image.detected_topics());
                ctx.insert("image", &image);
            }
            Err(e) => {
                report_failure(session, "load gallery image", &e);
                return redirect(DASHBOARD_URL);
            }
        }
    }

    render(state, "admin/gallery_form.html", &ctx)
}

async fn save_gallery_action(
    session: Session,
    state: web::Data<AppState>,
    form: Csrf<web::Form<GalleryImageForm>>,
) -> impl Responder {
    let form = form.into_inner();
    let image_id = match parse_optional_id(&form.image_id) {
        Ok(id) => id,
        Err(e) => {
            report_failure(&session, "save gallery image", &e);
            return redirect(DASHBOARD_URL);
        }
    };

    let fields = GalleryImageFields {
        chronological_order: &form.chronological_order,
        file_name: &form.file_name,
        title: &form.title,
        corroboration_text: &form.corroboration_text,
        admin_assigned_section: &form.admin_assigned_section,
        tags: &form.tags,
    };

    let result = admin_helpers::validate_gallery_image(&fields)
        .and_then(|draft| admin_helpers::save_image(&state.pool, image_id, &draft).map(|id| (id, draft)));

    match result {
        Ok((id, draft)) => {
            log::info!("Gallery image {} saved ('{}').", id, draft.file_name);
            set_notification(&session, &format!("Image '{}' saved successfully.", draft.file_name), "success");
            redirect(DASHBOARD_URL)
        }
        Err(e) => {
            report_failure(&session, "save gallery image", &e);
            redirect(&form_url("gallery", image_id))
        }
    }
}

async fn delete_gallery_action(
    session: Session,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    _form: Csrf<web::Form<DeleteForm>>,
) -> impl Responder {
    let image_id = path.into_inner();
    match admin_helpers::delete_image(&state.pool, image_id) {
        Ok(()) => {
            log::info!("Gallery image {} deleted.", image_id);
            set_notification(&session, "Image deleted successfully.", "success");
        }
        Err(e) => report_failure(&session, "delete gallery image", &e),
    }
    redirect(DASHBOARD_URL)
}

// --- Users ---

async fn show_user_form(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    user_form_page(&auth_user, &session, &state, &token, None)
}

async fn show_user_edit_form(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    token: CsrfToken,
    path: web::Path<i64>,
) -> impl Responder {
    user_form_page(&auth_user, &session, &state, &token, Some(path.into_inner()))
}

fn user_form_page(
    auth_user: &AuthenticatedUser,
    session: &Session,
    state: &AppState,
    token: &CsrfToken,
    user_id: Option<i64>,
) -> HttpResponse {
    let mut ctx = base_context(session, auth_user, token);

    if let Some(user_id) = user_id {
        match admin_helpers::fetch_user(&state.pool, user_id) {
            Ok(user) => ctx.insert("account", &user),
            Err(e) => {
                report_failure(session, "load user", &e);
                return redirect(DASHBOARD_URL);
            }
        }
    }

    render(state, "admin/user_form.html", &ctx)
}

async fn save_user_action(
    session: Session,
    state: web::Data<AppState>,
    form: Csrf<web::Form<UserForm>>,
) -> impl Responder {
    let form = form.into_inner();
    let user_id = match parse_optional_id(&form.user_id) {
        Ok(id) => id,
        Err(e) => {
            report_failure(&session, "save user", &e);
            return redirect(DASHBOARD_URL);
        }
    };

    let result = match user_id {
        None => admin_helpers::create_user(&state.pool, &form.username, &form.password).map(|_| ()),
        Some(id) => admin_helpers::update_user(&state.pool, id, &form.username, Some(form.password.as_str())),
    };

    match result {
        Ok(()) => {
            let username = form.username.trim();
            log::info!("User '{}' saved.", username);
            set_notification(&session, &format!("User '{}' saved successfully.", username), "success");
            redirect(DASHBOARD_URL)
        }
        Err(e) => {
            report_failure(&session, "save user", &e);
            redirect(&form_url("users", user_id))
        }
    }
}

async fn delete_user_action(
    auth_user: AuthenticatedUser,
    session: Session,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    _form: Csrf<web::Form<DeleteForm>>,
) -> impl Responder {
    let user_id = path.into_inner();
    if user_id == auth_user.id {
        set_notification(&session, "You cannot delete the account you are logged in with.", "error");
        return redirect(DASHBOARD_URL);
    }

    match admin_helpers::delete_user(&state.pool, user_id) {
        Ok(()) => {
            log::info!("User {} deleted by '{}'.", user_id, auth_user.username);
            set_notification(&session, "User deleted successfully.", "success");
        }
        Err(e) => report_failure(&session, "delete user", &e),
    }
    redirect(DASHBOARD_URL)
}
