use crate::helper::public_helpers;
use crate::AppState;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tera::Context;

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(is_server_active))
            .route("/timeline/{section}", web::get().to(get_timeline_section))
            .route("/gallery", web::get().to(get_gallery_images)),
    );
}

pub fn config_pages(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(show_index));
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn get_timeline_section(section: web::Path<String>, state: web::Data<AppState>) -> impl Responder {
    let section_name = section.into_inner();
    log::info!("Timeline requested for section '{}'", section_name);

    match public_helpers::fetch_timeline_by_section(&state.pool, &section_name) {
        Ok(events) => {
            log::info!("{} timeline events for '{}'", events.len(), section_name.to_lowercase());
            HttpResponse::Ok().json(events)
        }
        Err(e) => {
            log::error!("Failed to fetch timeline for '{}': {}", section_name, e);
            HttpResponse::InternalServerError().json(json!({ "erro": "Internal error in the timeline API." }))
        }
    }
}

async fn get_gallery_images(state: web::Data<AppState>) -> impl Responder {
    match public_helpers::fetch_all_gallery_images(&state.pool) {
        Ok(images) => {
            log::info!("{} gallery images returned", images.len());
            HttpResponse::Ok().json(images)
        }
        Err(e) => {
            log::error!("Failed to fetch gallery images: {}", e);
            HttpResponse::InternalServerError().json(json!({ "erro": "Internal error in the gallery API." }))
        }
    }
}

async fn show_index(state: web::Data<AppState>) -> impl Responder {
    match state.tera.render("index.html", &Context::new()) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error: {}", err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}
