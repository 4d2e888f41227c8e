#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{location, CookieJar, ADMIN_PASSWORD};
use serde_json::Value;

#[actix_web::test]
async fn event_created_from_the_form_is_served_by_the_api() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    let fields = vec![
        ("event_id", ""),
        ("section", "panceri"),
        ("sub_section", "Fiação"),
        ("year", "1925"),
        ("title", "Primeira fiação"),
        ("text", "A fiação começa a operar."),
        ("images_json", r#"["fiacao.jpg"]"#),
        ("corroboration", ""),
    ];
    let resp = submit!(app, jar, "/admin/timeline/new", "/admin/timeline/save", fields);
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin");

    let resp = get!(app, jar, "/admin");
    let body = common::body_string(resp).await;
    assert!(body.contains("Event &#x27;Primeira fiação&#x27; saved successfully."));

    let req = test::TestRequest::get().uri("/api/timeline/Panceri").to_request();
    let events: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["sub_section"], "Fiação");
    assert_eq!(events[0]["images"], serde_json::json!(["fiacao.jpg"]));
    assert!(events[0]["corroboracao"].is_null());
}

#[actix_web::test]
async fn invalid_event_goes_back_to_the_form_with_a_message() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    let fields = vec![("event_id", ""), ("section", "pompeia"), ("year", "mil novecentos"), ("title", "X"), ("text", "Y")];
    let resp = submit!(app, jar, "/admin/timeline/new", "/admin/timeline/save", fields);
    assert_eq!(location(&resp), "/admin/timeline/new");

    let resp = get!(app, jar, "/admin/timeline/new");
    let body = common::body_string(resp).await;
    assert!(body.contains("Year must be a whole number."));
}

#[actix_web::test]
async fn gallery_image_can_be_edited_and_deleted() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    let fields = vec![
        ("image_id", ""),
        ("chronological_order", "7"),
        ("file_name", "Fabrica Pompeia.jpg"),
        ("title", ""),
        ("corroboration_text", ""),
        ("admin_assigned_section", ""),
        ("tags", "fachada"),
    ];
    let resp = submit!(app, jar, "/admin/gallery/new", "/admin/gallery/save", fields);
    assert_eq!(location(&resp), "/admin");

    let req = test::TestRequest::get().uri("/api/gallery").to_request();
    let images: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(images[0]["admin_assigned_section"], "Geral");
    assert_eq!(images[0]["detected_topics"], serde_json::json!(["Pompeia"]));
    let id = images[0]["id"].as_i64().unwrap();

    let edit_page = format!("/admin/gallery/{}/edit", id);
    let id_field = id.to_string();
    let fields = vec![
        ("image_id", id_field.as_str()),
        ("chronological_order", "7"),
        ("file_name", "Fabrica Pompeia.jpg"),
        ("title", "Vista da fábrica"),
        ("corroboration_text", ""),
        ("admin_assigned_section", "Pompeia"),
        ("tags", "fachada, 1950"),
    ];
    let resp = submit!(app, jar, edit_page.as_str(), "/admin/gallery/save", fields);
    assert_eq!(location(&resp), "/admin");

    let req = test::TestRequest::get().uri("/api/gallery").to_request();
    let images: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(images[0]["title"], "Vista da fábrica");
    assert_eq!(images[0]["tags"], serde_json::json!(["fachada", "1950"]));

    let delete_url = format!("/admin/gallery/{}/delete", id);
    let resp = submit!(app, jar, "/admin", delete_url.as_str(), Vec::<(&str, &str)>::new());
    assert_eq!(location(&resp), "/admin");

    let req = test::TestRequest::get().uri("/api/gallery").to_request();
    let images: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(images.is_empty());
}

#[actix_web::test]
async fn duplicate_file_name_is_reported() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    for _ in 0..2 {
        let fields = vec![("image_id", ""), ("file_name", "dup.jpg")];
        submit!(app, jar, "/admin/gallery/new", "/admin/gallery/save", fields);
    }

    let resp = get!(app, jar, "/admin/gallery/new");
    let body = common::body_string(resp).await;
    assert!(body.contains("An image with this file name already exists."));
}

#[actix_web::test]
async fn new_user_can_log_in_and_cannot_delete_itself() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    let fields = vec![("user_id", ""), ("username", "curadora"), ("password", "arquivo-1908")];
    let resp = submit!(app, jar, "/admin/users/new", "/admin/users/save", fields);
    assert_eq!(location(&resp), "/admin");

    let mut other = CookieJar::default();
    let resp = login!(app, other, "curadora", "arquivo-1908");
    assert_eq!(location(&resp), "/admin");

    // The first account created is the admin, id 1; the new one is id 2.
    let resp = submit!(app, other, "/admin", "/admin/users/2/delete", Vec::<(&str, &str)>::new());
    assert_eq!(location(&resp), "/admin");
    let resp = get!(app, other, "/admin");
    let body = common::body_string(resp).await;
    assert!(body.contains("You cannot delete the account you are logged in with."));

    let resp = submit!(app, other, "/admin", "/admin/users/1/delete", Vec::<(&str, &str)>::new());
    assert_eq!(location(&resp), "/admin");
    let resp = get!(app, other, "/admin");
    let body = common::body_string(resp).await;
    assert!(body.contains("User deleted successfully."));
}

#[actix_web::test]
async fn missing_records_redirect_to_dashboard() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    let resp = get!(app, jar, "/admin/timeline/999/edit");
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin");

    let resp = get!(app, jar, "/admin");
    let body = common::body_string(resp).await;
    assert!(body.contains("Record not found."));
}

#[actix_web::test]
async fn non_numeric_edit_id_is_not_found() {
    let app = init_app!(common::state_with_admin());
    let mut jar = CookieJar::default();
    login!(app, jar, "admin", ADMIN_PASSWORD);

    for page in ["/admin/timeline/abc/edit", "/admin/gallery/abc/edit", "/admin/users/abc/edit"] {
        let resp = get!(app, jar, page);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", page);
    }

    let resp = get!(app, jar, "/admin/timeline/new");
    assert_eq!(resp.status(), StatusCode::OK);
}
