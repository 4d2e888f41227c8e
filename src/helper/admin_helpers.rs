use crate::helper::{get_conn, HelperError, HelperResult};
use crate::models::db_operations::{gallery_db_operations, timeline_db_operations, users_db_operations, DbError};
use crate::models::{
    parse_images_input, GalleryImage, GalleryImageDraft, TimelineEvent, TimelineEventDraft, User,
    DEFAULT_SECTION,
};
use crate::DbPool;
use regex::Regex;
use std::sync::OnceLock;

/// Raw timeline form values as typed by the operator.
pub struct TimelineEventFields<'a> {
    pub section: &'a str,
    pub sub_section: &'a str,
    pub year: &'a str,
    pub title: &'a str,
    pub text: &'a str,
    pub images_json: &'a str,
    pub corroboration: &'a str,
}

pub struct GalleryImageFields<'a> {
    pub chronological_order: &'a str,
    pub file_name: &'a str,
    pub title: &'a str,
    pub corroboration_text: &'a str,
    pub admin_assigned_section: &'a str,
    pub tags: &'a str,
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

static HTML_TAG: OnceLock<Option<Regex>> = OnceLock::new();

/// Removes markup from a title. Entities are left alone; templates escape
/// on output.
pub fn strip_html(value: &str) -> String {
    let pattern = HTML_TAG.get_or_init(|| match Regex::new(r"<[^>]*>") {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Invalid HTML tag pattern: {}", e);
            None
        }
    });
    match pattern {
        Some(re) => re.replace_all(value, "").into_owned(),
        None => value.to_string(),
    }
}

fn check_length(field: &str, value: &str, max: usize) -> HelperResult<()> {
    if value.chars().count() > max {
        return Err(HelperError::Validation(format!("{} must be at most {} characters.", field, max)));
    }
    Ok(())
}

fn required(field: &str, value: &str, max: usize) -> HelperResult<String> {
    let value = non_blank(value)
        .ok_or_else(|| HelperError::Validation(format!("{} is required.", field)))?;
    check_length(field, &value, max)?;
    Ok(value)
}

fn optional(field: &str, value: &str, max: usize) -> HelperResult<Option<String>> {
    let value = non_blank(value);
    if let Some(v) = &value {
        check_length(field, v, max)?;
    }
    Ok(value)
}

pub fn validate_timeline_event(fields: &TimelineEventFields, event_id: Option<i64>) -> HelperResult<TimelineEventDraft> {
    let year = match non_blank(fields.year) {
        Some(raw) => Some(
            raw.parse::<i32>()
                .map_err(|_| HelperError::Validation("Year must be a whole number.".to_string()))?,
        ),
        None => None,
    };

    Ok(TimelineEventDraft {
        section: required("Section", fields.section, 50)?,
        sub_section: optional("Sub-section", fields.sub_section, 50)?,
        year,
        title: required("Title", &strip_html(fields.title), 255)?,
        text: non_blank(fields.text)
            .ok_or_else(|| HelperError::Validation("Text is required.".to_string()))?,
        images: parse_images_input(fields.images_json, event_id),
        corroboration: non_blank(fields.corroboration),
    })
}

pub fn validate_gallery_image(fields: &GalleryImageFields) -> HelperResult<GalleryImageDraft> {
    let chronological_order = match non_blank(fields.chronological_order) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| HelperError::Validation("Chronological order must be a whole number.".to_string()))?,
        None => 0,
    };

    Ok(GalleryImageDraft {
        chronological_order,
        file_name: required("File name", fields.file_name, 255)?,
        title: optional("Title", &strip_html(fields.title), 255)?,
        corroboration_text: non_blank(fields.corroboration_text),
        admin_assigned_section: optional("Section", fields.admin_assigned_section, 100)?
            .unwrap_or_else(|| DEFAULT_SECTION.to_string()),
        tags: optional("Tags", fields.tags, 500)?,
    })
}

pub fn validate_username(username: &str) -> HelperResult<String> {
    required("Username", username, 80)
}

fn conflict_or(e: DbError, message: &str) -> HelperError {
    if e.is_constraint_violation() {
        HelperError::Validation(message.to_string())
    } else {
        HelperError::Database(e)
    }
}

// --- Timeline events ---

pub fn fetch_all_events(pool: &DbPool) -> HelperResult<Vec<TimelineEvent>> {
    let conn = get_conn(pool)?;
    Ok(timeline_db_operations::read_all_events(&conn)?)
}

pub fn fetch_event(pool: &DbPool, event_id: i64) -> HelperResult<TimelineEvent> {
    let conn = get_conn(pool)?;
    timeline_db_operations::read_event(&conn, event_id)?.ok_or(HelperError::NotFound)
}

pub fn save_event(pool: &DbPool, event_id: Option<i64>, draft: &TimelineEventDraft) -> HelperResult<i64> {
    let conn = get_conn(pool)?;
    match timeline_db_operations::save_event(&conn, event_id, draft) {
        Ok(id) => Ok(id),
        Err(DbError::NotFound(_)) => Err(HelperError::NotFound),
        Err(e) => Err(conflict_or(e, "The event violates a field constraint.")),
    }
}

pub fn delete_event(pool: &DbPool, event_id: i64) -> HelperResult<()> {
    let conn = get_conn(pool)?;
    match timeline_db_operations::delete_event(&conn, event_id)? {
        0 => Err(HelperError::NotFound),
        _ => Ok(()),
    }
}

// --- Gallery images ---

pub fn fetch_all_images(pool: &DbPool) -> HelperResult<Vec<GalleryImage>> {
    let conn = get_conn(pool)?;
    Ok(gallery_db_operations::read_all_images(&conn)?)
}

pub fn fetch_image(pool: &DbPool, image_id: i64) -> HelperResult<GalleryImage> {
    let conn = get_conn(pool)?;
    gallery_db_operations::read_image(&conn, image_id)?.ok_or(HelperError::NotFound)
}

pub fn save_image(pool: &DbPool, image_id: Option<i64>, draft: &GalleryImageDraft) -> HelperResult<i64> {
    let conn = get_conn(pool)?;
    match gallery_db_operations::save_image(&conn, image_id, draft) {
        Ok(id) => Ok(id),
        Err(DbError::NotFound(_)) => Err(HelperError::NotFound),
        Err(e) => Err(conflict_or(e, "An image with this file name already exists.")),
    }
}

pub fn delete_image(pool: &DbPool, image_id: i64) -> HelperResult<()> {
    let conn = get_conn(pool)?;
    match gallery_db_operations::delete_image(&conn, image_id)? {
        0 => Err(HelperError::NotFound),
        _ => Ok(()),
    }
}

// --- Users ---

pub fn fetch_all_users(pool: &DbPool) -> HelperResult<Vec<User>> {
    let conn = get_conn(pool)?;
    Ok(users_db_operations::read_all_users(&conn)?)
}

pub fn fetch_user(pool: &DbPool, user_id: i64) -> HelperResult<User> {
    let conn = get_conn(pool)?;
    users_db_operations::read_user(&conn, user_id)?.ok_or(HelperError::NotFound)
}

pub fn create_user(pool: &DbPool, username: &str, password: &str) -> HelperResult<i64> {
    let username = validate_username(username)?;
    if password.is_empty() {
        return Err(HelperError::Validation("A password is required to create a user.".to_string()));
    }
    let conn = get_conn(pool)?;
    users_db_operations::create_user(&conn, &username, password)
        .map_err(|e| conflict_or(e, "Username already exists."))
}

pub fn update_user(pool: &DbPool, user_id: i64, username: &str, new_password: Option<&str>) -> HelperResult<()> {
    let username = validate_username(username)?;
    let conn = get_conn(pool)?;
    match users_db_operations::update_user(&conn, user_id, &username, new_password) {
        Ok(()) => Ok(()),
        Err(DbError::NotFound(_)) => Err(HelperError::NotFound),
        Err(e) => Err(conflict_or(e, "Username already exists.")),
    }
}

pub fn delete_user(pool: &DbPool, user_id: i64) -> HelperResult<()> {
    let conn = get_conn(pool)?;
    match users_db_operations::delete_user(&conn, user_id)? {
        0 => Err(HelperError::NotFound),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_fields<'a>(year: &'a str, images_json: &'a str) -> TimelineEventFields<'a> {
        TimelineEventFields {
            section: " pompeia ",
            sub_section: "",
            year,
            title: "Fundação",
            text: "Texto",
            images_json,
            corroboration: "  ",
        }
    }

    #[test]
    fn timeline_fields_are_normalised() {
        let draft = validate_timeline_event(&event_fields("1908", r#"["a.jpg"]"#), None).unwrap();
        assert_eq!(draft.section, "pompeia");
        assert_eq!(draft.sub_section, None);
        assert_eq!(draft.year, Some(1908));
        assert_eq!(draft.images, vec!["a.jpg".to_string()]);
        assert_eq!(draft.corroboration, None);
    }

    #[test]
    fn blank_year_is_null_and_bad_year_rejected() {
        assert_eq!(validate_timeline_event(&event_fields("", ""), None).unwrap().year, None);
        assert!(matches!(
            validate_timeline_event(&event_fields("c. 1920", ""), None),
            Err(HelperError::Validation(_))
        ));
    }

    #[test]
    fn invalid_images_input_becomes_empty_list() {
        let draft = validate_timeline_event(&event_fields("1908", "a.jpg, b.jpg"), Some(4)).unwrap();
        assert!(draft.images.is_empty());
    }

    #[test]
    fn overlong_section_is_rejected() {
        let long = "x".repeat(51);
        let mut fields = event_fields("1908", "");
        fields.section = &long;
        assert!(validate_timeline_event(&fields, None).is_err());
    }

    #[test]
    fn gallery_defaults() {
        let draft = validate_gallery_image(&GalleryImageFields {
            chronological_order: "",
            file_name: "Crise no setor Têxtil.jpg",
            title: "",
            corroboration_text: "",
            admin_assigned_section: "",
            tags: "crise, 1981",
        })
        .unwrap();
        assert_eq!(draft.chronological_order, 0);
        assert_eq!(draft.admin_assigned_section, DEFAULT_SECTION);
        assert_eq!(draft.title, None);
        assert_eq!(draft.tags.as_deref(), Some("crise, 1981"));
    }

    #[test]
    fn gallery_requires_file_name() {
        let result = validate_gallery_image(&GalleryImageFields {
            chronological_order: "4",
            file_name: "  ",
            title: "",
            corroboration_text: "",
            admin_assigned_section: "Panceri",
            tags: "",
        });
        assert!(matches!(result, Err(HelperError::Validation(_))));
    }

    #[test]
    fn titles_lose_markup_but_keep_ampersands() {
        assert_eq!(strip_html("<b>Scavino & Bertuzzi</b>"), "Scavino & Bertuzzi");
        let mut fields = event_fields("1908", "");
        fields.title = "<script>x</script>";
        let draft = validate_timeline_event(&fields, None).unwrap();
        assert_eq!(draft.title, "x");

        fields.title = "<i></i>";
        assert!(validate_timeline_event(&fields, None).is_err());
    }

    #[test]
    fn username_limits() {
        assert!(validate_username("").is_err());
        assert!(validate_username(&"u".repeat(81)).is_err());
        assert_eq!(validate_username(" admin ").unwrap(), "admin");
    }
}
