use crate::helper::topic_helpers;
use serde::{Deserialize, Serialize};

/// Catch-all section assigned to gallery images that belong to no company.
pub const DEFAULT_SECTION: &str = "Geral";

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub last_login_time: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TimelineEvent {
    pub id: i64,
    pub section: String,
    pub sub_section: Option<String>,
    pub year: Option<i32>,
    pub title: String,
    pub text: String,
    pub images_json: Option<String>,
    pub corroboration: Option<String>,
}

/// Field values for creating or updating a timeline event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineEventDraft {
    pub section: String,
    pub sub_section: Option<String>,
    pub year: Option<i32>,
    pub title: String,
    pub text: String,
    pub images: Vec<String>,
    pub corroboration: Option<String>,
}

/// Wire shape of `GET /api/timeline/{section}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimelineEventResponse {
    pub id: i64,
    pub section: String,
    pub sub_section: Option<String>,
    pub year: Option<i32>,
    pub title: String,
    pub text: String,
    pub images: Vec<String>,
    pub corroboracao: Option<String>,
}

impl TimelineEvent {
    /// Decodes `images_json`. Anything that is not a JSON list of strings
    /// reads as an empty list.
    pub fn images(&self) -> Vec<String> {
        match self.images_json.as_deref() {
            Some(raw) if !raw.trim().is_empty() => match serde_json::from_str::<Vec<String>>(raw) {
                Ok(images) => images,
                Err(e) => {
                    log::error!("Malformed images JSON on timeline event {}: {} ({})", self.id, raw, e);
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }

    pub fn to_response(&self) -> TimelineEventResponse {
        TimelineEventResponse {
            id: self.id,
            section: self.section.clone(),
            sub_section: self.sub_section.clone(),
            year: self.year,
            title: self.title.clone(),
            text: self.text.clone(),
            images: self.images(),
            corroboracao: self.corroboration.clone(),
        }
    }
}

/// Serializes an image list for the `images_json` column.
pub fn encode_images(images: &[String]) -> String {
    serde_json::to_string(images).unwrap_or_else(|_| "[]".to_string())
}

/// Parses an images list typed by an operator. Input that is not a JSON
/// list of strings is an invalid list assignment and becomes an empty list.
pub fn parse_images_input(raw: &str, event_id: Option<i64>) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(trimmed) {
        Ok(images) => images,
        Err(_) => {
            let label = event_id.map_or_else(|| "new".to_string(), |id| id.to_string());
            log::warn!("Invalid 'images' value for timeline event {}; storing an empty list.", label);
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GalleryImage {
    pub id: i64,
    pub chronological_order: i64,
    pub file_name: String,
    pub title: Option<String>,
    pub corroboration_text: Option<String>,
    pub admin_assigned_section: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryImageDraft {
    pub chronological_order: i64,
    pub file_name: String,
    pub title: Option<String>,
    pub corroboration_text: Option<String>,
    pub admin_assigned_section: String,
    pub tags: Option<String>,
}

/// Wire shape of `GET /api/gallery`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GalleryImageResponse {
    pub id: i64,
    pub chronological_order: i64,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub title: Option<String>,
    pub corroboration: Option<String>,
    pub admin_assigned_section: Option<String>,
    pub detected_topics: Vec<String>,
    pub tags: Vec<String>,
}

impl GalleryImage {
    pub fn detected_topics(&self) -> Vec<String> {
        topic_helpers::detect_topics(
            self.title.as_deref(),
            self.corroboration_text.as_deref(),
            &self.file_name,
            self.admin_assigned_section.as_deref(),
        )
    }

    pub fn tags_list(&self) -> Vec<String> {
        parse_tags(self.tags.as_deref().unwrap_or(""))
    }

    pub fn to_response(&self) -> GalleryImageResponse {
        GalleryImageResponse {
            id: self.id,
            chronological_order: self.chronological_order,
            file_name: self.file_name.clone(),
            title: self.title.clone(),
            corroboration: self.corroboration_text.clone(),
            admin_assigned_section: self.admin_assigned_section.clone(),
            detected_topics: self.detected_topics(),
            tags: self.tags_list(),
        }
    }
}

pub fn parse_tags(tags_str: &str) -> Vec<String> {
    tags_str
        .split(',')
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

pub mod db_operations;
