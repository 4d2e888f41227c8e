//! Loads the historical records into an empty or partially filled archive.
//!
//! Seeding is idempotent: every record is checked against its natural key
//! (`file_name` for images, `(title, year, section)` for events) before it
//! is inserted, and the whole batch runs in one transaction.

use crate::models::db_operations::{gallery_db_operations, timeline_db_operations, DbError};
use crate::models::{GalleryImageDraft, TimelineEventDraft, DEFAULT_SECTION};
use rusqlite::Connection;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Could not read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

#[derive(Debug, Deserialize, Default)]
pub struct SeedData {
    /// Timeline events keyed by section name.
    #[serde(default)]
    pub timeline: BTreeMap<String, Vec<SeedEvent>>,
    #[serde(default)]
    pub gallery_images: Vec<SeedImage>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedEvent {
    pub sub_section: Option<String>,
    pub year: Option<i32>,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub corroboracao: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedImage {
    pub chronological_order: Option<i64>,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub title: Option<String>,
    pub corroboration: Option<String>,
    pub admin_assigned_section: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub events_inserted: usize,
    pub events_skipped: usize,
    pub images_inserted: usize,
    pub images_skipped: usize,
}

pub fn load_seed_file(path: &Path) -> Result<SeedData, SeedError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Inserts every record whose natural key is not present yet. Any failure
/// rolls the whole batch back.
pub fn seed_database(conn: &mut Connection, data: &SeedData) -> Result<SeedReport, SeedError> {
    let tx = conn.transaction()?;
    let mut report = SeedReport::default();

    for (section, events) in &data.timeline {
        log::info!("Seeding timeline section '{}' ({} events)", section, events.len());
        for event in events {
            if timeline_db_operations::event_exists(&tx, &event.title, event.year, section)? {
                report.events_skipped += 1;
                continue;
            }
            let draft = TimelineEventDraft {
                section: section.clone(),
                sub_section: event.sub_section.clone(),
                year: event.year,
                title: event.title.clone(),
                text: event.text.clone(),
                images: event.images.clone(),
                corroboration: event.corroboracao.clone(),
            };
            timeline_db_operations::save_event(&tx, None, &draft)?;
            report.events_inserted += 1;
        }
    }

    log::info!("Seeding {} gallery images", data.gallery_images.len());
    for (idx, image) in data.gallery_images.iter().enumerate() {
        if gallery_db_operations::image_exists(&tx, &image.file_name)? {
            report.images_skipped += 1;
            continue;
        }
        let draft = GalleryImageDraft {
            chronological_order: image.chronological_order.unwrap_or(idx as i64 + 1),
            file_name: image.file_name.clone(),
            title: image.title.clone(),
            corroboration_text: image.corroboration.clone(),
            admin_assigned_section: image
                .admin_assigned_section
                .clone()
                .unwrap_or_else(|| DEFAULT_SECTION.to_string()),
            tags: image.tags.clone(),
        };
        gallery_db_operations::save_image(&tx, None, &draft)?;
        report.images_inserted += 1;
    }

    tx.commit()?;
    Ok(report)
}

/// Startup entry point: loads and applies a seed file, logging instead of
/// failing so a bad seed never stops the server.
pub fn seed_from_file(conn: &mut Connection, path: &Path) -> Option<SeedReport> {
    let result = load_seed_file(path).and_then(|data| seed_database(conn, &data));
    match result {
        Ok(report) => {
            log::info!(
                "Seeding finished: {} events inserted ({} already present), {} images inserted ({} already present).",
                report.events_inserted, report.events_skipped, report.images_inserted, report.images_skipped
            );
            Some(report)
        }
        Err(e) => {
            log::error!("Seeding from '{}' failed and was rolled back: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_archive_db(&mut conn).unwrap();
        conn
    }

    fn sample() -> SeedData {
        serde_json::from_str(
            r#"{
                "timeline": {
                    "panceri": [
                        {"sub_section": "jose_panceri_pai", "year": 1858, "title": "Origens", "text": "t", "images": ["a.jpg"], "corroboracao": "c"},
                        {"title": "Sem data", "text": "t"}
                    ],
                    "pompeia": [
                        {"year": 1908, "title": "Fundação", "text": "t"}
                    ]
                },
                "gallery_images": [
                    {"chronological_order": 3, "fileName": "image.png", "title": "Lista"},
                    {"fileName": "image.png", "title": "Anúncio"},
                    {"fileName": "Curiosidade Panceri.jpg", "admin_assigned_section": "Panceri"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn second_run_inserts_nothing() {
        let mut conn = conn();
        let first = seed_database(&mut conn, &sample()).unwrap();
        assert_eq!(first.events_inserted, 3);
        assert_eq!(first.images_inserted, 2);
        assert_eq!(first.images_skipped, 1);

        let events = timeline_db_operations::count_events(&conn).unwrap();
        let images = gallery_db_operations::count_images(&conn).unwrap();

        let second = seed_database(&mut conn, &sample()).unwrap();
        assert_eq!(second.events_inserted, 0);
        assert_eq!(second.images_inserted, 0);
        assert_eq!(timeline_db_operations::count_events(&conn).unwrap(), events);
        assert_eq!(gallery_db_operations::count_images(&conn).unwrap(), images);
    }

    #[test]
    fn missing_order_uses_position_and_section_defaults() {
        let mut conn = conn();
        seed_database(&mut conn, &sample()).unwrap();
        let images = gallery_db_operations::read_all_images(&conn).unwrap();
        let curiosidade = images.iter().find(|i| i.file_name == "Curiosidade Panceri.jpg").unwrap();
        assert_eq!(curiosidade.chronological_order, 3);
        let lista = images.iter().find(|i| i.file_name == "image.png").unwrap();
        assert_eq!(lista.title.as_deref(), Some("Lista"));
        assert_eq!(lista.admin_assigned_section.as_deref(), Some(DEFAULT_SECTION));
    }

    #[test]
    fn failing_batch_is_rolled_back() {
        let mut conn = conn();
        let mut data = sample();
        data.gallery_images.push(SeedImage {
            chronological_order: None,
            file_name: "x".repeat(300),
            title: None,
            corroboration: None,
            admin_assigned_section: None,
            tags: None,
        });
        assert!(seed_database(&mut conn, &data).is_err());
        assert_eq!(timeline_db_operations::count_events(&conn).unwrap(), 0);
        assert_eq!(gallery_db_operations::count_images(&conn).unwrap(), 0);
    }

    #[test]
    fn bundled_seed_file_parses() {
        let data = load_seed_file(Path::new("data/seed.json")).unwrap();
        assert!(!data.timeline.is_empty());
        assert!(!data.gallery_images.is_empty());
    }
}
