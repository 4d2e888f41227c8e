use crate::models::db_operations::DbError;
use crate::models::{encode_images, TimelineEvent, TimelineEventDraft};
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_COLUMNS: &str = "id, section, sub_section, year, title, text, images_json, corroboration";

fn row_to_event(row: &Row) -> rusqlite::Result<TimelineEvent> {
    Ok(TimelineEvent {
        id: row.get(0)?,
        section: row.get(1)?,
        sub_section: row.get(2)?,
        year: row.get(3)?,
        title: row.get(4)?,
        text: row.get(5)?,
        images_json: row.get(6)?,
        corroboration: row.get(7)?,
    })
}

pub fn read_event(conn: &Connection, event_id: i64) -> Result<Option<TimelineEvent>, DbError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM timeline_event WHERE id = ?1", EVENT_COLUMNS),
            [event_id],
            row_to_event,
        )
        .optional()?)
}

/// Every event, grouped by section, for the admin listing.
pub fn read_all_events(conn: &Connection) -> Result<Vec<TimelineEvent>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM timeline_event ORDER BY section COLLATE NOCASE, year ASC NULLS FIRST, id ASC",
        EVENT_COLUMNS
    ))?;
    let events = stmt
        .query_map([], row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Events of one section, matched case-insensitively. Ordered by year with
/// events without a year first, then by id.
pub fn read_events_by_section(conn: &Connection, section: &str) -> Result<Vec<TimelineEvent>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM timeline_event WHERE section = ?1 COLLATE NOCASE ORDER BY year ASC NULLS FIRST, id ASC",
        EVENT_COLUMNS
    ))?;
    let events = stmt
        .query_map([section], row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Inserts when `event_id` is `None`, otherwise updates. Returns the row id.
pub fn save_event(
    conn: &Connection,
    event_id: Option<i64>,
    draft: &TimelineEventDraft,
) -> Result<i64, DbError> {
    let images_json = encode_images(&draft.images);

    match event_id {
        None => {
            conn.execute(
                "INSERT INTO timeline_event (section, sub_section, year, title, text, images_json, corroboration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    draft.section,
                    draft.sub_section,
                    draft.year,
                    draft.title,
                    draft.text,
                    images_json,
                    draft.corroboration
                ],
            )?;
            Ok(conn.last_insert_rowid())
        }
        Some(id) => {
            let changed = conn.execute(
                "UPDATE timeline_event SET section = ?1, sub_section = ?2, year = ?3, title = ?4,
                 text = ?5, images_json = ?6, corroboration = ?7 WHERE id = ?8",
                params![
                    draft.section,
                    draft.sub_section,
                    draft.year,
                    draft.title,
                    draft.text,
                    images_json,
                    draft.corroboration,
                    id
                ],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("timeline event {}", id)));
            }
            Ok(id)
        }
    }
}

pub fn delete_event(conn: &Connection, event_id: i64) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM timeline_event WHERE id = ?1", [event_id])?)
}

/// Natural-key lookup used to keep seeding idempotent.
pub fn event_exists(conn: &Connection, title: &str, year: Option<i32>, section: &str) -> Result<bool, DbError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM timeline_event WHERE title = ?1 AND year IS ?2 AND section = ?3)",
        params![title, year, section],
        |row| row.get(0),
    )?)
}

pub fn count_events(conn: &Connection) -> Result<i64, DbError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM timeline_event", [], |row| row.get(0))?)
}
