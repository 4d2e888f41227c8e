use crate::models::db_operations::DbError;
use crate::models::{GalleryImage, GalleryImageDraft};
use rusqlite::{params, Connection, OptionalExtension, Row};

const IMAGE_COLUMNS: &str =
    "id, chronological_order, file_name, title, corroboration_text, admin_assigned_section, tags";

fn row_to_image(row: &Row) -> rusqlite::Result<GalleryImage> {
    Ok(GalleryImage {
        id: row.get(0)?,
        chronological_order: row.get(1)?,
        file_name: row.get(2)?,
        title: row.get(3)?,
        corroboration_text: row.get(4)?,
        admin_assigned_section: row.get(5)?,
        tags: row.get(6)?,
    })
}

pub fn read_image(conn: &Connection, image_id: i64) -> Result<Option<GalleryImage>, DbError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM gallery_image WHERE id = ?1", IMAGE_COLUMNS),
            [image_id],
            row_to_image,
        )
        .optional()?)
}

/// All images by manual display order, ties broken by id.
pub fn read_all_images(conn: &Connection) -> Result<Vec<GalleryImage>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM gallery_image ORDER BY chronological_order ASC, id ASC",
        IMAGE_COLUMNS
    ))?;
    let images = stmt
        .query_map([], row_to_image)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(images)
}

pub fn save_image(
    conn: &Connection,
    image_id: Option<i64>,
    draft: &GalleryImageDraft,
) -> Result<i64, DbError> {
    match image_id {
        None => {
            conn.execute(
                "INSERT INTO gallery_image (chronological_order, file_name, title, corroboration_text, admin_assigned_section, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    draft.chronological_order,
                    draft.file_name,
                    draft.title,
                    draft.corroboration_text,
                    draft.admin_assigned_section,
                    draft.tags
                ],
            )?;
            Ok(conn.last_insert_rowid())
        }
        Some(id) => {
            let changed = conn.execute(
                "UPDATE gallery_image SET chronological_order = ?1, file_name = ?2, title = ?3,
                 corroboration_text = ?4, admin_assigned_section = ?5, tags = ?6 WHERE id = ?7",
                params![
                    draft.chronological_order,
                    draft.file_name,
                    draft.title,
                    draft.corroboration_text,
                    draft.admin_assigned_section,
                    draft.tags,
                    id
                ],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("gallery image {}", id)));
            }
            Ok(id)
        }
    }
}

pub fn delete_image(conn: &Connection, image_id: i64) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM gallery_image WHERE id = ?1", [image_id])?)
}

pub fn image_exists(conn: &Connection, file_name: &str) -> Result<bool, DbError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM gallery_image WHERE file_name = ?1)",
        [file_name],
        |row| row.get(0),
    )?)
}

pub fn count_images(conn: &Connection) -> Result<i64, DbError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM gallery_image", [], |row| row.get(0))?)
}
