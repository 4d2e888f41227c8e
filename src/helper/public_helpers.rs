use crate::helper::{get_conn, HelperResult};
use crate::models::db_operations::{gallery_db_operations, timeline_db_operations};
use crate::models::{GalleryImageResponse, TimelineEventResponse};
use crate::DbPool;

/// Timeline of one company section, exact match ignoring ASCII case. Events without a year
/// come first, then ascending years, ties by id.
pub fn fetch_timeline_by_section(pool: &DbPool, section: &str) -> HelperResult<Vec<TimelineEventResponse>> {
    let conn = get_conn(pool)?;
    let events = timeline_db_operations::read_events_by_section(&conn, section)?;
    Ok(events.iter().map(|event| event.to_response()).collect())
}

/// Whole gallery in display order with topics and tags resolved.
pub fn fetch_all_gallery_images(pool: &DbPool) -> HelperResult<Vec<GalleryImageResponse>> {
    let conn = get_conn(pool)?;
    let images = gallery_db_operations::read_all_images(&conn)?;
    Ok(images.iter().map(|image| image.to_response()).collect())
}
