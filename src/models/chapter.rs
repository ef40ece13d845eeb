//! Chapters and their ordering within a book.
//!
//! `sort_order` is the sequencing key. It is expected to be unique per book
//! but is not enforced; listings fall back to creation time and then record
//! id so that duplicates still come back in a stable order.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::ManuscryptError;

/// A chapter of a book.
///
/// `content` holds the serialized rich-text document (see
/// [`crate::utils::richtext`]); plain text is derived from it on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: RecordId,
    pub book: RecordId,
    pub number: i64,
    pub title: String,
    pub synopsis: Option<String>,
    pub content: Option<String>,
    pub word_count: Option<i64>,
    pub status: Option<String>,
    pub act: Option<i64>,
    pub sort_order: i64,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// Data for creating a new chapter.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct ChapterCreate {
    pub book: RecordId,
    pub number: i64,
    pub title: String,
    pub synopsis: Option<String>,
    pub content: Option<String>,
    pub word_count: Option<i64>,
    pub status: Option<String>,
    pub act: Option<i64>,
    pub sort_order: i64,
}

/// Data for updating a chapter.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct ChapterUpdate {
    pub title: Option<String>,
    pub synopsis: Option<Option<String>>,
    pub content: Option<Option<String>>,
    pub word_count: Option<i64>,
    pub status: Option<String>,
    pub act: Option<Option<i64>>,
    pub sort_order: Option<i64>,
    pub updated_at: Datetime,
}

/// Create a new chapter in the database.
pub async fn create_chapter(
    db: &ManuscryptDb,
    data: ChapterCreate,
) -> Result<Chapter, ManuscryptError> {
    let result: Option<Chapter> = db.create("chapter").content(data).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create chapter".into()))
}

/// Get a chapter by ID (the key part, not the full RecordId).
pub async fn get_chapter(db: &ManuscryptDb, id: &str) -> Result<Option<Chapter>, ManuscryptError> {
    let result: Option<Chapter> = db.select(("chapter", id)).await?;
    Ok(result)
}

/// List a book's chapters in reading order.
///
/// Ordered by `sort_order`, then creation time, then record id.
pub async fn list_chapters(
    db: &ManuscryptDb,
    book_id: &str,
) -> Result<Vec<Chapter>, ManuscryptError> {
    let book = RecordId::from(("book", book_id));
    let mut result = db
        .query("SELECT * FROM chapter WHERE book = $book ORDER BY sort_order ASC, created_at ASC, id ASC")
        .bind(("book", book))
        .await?;
    let mut chapters: Vec<Chapter> = result.take(0)?;
    // Stable: keeps the storage tie-break for duplicate keys.
    chapters.sort_by_key(|c| c.sort_order);
    Ok(chapters)
}

/// Update a chapter by ID.
pub async fn update_chapter(
    db: &ManuscryptDb,
    id: &str,
    data: ChapterUpdate,
) -> Result<Option<Chapter>, ManuscryptError> {
    let result: Option<Chapter> = db.update(("chapter", id)).merge(data).await?;
    Ok(result)
}

/// Delete a chapter by ID. Its scenes are removed by the `chapter_cascade` event.
pub async fn delete_chapter(
    db: &ManuscryptDb,
    id: &str,
) -> Result<Option<Chapter>, ManuscryptError> {
    let result: Option<Chapter> = db.delete(("chapter", id)).await?;
    Ok(result)
}

/// Find the chapters immediately before and after `current` in `chapters`.
///
/// `chapters` must already be in reading order (see [`list_chapters`]).
/// The previous chapter is the last one whose `sort_order` is strictly lower
/// than the current key; the next is the first one strictly higher. Chapters
/// sharing the current key are neither.
pub fn neighbors<'a>(
    chapters: &'a [Chapter],
    current: &Chapter,
) -> (Option<&'a Chapter>, Option<&'a Chapter>) {
    let previous = chapters
        .iter()
        .filter(|c| c.sort_order < current.sort_order)
        .last();
    let next = chapters
        .iter()
        .find(|c| c.sort_order > current.sort_order);
    (previous, next)
}
