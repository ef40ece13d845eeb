//! Scenes within a chapter.
//!
//! POV character and location are stored as plain record keys rather than
//! typed links: deleting a character or location leaves the reference in
//! place, and readers must treat an unresolvable key as unknown.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::ManuscryptError;

/// A scene in a chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: RecordId,
    pub chapter: RecordId,
    pub title: String,
    pub synopsis: Option<String>,
    pub pov_character_id: Option<String>,
    pub location_id: Option<String>,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
    pub target_word_count: Option<i64>,
    pub status: Option<String>,
    pub sort_order: i64,
    pub created_at: Datetime,
}

/// Data for creating a new scene.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct SceneCreate {
    pub chapter: RecordId,
    pub title: String,
    pub synopsis: Option<String>,
    pub pov_character_id: Option<String>,
    pub location_id: Option<String>,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
    pub target_word_count: Option<i64>,
    pub status: Option<String>,
    pub sort_order: i64,
}

/// Data for updating a scene.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct SceneUpdate {
    pub title: Option<String>,
    pub synopsis: Option<Option<String>>,
    pub pov_character_id: Option<Option<String>>,
    pub location_id: Option<Option<String>>,
    pub mood_start: Option<Option<String>>,
    pub mood_end: Option<Option<String>>,
    pub target_word_count: Option<Option<i64>>,
    pub status: Option<String>,
    pub sort_order: Option<i64>,
}

/// Create a new scene in the database.
pub async fn create_scene(db: &ManuscryptDb, data: SceneCreate) -> Result<Scene, ManuscryptError> {
    let result: Option<Scene> = db.create("scene").content(data).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create scene".into()))
}

/// Get a scene by ID.
pub async fn get_scene(db: &ManuscryptDb, id: &str) -> Result<Option<Scene>, ManuscryptError> {
    let result: Option<Scene> = db.select(("scene", id)).await?;
    Ok(result)
}

/// List a chapter's scenes in order.
pub async fn list_scenes(
    db: &ManuscryptDb,
    chapter_id: &str,
) -> Result<Vec<Scene>, ManuscryptError> {
    let chapter = RecordId::from(("chapter", chapter_id));
    let mut result = db
        .query("SELECT * FROM scene WHERE chapter = $chapter ORDER BY sort_order ASC, created_at ASC, id ASC")
        .bind(("chapter", chapter))
        .await?;
    let mut scenes: Vec<Scene> = result.take(0)?;
    scenes.sort_by_key(|s| s.sort_order);
    Ok(scenes)
}

/// Update a scene by ID.
pub async fn update_scene(
    db: &ManuscryptDb,
    id: &str,
    data: SceneUpdate,
) -> Result<Option<Scene>, ManuscryptError> {
    let result: Option<Scene> = db.update(("scene", id)).merge(data).await?;
    Ok(result)
}

/// Delete a scene by ID.
pub async fn delete_scene(db: &ManuscryptDb, id: &str) -> Result<Option<Scene>, ManuscryptError> {
    let result: Option<Scene> = db.delete(("scene", id)).await?;
    Ok(result)
}
