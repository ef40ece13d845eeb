use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::ManuscryptError;

/// Location entity as stored in database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: RecordId,
    pub book: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub sensory_details: Option<String>,
    pub emotional_tone: Option<String>,
    pub created_at: Datetime,
}

/// Data for creating a new location.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct LocationCreate {
    pub book: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub sensory_details: Option<String>,
    pub emotional_tone: Option<String>,
}

/// Data for updating a location.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub sensory_details: Option<Option<String>>,
    pub emotional_tone: Option<Option<String>>,
}

/// Create a new location in the database.
pub async fn create_location(
    db: &ManuscryptDb,
    data: LocationCreate,
) -> Result<Location, ManuscryptError> {
    let result: Option<Location> = db.create("location").content(data).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create location".into()))
}

/// Get a location by ID.
pub async fn get_location(
    db: &ManuscryptDb,
    id: &str,
) -> Result<Option<Location>, ManuscryptError> {
    let result: Option<Location> = db.select(("location", id)).await?;
    Ok(result)
}

/// List a book's locations in creation order.
pub async fn list_locations(
    db: &ManuscryptDb,
    book_id: &str,
) -> Result<Vec<Location>, ManuscryptError> {
    let book = RecordId::from(("book", book_id));
    let mut result = db
        .query("SELECT * FROM location WHERE book = $book ORDER BY created_at ASC, id ASC")
        .bind(("book", book))
        .await?;
    let locations: Vec<Location> = result.take(0)?;
    Ok(locations)
}

/// Update a location by ID.
pub async fn update_location(
    db: &ManuscryptDb,
    id: &str,
    data: LocationUpdate,
) -> Result<Option<Location>, ManuscryptError> {
    let result: Option<Location> = db.update(("location", id)).merge(data).await?;
    Ok(result)
}

/// Delete a location by ID. Scenes set there keep the dangling key.
pub async fn delete_location(
    db: &ManuscryptDb,
    id: &str,
) -> Result<Option<Location>, ManuscryptError> {
    let result: Option<Location> = db.delete(("location", id)).await?;
    Ok(result)
}
