use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::ManuscryptError;

/// Character entity as stored in database.
///
/// All narrative attributes are free text and optional; only the name is
/// required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: RecordId,
    pub book: RecordId,
    pub name: String,
    pub role: Option<String>,
    pub age: Option<String>,
    pub archetype: Option<String>,
    pub description: Option<String>,
    pub motivation: Option<String>,
    pub fear: Option<String>,
    /// The character's internal contradiction.
    pub contradiction: Option<String>,
    pub voice_notes: Option<String>,
    pub traits: Option<String>,
    pub backstory: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// Data for creating a new character.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct CharacterCreate {
    pub book: RecordId,
    pub name: String,
    pub role: Option<String>,
    pub age: Option<String>,
    pub archetype: Option<String>,
    pub description: Option<String>,
    pub motivation: Option<String>,
    pub fear: Option<String>,
    pub contradiction: Option<String>,
    pub voice_notes: Option<String>,
    pub traits: Option<String>,
    pub backstory: Option<String>,
}

impl CharacterCreate {
    /// A character with only a name; remaining attributes unset.
    pub fn named(book_id: &str, name: impl Into<String>) -> Self {
        Self {
            book: RecordId::from(("book", book_id)),
            name: name.into(),
            role: None,
            age: None,
            archetype: None,
            description: None,
            motivation: None,
            fear: None,
            contradiction: None,
            voice_notes: None,
            traits: None,
            backstory: None,
        }
    }
}

/// Data for updating a character.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct CharacterUpdate {
    pub name: Option<String>,
    pub role: Option<Option<String>>,
    pub age: Option<Option<String>>,
    pub archetype: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub motivation: Option<Option<String>>,
    pub fear: Option<Option<String>>,
    pub contradiction: Option<Option<String>>,
    pub voice_notes: Option<Option<String>>,
    pub traits: Option<Option<String>>,
    pub backstory: Option<Option<String>>,
    pub updated_at: Datetime,
}

/// Create a new character in the database.
pub async fn create_character(
    db: &ManuscryptDb,
    data: CharacterCreate,
) -> Result<Character, ManuscryptError> {
    let result: Option<Character> = db.create("character").content(data).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create character".into()))
}

/// Get a character by ID (the key part, not the full RecordId).
pub async fn get_character(
    db: &ManuscryptDb,
    id: &str,
) -> Result<Option<Character>, ManuscryptError> {
    let result: Option<Character> = db.select(("character", id)).await?;
    Ok(result)
}

/// List a book's characters in creation order.
pub async fn list_characters(
    db: &ManuscryptDb,
    book_id: &str,
) -> Result<Vec<Character>, ManuscryptError> {
    let book = RecordId::from(("book", book_id));
    let mut result = db
        .query("SELECT * FROM character WHERE book = $book ORDER BY created_at ASC, id ASC")
        .bind(("book", book))
        .await?;
    let characters: Vec<Character> = result.take(0)?;
    Ok(characters)
}

/// Update a character by ID.
pub async fn update_character(
    db: &ManuscryptDb,
    id: &str,
    data: CharacterUpdate,
) -> Result<Option<Character>, ManuscryptError> {
    let result: Option<Character> = db.update(("character", id)).merge(data).await?;
    Ok(result)
}

/// Delete a character by ID.
///
/// Relationships touching the character are removed by the
/// `character_cascade` event. Scenes that used the character as POV keep
/// the now-dangling key.
pub async fn delete_character(
    db: &ManuscryptDb,
    id: &str,
) -> Result<Option<Character>, ManuscryptError> {
    let result: Option<Character> = db.delete(("character", id)).await?;
    Ok(result)
}
