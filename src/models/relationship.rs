use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::models::character::get_character;
use crate::models::record_key;
use crate::ManuscryptError;

/// Directed relationship between two characters of the same book.
///
/// Relationship types are free text ("rivals", "siblings", "mentor") and
/// not enforced by schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RecordId,
    pub book: RecordId,
    pub from_character: RecordId,
    pub to_character: RecordId,
    pub relationship_type: String,
    pub description: Option<String>,
    pub created_at: Option<Datetime>,
}

/// Data for creating a relationship.
#[derive(Debug, Clone)]
pub struct RelationshipCreate {
    pub book_id: String,
    pub from_character_id: String,
    pub to_character_id: String,
    pub relationship_type: String,
    pub description: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize)]
struct RelationshipContent {
    book: RecordId,
    from_character: RecordId,
    to_character: RecordId,
    relationship_type: String,
    description: Option<String>,
}

/// Create a relationship between two characters.
///
/// Both endpoints must exist and belong to `book_id`.
pub async fn create_relationship(
    db: &ManuscryptDb,
    data: RelationshipCreate,
) -> Result<Relationship, ManuscryptError> {
    let book = RecordId::from(("book", data.book_id.as_str()));
    for character_id in [&data.from_character_id, &data.to_character_id] {
        let character = get_character(db, character_id)
            .await?
            .ok_or_else(|| ManuscryptError::not_found("character", character_id))?;
        if character.book != book {
            return Err(ManuscryptError::Validation(format!(
                "character '{}' does not belong to book '{}'",
                character_id, data.book_id
            )));
        }
    }

    let content = RelationshipContent {
        book,
        from_character: RecordId::from(("character", data.from_character_id.as_str())),
        to_character: RecordId::from(("character", data.to_character_id.as_str())),
        relationship_type: data.relationship_type,
        description: data.description,
    };
    let result: Option<Relationship> = db.create("relationship").content(content).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create relationship".into()))
}

/// List a book's relationships in creation order.
pub async fn list_relationships(
    db: &ManuscryptDb,
    book_id: &str,
) -> Result<Vec<Relationship>, ManuscryptError> {
    let book = RecordId::from(("book", book_id));
    let mut result = db
        .query("SELECT * FROM relationship WHERE book = $book ORDER BY created_at ASC, id ASC")
        .bind(("book", book))
        .await?;
    let relationships: Vec<Relationship> = result.take(0)?;
    Ok(relationships)
}

/// Delete a relationship by ID.
pub async fn delete_relationship(
    db: &ManuscryptDb,
    id: &str,
) -> Result<Option<Relationship>, ManuscryptError> {
    let result: Option<Relationship> = db.delete(("relationship", id)).await?;
    Ok(result)
}

impl Relationship {
    pub fn from_key(&self) -> String {
        record_key(&self.from_character)
    }

    pub fn to_key(&self) -> String {
        record_key(&self.to_character)
    }
}
