//! Conversation log entries.
//!
//! A message with no character belongs to the book's general assistant
//! log; one with a character belongs to that character's interview log.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::llm::Role;
use crate::ManuscryptError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: RecordId,
    pub book: RecordId,
    pub chapter_id: Option<String>,
    pub character_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub command: Option<String>,
    pub created_at: Datetime,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct MessageCreate {
    pub book: RecordId,
    pub chapter_id: Option<String>,
    pub character_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub command: Option<String>,
}

pub async fn create_message(
    db: &ManuscryptDb,
    data: MessageCreate,
) -> Result<Message, ManuscryptError> {
    let result: Option<Message> = db.create("message").content(data).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create message".into()))
}

/// List one log, oldest first. `character_id = None` selects the general log.
pub async fn list_messages(
    db: &ManuscryptDb,
    book_id: &str,
    character_id: Option<&str>,
) -> Result<Vec<Message>, ManuscryptError> {
    let book = RecordId::from(("book", book_id));
    let mut result = match character_id {
        Some(character) => {
            db.query(
                "SELECT * FROM message WHERE book = $book AND character_id = $character \
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(("book", book))
            .bind(("character", character.to_string()))
            .await?
        }
        None => {
            db.query(
                "SELECT * FROM message WHERE book = $book AND character_id = NONE \
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(("book", book))
            .await?
        }
    };
    let messages: Vec<Message> = result.take(0)?;
    Ok(messages)
}

/// Delete one log. Returns the number of removed messages.
pub async fn clear_messages(
    db: &ManuscryptDb,
    book_id: &str,
    character_id: Option<&str>,
) -> Result<usize, ManuscryptError> {
    let book = RecordId::from(("book", book_id));
    let mut result = match character_id {
        Some(character) => {
            db.query("DELETE message WHERE book = $book AND character_id = $character RETURN BEFORE")
                .bind(("book", book))
                .bind(("character", character.to_string()))
                .await?
        }
        None => {
            db.query("DELETE message WHERE book = $book AND character_id = NONE RETURN BEFORE")
                .bind(("book", book))
                .await?
        }
    };
    let removed: Vec<Message> = result.take(0)?;
    Ok(removed.len())
}
