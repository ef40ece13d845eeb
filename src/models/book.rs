use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::ManuscryptDb;
use crate::ManuscryptError;

/// Book entity as stored in database.
///
/// A book owns its chapters, characters, locations, relationships and
/// assistant messages; deleting it removes all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: RecordId,
    pub title: String,
    pub genre: Option<String>,
    pub premise: Option<String>,
    pub style_guide: Option<String>,
    pub target_word_count: Option<i64>,
    pub status: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// Data for creating a new book.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct BookCreate {
    pub title: String,
    pub genre: Option<String>,
    pub premise: Option<String>,
    pub style_guide: Option<String>,
    pub target_word_count: Option<i64>,
    pub status: Option<String>,
}

/// Data for updating a book.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub genre: Option<Option<String>>,
    pub premise: Option<Option<String>>,
    pub style_guide: Option<Option<String>>,
    pub target_word_count: Option<i64>,
    pub status: Option<String>,
    pub updated_at: Datetime,
}

/// Create a new book in the database.
pub async fn create_book(db: &ManuscryptDb, data: BookCreate) -> Result<Book, ManuscryptError> {
    let result: Option<Book> = db.create("book").content(data).await?;
    result.ok_or_else(|| ManuscryptError::Database("Failed to create book".into()))
}

/// Get a book by ID (the key part, not the full RecordId).
pub async fn get_book(db: &ManuscryptDb, id: &str) -> Result<Option<Book>, ManuscryptError> {
    let result: Option<Book> = db.select(("book", id)).await?;
    Ok(result)
}

/// List all books, most recently updated first.
pub async fn list_books(db: &ManuscryptDb) -> Result<Vec<Book>, ManuscryptError> {
    let mut result = db
        .query("SELECT * FROM book ORDER BY updated_at DESC")
        .await?;
    let books: Vec<Book> = result.take(0)?;
    Ok(books)
}

/// Update a book by ID.
pub async fn update_book(
    db: &ManuscryptDb,
    id: &str,
    data: BookUpdate,
) -> Result<Option<Book>, ManuscryptError> {
    let result: Option<Book> = db.update(("book", id)).merge(data).await?;
    Ok(result)
}

/// Delete a book by ID.
///
/// Chapters (and their scenes), characters, locations, relationships and
/// messages are removed by the `book_cascade` event.
pub async fn delete_book(db: &ManuscryptDb, id: &str) -> Result<Option<Book>, ManuscryptError> {
    let result: Option<Book> = db.delete(("book", id)).await?;
    Ok(result)
}

/// Cheap liveness probe used by the health endpoint.
pub async fn count_books(db: &ManuscryptDb) -> Result<usize, ManuscryptError> {
    #[derive(Deserialize)]
    struct Count {
        count: usize,
    }

    let mut result = db
        .query("SELECT count() AS count FROM book GROUP ALL")
        .await?;
    let row: Option<Count> = result.take(0)?;
    Ok(row.map(|r| r.count).unwrap_or(0))
}
