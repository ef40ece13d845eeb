//! Test data builders and seeding helpers.

use manuscrypt::db::connection::ManuscryptDb;
use manuscrypt::models::book::create_book;
use manuscrypt::models::chapter::create_chapter;
use manuscrypt::models::character::create_character;
use manuscrypt::models::location::create_location;
use manuscrypt::models::scene::create_scene;
use manuscrypt::models::{
    record_key, BookCreate, ChapterCreate, CharacterCreate, LocationCreate, SceneCreate,
};
use manuscrypt::utils::richtext;
use surrealdb::RecordId;

/// Create a book and return its key.
pub async fn seed_book(db: &ManuscryptDb, title: &str, premise: Option<&str>) -> String {
    let book = create_book(
        db,
        BookCreate {
            title: title.to_string(),
            premise: premise.map(String::from),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to create book");
    record_key(&book.id)
}

/// Builder for test chapters.
pub struct ChapterBuilder {
    book_id: String,
    number: i64,
    title: String,
    synopsis: Option<String>,
    content: Option<String>,
    sort_order: i64,
}

impl ChapterBuilder {
    pub fn new(book_id: &str, number: i64, title: impl Into<String>) -> Self {
        Self {
            book_id: book_id.to_string(),
            number,
            title: title.into(),
            synopsis: None,
            content: None,
            sort_order: number,
        }
    }

    pub fn synopsis(mut self, synopsis: impl Into<String>) -> Self {
        self.synopsis = Some(synopsis.into());
        self
    }

    /// Plain text, stored as a rich-text document.
    pub fn text(mut self, text: &str) -> Self {
        self.content = Some(richtext::plain_text_to_json(text).expect("serializable document"));
        self
    }

    /// Raw rich-text JSON.
    pub fn raw_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn build(self) -> ChapterCreate {
        ChapterCreate {
            book: RecordId::from(("book", self.book_id.as_str())),
            number: self.number,
            title: self.title,
            synopsis: self.synopsis,
            content: self.content,
            word_count: None,
            status: None,
            act: None,
            sort_order: self.sort_order,
        }
    }

    /// Create the chapter and return its key.
    pub async fn create(self, db: &ManuscryptDb) -> String {
        let chapter = create_chapter(db, self.build())
            .await
            .expect("Failed to create chapter");
        record_key(&chapter.id)
    }
}

/// Create a named character and return its key.
pub async fn seed_character(db: &ManuscryptDb, book_id: &str, name: &str) -> String {
    let character = create_character(db, CharacterCreate::named(book_id, name))
        .await
        .expect("Failed to create character");
    record_key(&character.id)
}

pub async fn seed_location(db: &ManuscryptDb, book_id: &str, name: &str) -> String {
    let location = create_location(
        db,
        LocationCreate {
            book: RecordId::from(("book", book_id)),
            name: name.to_string(),
            description: None,
            sensory_details: None,
            emotional_tone: None,
        },
    )
    .await
    .expect("Failed to create location");
    record_key(&location.id)
}

/// Builder for test scenes.
pub struct SceneBuilder {
    chapter_id: String,
    title: String,
    pov: Option<String>,
    location: Option<String>,
    sort_order: i64,
}

impl SceneBuilder {
    pub fn new(chapter_id: &str, title: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.to_string(),
            title: title.into(),
            pov: None,
            location: None,
            sort_order: 0,
        }
    }

    pub fn pov(mut self, character_id: impl Into<String>) -> Self {
        self.pov = Some(character_id.into());
        self
    }

    pub fn location(mut self, location_id: impl Into<String>) -> Self {
        self.location = Some(location_id.into());
        self
    }

    pub fn sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub async fn create(self, db: &ManuscryptDb) -> String {
        let scene = create_scene(
            db,
            SceneCreate {
                chapter: RecordId::from(("chapter", self.chapter_id.as_str())),
                title: self.title,
                synopsis: None,
                pov_character_id: self.pov,
                location_id: self.location,
                mood_start: None,
                mood_end: None,
                target_word_count: None,
                status: None,
                sort_order: self.sort_order,
            },
        )
        .await
        .expect("Failed to create scene");
        record_key(&scene.id)
    }
}
