//! Context Repository: everything the assembler needs for one book, in one
//! read.
//!
//! Absence is encoded in [`ContextRows`], never raised: a missing book
//! yields `book: None` with empty collections, and a chapter id that does
//! not resolve (or belongs to another book) yields `chapter: None`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::db::connection::ManuscryptDb;
use crate::models::chapter::{self, neighbors};
use crate::models::{
    book, character, location, record_key, relationship, scene, Book, Chapter, Character,
    Location, Relationship, Scene,
};
use crate::ManuscryptError;

/// Raw rows for one book, optionally scoped to a chapter.
#[derive(Debug, Clone, Default)]
pub struct ContextRows {
    pub book: Option<Book>,
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
    pub relationships: Vec<Relationship>,
    pub chapter: Option<ChapterRows>,
}

/// Chapter-scoped rows.
#[derive(Debug, Clone)]
pub struct ChapterRows {
    pub chapter: Chapter,
    pub scenes: Vec<Scene>,
    /// Nearest chapter with a lower sort key.
    pub previous: Option<Chapter>,
    /// Nearest chapter with a higher sort key.
    pub next: Option<Chapter>,
}

#[async_trait]
pub trait ContextRepository: Send + Sync {
    async fn load(
        &self,
        book_id: &str,
        chapter_id: Option<&str>,
    ) -> Result<ContextRows, ManuscryptError>;
}

/// SurrealDB implementation of ContextRepository.
pub struct SurrealContextRepository {
    db: Arc<ManuscryptDb>,
}

impl SurrealContextRepository {
    pub fn new(db: Arc<ManuscryptDb>) -> Self {
        Self { db }
    }

    async fn load_chapter(
        &self,
        book_id: &str,
        chapter_id: &str,
    ) -> Result<Option<ChapterRows>, ManuscryptError> {
        let Some(current) = chapter::get_chapter(&self.db, chapter_id).await? else {
            return Ok(None);
        };
        if record_key(&current.book) != book_id {
            tracing::debug!(book_id, chapter_id, "Chapter belongs to another book");
            return Ok(None);
        }

        let (siblings, scenes) = futures::try_join!(
            chapter::list_chapters(&self.db, book_id),
            scene::list_scenes(&self.db, chapter_id),
        )?;
        let (previous, next) = neighbors(&siblings, &current);
        let (previous, next) = (previous.cloned(), next.cloned());

        Ok(Some(ChapterRows {
            chapter: current,
            scenes,
            previous,
            next,
        }))
    }
}

#[async_trait]
impl ContextRepository for SurrealContextRepository {
    async fn load(
        &self,
        book_id: &str,
        chapter_id: Option<&str>,
    ) -> Result<ContextRows, ManuscryptError> {
        let Some(book) = book::get_book(&self.db, book_id).await? else {
            return Ok(ContextRows::default());
        };

        let (characters, locations, relationships) = futures::try_join!(
            character::list_characters(&self.db, book_id),
            location::list_locations(&self.db, book_id),
            relationship::list_relationships(&self.db, book_id),
        )?;

        let chapter = match chapter_id {
            Some(id) => self.load_chapter(book_id, id).await?,
            None => None,
        };

        Ok(ContextRows {
            book: Some(book),
            characters,
            locations,
            relationships,
            chapter,
        })
    }
}

/// Id → name lookup built once per request.
#[derive(Debug, Default)]
pub struct NameIndex<'a> {
    names: HashMap<String, &'a str>,
}

impl<'a> NameIndex<'a> {
    pub fn characters(characters: &'a [Character]) -> Self {
        Self {
            names: characters
                .iter()
                .map(|c| (record_key(&c.id), c.name.as_str()))
                .collect(),
        }
    }

    pub fn locations(locations: &'a [Location]) -> Self {
        Self {
            names: locations
                .iter()
                .map(|l| (record_key(&l.id), l.name.as_str()))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a str> {
        self.names.get(id).copied()
    }
}
