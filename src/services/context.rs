//! Context Assembler: turns repository rows into a [`BookContext`].
//!
//! The context is rebuilt on every request. Narrative entities change
//! between assistant calls, so nothing here is cached.

use std::sync::Arc;

use serde::Serialize;

use crate::models::{Book, Character, Location, Relationship, Scene};
use crate::repository::{ChapterRows, ContextRepository, ContextRows, NameIndex};
use crate::utils::richtext;
use crate::ManuscryptError;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_GENRE: &str = "Literary Fiction";
/// Label used when a relationship endpoint cannot be resolved.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Point-in-time snapshot of a book's narrative state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookContext {
    pub title: String,
    pub genre: Option<String>,
    pub premise: Option<String>,
    pub style_guide: Option<String>,
    pub characters: Vec<CharacterBrief>,
    pub locations: Vec<LocationBrief>,
    pub relationships: Vec<RelationshipBrief>,
    /// Scenes of the current chapter, in order.
    pub scenes: Vec<SceneBrief>,
    /// Previous chapter first, then next; either may be missing.
    pub neighboring_chapters: Vec<NeighborBrief>,
    pub chapter_synopsis: Option<String>,
    /// Plain text of the current chapter.
    pub current_content: Option<String>,
}

impl Default for BookContext {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            genre: Some(DEFAULT_GENRE.to_string()),
            premise: None,
            style_guide: None,
            characters: Vec::new(),
            locations: Vec::new(),
            relationships: Vec::new(),
            scenes: Vec::new(),
            neighboring_chapters: Vec::new(),
            chapter_synopsis: None,
            current_content: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterBrief {
    pub name: String,
    pub role: Option<String>,
    pub age: Option<String>,
    pub archetype: Option<String>,
    pub description: Option<String>,
    pub motivation: Option<String>,
    pub fear: Option<String>,
    pub contradiction: Option<String>,
    pub traits: Option<String>,
    pub backstory: Option<String>,
    pub voice_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBrief {
    pub name: String,
    pub description: Option<String>,
    pub sensory_details: Option<String>,
    pub emotional_tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipBrief {
    pub from_name: String,
    pub to_name: String,
    pub relationship_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneBrief {
    pub title: String,
    pub synopsis: Option<String>,
    /// POV character name; `None` when unset or no longer resolvable.
    pub pov: Option<String>,
    /// Location name; `None` when unset or no longer resolvable.
    pub location: Option<String>,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjacency {
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborBrief {
    pub position: Adjacency,
    pub number: i64,
    pub title: String,
    pub synopsis: Option<String>,
}

/// Loads rows through a [`ContextRepository`] and assembles them.
pub struct ContextAssembler {
    repo: Arc<dyn ContextRepository>,
}

impl ContextAssembler {
    pub fn new(repo: Arc<dyn ContextRepository>) -> Self {
        Self { repo }
    }

    /// Build a fresh context. Missing books and chapters degrade to the
    /// default context or empty chapter fields; only storage failures error.
    pub async fn build(
        &self,
        book_id: &str,
        chapter_id: Option<&str>,
    ) -> Result<BookContext, ManuscryptError> {
        let rows = self.repo.load(book_id, chapter_id).await?;
        if rows.book.is_none() {
            tracing::debug!(book_id, "Book not found, using default context");
        }
        Ok(assemble(&rows))
    }
}

/// Pure transformation from rows to context.
pub fn assemble(rows: &ContextRows) -> BookContext {
    let Some(book) = rows.book.as_ref() else {
        return BookContext::default();
    };

    let character_names = NameIndex::characters(&rows.characters);
    let location_names = NameIndex::locations(&rows.locations);

    let mut context = book_fields(book);
    context.characters = rows.characters.iter().map(character_brief).collect();
    context.locations = rows.locations.iter().map(location_brief).collect();
    context.relationships = rows
        .relationships
        .iter()
        .map(|r| relationship_brief(r, &character_names))
        .collect();

    if let Some(chapter) = rows.chapter.as_ref() {
        apply_chapter(&mut context, chapter, &character_names, &location_names);
    }
    context
}

fn book_fields(book: &Book) -> BookContext {
    BookContext {
        title: book.title.clone(),
        genre: book.genre.clone(),
        premise: book.premise.clone(),
        style_guide: book.style_guide.clone(),
        ..BookContext::default()
    }
}

fn character_brief(c: &Character) -> CharacterBrief {
    CharacterBrief {
        name: c.name.clone(),
        role: c.role.clone(),
        age: c.age.clone(),
        archetype: c.archetype.clone(),
        description: c.description.clone(),
        motivation: c.motivation.clone(),
        fear: c.fear.clone(),
        contradiction: c.contradiction.clone(),
        traits: c.traits.clone(),
        backstory: c.backstory.clone(),
        voice_notes: c.voice_notes.clone(),
    }
}

fn location_brief(l: &Location) -> LocationBrief {
    LocationBrief {
        name: l.name.clone(),
        description: l.description.clone(),
        sensory_details: l.sensory_details.clone(),
        emotional_tone: l.emotional_tone.clone(),
    }
}

fn relationship_brief(r: &Relationship, names: &NameIndex<'_>) -> RelationshipBrief {
    let resolve = |key: String| names.get(&key).unwrap_or(UNKNOWN_NAME).to_string();
    RelationshipBrief {
        from_name: resolve(r.from_key()),
        to_name: resolve(r.to_key()),
        relationship_type: r.relationship_type.clone(),
        description: r.description.clone(),
    }
}

fn scene_brief(s: &Scene, characters: &NameIndex<'_>, locations: &NameIndex<'_>) -> SceneBrief {
    SceneBrief {
        title: s.title.clone(),
        synopsis: s.synopsis.clone(),
        pov: s
            .pov_character_id
            .as_deref()
            .and_then(|id| characters.get(id))
            .map(String::from),
        location: s
            .location_id
            .as_deref()
            .and_then(|id| locations.get(id))
            .map(String::from),
        mood_start: s.mood_start.clone(),
        mood_end: s.mood_end.clone(),
    }
}

fn apply_chapter(
    context: &mut BookContext,
    rows: &ChapterRows,
    characters: &NameIndex<'_>,
    locations: &NameIndex<'_>,
) {
    context.chapter_synopsis = rows.chapter.synopsis.clone();
    context.current_content = Some(richtext::to_plain_text(rows.chapter.content.as_deref()));
    context.scenes = rows
        .scenes
        .iter()
        .map(|s| scene_brief(s, characters, locations))
        .collect();

    let adjacent = [
        (Adjacency::Previous, rows.previous.as_ref()),
        (Adjacency::Next, rows.next.as_ref()),
    ];
    context.neighboring_chapters = adjacent
        .into_iter()
        .filter_map(|(position, chapter)| {
            chapter.map(|c| NeighborBrief {
                position,
                number: c.number,
                title: c.title.clone(),
                synopsis: c.synopsis.clone(),
            })
        })
        .collect();
}
