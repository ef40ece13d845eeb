//! YAML book import.
//!
//! Characters and locations carry local keys; relationships and scenes
//! refer to them by key. Every reference is checked before anything is
//! written, so an invalid file leaves storage untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::db::connection::ManuscryptDb;
use crate::models::book::{create_book, BookCreate};
use crate::models::chapter::{create_chapter, ChapterCreate};
use crate::models::character::{create_character, CharacterCreate};
use crate::models::location::{create_location, LocationCreate};
use crate::models::record_key;
use crate::models::relationship::{create_relationship, RelationshipCreate};
use crate::models::scene::{create_scene, SceneCreate};
use crate::utils::richtext;
use crate::ManuscryptError;

#[derive(Debug, Clone, Deserialize)]
pub struct BookImport {
    pub book: BookSpec,
    #[serde(default)]
    pub characters: Vec<CharacterSpec>,
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
    #[serde(default)]
    pub chapters: Vec<ChapterSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookSpec {
    pub title: String,
    pub genre: Option<String>,
    pub premise: Option<String>,
    pub style_guide: Option<String>,
    pub target_word_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterSpec {
    pub key: String,
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

#[derive(Debug, Clone, Deserialize)]
pub struct LocationSpec {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub sensory_details: Option<String>,
    pub emotional_tone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipSpec {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterSpec {
    pub title: String,
    pub synopsis: Option<String>,
    /// Plain text; stored as a rich-text document.
    pub content: Option<String>,
    pub status: Option<String>,
    pub act: Option<i64>,
    #[serde(default)]
    pub scenes: Vec<SceneSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneSpec {
    pub title: String,
    pub synopsis: Option<String>,
    pub pov: Option<String>,
    pub location: Option<String>,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub book_id: String,
    pub characters: usize,
    pub locations: usize,
    pub relationships: usize,
    pub chapters: usize,
    pub scenes: usize,
}

impl BookImport {
    pub fn from_yaml(source: &str) -> Result<Self, ManuscryptError> {
        serde_yaml_ng::from_str(source)
            .map_err(|e| ManuscryptError::Validation(format!("Invalid import file: {e}")))
    }

    /// Check local keys: unique, and every reference resolves.
    pub fn validate(&self) -> Result<(), ManuscryptError> {
        let characters = unique_keys("character", self.characters.iter().map(|c| &c.key))?;
        let locations = unique_keys("location", self.locations.iter().map(|l| &l.key))?;

        let check = |kind: &str, known: &HashSet<&str>, key: &str| {
            if known.contains(key) {
                Ok(())
            } else {
                Err(ManuscryptError::Validation(format!("Unknown {kind} key '{key}'")))
            }
        };

        for r in &self.relationships {
            check("character", &characters, &r.from)?;
            check("character", &characters, &r.to)?;
        }
        for scene in self.chapters.iter().flat_map(|c| &c.scenes) {
            if let Some(pov) = &scene.pov {
                check("character", &characters, pov)?;
            }
            if let Some(location) = &scene.location {
                check("location", &locations, location)?;
            }
        }
        Ok(())
    }
}

fn unique_keys<'a>(
    kind: &str,
    keys: impl Iterator<Item = &'a String>,
) -> Result<HashSet<&'a str>, ManuscryptError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.as_str()) {
            return Err(ManuscryptError::Validation(format!("Duplicate {kind} key '{key}'")));
        }
    }
    Ok(seen)
}

pub struct ImportService {
    db: Arc<ManuscryptDb>,
}

impl ImportService {
    pub fn new(db: Arc<ManuscryptDb>) -> Self {
        Self { db }
    }

    pub async fn execute_import(&self, import: BookImport) -> Result<ImportResult, ManuscryptError> {
        import.validate()?;

        let book = create_book(
            &self.db,
            BookCreate {
                title: import.book.title,
                genre: import.book.genre,
                premise: import.book.premise,
                style_guide: import.book.style_guide,
                target_word_count: import.book.target_word_count,
                status: None,
            },
        )
        .await?;
        let book_id = record_key(&book.id);
        let mut result = ImportResult {
            book_id: book_id.clone(),
            ..ImportResult::default()
        };

        let mut character_ids = HashMap::new();
        for entry in import.characters {
            let character = create_character(
                &self.db,
                CharacterCreate {
                    role: entry.role,
                    age: entry.age,
                    archetype: entry.archetype,
                    description: entry.description,
                    motivation: entry.motivation,
                    fear: entry.fear,
                    contradiction: entry.contradiction,
                    voice_notes: entry.voice_notes,
                    traits: entry.traits,
                    backstory: entry.backstory,
                    ..CharacterCreate::named(&book_id, entry.name)
                },
            )
            .await?;
            character_ids.insert(entry.key, record_key(&character.id));
            result.characters += 1;
        }

        let mut location_ids = HashMap::new();
        for entry in import.locations {
            let location = create_location(
                &self.db,
                LocationCreate {
                    book: book.id.clone(),
                    name: entry.name,
                    description: entry.description,
                    sensory_details: entry.sensory_details,
                    emotional_tone: entry.emotional_tone,
                },
            )
            .await?;
            location_ids.insert(entry.key, record_key(&location.id));
            result.locations += 1;
        }

        for entry in import.relationships {
            // Keys were validated above.
            let (Some(from), Some(to)) = (character_ids.get(&entry.from), character_ids.get(&entry.to))
            else {
                continue;
            };
            create_relationship(
                &self.db,
                RelationshipCreate {
                    book_id: book_id.clone(),
                    from_character_id: from.clone(),
                    to_character_id: to.clone(),
                    relationship_type: entry.relationship_type,
                    description: entry.description,
                },
            )
            .await?;
            result.relationships += 1;
        }

        for (index, entry) in import.chapters.into_iter().enumerate() {
            let text = entry.content.unwrap_or_default();
            let content = if text.trim().is_empty() {
                None
            } else {
                Some(richtext::plain_text_to_json(&text)?)
            };
            let chapter = create_chapter(
                &self.db,
                ChapterCreate {
                    book: RecordId::from(("book", book_id.as_str())),
                    number: index as i64 + 1,
                    title: entry.title,
                    synopsis: entry.synopsis,
                    content,
                    word_count: Some(richtext::word_count(&text) as i64),
                    status: entry.status,
                    act: entry.act,
                    sort_order: index as i64,
                },
            )
            .await?;
            result.chapters += 1;

            for (scene_index, scene) in entry.scenes.into_iter().enumerate() {
                create_scene(
                    &self.db,
                    SceneCreate {
                        chapter: chapter.id.clone(),
                        title: scene.title,
                        synopsis: scene.synopsis,
                        pov_character_id: scene.pov.and_then(|k| character_ids.get(&k).cloned()),
                        location_id: scene.location.and_then(|k| location_ids.get(&k).cloned()),
                        mood_start: scene.mood_start,
                        mood_end: scene.mood_end,
                        target_word_count: None,
                        status: None,
                        sort_order: scene_index as i64,
                    },
                )
                .await?;
                result.scenes += 1;
            }
        }

        tracing::info!(
            book_id = %result.book_id,
            characters = result.characters,
            chapters = result.chapters,
            "Imported book"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
book:
  title: The Lighthouse
  premise: A keeper loses the light
characters:
  - key: mara
    name: Mara
    role: protagonist
  - key: eli
    name: Eli
locations:
  - key: tower
    name: The Tower
relationships:
  - from: mara
    to: eli
    type: estranged
chapters:
  - title: Landfall
    synopsis: The boat arrives
    content: |
      The boat came in at dusk.

      Mara watched from the gallery.
    scenes:
      - title: Arrival
        pov: mara
        location: tower
"#;

    #[test]
    fn test_parse_and_validate_sample() {
        let import = BookImport::from_yaml(SAMPLE).unwrap();
        assert_eq!(import.characters.len(), 2);
        assert_eq!(import.chapters[0].scenes[0].pov.as_deref(), Some("mara"));
        import.validate().unwrap();
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let mut import = BookImport::from_yaml(SAMPLE).unwrap();
        import.relationships[0].to = "nobody".into();
        let err = import.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown character key 'nobody'"));

        let mut import = BookImport::from_yaml(SAMPLE).unwrap();
        import.chapters[0].scenes[0].location = Some("cellar".into());
        assert!(import.validate().is_err());
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let mut import = BookImport::from_yaml(SAMPLE).unwrap();
        import.characters[1].key = "mara".into();
        assert!(import.validate().is_err());
    }
}
