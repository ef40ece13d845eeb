pub mod book;
pub mod chapter;
pub mod character;
pub mod location;
pub mod message;
pub mod relationship;
pub mod scene;

use surrealdb::RecordId;

pub use book::{Book, BookCreate, BookUpdate};
pub use chapter::{Chapter, ChapterCreate, ChapterUpdate};
pub use character::{Character, CharacterCreate, CharacterUpdate};
pub use location::{Location, LocationCreate, LocationUpdate};
pub use message::{Message, MessageCreate};
pub use relationship::{Relationship, RelationshipCreate};
pub use scene::{Scene, SceneCreate, SceneUpdate};

/// The key part of a record id, without SurrealDB's escaping brackets.
///
/// Keys that are not plain identifiers (uuids, keys with dashes) render as
/// `⟨...⟩` or with backticks; callers compare and expose the bare form.
pub fn record_key(id: &RecordId) -> String {
    let raw = id.key().to_string();
    raw.trim_start_matches(['⟨', '`'])
        .trim_end_matches(['⟩', '`'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_strips_escaping() {
        let plain = RecordId::from(("book", "novel"));
        assert_eq!(record_key(&plain), "novel");

        let dashed = RecordId::from(("book", "my-novel-2"));
        assert_eq!(record_key(&dashed), "my-novel-2");
    }
}
