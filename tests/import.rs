//! YAML import into storage, read back through the context assembler.

mod common;

use std::sync::Arc;

use manuscrypt::models::chapter::list_chapters;
use manuscrypt::repository::SurrealContextRepository;
use manuscrypt::services::{BookImport, ContextAssembler, ImportService};
use manuscrypt::models::record_key;
use pretty_assertions::assert_eq;

use common::TestHarness;

const WORLD: &str = r#"
book:
  title: The Lighthouse
  genre: Gothic
  premise: A keeper loses the light
characters:
  - key: mara
    name: Mara
    role: protagonist
    motivation: Keep the lamp lit
  - key: eli
    name: Eli
locations:
  - key: tower
    name: The Tower
    emotional_tone: Isolated
relationships:
  - from: mara
    to: eli
    type: estranged
    description: They have not spoken in years
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
        mood_start: dread
  - title: The Dark
    synopsis: The lamp fails
"#;

#[tokio::test]
async fn test_import_creates_whole_book() {
    let harness = TestHarness::new().await;
    let service = ImportService::new(harness.db.clone());
    let result = service
        .execute_import(BookImport::from_yaml(WORLD).unwrap())
        .await
        .unwrap();

    assert_eq!(result.characters, 2);
    assert_eq!(result.locations, 1);
    assert_eq!(result.relationships, 1);
    assert_eq!(result.chapters, 2);
    assert_eq!(result.scenes, 1);

    let chapters = list_chapters(&harness.db, &result.book_id).await.unwrap();
    let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Landfall", "The Dark"]);

    let assembler =
        ContextAssembler::new(Arc::new(SurrealContextRepository::new(harness.db.clone())));
    let ctx = assembler
        .build(&result.book_id, Some(&record_key(&chapters[0].id)))
        .await
        .unwrap();

    assert_eq!(ctx.title, "The Lighthouse");
    assert_eq!(ctx.genre.as_deref(), Some("Gothic"));
    assert_eq!(
        ctx.current_content.as_deref(),
        Some("The boat came in at dusk.\n\nMara watched from the gallery.")
    );
    assert_eq!(ctx.relationships[0].from_name, "Mara");
    assert_eq!(ctx.relationships[0].to_name, "Eli");
    assert_eq!(ctx.scenes[0].pov.as_deref(), Some("Mara"));
    assert_eq!(ctx.scenes[0].location.as_deref(), Some("The Tower"));
    assert_eq!(ctx.neighboring_chapters.len(), 1);
    assert_eq!(ctx.neighboring_chapters[0].title, "The Dark");
}

#[tokio::test]
async fn test_import_with_unknown_key_creates_nothing() {
    let harness = TestHarness::new().await;
    let broken = WORLD.replace("pov: mara", "pov: nobody");
    let result = ImportService::new(harness.db.clone())
        .execute_import(BookImport::from_yaml(&broken).unwrap())
        .await;

    assert!(result.is_err());
    let books = manuscrypt::models::book::list_books(&harness.db).await.unwrap();
    assert!(books.is_empty());
}
