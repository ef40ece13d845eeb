//! Storage collaborator: cascades, relationship validation, message logs.

mod common;

use manuscrypt::llm::Role;
use manuscrypt::models::book::delete_book;
use manuscrypt::models::chapter::{delete_chapter, get_chapter, list_chapters};
use manuscrypt::models::character::{delete_character, list_characters};
use manuscrypt::models::relationship::{create_relationship, list_relationships, RelationshipCreate};
use manuscrypt::models::scene::list_scenes;
use manuscrypt::models::MessageCreate;
use manuscrypt::repository::{MessageLog, SurrealMessageLog};
use manuscrypt::ManuscryptError;
use pretty_assertions::assert_eq;
use surrealdb::RecordId;

use common::builders::{seed_book, seed_character, ChapterBuilder, SceneBuilder};
use common::TestHarness;

fn relationship(book_id: &str, from: &str, to: &str) -> RelationshipCreate {
    RelationshipCreate {
        book_id: book_id.to_string(),
        from_character_id: from.to_string(),
        to_character_id: to.to_string(),
        relationship_type: "rival".to_string(),
        description: None,
    }
}

fn message(book_id: &str, character_id: Option<&str>, role: Role, content: &str) -> MessageCreate {
    MessageCreate {
        book: RecordId::from(("book", book_id)),
        chapter_id: None,
        character_id: character_id.map(String::from),
        role,
        content: content.to_string(),
        command: None,
    }
}

#[tokio::test]
async fn test_deleting_book_removes_owned_records() {
    let harness = TestHarness::new().await;
    let db = &harness.db;
    let book_id = seed_book(db, "Doomed", None).await;
    let chapter_id = ChapterBuilder::new(&book_id, 1, "One").create(db).await;
    SceneBuilder::new(&chapter_id, "S").create(db).await;
    let a = seed_character(db, &book_id, "A").await;
    let b = seed_character(db, &book_id, "B").await;
    create_relationship(db, relationship(&book_id, &a, &b)).await.unwrap();
    let log = SurrealMessageLog::new(db.clone());
    log.append(message(&book_id, None, Role::User, "hi")).await.unwrap();

    delete_book(db, &book_id).await.unwrap();

    assert!(list_chapters(db, &book_id).await.unwrap().is_empty());
    assert!(list_scenes(db, &chapter_id).await.unwrap().is_empty());
    assert!(list_characters(db, &book_id).await.unwrap().is_empty());
    assert!(list_relationships(db, &book_id).await.unwrap().is_empty());
    assert!(log.list(&book_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_chapter_removes_its_scenes_only() {
    let harness = TestHarness::new().await;
    let db = &harness.db;
    let book_id = seed_book(db, "Book", None).await;
    let doomed = ChapterBuilder::new(&book_id, 1, "One").create(db).await;
    let kept = ChapterBuilder::new(&book_id, 2, "Two").create(db).await;
    SceneBuilder::new(&doomed, "gone").create(db).await;
    SceneBuilder::new(&kept, "stays").create(db).await;

    delete_chapter(db, &doomed).await.unwrap();

    assert!(get_chapter(db, &doomed).await.unwrap().is_none());
    assert!(list_scenes(db, &doomed).await.unwrap().is_empty());
    let remaining = list_scenes(db, &kept).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "stays");
}

#[tokio::test]
async fn test_deleting_character_removes_its_relationships() {
    let harness = TestHarness::new().await;
    let db = &harness.db;
    let book_id = seed_book(db, "Book", None).await;
    let a = seed_character(db, &book_id, "A").await;
    let b = seed_character(db, &book_id, "B").await;
    let c = seed_character(db, &book_id, "C").await;
    create_relationship(db, relationship(&book_id, &a, &b)).await.unwrap();
    create_relationship(db, relationship(&book_id, &c, &a)).await.unwrap();
    create_relationship(db, relationship(&book_id, &b, &c)).await.unwrap();

    delete_character(db, &a).await.unwrap();

    let left = list_relationships(db, &book_id).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].from_key(), b);
    assert_eq!(left[0].to_key(), c);
}

#[tokio::test]
async fn test_relationship_endpoints_must_resolve_in_book() {
    let harness = TestHarness::new().await;
    let db = &harness.db;
    let book_id = seed_book(db, "Mine", None).await;
    let other_book = seed_book(db, "Theirs", None).await;
    let mine = seed_character(db, &book_id, "Local").await;
    let theirs = seed_character(db, &other_book, "Foreign").await;

    let err = create_relationship(db, relationship(&book_id, &mine, &theirs))
        .await
        .unwrap_err();
    assert!(matches!(err, ManuscryptError::Validation(_)), "got {err:?}");

    let err = create_relationship(db, relationship(&book_id, &mine, "missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ManuscryptError::NotFound { .. }), "got {err:?}");

    assert!(list_relationships(db, &book_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_message_logs_are_separate_and_ordered() {
    let harness = TestHarness::new().await;
    let db = &harness.db;
    let book_id = seed_book(db, "Chatty", None).await;
    let mara = seed_character(db, &book_id, "Mara").await;
    let log = SurrealMessageLog::new(db.clone());

    log.append(message(&book_id, None, Role::User, "first")).await.unwrap();
    log.append(message(&book_id, Some(&mara), Role::User, "who are you?"))
        .await
        .unwrap();
    log.append(message(&book_id, None, Role::Assistant, "second"))
        .await
        .unwrap();

    let general: Vec<String> = log
        .list(&book_id, None)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(general, vec!["first", "second"]);

    let interview = log.list(&book_id, Some(&mara)).await.unwrap();
    assert_eq!(interview.len(), 1);
    assert_eq!(interview[0].role, Role::User);

    assert_eq!(log.clear(&book_id, None).await.unwrap(), 2);
    assert!(log.list(&book_id, None).await.unwrap().is_empty());
    assert_eq!(log.list(&book_id, Some(&mara)).await.unwrap().len(), 1);
}
