use std::sync::Arc;

use async_trait::async_trait;

use crate::db::connection::ManuscryptDb;
use crate::models::message::{self, Message, MessageCreate};
use crate::ManuscryptError;

/// Durable, append-only conversation log.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, data: MessageCreate) -> Result<Message, ManuscryptError>;

    async fn list(
        &self,
        book_id: &str,
        character_id: Option<&str>,
    ) -> Result<Vec<Message>, ManuscryptError>;

    async fn clear(&self, book_id: &str, character_id: Option<&str>)
        -> Result<usize, ManuscryptError>;
}

/// SurrealDB implementation of MessageLog.
pub struct SurrealMessageLog {
    db: Arc<ManuscryptDb>,
}

impl SurrealMessageLog {
    pub fn new(db: Arc<ManuscryptDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageLog for SurrealMessageLog {
    async fn append(&self, data: MessageCreate) -> Result<Message, ManuscryptError> {
        message::create_message(&self.db, data).await
    }

    async fn list(
        &self,
        book_id: &str,
        character_id: Option<&str>,
    ) -> Result<Vec<Message>, ManuscryptError> {
        message::list_messages(&self.db, book_id, character_id).await
    }

    async fn clear(
        &self,
        book_id: &str,
        character_id: Option<&str>,
    ) -> Result<usize, ManuscryptError> {
        message::clear_messages(&self.db, book_id, character_id).await
    }
}
