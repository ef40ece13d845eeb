pub mod context;
pub mod message;

pub use context::{ChapterRows, ContextRepository, ContextRows, NameIndex, SurrealContextRepository};
pub use message::{MessageLog, SurrealMessageLog};
