//! CLI command handlers.

pub mod chat;
pub mod import;
pub mod prompt;
pub mod serve;
