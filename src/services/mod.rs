pub mod analysis;
pub mod context;
pub mod import;
pub mod prompt;

pub use analysis::{ChapterReview, ScoredFeedback, StyleAnalysis};
pub use context::{BookContext, ContextAssembler};
pub use import::{BookImport, ImportResult, ImportService};
pub use prompt::{interview_prompt, Command, PromptCompiler};
