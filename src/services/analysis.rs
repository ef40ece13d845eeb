//! Single-shot structured calls: chapter review and style analysis.

use serde::{Deserialize, Serialize};

use crate::llm::{complete_json, ChatTurn, CompletionRequest, LlmProvider};
use crate::models::Chapter;
use crate::utils::richtext;
use crate::ManuscryptError;

pub const ANALYSIS_MAX_TOKENS: u32 = 2048;
pub const REVIEW_MIN_CHARS: usize = 50;
pub const STYLE_MIN_CHARS: usize = 100;
pub const STYLE_MAX_CHARS: usize = 50_000;

const REVIEW_SYSTEM: &str = "You are a professional manuscript reviewer and literary editor. \
Analyze the provided chapter text and return a JSON object with these exact fields:
- overallImpression (string): 2-3 sentence summary of the chapter's quality and impact
- proseQuality (object with \"score\" as number 1-10 and \"feedback\" as string): evaluate clarity, elegance, and literary merit of the writing
- pacing (object with \"score\" as number 1-10 and \"feedback\" as string): evaluate narrative rhythm, scene transitions, and momentum
- dialogue (object with \"score\" as number 1-10 and \"feedback\" as string): evaluate authenticity, subtext, and character distinction in dialogue
- characterVoice (object with \"score\" as number 1-10 and \"feedback\" as string): evaluate consistency and distinctiveness of character voices
- suggestions (string array): 3-5 specific, actionable improvements the author can make

Be honest but constructive. Give specific examples from the text when possible.
Return ONLY valid JSON, no markdown code fences, no other text.";

const STYLE_SYSTEM: &str = "You are a literary style analyst. Analyze the provided text and \
return a JSON object with these exact fields:
- sentenceLengthAvg (number): average words per sentence
- vocabularyRichness (number 0-1): type-token ratio (unique words / total words)
- dialogueRatio (number 0-1): estimated proportion of text that is dialogue
- toneDescription (string): 2-3 sentence description of the overall tone
- paceDescription (string): 2-3 sentence description of the pacing and rhythm
- strengths (string array): 3-4 specific strengths of the prose
- suggestions (string array): 3-5 specific, actionable craft suggestions for improvement
- comparableAuthors (string array): 2-3 authors whose style this most resembles

Return ONLY valid JSON, no markdown code fences, no other text.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFeedback {
    pub score: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterReview {
    pub overall_impression: String,
    pub prose_quality: ScoredFeedback,
    pub pacing: ScoredFeedback,
    pub dialogue: ScoredFeedback,
    pub character_voice: ScoredFeedback,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleAnalysis {
    pub sentence_length_avg: f64,
    pub vocabulary_richness: f64,
    pub dialogue_ratio: f64,
    pub tone_description: String,
    pub pace_description: String,
    pub strengths: Vec<String>,
    pub suggestions: Vec<String>,
    pub comparable_authors: Vec<String>,
}

/// Review a chapter's prose. The chapter needs at least
/// [`REVIEW_MIN_CHARS`] characters of plain text.
pub async fn review_chapter(
    provider: &dyn LlmProvider,
    model: &str,
    chapter: &Chapter,
) -> Result<ChapterReview, ManuscryptError> {
    let text = richtext::to_plain_text(chapter.content.as_deref());
    if text.trim().chars().count() < REVIEW_MIN_CHARS {
        return Err(ManuscryptError::Validation(format!(
            "Chapter needs at least {REVIEW_MIN_CHARS} characters of content to review"
        )));
    }

    let request = CompletionRequest {
        model: model.to_string(),
        system: REVIEW_SYSTEM.to_string(),
        messages: vec![ChatTurn::user(format!(
            "Review this chapter titled \"{}\":\n\n{}",
            chapter.title, text
        ))],
        max_tokens: ANALYSIS_MAX_TOKENS,
    };
    complete_json(provider, request, "review").await
}

/// Reject texts outside `STYLE_MIN_CHARS..=STYLE_MAX_CHARS`.
pub fn validate_style_text(text: &str) -> Result<(), ManuscryptError> {
    let count = text.chars().count();
    if count < STYLE_MIN_CHARS {
        return Err(ManuscryptError::Validation(format!(
            "Please provide at least {STYLE_MIN_CHARS} characters of text to analyze"
        )));
    }
    if count > STYLE_MAX_CHARS {
        return Err(ManuscryptError::Validation(
            "Text must not exceed 50,000 characters".to_string(),
        ));
    }
    Ok(())
}

pub async fn analyze_style(
    provider: &dyn LlmProvider,
    model: &str,
    text: &str,
) -> Result<StyleAnalysis, ManuscryptError> {
    validate_style_text(text)?;
    let request = CompletionRequest {
        model: model.to_string(),
        system: STYLE_SYSTEM.to_string(),
        messages: vec![ChatTurn::user(format!(
            "Analyze the literary style of this text:\n\n{text}"
        ))],
        max_tokens: ANALYSIS_MAX_TOKENS,
    };
    complete_json(provider, request, "style analysis").await
}
