//! Prompt Compiler: renders the system prompt for a book context, a
//! command and an optional selected passage. Pure, no I/O.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::Character;
use crate::services::context::{Adjacency, BookContext, DEFAULT_GENRE};

/// Default size, in characters, of the manuscript tail sent with `continue`.
pub const DEFAULT_CONTINUATION_WINDOW: usize = 3000;

/// Header of the manuscript block. Only `continue` ever emits it.
pub const MANUSCRIPT_MARKER: &str = "Current manuscript text";

/// Prefix placed before a manuscript tail that was cut.
pub const TRUNCATION_MARKER: &str = "[...]";

/// Assistant intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Continue,
    Deepen,
    Dialogue,
    Sensory,
    Freeform,
}

impl Command {
    /// Map a wire tag to a command. Absent and unrecognised tags are
    /// freeform.
    pub fn parse(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("continue") => Command::Continue,
            Some("deepen") => Command::Deepen,
            Some("dialogue") => Command::Dialogue,
            Some("sensory") => Command::Sensory,
            _ => Command::Freeform,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Continue => "continue",
            Command::Deepen => "deepen",
            Command::Dialogue => "dialogue",
            Command::Sensory => "sensory",
            Command::Freeform => "freeform",
        }
    }

    /// Task instruction appended after the context sections.
    pub fn instruction(&self, has_selection: bool) -> &'static str {
        match (self, has_selection) {
            (Command::Continue, _) => {
                "Your task: Continue writing the narrative seamlessly from where the writer left off. \
                 Match the established voice, tone, and pacing. Write 200-400 words of new prose that \
                 flows naturally. Focus on literary quality, sensory details, and psychological depth."
            }
            (Command::Deepen, _) => {
                "Your task: Rewrite the provided passage with greater psychological depth and literary \
                 richness. Add internal monologue, sensory details, subtext, emotional complexity, and \
                 imagery. Maintain the same events but make the prose more layered and literary. \
                 Respond with ONLY the rewritten prose, no preamble or commentary."
            }
            (Command::Dialogue, _) => {
                "Your task: Generate authentic dialogue for characters in this scene. Each character \
                 should have a distinct voice. Focus on subtext, character-specific speech patterns, \
                 tension, and natural rhythm. Use action beats between lines. \
                 Respond with ONLY the rewritten prose, no preamble or commentary."
            }
            (Command::Sensory, _) => {
                "Your task: Enrich the passage with vivid sensory details: visual, auditory, olfactory, \
                 tactile, gustatory. Weave them naturally into the prose without overloading. \
                 Respond with ONLY the rewritten prose, no preamble or commentary."
            }
            (Command::Freeform, true) => {
                "The writer has selected the passage above. If they ask for changes, revise it and \
                 respond with ONLY the revised prose, matching the manuscript's existing voice, tense, \
                 and point of view. If they ask a question about it, answer conversationally."
            }
            (Command::Freeform, false) => {
                "You are a thoughtful writing assistant. Help with brainstorming, feedback, plotting, \
                 character development, prose critique, or discussion. Be specific and insightful."
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptCompiler {
    continuation_window: usize,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_CONTINUATION_WINDOW)
    }
}

impl PromptCompiler {
    pub fn new(continuation_window: usize) -> Self {
        Self {
            continuation_window: continuation_window.max(1),
        }
    }

    pub fn continuation_window(&self) -> usize {
        self.continuation_window
    }

    pub fn compile(
        &self,
        ctx: &BookContext,
        command: Command,
        selected_text: Option<&str>,
    ) -> String {
        let mut prompt = String::new();
        write_base(&mut prompt, ctx);
        write_characters(&mut prompt, ctx);
        write_relationships(&mut prompt, ctx);
        write_locations(&mut prompt, ctx);
        write_scenes(&mut prompt, ctx);
        write_neighbors(&mut prompt, ctx);
        if let Some(synopsis) = present(&ctx.chapter_synopsis) {
            let _ = write!(prompt, "\n\nCurrent Chapter Synopsis: {synopsis}");
        }

        let selection = selected_text.filter(|s| !s.trim().is_empty());
        match command {
            Command::Continue => {
                if let Some(content) = ctx.current_content.as_deref().filter(|c| !c.is_empty()) {
                    let _ = write!(
                        prompt,
                        "\n\n{MANUSCRIPT_MARKER}:\n\"\"\"\n{}\n\"\"\"",
                        self.manuscript_tail(content)
                    );
                }
            }
            _ => {
                if let Some(text) = selection {
                    let _ = write!(prompt, "\n\nSelected text:\n\"\"\"\n{text}\n\"\"\"");
                }
            }
        }

        let _ = write!(prompt, "\n\n{}", command.instruction(selection.is_some()));
        prompt
    }

    /// The last `continuation_window` characters of `content`, prefixed with
    /// the truncation marker when anything was cut.
    fn manuscript_tail(&self, content: &str) -> String {
        let total = content.chars().count();
        if total <= self.continuation_window {
            return content.to_string();
        }
        let start = content
            .char_indices()
            .nth(total - self.continuation_window)
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{TRUNCATION_MARKER}{}", &content[start..])
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn write_base(prompt: &mut String, ctx: &BookContext) {
    let genre = present(&ctx.genre).unwrap_or(DEFAULT_GENRE);
    let _ = write!(
        prompt,
        "You are a literary fiction writing assistant for the novel \"{}\".\nGenre: {genre}.",
        ctx.title
    );
    if let Some(premise) = present(&ctx.premise) {
        let _ = write!(prompt, "\nPremise: {premise}");
    }
    if let Some(style) = present(&ctx.style_guide) {
        let _ = write!(prompt, "\n\nStyle Guide: {style}");
    }
}

fn write_characters(prompt: &mut String, ctx: &BookContext) {
    if ctx.characters.is_empty() {
        return;
    }
    prompt.push_str("\n\nKey Characters:");
    for c in &ctx.characters {
        let _ = write!(prompt, "\n- {}", c.name);
        if let Some(role) = present(&c.role) {
            let _ = write!(prompt, " ({role})");
        }
        if let Some(age) = present(&c.age) {
            let _ = write!(prompt, ", age {age}");
        }
        if let Some(archetype) = present(&c.archetype) {
            let _ = write!(prompt, ", {archetype}");
        }
        if let Some(description) = present(&c.description) {
            let _ = write!(prompt, ": {description}");
        }
        let labelled = [
            ("Motivation", &c.motivation),
            ("Fear", &c.fear),
            ("Internal conflict", &c.contradiction),
            ("Traits", &c.traits),
            ("Backstory", &c.backstory),
            ("Voice", &c.voice_notes),
        ];
        for (label, value) in labelled {
            if let Some(value) = present(value) {
                let _ = write!(prompt, " | {label}: {value}");
            }
        }
    }
}

fn write_relationships(prompt: &mut String, ctx: &BookContext) {
    if ctx.relationships.is_empty() {
        return;
    }
    prompt.push_str("\n\nCharacter Relationships:");
    for r in &ctx.relationships {
        let _ = write!(
            prompt,
            "\n- {} → {} ({})",
            r.from_name, r.to_name, r.relationship_type
        );
        if let Some(description) = present(&r.description) {
            let _ = write!(prompt, ": {description}");
        }
    }
}

fn write_locations(prompt: &mut String, ctx: &BookContext) {
    if ctx.locations.is_empty() {
        return;
    }
    prompt.push_str("\n\nLocations:");
    for l in &ctx.locations {
        let _ = write!(prompt, "\n- {}", l.name);
        if let Some(description) = present(&l.description) {
            let _ = write!(prompt, ": {description}");
        }
        if let Some(sensory) = present(&l.sensory_details) {
            let _ = write!(prompt, " | Sensory: {sensory}");
        }
        if let Some(tone) = present(&l.emotional_tone) {
            let _ = write!(prompt, " | Tone: {tone}");
        }
    }
}

fn write_scenes(prompt: &mut String, ctx: &BookContext) {
    if ctx.scenes.is_empty() {
        return;
    }
    prompt.push_str("\n\nScenes in This Chapter:");
    for s in &ctx.scenes {
        let _ = write!(prompt, "\n- {}", s.title);
        if let Some(synopsis) = present(&s.synopsis) {
            let _ = write!(prompt, ": {synopsis}");
        }
        if let Some(pov) = present(&s.pov) {
            let _ = write!(prompt, " [POV: {pov}]");
        }
        if let Some(location) = present(&s.location) {
            let _ = write!(prompt, " [Location: {location}]");
        }
        let (start, end) = (present(&s.mood_start), present(&s.mood_end));
        if start.is_some() || end.is_some() {
            let _ = write!(
                prompt,
                " [Mood: {} → {}]",
                start.unwrap_or("?"),
                end.unwrap_or("?")
            );
        }
    }
}

fn write_neighbors(prompt: &mut String, ctx: &BookContext) {
    if ctx.neighboring_chapters.is_empty() {
        return;
    }
    prompt.push_str("\n\nAdjacent Chapters:");
    for n in &ctx.neighboring_chapters {
        let position = match n.position {
            Adjacency::Previous => "Previous",
            Adjacency::Next => "Next",
        };
        let _ = write!(prompt, "\n- {position}: Chapter {} \"{}\"", n.number, n.title);
        if let Some(synopsis) = present(&n.synopsis) {
            let _ = write!(prompt, ": {synopsis}");
        }
    }
}

/// In-character system prompt for interviewing `character`.
pub fn interview_prompt(character: &Character) -> String {
    let name = &character.name;
    let mut prompt = format!(
        "You ARE {name}. Respond as this character would, in their voice, with their \
         mannerisms, beliefs, and emotional patterns."
    );
    let sections = [
        ("\n\nAbout you", &character.description),
        ("\nWhat drives you", &character.motivation),
        ("\nWhat you fear", &character.fear),
        ("\nYour internal conflict", &character.contradiction),
        ("\nHow you speak", &character.voice_notes),
        ("\nYour history", &character.backstory),
    ];
    for (label, value) in sections {
        if let Some(value) = present(value) {
            let _ = write!(prompt, "{label}: {value}");
        }
    }
    let _ = write!(
        prompt,
        "\n\nStay fully in character. Respond naturally as {name} would. Reveal personality, \
         backstory, and motivations through conversation. Never break character or acknowledge \
         you are an AI."
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::context::{
        CharacterBrief, LocationBrief, NeighborBrief, RelationshipBrief, SceneBrief,
    };
    use pretty_assertions::assert_eq;

    const ALL: [Command; 5] = [
        Command::Continue,
        Command::Deepen,
        Command::Dialogue,
        Command::Sensory,
        Command::Freeform,
    ];

    fn context() -> BookContext {
        BookContext {
            title: "The Lighthouse".into(),
            genre: None,
            premise: Some("A keeper loses the light".into()),
            ..BookContext::default()
        }
    }

    fn with_content(content: &str) -> BookContext {
        BookContext {
            chapter_synopsis: Some("Storm night".into()),
            current_content: Some(content.into()),
            ..context()
        }
    }

    /// Text between the manuscript block's quote fences.
    fn manuscript_block(prompt: &str) -> &str {
        let start = prompt.find(MANUSCRIPT_MARKER).expect("manuscript block");
        let body = &prompt[start..];
        let open = body.find("\"\"\"\n").expect("opening fence") + 4;
        let close = body[open..].find("\n\"\"\"").expect("closing fence");
        &body[open..open + close]
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse(Some("continue")), Command::Continue);
        assert_eq!(Command::parse(Some("sensory")), Command::Sensory);
        assert_eq!(Command::parse(Some("summarize")), Command::Freeform);
        assert_eq!(Command::parse(None), Command::Freeform);
        for command in ALL {
            assert_eq!(Command::parse(Some(command.as_str())), command);
        }
    }

    #[test]
    fn test_base_section_defaults_genre() {
        let prompt = PromptCompiler::default().compile(&context(), Command::Freeform, None);
        assert!(prompt.starts_with(
            "You are a literary fiction writing assistant for the novel \"The Lighthouse\".\nGenre: Literary Fiction."
        ));
        assert!(prompt.contains("\nPremise: A keeper loses the light"));
        assert!(!prompt.contains("Style Guide"));
        assert!(prompt.contains("thoughtful writing assistant"));
    }

    #[test]
    fn test_manuscript_block_only_for_continue() {
        let ctx = with_content("The waves rose.");
        let compiler = PromptCompiler::default();
        for command in ALL {
            let prompt = compiler.compile(&ctx, command, Some("The waves rose."));
            assert_eq!(
                prompt.contains(MANUSCRIPT_MARKER),
                command == Command::Continue,
                "{command:?}"
            );
        }
    }

    #[test]
    fn test_continue_without_content_has_no_manuscript_block() {
        let prompt = PromptCompiler::default().compile(&with_content(""), Command::Continue, None);
        assert!(!prompt.contains(MANUSCRIPT_MARKER));
        assert!(prompt.contains("Continue writing the narrative"));
    }

    #[test]
    fn test_whitespace_only_content_still_gets_manuscript_block() {
        let prompt = PromptCompiler::default().compile(&with_content("   "), Command::Continue, None);
        assert_eq!(manuscript_block(&prompt), "   ");
    }

    #[test]
    fn test_continue_ignores_selected_text() {
        let prompt = PromptCompiler::default().compile(
            &with_content("Body"),
            Command::Continue,
            Some("SELECTED PASSAGE"),
        );
        assert!(!prompt.contains("SELECTED PASSAGE"));
        assert!(!prompt.contains("Selected text"));
    }

    #[test]
    fn test_short_content_is_not_truncated() {
        let prompt = PromptCompiler::new(20).compile(&with_content("Short text."), Command::Continue, None);
        assert_eq!(manuscript_block(&prompt), "Short text.");
        assert!(!prompt.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_long_content_keeps_exact_tail() {
        let content = "abcdefghij".repeat(5);
        let prompt = PromptCompiler::new(12).compile(&with_content(&content), Command::Continue, None);
        let block = manuscript_block(&prompt);
        assert_eq!(block, format!("[...]{}", &content[content.len() - 12..]));
        // The continuation instruction still follows the block.
        assert!(prompt.ends_with(Command::Continue.instruction(false)));
    }

    #[test]
    fn test_tail_respects_multibyte_characters() {
        let content = "é".repeat(10);
        let prompt = PromptCompiler::new(4).compile(&with_content(&content), Command::Continue, None);
        assert_eq!(manuscript_block(&prompt), "[...]éééé");
    }

    #[test]
    fn test_revision_commands_quote_selection() {
        for command in [Command::Deepen, Command::Dialogue, Command::Sensory] {
            let prompt = PromptCompiler::default().compile(&context(), command, Some("He left."));
            assert!(prompt.contains("Selected text:\n\"\"\"\nHe left.\n\"\"\""));
            assert!(prompt.contains("Respond with ONLY the rewritten prose"));
        }
        let deepen = PromptCompiler::default().compile(&context(), Command::Deepen, None);
        assert!(deepen.contains("greater psychological depth"));
        assert!(!deepen.contains("Selected text"));
    }

    #[test]
    fn test_freeform_with_selection_matches_voice() {
        let prompt = PromptCompiler::default().compile(&context(), Command::Freeform, Some("He left."));
        assert!(prompt.contains("Selected text"));
        assert!(prompt.contains("respond with ONLY the revised prose"));
        assert!(prompt.contains("voice, tense"));
        assert!(!prompt.contains("thoughtful writing assistant"));
    }

    #[test]
    fn test_sections_render_present_fields_only() {
        let ctx = BookContext {
            characters: vec![CharacterBrief {
                name: "Mara".into(),
                role: Some("protagonist".into()),
                age: Some("34".into()),
                motivation: Some("Keep the light burning".into()),
                contradiction: Some("Craves company, pushes people away".into()),
                ..CharacterBrief::default()
            }],
            relationships: vec![RelationshipBrief {
                from_name: "Mara".into(),
                to_name: "Unknown".into(),
                relationship_type: "estranged".into(),
                description: None,
            }],
            locations: vec![LocationBrief {
                name: "The Tower".into(),
                sensory_details: Some("Salt and kerosene".into()),
                ..LocationBrief::default()
            }],
            scenes: vec![SceneBrief {
                title: "Landfall".into(),
                synopsis: Some("The boat arrives".into()),
                pov: Some("Mara".into()),
                mood_start: Some("dread".into()),
                ..SceneBrief::default()
            }],
            neighboring_chapters: vec![NeighborBrief {
                position: Adjacency::Next,
                number: 3,
                title: "Fog".into(),
                synopsis: None,
            }],
            ..context()
        };
        let prompt = PromptCompiler::default().compile(&ctx, Command::Freeform, None);
        assert!(prompt.contains(
            "\n- Mara (protagonist), age 34 | Motivation: Keep the light burning | Internal conflict: Craves company, pushes people away"
        ));
        assert!(prompt.contains("\n- Mara → Unknown (estranged)"));
        assert!(prompt.contains("\n- The Tower | Sensory: Salt and kerosene"));
        assert!(prompt.contains("\n- Landfall: The boat arrives [POV: Mara] [Mood: dread → ?]"));
        assert!(prompt.contains("\n- Next: Chapter 3 \"Fog\""));
    }

    #[test]
    fn test_interview_prompt() {
        let character = Character {
            id: surrealdb::RecordId::from(("character", "mara")),
            book: surrealdb::RecordId::from(("book", "b")),
            name: "Mara".into(),
            role: None,
            age: None,
            archetype: None,
            description: Some("A lighthouse keeper".into()),
            motivation: None,
            fear: Some("The dark".into()),
            contradiction: None,
            voice_notes: Some("Clipped, nautical".into()),
            traits: None,
            backstory: None,
            created_at: surrealdb::Datetime::default(),
            updated_at: surrealdb::Datetime::default(),
        };
        let prompt = interview_prompt(&character);
        assert!(prompt.starts_with("You ARE Mara."));
        assert!(prompt.contains("\n\nAbout you: A lighthouse keeper"));
        assert!(prompt.contains("\nWhat you fear: The dark"));
        assert!(prompt.contains("\nHow you speak: Clipped, nautical"));
        assert!(!prompt.contains("What drives you"));
        assert!(prompt.ends_with("Never break character or acknowledge you are an AI."));
    }
}
