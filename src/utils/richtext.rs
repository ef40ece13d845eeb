//! Rich-text chapter documents.
//!
//! Chapter prose is stored as a typed node tree (`doc` → `paragraph` →
//! `text`, plus headings, block quotes, rules and hard breaks). The prompt
//! pipeline only ever needs plain text, derived here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Heading level assumed when a heading carries no `level` attribute.
const DEFAULT_HEADING_LEVEL: usize = 3;

/// Deepest heading the editor produces; larger levels are clamped to it.
const MAX_HEADING_LEVEL: u64 = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

impl Node {
    fn block(kind: &str, content: Vec<Node>) -> Self {
        Self {
            kind: kind.to_string(),
            content,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A paragraph holding `text` verbatim (no text node when empty).
    pub fn paragraph(text: &str) -> Self {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Self::block("paragraph", content)
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::block("doc", content)
    }
}

/// Plain text of a serialized document.
///
/// Absent, empty or malformed input yields an empty string. Trailing
/// newlines are trimmed so that re-wrapping the output in a single
/// paragraph and extracting again is a fixed point.
pub fn to_plain_text(content: Option<&str>) -> String {
    let Some(raw) = content.filter(|c| !c.trim().is_empty()) else {
        return String::new();
    };
    match serde_json::from_str::<Node>(raw) {
        Ok(doc) => node_to_plain_text(&doc),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable rich-text document");
            String::new()
        }
    }
}

/// Plain text of an already-parsed tree.
pub fn node_to_plain_text(node: &Node) -> String {
    let mut text = extract(node);
    let trimmed = text.trim_end_matches('\n').len();
    text.truncate(trimmed);
    text
}

fn children(node: &Node) -> String {
    node.content.iter().map(extract).collect()
}

fn extract(node: &Node) -> String {
    match node.kind.as_str() {
        "text" => node.text.clone().unwrap_or_default(),
        "paragraph" => children(node) + "\n\n",
        "heading" => {
            let level = node
                .attrs
                .as_ref()
                .and_then(|a| a.get("level"))
                .and_then(Value::as_u64)
                .map(|l| l.clamp(1, MAX_HEADING_LEVEL) as usize)
                .unwrap_or(DEFAULT_HEADING_LEVEL);
            format!("{} {}\n\n", "#".repeat(level + 2), children(node))
        }
        "hardBreak" => "\n".to_string(),
        "blockquote" => {
            let inner = children(node);
            let quoted: Vec<String> = inner
                .trim_end_matches('\n')
                .split('\n')
                .map(|line| {
                    if line.trim().is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect();
            quoted.join("\n") + "\n\n"
        }
        "horizontalRule" => "---\n\n".to_string(),
        _ => children(node),
    }
}

/// Build a document from plain text: blank lines separate paragraphs and
/// single newlines become hard breaks.
pub fn from_plain_text(text: &str) -> Node {
    let paragraphs = text
        .split("\n\n")
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let mut content = Vec::new();
            for (i, line) in p.split('\n').enumerate() {
                if i > 0 {
                    content.push(Node::block("hardBreak", Vec::new()));
                }
                if !line.is_empty() {
                    content.push(Node::text(line));
                }
            }
            Node::block("paragraph", content)
        })
        .collect();
    Node::doc(paragraphs)
}

/// Serialized form of [`from_plain_text`], ready for storage.
pub fn plain_text_to_json(text: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&from_plain_text(text))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
