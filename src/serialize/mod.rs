//! Pure `PromptDocument -> String` compilers, one per export format.
//!
//! Every serializer is total and deterministic. An AI-suggestion document is
//! rendered from its task alone; no other field can influence the output.
//! Context and constraint entries are written in insertion order.

mod json;
mod markdown;
mod text;
mod xml;
mod yaml;

pub use json::to_json;
pub use markdown::to_markdown;
pub use text::to_text;
pub use xml::{to_xml, xml_tag_name};
pub use yaml::to_yaml;

/// Key used by the structured short forms of an AI suggestion.
pub const AI_SUGGESTION_KEY: &str = "ai_improved_prompt";
