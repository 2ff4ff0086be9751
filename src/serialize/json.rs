use serde_json::json;

use super::AI_SUGGESTION_KEY;
use crate::document::PromptDocument;

/// Pretty-printed document; the suggestion short form is a single key.
pub fn to_json(document: &PromptDocument) -> String {
    let rendered = if document.is_ai_suggestion() {
        serde_json::to_string_pretty(&json!({ AI_SUGGESTION_KEY: document.task() }))
    } else {
        serde_json::to_string_pretty(document)
    };
    rendered.expect("prompt documents contain only strings, sequences and flags")
}
