//! Block-style YAML emitter.
//!
//! Scalars are written as double-quoted strings with every character YAML
//! treats specially escaped, so any value parses back unchanged. Multi-line
//! RAG context and suggestion text use literal block scalars unless a line
//! opens with a tab, which block indentation cannot carry.

use std::fmt::Write as _;

use super::AI_SUGGESTION_KEY;
use crate::document::{LabeledValue, PromptDocument};

pub fn to_yaml(document: &PromptDocument) -> String {
    let mut out = String::new();

    if document.is_ai_suggestion() {
        push_text(&mut out, 0, AI_SUGGESTION_KEY, document.task());
        return out;
    }

    push_scalar(&mut out, 0, "role", document.role());
    push_scalar(&mut out, 0, "task", document.task());
    push_entries(&mut out, "context", document.context());

    if let Some(style) = document.style() {
        out.push_str("style:\n");
        push_scalar(&mut out, 2, "name", &style.name);
        push_scalar(&mut out, 2, "instruction", &style.instruction);
    }

    if let Some(technique) = document.technique() {
        out.push_str("technique:\n");
        push_scalar(&mut out, 2, "name", &technique.name);
        push_scalar(&mut out, 2, "instruction", &technique.instruction);
        if let Some(examples) = &technique.examples {
            if examples.is_empty() {
                out.push_str("  examples: []\n");
            } else {
                out.push_str("  examples:\n");
                for example in examples {
                    let _ = writeln!(out, "    - input: {}", quote(&example.input));
                    let _ = writeln!(out, "      output: {}", quote(&example.output));
                }
            }
        }
        if let Some(rag) = &technique.rag_context {
            push_text(&mut out, 2, "ragContext", rag);
        }
    }

    push_entries(&mut out, "customizations", document.customizations());

    if let Some(flag) = document.ai_suggestion_flag() {
        let _ = writeln!(out, "isAiSuggestion: {flag}");
    }
    out
}

fn push_scalar(out: &mut String, indent: usize, key: &str, value: &str) {
    let _ = writeln!(out, "{:indent$}{key}: {}", "", quote(value));
}

fn push_entries(out: &mut String, key: &str, entries: &[LabeledValue]) {
    if entries.is_empty() {
        let _ = writeln!(out, "{key}: []");
        return;
    }
    let _ = writeln!(out, "{key}:");
    for entry in entries {
        let _ = writeln!(out, "  - label: {}", quote(&entry.label));
        let _ = writeln!(out, "    value: {}", quote(&entry.value));
    }
}

/// Writes `key: |` with `text` as a literal block, or a quoted scalar when
/// the text cannot be represented as one.
fn push_text(out: &mut String, indent: usize, key: &str, text: &str) {
    if !fits_block_scalar(text) {
        push_scalar(out, indent, key, text);
        return;
    }

    let body = text.trim_end_matches('\n');
    let trailing = text.len() - body.len();
    let chomping = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };
    let leading_space = body
        .lines()
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with(' '));
    let indicator = if leading_space { "2" } else { "" };

    let _ = writeln!(out, "{:indent$}{key}: |{indicator}{chomping}", "");
    let content_indent = indent + 2;
    for line in body.split('\n') {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{:content_indent$}{line}", "");
        }
    }
    for _ in 1..trailing {
        out.push('\n');
    }
}

fn fits_block_scalar(text: &str) -> bool {
    text.contains('\n')
        && !text.trim().is_empty()
        && !text.split('\n').any(|line| line.starts_with('\t'))
        && !text.chars().any(|c| c != '\n' && needs_escape(c))
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if needs_escape(c) => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Characters outside the YAML printable set, plus the ones parsers treat as
/// line breaks or byte order marks.
fn needs_escape(c: char) -> bool {
    (c.is_control() && c != '\t')
        || matches!(
            c,
            '\u{FEFF}' | '\u{2028}' | '\u{2029}' | '\u{FFFE}' | '\u{FFFF}'
        )
}
