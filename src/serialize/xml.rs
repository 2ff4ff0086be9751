use std::fmt::Write as _;

use super::AI_SUGGESTION_KEY;
use crate::document::{LabeledValue, PromptDocument};

pub fn to_xml(document: &PromptDocument) -> String {
    if document.is_ai_suggestion() {
        return format!(
            "<{AI_SUGGESTION_KEY}>{}</{AI_SUGGESTION_KEY}>\n",
            escape(document.task())
        );
    }

    let mut out = String::from("<prompt>\n  <instructions>\n");
    let _ = writeln!(out, "    <role>{}</role>", escape(document.role()));
    let _ = writeln!(out, "    <task>{}</task>", escape(document.task()));
    if let Some(style) = document.style() {
        let _ = writeln!(
            out,
            "    <style name=\"{}\">{}</style>",
            escape(&style.name),
            escape(&style.instruction)
        );
    }
    if let Some(technique) = document.technique() {
        let _ = writeln!(
            out,
            "    <technique name=\"{}\">{}</technique>",
            escape(&technique.name),
            escape(&technique.instruction)
        );
    }
    out.push_str("  </instructions>\n");

    if let Some(technique) = document.technique() {
        if let Some(examples) = technique.examples() {
            out.push_str("  <examples>\n");
            for (index, example) in examples.iter().enumerate() {
                let _ = writeln!(out, "    <example number=\"{}\">", index + 1);
                let _ = writeln!(out, "      <input>{}</input>", escape(&example.input));
                let _ = writeln!(out, "      <output>{}</output>", escape(&example.output));
                out.push_str("    </example>\n");
            }
            out.push_str("  </examples>\n");
        }
        if let Some(rag) = technique.rag_context() {
            let _ = writeln!(out, "  <document_context>{}</document_context>", escape(rag));
        }
    }

    if !document.context().is_empty() {
        push_section(&mut out, "context", document.context());
    }
    push_section(&mut out, "constraints", document.customizations());

    out.push_str("</prompt>\n");
    out
}

fn push_section(out: &mut String, name: &str, entries: &[LabeledValue]) {
    let _ = writeln!(out, "  <{name}>");
    for entry in entries {
        let tag = xml_tag_name(&entry.label);
        let _ = writeln!(out, "    <{tag}>{}</{tag}>", escape(&entry.value));
    }
    let _ = writeln!(out, "  </{name}>");
}

/// Element name for a label: each word title-cased, then everything but
/// ASCII alphanumerics removed ("Target Audience" -> `TargetAudience`).
///
/// A label with nothing left becomes `item`; a leading digit gets a `_`
/// prefix so the name stays a valid XML name.
pub fn xml_tag_name(label: &str) -> String {
    let mut name: String = label
        .split_whitespace()
        .map(title_case)
        .collect::<String>()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if name.is_empty() {
        name.push_str("item");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
