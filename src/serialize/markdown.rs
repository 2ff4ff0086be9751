use std::fmt::Write as _;

use crate::document::{LabeledValue, PromptDocument};

pub fn to_markdown(document: &PromptDocument) -> String {
    if document.is_ai_suggestion() {
        return fenced(document.task(), "");
    }

    let mut out = String::new();
    let _ = write!(out, "### Role\n{}\n\n", document.role());
    let _ = write!(out, "### Task\n{}\n\n", document.task());

    if let Some(style) = document.style() {
        let _ = write!(out, "### Style: {}\n{}\n\n", style.name, style.instruction);
    }

    if let Some(technique) = document.technique() {
        let _ = write!(
            out,
            "### Technique: {}\n{}\n\n",
            technique.name, technique.instruction
        );

        if let Some(examples) = technique.examples() {
            out.push_str("### Examples\n\n");
            for (index, example) in examples.iter().enumerate() {
                let _ = write!(out, "**Example {}**\n\n", index + 1);
                out.push_str("**Input:**\n");
                out.push_str(&fenced(&example.input, ""));
                out.push_str("\n**Output:**\n");
                out.push_str(&fenced(&example.output, ""));
                out.push('\n');
            }
        }

        if let Some(rag) = technique.rag_context() {
            out.push_str("### Reference Context\n");
            out.push_str(&fenced(rag, "text"));
            out.push('\n');
        }
    }

    if !document.context().is_empty() {
        out.push_str("### Context\n");
        push_list(&mut out, document.context());
        out.push('\n');
    }

    out.push_str("### Constraints\n");
    push_list(&mut out, document.customizations());
    out
}

fn push_list(out: &mut String, entries: &[LabeledValue]) {
    for entry in entries {
        let _ = writeln!(out, "- **{}:** {}", entry.label, entry.value);
    }
}

/// Fences `body` with a backtick run longer than any run inside it.
fn fenced(body: &str, info: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}{info}\n{}\n{fence}\n", body.trim_end_matches('\n'))
}
