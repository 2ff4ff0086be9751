use std::fmt::Write as _;

use crate::document::{LabeledValue, PromptDocument};

pub fn to_text(document: &PromptDocument) -> String {
    if document.is_ai_suggestion() {
        return document.task().to_string();
    }

    let mut out = String::new();
    let _ = write!(out, "{} {}\n\n", document.role(), document.task());

    if let Some(style) = document.style() {
        let _ = write!(out, "Writing style: {}. {}\n\n", style.name, style.instruction);
    }

    if let Some(technique) = document.technique() {
        let _ = write!(
            out,
            "Technique: {}. {}\n\n",
            technique.name, technique.instruction
        );

        if let Some(examples) = technique.examples() {
            out.push_str("EXAMPLES:\n");
            for (index, example) in examples.iter().enumerate() {
                let _ = write!(
                    out,
                    "Example {}:\nInput: {}\nOutput: {}\n\n",
                    index + 1,
                    example.input,
                    example.output
                );
            }
        }

        if let Some(rag) = technique.rag_context() {
            let _ = write!(out, "---\n{}\n---\n\n", rag.trim_end_matches('\n'));
        }
    }

    if !document.context().is_empty() {
        out.push_str("Context:\n");
        push_list(&mut out, document.context());
    }

    out.push_str("\nConstraints:\n");
    push_list(&mut out, document.customizations());
    out
}

fn push_list(out: &mut String, entries: &[LabeledValue]) {
    for entry in entries {
        let _ = writeln!(out, "- {}: {}", entry.label, entry.value);
    }
}
