use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chat_session::{ChatSessionAccumulator, SendOutcome};
use chat_transport::{cancel_signal, CancelSignal, ChatTransport};
use completions_api::{ChatCompletionRequest, CompletionsClient, WireMessage};
use promptsmith::{to_text, ExportFormat, MarkdownRenderer, PromptDocument};
use serde::Deserialize;

const IMPROVE_INSTRUCTIONS: &str = "You are an expert prompt engineer. Rewrite the prompt you \
are given so it is clearer, more specific and more effective, keeping its intent. Reply only \
with a JSON object of the form {\"improved_prompt\": \"<the rewritten prompt>\"}.";

pub fn read_document(path: &Path) -> anyhow::Result<PromptDocument> {
    let json = if path.as_os_str() == "-" {
        let mut json = String::new();
        io::stdin()
            .read_to_string(&mut json)
            .context("failed to read document from stdin")?;
        json
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read document {}", path.display()))?
    };
    PromptDocument::from_json(&json)
        .with_context(|| format!("invalid prompt document {}", path.display()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| *stem != "-")
        .unwrap_or("prompt")
        .to_string()
}

/// Writes each format into `out_dir` and returns the paths written.
pub fn write_exports(
    document: &PromptDocument,
    stem: &str,
    formats: &[ExportFormat],
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = out_dir.join(format.file_name(stem));
        fs::write(&path, format.serialize(document))
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), mime = format.mime_type(), "export written");
        written.push(path);
    }
    Ok(written)
}

pub fn compile(
    input: &Path,
    format: ExportFormat,
    out_dir: Option<&Path>,
    all: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let document = read_document(input)?;

    let Some(out_dir) = out_dir else {
        out.write_all(format.serialize(&document).as_bytes())?;
        return Ok(());
    };

    let formats: &[ExportFormat] = if all {
        &ExportFormat::ALL
    } else {
        std::slice::from_ref(&format)
    };
    for path in write_exports(&document, &file_stem(input), formats, out_dir)? {
        writeln!(out, "{}", path.display())?;
    }
    Ok(())
}

/// Cancel signal tripped by Ctrl-C.
pub fn ctrl_c_signal() -> CancelSignal {
    let cancel = cancel_signal();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });
    cancel
}

pub struct ChatOptions {
    pub system_prompt: String,
    pub html: bool,
    pub save: Option<PathBuf>,
}

/// Sends every message in turn, streaming replies to `out`.
///
/// Stops after the first reply that fails or is cancelled.
pub async fn chat(
    transport: Box<dyn ChatTransport>,
    options: ChatOptions,
    messages: &[String],
    cancel: CancelSignal,
    out: &mut impl Write,
) -> anyhow::Result<Vec<SendOutcome>> {
    let mut session = ChatSessionAccumulator::new(transport, options.system_prompt);
    let renderer = MarkdownRenderer::new();
    let mut outcomes = Vec::new();

    for message in messages {
        writeln!(out, "> {message}")?;
        let mut printed = 0;
        let mut write_error = None;

        let outcome = session
            .send(message, cancel.clone(), |reply| {
                let fresh = reply.content.get(printed..).unwrap_or_default();
                if let Err(error) = out.write_all(fresh.as_bytes()).and_then(|()| out.flush()) {
                    write_error.get_or_insert(error);
                }
                printed = reply.content.len();
            })
            .await?;
        if let Some(error) = write_error {
            return Err(error.into());
        }
        writeln!(out)?;

        if let SendOutcome::Aborted { notice } = &outcome {
            writeln!(out, "[{notice}]")?;
        }
        if options.html {
            if let Some(reply) = session.messages().last() {
                writeln!(out, "{}", renderer.render(&reply.content))?;
            }
        }

        let stop = !matches!(outcome, SendOutcome::Completed);
        outcomes.push(outcome);
        if stop {
            break;
        }
    }

    if let Some(path) = &options.save {
        let snapshot = session.snapshot()?;
        fs::write(path, serde_json::to_string_pretty(&snapshot)?)
            .with_context(|| format!("failed to save transcript to {}", path.display()))?;
        tracing::info!(path = %path.display(), id = %snapshot.id, "transcript saved");
    }
    Ok(outcomes)
}

#[derive(Debug, Deserialize)]
struct ImprovedPrompt {
    improved_prompt: String,
}

/// Asks for an improved prompt and returns it as an AI-suggestion document.
///
/// Failures are reported with a message that separates an unreachable
/// service from an unusable reply.
pub async fn improve(
    client: &CompletionsClient,
    document: &PromptDocument,
    cancel: &CancelSignal,
) -> anyhow::Result<PromptDocument> {
    let request = ChatCompletionRequest::new(
        client.config().model.clone(),
        vec![
            WireMessage::system(IMPROVE_INSTRUCTIONS),
            WireMessage::user(to_text(document)),
        ],
    );

    let improved: ImprovedPrompt = client
        .complete_structured(request, cancel)
        .await
        .map_err(|error| anyhow::anyhow!(error.user_message()))?;
    Ok(PromptDocument::ai_suggestion(improved.improved_prompt)?)
}
