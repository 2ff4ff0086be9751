//! Prompt compilation engine.
//!
//! A [`PromptDocument`] is the validated intermediate representation of a
//! prompt. It compiles deterministically into five textual formats through
//! [`ExportFormat`] or the functions in [`serialize`]. [`MarkdownRenderer`]
//! turns model replies into display HTML.
//!
//! # Public API Overview
//! - Build documents with [`PromptBuilder`] or parse them with
//!   [`PromptDocument::from_json`].
//! - Compile with [`ExportFormat::serialize`] and name downloads with
//!   [`ExportFormat::file_name`].
//! - Render streaming replies with [`MarkdownRenderer::render_streaming`].

pub mod document;
pub mod export;
pub mod render;
pub mod serialize;

pub use crate::document::{
    Example, LabeledValue, PromptBuilder, PromptDocument, Style, Technique, ValidationError,
};
pub use crate::export::{ExportFormat, UnknownFormat};
pub use crate::render::{MarkdownRenderer, STREAMING_CURSOR};
pub use crate::serialize::{to_json, to_markdown, to_text, to_xml, to_yaml};
