//! HTML rendering of model output for display.

pub mod markdown;

pub use markdown::{MarkdownRenderer, STREAMING_CURSOR};
