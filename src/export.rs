use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::document::PromptDocument;
use crate::serialize;

/// Downloadable output format of a compiled prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Text,
    Markdown,
    Xml,
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown export format '{0}'; expected text, markdown, xml, json or yaml")]
pub struct UnknownFormat(pub String);

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Text,
        ExportFormat::Markdown,
        ExportFormat::Xml,
        ExportFormat::Json,
        ExportFormat::Yaml,
    ];

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Xml => "application/xml",
            Self::Json => "application/json",
            Self::Yaml => "application/x-yaml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    pub fn serialize(self, document: &PromptDocument) -> String {
        match self {
            Self::Text => serialize::to_text(document),
            Self::Markdown => serialize::to_markdown(document),
            Self::Xml => serialize::to_xml(document),
            Self::Json => serialize::to_json(document),
            Self::Yaml => serialize::to_yaml(document),
        }
    }

    /// `stem` with this format's extension; a blank stem becomes `prompt`.
    pub fn file_name(self, stem: &str) -> String {
        let stem = stem.trim();
        let stem = if stem.is_empty() { "prompt" } else { stem };
        format!("{stem}.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Yaml => "yaml",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(UnknownFormat(value.to_string())),
        }
    }
}
