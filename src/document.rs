//! The prompt intermediate representation and its construction rules.
//!
//! A [`PromptDocument`] is only obtainable through [`PromptBuilder::build`],
//! [`PromptDocument::ai_suggestion`] or [`PromptDocument::from_json`], each of
//! which validates it. Once built it is never mutated; collections keep
//! insertion order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a document could not be built.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("task must not be empty")]
    EmptyTask,

    #[error("role must not be empty unless the document is an AI suggestion")]
    EmptyRole,

    #[error("technique may carry examples or RAG context, not both")]
    ConflictingTechnique,

    #[error("{section} entry {index} has an empty label")]
    EmptyLabel { section: &'static str, index: usize },

    #[error("invalid prompt document JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

impl LabeledValue {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
}

impl Example {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technique {
    pub name: String,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Example>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_context: Option<String>,
}

impl Technique {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            examples: None,
            rag_context: None,
        }
    }

    #[must_use]
    pub fn with_examples(mut self, examples: Vec<Example>) -> Self {
        self.examples = Some(examples);
        self
    }

    #[must_use]
    pub fn with_rag_context(mut self, rag_context: impl Into<String>) -> Self {
        self.rag_context = Some(rag_context.into());
        self
    }

    /// Examples, when at least one is present.
    pub fn examples(&self) -> Option<&[Example]> {
        self.examples.as_deref().filter(|examples| !examples.is_empty())
    }

    /// RAG context, when it has any non-whitespace content.
    pub fn rag_context(&self) -> Option<&str> {
        self.rag_context
            .as_deref()
            .filter(|context| !context.trim().is_empty())
    }
}

/// Compiled prompt. Field order here is the key order of the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDocument {
    role: String,
    task: String,
    context: Vec<LabeledValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<Style>,
    #[serde(skip_serializing_if = "Option::is_none")]
    technique: Option<Technique>,
    customizations: Vec<LabeledValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_ai_suggestion: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRepr {
    #[serde(default)]
    role: String,
    task: String,
    #[serde(default)]
    context: Vec<LabeledValue>,
    #[serde(default)]
    style: Option<Style>,
    #[serde(default)]
    technique: Option<Technique>,
    #[serde(default)]
    customizations: Vec<LabeledValue>,
    #[serde(default)]
    is_ai_suggestion: Option<bool>,
}

impl<'de> Deserialize<'de> for PromptDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = DocumentRepr::deserialize(deserializer)?;
        PromptDocument::from_repr(repr).map_err(serde::de::Error::custom)
    }
}

impl PromptDocument {
    /// Short form that every serializer renders as the task alone.
    pub fn ai_suggestion(task: impl Into<String>) -> Result<Self, ValidationError> {
        PromptBuilder::new("", task).ai_suggestion(true).build()
    }

    /// Parses the canonical JSON form and validates it.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let repr: DocumentRepr = serde_json::from_str(json)?;
        Self::from_repr(repr)
    }

    fn from_repr(repr: DocumentRepr) -> Result<Self, ValidationError> {
        let document = Self {
            role: repr.role,
            task: repr.task,
            context: repr.context,
            style: repr.style,
            technique: repr.technique,
            customizations: repr.customizations,
            is_ai_suggestion: repr.is_ai_suggestion,
        };
        document.validate()?;
        Ok(document)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.task.trim().is_empty() {
            return Err(ValidationError::EmptyTask);
        }
        if self.role.trim().is_empty() && !self.is_ai_suggestion() {
            return Err(ValidationError::EmptyRole);
        }
        if let Some(technique) = &self.technique {
            if technique.examples().is_some() && technique.rag_context().is_some() {
                return Err(ValidationError::ConflictingTechnique);
            }
        }
        check_labels("context", &self.context)?;
        check_labels("customizations", &self.customizations)
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn context(&self) -> &[LabeledValue] {
        &self.context
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub fn technique(&self) -> Option<&Technique> {
        self.technique.as_ref()
    }

    pub fn customizations(&self) -> &[LabeledValue] {
        &self.customizations
    }

    pub fn is_ai_suggestion(&self) -> bool {
        self.is_ai_suggestion.unwrap_or(false)
    }

    /// Stored flag as it appears in the JSON form.
    pub fn ai_suggestion_flag(&self) -> Option<bool> {
        self.is_ai_suggestion
    }

    /// Builder seeded with this document's fields.
    pub fn to_builder(&self) -> PromptBuilder {
        PromptBuilder {
            document: self.clone(),
        }
    }
}

fn check_labels(section: &'static str, entries: &[LabeledValue]) -> Result<(), ValidationError> {
    match entries
        .iter()
        .position(|entry| entry.label.trim().is_empty())
    {
        Some(index) => Err(ValidationError::EmptyLabel { section, index }),
        None => Ok(()),
    }
}

/// Accumulates fields for one document; nothing is checked until [`build`].
///
/// [`build`]: PromptBuilder::build
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    document: PromptDocument,
}

impl PromptBuilder {
    pub fn new(role: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            document: PromptDocument {
                role: role.into(),
                task: task.into(),
                context: Vec::new(),
                style: None,
                technique: None,
                customizations: Vec::new(),
                is_ai_suggestion: None,
            },
        }
    }

    #[must_use]
    pub fn context(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.document.context.push(LabeledValue::new(label, value));
        self
    }

    #[must_use]
    pub fn style(mut self, name: impl Into<String>, instruction: impl Into<String>) -> Self {
        self.document.style = Some(Style {
            name: name.into(),
            instruction: instruction.into(),
        });
        self
    }

    #[must_use]
    pub fn technique(mut self, technique: Technique) -> Self {
        self.document.technique = Some(technique);
        self
    }

    #[must_use]
    pub fn customization(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.document
            .customizations
            .push(LabeledValue::new(label, value));
        self
    }

    /// Appends the conventional `Tone`, `Format` and `Length` constraints.
    #[must_use]
    pub fn with_standard_customizations(
        self,
        tone: impl Into<String>,
        format: impl Into<String>,
        length: impl Into<String>,
    ) -> Self {
        self.customization("Tone", tone)
            .customization("Format", format)
            .customization("Length", length)
    }

    #[must_use]
    pub fn ai_suggestion(mut self, is_ai_suggestion: bool) -> Self {
        self.document.is_ai_suggestion = Some(is_ai_suggestion);
        self
    }

    pub fn build(self) -> Result<PromptDocument, ValidationError> {
        self.document.validate()?;
        Ok(self.document)
    }
}
