//! Request and response schemas.
//!
//! Deserialization handles shape; `validate` handles length limits,
//! identifier formats and HTML escaping of free text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::error::ValidationError;
use crate::security::escape_html;

pub const MAX_QUERY_CHARS: usize = 4000;
pub const MAX_WORKSPACE_NAME_CHARS: usize = 100;
pub const MAX_FILENAME_CHARS: usize = 255;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    Ar,
    En,
}

impl LanguageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::Ar => "ar",
            LanguageCode::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CulturalContext {
    #[default]
    Saudi,
    Sudan,
    Gulf,
    Levant,
}

impl CulturalContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            CulturalContext::Saudi => "saudi",
            CulturalContext::Sudan => "sudan",
            CulturalContext::Gulf => "gulf",
            CulturalContext::Levant => "levant",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Xlsx,
    Txt,
    Json,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceLevel {
    #[default]
    Standard,
    Hipaa,
    Pdpl,
    Phi,
}

/// Trim, enforce a character range, then escape.
fn clean_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if len > max_chars {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_chars),
        ));
    }
    Ok(escape_html(trimmed))
}

/// `ws_` followed by at least one of `[A-Za-z0-9_-]`.
pub fn validate_workspace_id(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .strip_prefix("ws_")
        .map(|rest| {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new(
            "workspace_id",
            "must match ws_[A-Za-z0-9_-]+",
        ))
    }
}

/// Store-assigned document ids: 1 to 128 of `[A-Za-z0-9_-]`.
pub fn validate_document_id(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value.len() <= 128
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("document_id", "must match [A-Za-z0-9_-]{1,128}"))
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatQuery {
    pub query: String,
    pub workspace_id: String,
    #[serde(default)]
    pub language: LanguageCode,
    #[serde(default)]
    pub cultural_context: CulturalContext,
    #[serde(default = "yes")]
    pub use_rag: bool,
    #[serde(default = "yes")]
    pub include_citations: bool,
}

impl ChatQuery {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.query = clean_text("query", &self.query, MAX_QUERY_CHARS)?;
        validate_workspace_id(&self.workspace_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub chunk: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: f32,
    pub language: LanguageCode,
    pub model_used: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: LanguageCode,
    #[serde(default)]
    pub cultural_context: CulturalContext,
}

impl WorkspaceCreate {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.name = clean_text("name", &self.name, MAX_WORKSPACE_NAME_CHARS)?;
        self.description = self.description.map(|d| escape_html(&d));
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceResponse {
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub language: LanguageCode,
    pub cultural_context: CulturalContext,
    pub created_at: String,
    pub user_id: String,
}

fn english() -> LanguageCode {
    LanguageCode::En
}

fn healthcare() -> String {
    "healthcare".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub document_type: DocumentType,
    #[serde(default = "english")]
    pub language: LanguageCode,
    #[serde(default = "healthcare")]
    pub domain: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub compliance_level: ComplianceLevel,
}

impl DocumentMetadata {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.filename = clean_text("metadata.filename", &self.filename, MAX_FILENAME_CHARS)?;
        Ok(self)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub document_id: String,
    pub filename: String,
    pub workspace_id: String,
    pub status: &'static str,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsQuery {
    pub workspace_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub generation: bool,
    pub database: bool,
    pub cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub services: ServiceStatus,
}
