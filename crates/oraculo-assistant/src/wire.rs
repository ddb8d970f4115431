//! Wire format of the `generateContent` endpoint.
//!
//! Typed request/response structs for the subset of the API this system
//! uses: text and inline-data parts, function declarations, the web-search
//! tool, JSON response schemas, and grounding metadata.

use serde::{Deserialize, Serialize};

use crate::history::Role;

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
  pub contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub system_instruction: Option<Content>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tools: Vec<Tool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role:  Option<Role>,
  #[serde(default)]
  pub parts: Vec<Part>,
}

impl Content {
  pub fn user(parts: Vec<Part>) -> Self {
    Self { role: Some(Role::User), parts }
  }

  pub fn system(text: impl Into<String>) -> Self {
    Self { role: None, parts: vec![Part::text(text)] }
  }
}

/// One part of a content block. Exactly one field is set in practice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inline_data: Option<InlineData>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub function_call: Option<FunctionCall>,
}

impl Part {
  pub fn text(text: impl Into<String>) -> Self {
    Self { text: Some(text.into()), ..Self::default() }
  }

  pub fn inline(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
    Self {
      inline_data: Some(InlineData {
        mime_type: mime_type.into(),
        data:      data.into(),
      }),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
  pub mime_type: String,
  pub data:      String,
}

/// A function call the model asks the client to perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
  pub name: String,
  #[serde(default)]
  pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub function_declarations: Option<Vec<FunctionDeclaration>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub google_search: Option<serde_json::Value>,
}

impl Tool {
  pub fn functions(declarations: Vec<FunctionDeclaration>) -> Self {
    Self { function_declarations: Some(declarations), ..Self::default() }
  }

  pub fn web_search() -> Self {
    Self { google_search: Some(serde_json::json!({})), ..Self::default() }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
  pub name:        String,
  pub description: String,
  pub parameters:  serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response_mime_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response_schema: Option<serde_json::Value>,
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
  #[serde(default)]
  pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
  #[serde(default)]
  pub content: Option<Content>,
  #[serde(default)]
  pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
  #[serde(default)]
  pub grounding_chunks: Vec<GroundingChunk>,
}

/// A web source the answer was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingChunk {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSource {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uri:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

impl GenerateContentResponse {
  /// Concatenated text parts of the first candidate.
  pub fn text(&self) -> Option<String> {
    let content = self.candidates.first()?.content.as_ref()?;
    let joined: String = content
      .parts
      .iter()
      .filter_map(|p| p.text.as_deref())
      .collect();
    if joined.is_empty() { None } else { Some(joined) }
  }

  pub fn function_calls(&self) -> Vec<FunctionCall> {
    self
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|content| {
        content
          .parts
          .iter()
          .filter_map(|p| p.function_call.clone())
          .collect()
      })
      .unwrap_or_default()
  }

  pub fn grounding_chunks(&self) -> Vec<GroundingChunk> {
    self
      .candidates
      .first()
      .and_then(|c| c.grounding_metadata.as_ref())
      .map(|m| m.grounding_chunks.clone())
      .unwrap_or_default()
  }
}
