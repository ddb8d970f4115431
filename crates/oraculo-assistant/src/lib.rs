//! Gateway to the generative-AI service ("Maya").
//!
//! Three operations, all single-shot: structured metadata extraction from an
//! uploaded bid notice, conversational chat with an optional status-update
//! function call or web-search grounding, and proposal drafting. No
//! streaming, no retries — a failed call surfaces once and the caller
//! decides what to show.

pub mod error;
pub mod history;
pub mod wire;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use oraculo_core::bid::{Bid, BidStatus};

pub use error::{Error, Result};
use history::{ChatTurn, is_radar_query, normalize_history};
use wire::{
  Content, FunctionCall, FunctionDeclaration, GenerateContentRequest,
  GenerateContentResponse, GenerationConfig, GroundingChunk, Part, Tool,
};

/// Company master data injected into every chat system instruction.
const COMPANY_CONTEXT: &str = "\
DADOS MESTRE DA KITS VITAL:
- Razão Social: Kits Vital Comercio de Produtos Para Saude, Tatico e Emergencia Ltda.
- CNPJ: 42.394.438/0001-41
- Inscrição Estadual: 16.402.085-3
- Endereço: Avenida Dom Pedro II, 531, Sala 120, Centro, João Pessoa - PB, CEP: 58013-420
PRODUTOS TÁTICOS: Torniquetes, bandagens israelenses, gazes táticas, gase hemostática, tesoura ponta romba, kits APH.";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_EXTRACT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-3-flash-preview";

/// Name of the single declared function.
pub const UPDATE_BID_STATUS: &str = "update_bid_status";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  pub api_key:  String,
  /// Model used for document extraction and proposal drafting.
  #[serde(default = "default_extract_model")]
  pub extract_model: String,
  /// Model used for chat.
  #[serde(default = "default_chat_model")]
  pub chat_model: String,
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_extract_model() -> String {
  DEFAULT_EXTRACT_MODEL.to_string()
}

fn default_chat_model() -> String {
  DEFAULT_CHAT_MODEL.to_string()
}

impl AssistantConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      base_url:      default_base_url(),
      api_key:       api_key.into(),
      extract_model: default_extract_model(),
      chat_model:    default_chat_model(),
    }
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Fields extracted from an uploaded bid notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidMetadata {
  pub organ:          String,
  pub bidding_number: String,
  pub title:          String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// A file sent alongside a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAttachment {
  pub data:      String,
  pub mime_type: String,
}

/// What one chat round produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
  pub text: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub function_calls: Vec<FunctionCall>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub grounding: Vec<GroundingChunk>,
}

/// A parsed `update_bid_status` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
  pub bid_id: Uuid,
  pub status: BidStatus,
}

/// Decode the status updates among the model's function calls, skipping
/// anything malformed.
pub fn parse_status_updates(calls: &[FunctionCall]) -> Vec<StatusUpdate> {
  calls
    .iter()
    .filter(|c| c.name == UPDATE_BID_STATUS)
    .filter_map(|c| {
      let bid_id = c.args.get("bidId")?.as_str()?.parse().ok()?;
      let label = c.args.get("newStatus")?.as_str()?;
      let status = BidStatus::from_label(label).ok()?;
      Some(StatusUpdate { bid_id, status })
    })
    .collect()
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// Client for the generative-AI REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct Assistant {
  client: Client,
  config: AssistantConfig,
}

impl Assistant {
  pub fn new(config: AssistantConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(120))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, model: &str) -> String {
    format!(
      "{}/v1beta/models/{model}:generateContent",
      self.config.base_url.trim_end_matches('/')
    )
  }

  async fn generate(
    &self,
    model: &str,
    request: &GenerateContentRequest,
  ) -> Result<GenerateContentResponse> {
    tracing::debug!(model, turns = request.contents.len(), "generateContent call");
    let resp = self
      .client
      .post(self.url(model))
      .header("x-goog-api-key", &self.config.api_key)
      .json(request)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Service {
        status,
        body: resp.text().await.unwrap_or_default(),
      });
    }
    Ok(resp.json().await?)
  }

  // ── Extraction ────────────────────────────────────────────────────────

  /// Extract bid metadata from an uploaded notice (edital/aviso).
  pub async fn extract_bid_metadata(
    &self,
    file_base64: &str,
    mime_type: &str,
  ) -> Result<BidMetadata> {
    let request = GenerateContentRequest {
      contents: vec![Content::user(vec![
        Part::inline(file_base64, mime_type),
        Part::text(
          "Você é um especialista em licitações brasileiras da Kits Vital.\n\
           Analise este documento (Edital/Aviso) e extraia com precisão:\n\
           1. organ: Órgão/Prefeitura.\n\
           2. biddingNumber: Número do Pregão/Processo.\n\
           3. title: Objeto da compra.\n\
           4. date: Data/Hora ISO (YYYY-MM-DDTHH:mm).\n\
           5. notes: Exigências críticas (ANVISA/Amostras).",
        ),
      ])],
      system_instruction: None,
      tools: Vec::new(),
      generation_config: Some(GenerationConfig {
        response_mime_type: Some("application/json".to_string()),
        response_schema: Some(serde_json::json!({
          "type": "OBJECT",
          "properties": {
            "organ": { "type": "STRING" },
            "biddingNumber": { "type": "STRING" },
            "title": { "type": "STRING" },
            "date": { "type": "STRING" },
            "notes": { "type": "STRING" }
          },
          "required": ["organ", "biddingNumber", "title"]
        })),
      }),
    };

    let response = self.generate(&self.config.extract_model, &request).await?;
    let text = response
      .text()
      .ok_or_else(|| Error::Malformed("extraction returned no text".into()))?;
    Ok(serde_json::from_str(&text)?)
  }

  // ── Proposal drafting ─────────────────────────────────────────────────

  pub async fn draft_proposal(&self, bid: &Bid) -> Result<String> {
    let items = serde_json::to_string(&bid.items)?;
    let request = GenerateContentRequest {
      contents: vec![Content::user(vec![Part::text(format!(
        "Crie proposta comercial Kits Vital para {}. Itens: {items}.",
        bid.title
      ))])],
      system_instruction: None,
      tools: Vec::new(),
      generation_config: None,
    };

    let response = self.generate(&self.config.extract_model, &request).await?;
    response
      .text()
      .ok_or_else(|| Error::Malformed("proposal returned no text".into()))
  }

  // ── Chat ──────────────────────────────────────────────────────────────

  /// One chat round. Radar-style queries get the web-search tool; every
  /// other message gets the `update_bid_status` function.
  pub async fn chat(
    &self,
    message: &str,
    history: &[ChatTurn],
    attachment: Option<&ChatAttachment>,
  ) -> Result<ChatReply> {
    let mut contents: Vec<Content> = normalize_history(history)
      .into_iter()
      .map(|turn| Content {
        role:  Some(turn.role),
        parts: vec![Part::text(turn.text)],
      })
      .collect();

    let mut parts = vec![Part::text(message)];
    if let Some(file) = attachment {
      parts.push(Part::inline(&file.data, &file.mime_type));
    }
    contents.push(Content::user(parts));

    let tools = if is_radar_query(message) {
      vec![Tool::web_search()]
    } else {
      vec![Tool::functions(vec![status_function_declaration()])]
    };

    let request = GenerateContentRequest {
      contents,
      system_instruction: Some(Content::system(format!(
        "Você é Maya AI, inteligência operacional da Kits Vital.\n\
         Contexto Kits Vital: {COMPANY_CONTEXT}.\n\
         Sua função é gerir licitações e radar de oportunidades. \
         Seja direta e técnica."
      ))),
      tools,
      generation_config: None,
    };

    let response = self.generate(&self.config.chat_model, &request).await?;
    Ok(ChatReply {
      text:           response.text().unwrap_or_default(),
      function_calls: response.function_calls(),
      grounding:      response.grounding_chunks(),
    })
  }
}

/// The single declared function: move a bid to a new pipeline stage.
fn status_function_declaration() -> FunctionDeclaration {
  let labels: Vec<&str> = BidStatus::ALL.iter().map(|s| s.label()).collect();
  FunctionDeclaration {
    name:        UPDATE_BID_STATUS.to_string(),
    description: "Altera o status de uma licitação internamente no sistema Oráculo."
      .to_string(),
    parameters: serde_json::json!({
      "type": "OBJECT",
      "properties": {
        "bidId": { "type": "STRING", "description": "ID único da licitação" },
        "newStatus": {
          "type": "STRING",
          "enum": labels,
          "description": "Novo status para aplicar"
        }
      },
      "required": ["bidId", "newStatus"]
    }),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
