//! Listing drafts from voice memos
//!
//! A seller describes the item informally in a short recording; the drafter
//! turns it into a structured listing. [`GeminiDrafter`] sends the audio
//! inline to the Gemini `generateContent` endpoint and constrains the answer
//! with a JSON response schema.

use crate::models::Draft;
use async_trait::async_trait;
use base64::Engine;
use lista_common::config::DraftingSettings;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const USER_AGENT: &str = concat!("lista/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 120;

const PRICE_TYPES: &[&str] = &["NEGOTIABLE", "FIXED", "GIVE_AWAY"];
const SHIPPING_TYPES: &[&str] = &["SHIPPING", "PICKUP"];

/// Drafting errors
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Failed to read category list {path}: {source}")]
    Categories {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Turns a recorded description into a listing draft
#[async_trait]
pub trait ListingDrafter: Send + Sync {
    async fn draft(&self, audio: Vec<u8>, mime_type: &str) -> Result<Draft, DraftError>;
}

/// Structured answer requested from the model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingOutput {
    pub price_type: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub shipping: String,
}

impl ListingOutput {
    /// Validate enumerated fields and build the draft shown in the UI
    pub fn into_draft(self, description_suffix: &str) -> Result<Draft, DraftError> {
        let price_type = self.price_type.trim().to_uppercase();
        if !PRICE_TYPES.contains(&price_type.as_str()) {
            return Err(DraftError::ParseError(format!("Unknown price type: {}", self.price_type)));
        }
        let shipping_type = self.shipping.trim().to_uppercase();
        if !SHIPPING_TYPES.contains(&shipping_type.as_str()) {
            return Err(DraftError::ParseError(format!("Unknown shipping type: {}", self.shipping)));
        }

        let description = if description_suffix.is_empty() {
            self.description
        } else {
            format!("{}\n\n{}", self.description.trim_end(), description_suffix)
        };

        Ok(Draft {
            ad_type: "OFFER".to_string(),
            price_type,
            title: self.title,
            description,
            category: self.category,
            price: self.price,
            shipping_type,
            sell_directly: false,
        })
    }
}

/// JSON schema of [`ListingOutput`] in Gemini's OpenAPI subset
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "price_type": {"type": "STRING", "enum": PRICE_TYPES},
            "title": {"type": "STRING"},
            "description": {"type": "STRING"},
            "price": {"type": "INTEGER"},
            "category": {"type": "STRING"},
            "shipping": {"type": "STRING", "enum": SHIPPING_TYPES}
        },
        "required": ["price_type", "title", "description", "price", "category", "shipping"],
        "propertyOrdering": ["price_type", "title", "description", "price", "category", "shipping"]
    })
}

/// Instructions sent with every recording
pub fn system_prompt(categories: &str) -> String {
    format!(
        r#"You write classified ads for Kleinanzeigen.
The audio is a seller informally describing one product they want to sell.
Extract everything relevant and answer in the provided schema.

Title: descriptive, search friendly, with the key details of the product, at least 10 characters.

Description: every detail the seller mentioned, clear and well organized but concise.
Write in German, in first person, addressing the reader with "du". Keep the tone relaxed and friendly; emojis are welcome where they fit.

Price: whole euros. If the seller names no price, pick a fitting one and use price type FIXED.
Shipping: assume SHIPPING unless the seller says otherwise.

Category: pick the best fitting category ID from the list below. Each line is `name: id`; leading `>` marks nesting depth. For example
```
Elektronik: 161/168
  > Audio & Hifi: 161/172/sonstiges
  >  > CD Player: 161/172/cd_player
```
means the full category `Elektronik > Audio & Hifi > CD Player` has the ID `161/172/cd_player`. Answer with the ID only, never the display name.

<categories>
{categories}
</categories>
"#
    )
}

/// Gemini REST client
pub struct GeminiDrafter {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    description_suffix: String,
}

impl GeminiDrafter {
    /// Build a drafter; reads the category list once
    pub fn new(settings: &DraftingSettings) -> Result<Self, DraftError> {
        let categories = std::fs::read_to_string(&settings.categories_file).map_err(|source| {
            DraftError::Categories {
                path: settings.categories_file.display().to_string(),
                source,
            }
        })?;
        Self::with_categories(settings, &categories)
    }

    /// Build a drafter from an already loaded category list
    pub fn with_categories(settings: &DraftingSettings, categories: &str) -> Result<Self, DraftError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DraftError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            system_prompt: system_prompt(categories),
            description_suffix: settings.description_suffix.clone(),
        })
    }

    /// `generateContent` request body
    pub fn request_body(&self, audio: &[u8], mime_type: &str) -> Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        json!({
            "systemInstruction": {"parts": [{"text": self.system_prompt}]},
            "contents": [{
                "role": "user",
                "parts": [{"inlineData": {"mimeType": mime_type, "data": encoded}}]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        })
    }
}

/// Parse the structured answer from the first candidate's text parts
pub fn extract_output(response: &Value) -> Result<ListingOutput, DraftError> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| DraftError::ParseError("Response has no candidate content".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    serde_json::from_str(&text).map_err(|e| DraftError::ParseError(e.to_string()))
}

#[async_trait]
impl ListingDrafter for GeminiDrafter {
    async fn draft(&self, audio: Vec<u8>, mime_type: &str) -> Result<Draft, DraftError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        tracing::debug!(model = %self.model, bytes = audio.len(), "Requesting listing draft");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(&audio, mime_type))
            .send()
            .await
            .map_err(|e| DraftError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(DraftError::InvalidApiKey);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DraftError::ApiError(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DraftError::ParseError(e.to_string()))?;
        let draft = extract_output(&body)?.into_draft(&self.description_suffix)?;

        tracing::info!(
            title = %draft.title,
            category = %draft.category,
            price = draft.price,
            "Listing draft generated"
        );
        Ok(draft)
    }
}
