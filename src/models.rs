use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// Which instruction templates drive scenario and render generation.
/// Chosen by the user before upload; immutable for the whole round.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Jewelry,
    Restaurant,
    Fashion,
}

impl ProductCategory {
    pub fn all() -> [ProductCategory; 3] {
        [ProductCategory::Jewelry, ProductCategory::Restaurant, ProductCategory::Fashion]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Jewelry => "JEWELRY",
            ProductCategory::Restaurant => "RESTAURANT",
            ProductCategory::Fashion => "FASHION",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One synthesized render as it crosses the relay wire. Carries no id:
/// identity is assigned when a result is adopted into a session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RenderResult {
    pub url: String,
    pub scenario: String,
    pub base64: String,
    #[serde(rename = "backgroundUrl", skip_serializing_if = "Option::is_none")]
    pub background_url: Option<String>,
}

/// A render owned by the current session. `id` and `scenario` never change
/// after creation; an edit replaces only `url`/`base64`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub scenario: String,
    pub base64: String,
    pub background_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    pub fn adopt(result: RenderResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: result.url,
            scenario: result.scenario,
            base64: result.base64,
            background_url: result.background_url,
            created_at: Utc::now(),
        }
    }
}

// --- Relay envelope payloads (camelCase on the wire) ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScenariosPayload {
    #[serde(rename = "assetBase64")]
    pub asset_base64: String,
    #[serde(default)]
    pub brief: String,
    pub category: ProductCategory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelImagesPayload {
    pub base64: String,
    pub scenarios: Vec<String>,
    pub category: ProductCategory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EditPayload {
    #[serde(rename = "originalBase64")]
    pub original_base64: String,
    #[serde(rename = "editPrompt")]
    pub edit_prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScenariosResponse {
    pub scenarios: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelImagesResponse {
    pub results: Vec<RenderResult>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EditResponse {
    pub image: String,
}

/// `ping` result: lets a client detect whether the relay holds a credential
/// without the cost of a model call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RelayStatus {
    pub ok: bool,
    pub mode: String,
}

// --- Image payload encoding helpers ---

/// Strip a `data:image/...;base64,` prefix if present. Inline assets sent
/// to a generation call must be the bare base64 payload.
pub fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:image/") {
        if let Some(idx) = payload.find(";base64,") {
            return &payload[idx + ";base64,".len()..];
        }
    }
    payload
}

pub fn to_data_url(base64: &str) -> String {
    format!("data:image/png;base64,{base64}")
}

/// Cheap guard before spending a vendor call on an undecodable payload.
pub fn validate_image_payload(payload: &str) -> Result<(), StudioError> {
    let bare = strip_data_url(payload);
    base64::engine::general_purpose::STANDARD
        .decode(bare)
        .map(|_| ())
        .map_err(|e| StudioError::InvalidRequest(format!("image payload is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_wire_names_are_screaming_case() {
        for category in ProductCategory::all() {
            let wire = serde_json::to_string(&category).unwrap();
            assert_eq!(wire, format!("\"{}\"", category.label()));
        }
    }

    #[test]
    fn data_url_round_trip_preserves_payload() {
        let b64 = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";
        assert_eq!(strip_data_url(&to_data_url(b64)), b64);
        // Already-bare payloads pass through untouched.
        assert_eq!(strip_data_url(b64), b64);
        assert_eq!(strip_data_url("data:image/jpeg;base64,abcd"), "abcd");
    }

    #[test]
    fn payload_validation_rejects_garbage() {
        assert!(validate_image_payload("data:image/png;base64,aGVsbG8=").is_ok());
        assert!(validate_image_payload("not base64 at all!!").is_err());
    }

    #[test]
    fn adoption_assigns_identity_and_keeps_provenance() {
        let result = RenderResult {
            url: "data:image/png;base64,QQ==".into(),
            scenario: "Minimalist Architectural Studio".into(),
            base64: "QQ==".into(),
            background_url: None,
        };
        let a = GeneratedImage::adopt(result.clone());
        let b = GeneratedImage::adopt(result.clone());
        assert_eq!(a.scenario, result.scenario);
        assert_eq!(a.base64, result.base64);
        assert!(a.id != b.id);
    }
}
