use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::StudioConfig;
use crate::models::{strip_data_url, ProductCategory};
use crate::prompts;

/// Text/vision model used for scenario generation.
const SCENARIO_MODEL: &str = "gemini-3-flash-preview";
/// High-fidelity image model for renders, background plates and edits.
const RENDER_MODEL: &str = "gemini-3-pro-image-preview";
/// Faster model used for one retry when the primary render yields nothing.
const RENDER_FALLBACK_MODEL: &str = "gemini-2.5-flash-image-preview";

/// 1x1 transparent PNG served in dev-fallback mode.
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("no usable model-access credential")]
    CredentialMissing,
    #[error("Other: {0}")]
    Other(String),
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100
                            && s.chars().all(|c| c.is_alphanumeric() || c == '+' || c == '/' || c == '=')
                        {
                            *val = serde_json::Value::String(format!(
                                "{}...[truncated {} chars]",
                                &s[..50],
                                s.len() - 50
                            ));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn preview(data: &str) -> String {
    if data.len() > 50 {
        format!("{}...[{} chars total]", &data[..50], data.len())
    } else {
        data.to_string()
    }
}

/// One fully synthesized scenario: the integrated render plus an optional
/// companion background plate.
#[derive(Debug, Clone)]
pub struct ScenarioRender {
    pub scenario: String,
    pub base64: String,
    pub background_base64: Option<String>,
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    dev_fallback: bool,
}

impl GeminiClient {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.clone(),
            dev_fallback: config.dev_fallback,
        }
    }

    pub fn dev_fallback(&self) -> bool {
        self.dev_fallback
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn require_key(&self) -> Result<&str, GeminiError> {
        self.api_key.as_deref().ok_or(GeminiError::CredentialMissing)
    }

    async fn perform_api_call(
        &self,
        model: &str,
        request_body: serde_json::Value,
    ) -> Result<GeminiResponse, GeminiError> {
        let key = self.require_key()?;
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, model, key);

        info!("🔗 Making request to: {}", url.replace(key, "***"));
        let mut loggable = request_body.clone();
        truncate_base64_in_json(&mut loggable);
        info!("📤 Request body: {}", serde_json::to_string_pretty(&loggable).unwrap_or_default());

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", error_body);
            return Err(GeminiError::Http(format!("status={} body={}", status, error_body)));
        }

        let response_text =
            response.text().await.map_err(|e| GeminiError::Other(e.to_string()))?;

        if response_text.len() > 1000 {
            if let Ok(mut json_value) = serde_json::from_str::<serde_json::Value>(&response_text) {
                truncate_base64_in_json(&mut json_value);
                info!(
                    "📥 Raw API response: {}",
                    serde_json::to_string_pretty(&json_value)
                        .unwrap_or_else(|_| response_text[..1000].to_string() + "...")
                );
            }
        } else {
            info!("📥 Raw API response: {}", response_text);
        }

        serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}: {}", e, response_text)))
    }

    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
        inline_b64: &str,
        generation_config: serde_json::Value,
    ) -> Result<String, GeminiError> {
        let request_body = json!({
            "contents": [{
                "parts": [
                    {"inlineData": {"data": strip_data_url(inline_b64), "mimeType": "image/png"}},
                    {"text": prompt}
                ]
            }],
            "generationConfig": generation_config
        });

        let parsed = self.perform_api_call(model, request_body).await?;
        let image = extract_first_image_b64(&parsed);
        if let Some(ref image_data) = image {
            let image_type = if image_data.starts_with("iVBORw0KGgo") {
                "PNG"
            } else if image_data.starts_with("/9j/") {
                "JPEG"
            } else {
                "Unknown"
            };
            info!("🖼️ Extracted {} image from API response: {}", image_type, preview(image_data));
        }
        image.ok_or_else(|| GeminiError::Other("no image data in response".into()))
    }

    /// Scenario generation: persona + brief + product image in, raw scenario
    /// strings out. May return fewer than 3; the transport tops up from the
    /// category defaults.
    pub async fn generate_scenarios(
        &self,
        asset_base64: &str,
        brief: &str,
        category: ProductCategory,
    ) -> Result<Vec<String>, GeminiError> {
        if self.dev_fallback {
            info!("Using dev fallback mode - serving sample scenarios");
            return Ok(prompts::sample_scenarios(category));
        }

        let request_body = json!({
            "systemInstruction": {
                "parts": [{"text": prompts::scenario_system_instruction(category)}]
            },
            "contents": [{
                "parts": [
                    {"inlineData": {"data": strip_data_url(asset_base64), "mimeType": "image/png"}},
                    {"text": prompts::scenario_request(brief, category)}
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.2
            }
        });

        let parsed = self.perform_api_call(SCENARIO_MODEL, request_body).await?;
        let text = first_text(&parsed)
            .ok_or_else(|| GeminiError::Other("no text content in response".into()))?;
        let scenarios = recover_scenarios(&text);
        info!("🎬 Recovered {} scenario(s) from model output", scenarios.len());
        Ok(scenarios)
    }

    /// Renders one scenario. The integrated render gets one retry on the
    /// faster model with a strengthened anti-cropping directive; the
    /// background plate is requested concurrently and is never fatal.
    pub async fn synthesize_scenario(
        &self,
        product_base64: &str,
        scenario: &str,
        category: ProductCategory,
    ) -> Result<ScenarioRender, GeminiError> {
        if self.dev_fallback {
            info!("Using dev fallback mode - serving placeholder render for '{}'", scenario);
            return Ok(ScenarioRender {
                scenario: scenario.to_string(),
                base64: PLACEHOLDER_PNG.to_string(),
                background_base64: None,
            });
        }
        self.require_key()?;

        let (render, background) = tokio::join!(
            self.render_with_fallback(product_base64, scenario, category),
            self.background_plate(scenario, category, product_base64),
        );

        let base64 = render?;
        info!("✅ Scenario '{}' render generated: {}", scenario, preview(&base64));
        Ok(ScenarioRender { scenario: scenario.to_string(), base64, background_base64: background })
    }

    async fn render_with_fallback(
        &self,
        product_base64: &str,
        scenario: &str,
        category: ProductCategory,
    ) -> Result<String, GeminiError> {
        let primary_config = json!({
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": {"aspectRatio": "3:4", "imageSize": "4K"}
        });
        let prompt = prompts::render_prompt(scenario, category);
        match self.generate_image(RENDER_MODEL, &prompt, product_base64, primary_config).await {
            Ok(image) => Ok(image),
            Err(e) => {
                warn!("🔄 Primary render failed for '{}' ({}), retrying on {}", scenario, e, RENDER_FALLBACK_MODEL);
                let fallback_config = json!({
                    "responseModalities": ["TEXT", "IMAGE"],
                    "temperature": 0.4,
                    "topP": 0.95,
                    "topK": 64,
                    "candidateCount": 1
                });
                let prompt = prompts::render_fallback_prompt(scenario, category);
                self.generate_image(RENDER_FALLBACK_MODEL, &prompt, product_base64, fallback_config)
                    .await
            }
        }
    }

    async fn background_plate(
        &self,
        scenario: &str,
        category: ProductCategory,
        product_base64: &str,
    ) -> Option<String> {
        let config = json!({
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": {"aspectRatio": "3:4", "imageSize": "4K"}
        });
        let prompt = prompts::background_prompt(scenario, category);
        match self.generate_image(RENDER_MODEL, &prompt, product_base64, config).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("⚠️ Background plate failed for '{}' ({}), omitting", scenario, e);
                None
            }
        }
    }

    /// Single-shot refinement of an already-accepted render. No retries, no
    /// fallback model: a failure surfaces immediately.
    pub async fn edit_image(
        &self,
        original_base64: &str,
        edit_prompt: &str,
    ) -> Result<String, GeminiError> {
        if self.dev_fallback {
            info!("Using dev fallback mode - echoing original image");
            return Ok(strip_data_url(original_base64).to_string());
        }
        self.require_key()?;

        let config = json!({
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": {"aspectRatio": "3:4", "imageSize": "4K"}
        });
        let prompt = prompts::refinement_prompt(edit_prompt);
        self.generate_image(RENDER_MODEL, &prompt, original_base64, config).await
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

fn extract_first_image_b64(resp: &GeminiResponse) -> Option<String> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Inline { inline_data } = p {
                info!("🎯 Found image data with mime type: {}", inline_data.mime_type);
                return Some(inline_data.data.clone());
            }
        }
    }
    info!("⚠️ No inline image data found in response structure");
    None
}

fn first_text(resp: &GeminiResponse) -> Option<String> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            if let Part::Text { text } = p {
                return Some(text.trim().to_string());
            }
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct ScenarioDoc {
    #[serde(default)]
    scenarios: Vec<String>,
}

/// Best-effort recovery of scenario strings from model output: strict JSON
/// first, then the first `{...}` substring, then plain lines with
/// enumeration markers stripped. Empty strings never survive.
pub fn recover_scenarios(text: &str) -> Vec<String> {
    if let Ok(doc) = serde_json::from_str::<ScenarioDoc>(text) {
        let scenarios = clean(doc.scenarios);
        if !scenarios.is_empty() {
            return scenarios;
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(doc) = serde_json::from_str::<ScenarioDoc>(&text[start..=end]) {
                let scenarios = clean(doc.scenarios);
                if !scenarios.is_empty() {
                    return scenarios;
                }
            }
        }
    }

    clean(text.lines().map(strip_enumeration).map(str::to_string).collect())
        .into_iter()
        .take(3)
        .collect()
}

fn clean(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|s| s.trim().trim_matches('"').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_enumeration(line: &str) -> &str {
    let s = line.trim();
    let unnumbered = s.trim_start_matches(|c: char| c.is_ascii_digit());
    if unnumbered.len() != s.len() {
        unnumbered.trim_start_matches(['.', ')', ':']).trim_start()
    } else {
        s.trim_start_matches(['-', '*', '•']).trim_start()
    }
}
