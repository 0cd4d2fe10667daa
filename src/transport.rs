use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{classify_upstream, is_auth_shaped, StudioError};
use crate::gemini::{GeminiClient, GeminiError};
use crate::models::{
    to_data_url, EditResponse, ModelImagesResponse, ProductCategory, RelayStatus, RenderResult,
    ScenariosResponse,
};
use crate::prompts;

/// One interface over both deployment modes: the in-process vendor client
/// (direct mode) and the HTTP relay (relay mode). Both expose identical
/// semantics; `generate_scenarios` always yields exactly 3 strings.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn ping(&self) -> Result<RelayStatus, StudioError>;

    async fn generate_scenarios(
        &self,
        asset_base64: &str,
        brief: &str,
        category: ProductCategory,
    ) -> Result<Vec<String>, StudioError>;

    async fn generate_model_images(
        &self,
        base64: &str,
        scenarios: &[String],
        category: ProductCategory,
    ) -> Result<Vec<RenderResult>, StudioError>;

    async fn edit_image(
        &self,
        original_base64: &str,
        edit_prompt: &str,
    ) -> Result<String, StudioError>;
}

fn reclassify(err: GeminiError) -> StudioError {
    match err {
        GeminiError::CredentialMissing => StudioError::CredentialMissing,
        other => classify_upstream(other.to_string()),
    }
}

/// Top up a recovered scenario list from the category defaults so exactly 3
/// reach the synthesizer, which depends on that bound.
fn fill_scenarios(mut scenarios: Vec<String>, category: ProductCategory) -> Vec<String> {
    scenarios.truncate(3);
    if scenarios.len() < 3 {
        warn!(
            category = %category,
            recovered = scenarios.len(),
            "🎬 scenario fallback engaged: topping up from category defaults"
        );
        for default in prompts::default_scenarios(category) {
            if scenarios.len() == 3 {
                break;
            }
            if !scenarios.iter().any(|s| s == default) {
                scenarios.push(default.to_string());
            }
        }
    }
    scenarios
}

// --- Direct mode ---

pub struct DirectTransport {
    gemini: GeminiClient,
}

impl DirectTransport {
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }

    fn require_backend(&self) -> Result<(), StudioError> {
        if self.gemini.dev_fallback() || self.gemini.has_credential() {
            Ok(())
        } else {
            Err(StudioError::CredentialMissing)
        }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn ping(&self) -> Result<RelayStatus, StudioError> {
        Ok(RelayStatus {
            ok: self.gemini.has_credential() || self.gemini.dev_fallback(),
            mode: if self.gemini.has_credential() { "server".into() } else { "dev".into() },
        })
    }

    async fn generate_scenarios(
        &self,
        asset_base64: &str,
        brief: &str,
        category: ProductCategory,
    ) -> Result<Vec<String>, StudioError> {
        self.require_backend()?;
        let recovered = match self.gemini.generate_scenarios(asset_base64, brief, category).await {
            Ok(list) => list,
            Err(e) => {
                let classified = reclassify(e);
                if classified == StudioError::CredentialMissing {
                    return Err(classified);
                }
                warn!(
                    category = %category,
                    cause = %classified,
                    "🎬 scenario fallback engaged: serving full default set"
                );
                Vec::new()
            }
        };
        Ok(fill_scenarios(recovered, category))
    }

    async fn generate_model_images(
        &self,
        base64: &str,
        scenarios: &[String],
        category: ProductCategory,
    ) -> Result<Vec<RenderResult>, StudioError> {
        self.require_backend()?;

        // All per-scenario renders (and their paired background plates) are
        // issued together; any subset may fail without aborting the rest.
        let tasks = scenarios
            .iter()
            .map(|scenario| self.gemini.synthesize_scenario(base64, scenario, category));
        let outcomes = join_all(tasks).await;

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (scenario, outcome) in scenarios.iter().zip(outcomes) {
            match outcome {
                Ok(render) => {
                    results.push(RenderResult {
                        url: to_data_url(&render.base64),
                        scenario: render.scenario,
                        base64: render.base64,
                        background_url: render.background_base64.as_deref().map(to_data_url),
                    });
                }
                Err(e) => {
                    let classified = reclassify(e);
                    error!("❌ Render failed for scenario '{}': {}", scenario, classified);
                    failures.push(classified);
                }
            }
        }

        info!("✅ Synthesis round complete: {}/{} scenarios rendered", results.len(), scenarios.len());
        if results.is_empty() && failures.contains(&StudioError::CredentialMissing) {
            return Err(StudioError::CredentialMissing);
        }
        Ok(results)
    }

    async fn edit_image(
        &self,
        original_base64: &str,
        edit_prompt: &str,
    ) -> Result<String, StudioError> {
        self.require_backend()?;
        match self.gemini.edit_image(original_base64, edit_prompt).await {
            Ok(base64) => Ok(to_data_url(&base64)),
            Err(GeminiError::CredentialMissing) => Err(StudioError::CredentialMissing),
            Err(e) => {
                let message = e.to_string();
                if is_auth_shaped(&message) {
                    Err(StudioError::CredentialMissing)
                } else {
                    Err(StudioError::Refinement(message))
                }
            }
        }
    }
}

// --- Relay mode ---

/// Client for a deployed relay endpoint: ships the `{action, payload}`
/// envelope and maps `{error, details}` bodies back into the taxonomy.
pub struct RelayTransport {
    http: Client,
    endpoint: String,
}

impl RelayTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { http: Client::new(), endpoint: endpoint.into() }
    }

    async fn call(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, StudioError> {
        let envelope = json!({"action": action, "payload": payload});
        let response = self
            .http
            .post(&self.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| StudioError::Upstream(format!("relay unreachable: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StudioError::Upstream(format!("relay response unreadable: {e}")))?;

        if !status.is_success() {
            let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
            let message = format!(
                "status={} {}: {}",
                status,
                body["error"].as_str().unwrap_or("relay call failed"),
                body["details"].as_str().unwrap_or(&text),
            );
            error!("❌ Relay '{}' failed: {}", action, message);
            return Err(match status.as_u16() {
                400 => StudioError::InvalidRequest(message),
                _ if is_auth_shaped(&message) || message.contains("credential") => {
                    StudioError::CredentialMissing
                }
                _ => StudioError::Upstream(message),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| StudioError::Upstream(format!("relay returned malformed JSON: {e}")))
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn ping(&self) -> Result<RelayStatus, StudioError> {
        let body = self.call("ping", json!({})).await?;
        serde_json::from_value(body)
            .map_err(|e| StudioError::Upstream(format!("malformed ping response: {e}")))
    }

    async fn generate_scenarios(
        &self,
        asset_base64: &str,
        brief: &str,
        category: ProductCategory,
    ) -> Result<Vec<String>, StudioError> {
        let body = self
            .call(
                "generateScenarios",
                json!({"assetBase64": asset_base64, "brief": brief, "category": category}),
            )
            .await?;
        let parsed: ScenariosResponse = serde_json::from_value(body)
            .map_err(|e| StudioError::Upstream(format!("malformed scenarios response: {e}")))?;
        Ok(fill_scenarios(parsed.scenarios, category))
    }

    async fn generate_model_images(
        &self,
        base64: &str,
        scenarios: &[String],
        category: ProductCategory,
    ) -> Result<Vec<RenderResult>, StudioError> {
        let body = self
            .call(
                "generateModelImages",
                json!({"base64": base64, "scenarios": scenarios, "category": category}),
            )
            .await?;
        let parsed: ModelImagesResponse = serde_json::from_value(body)
            .map_err(|e| StudioError::Upstream(format!("malformed results response: {e}")))?;
        Ok(parsed.results)
    }

    async fn edit_image(
        &self,
        original_base64: &str,
        edit_prompt: &str,
    ) -> Result<String, StudioError> {
        let body = self
            .call(
                "editImage",
                json!({"originalBase64": original_base64, "editPrompt": edit_prompt}),
            )
            .await?;
        let parsed: EditResponse = serde_json::from_value(body)
            .map_err(|e| StudioError::Upstream(format!("malformed edit response: {e}")))?;
        Ok(parsed.image)
    }
}
