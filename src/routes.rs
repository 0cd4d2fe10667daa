use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::StudioError;
use crate::models::{
    validate_image_payload, EditPayload, EditResponse, ModelImagesPayload, ModelImagesResponse,
    ScenariosPayload, ScenariosResponse,
};
use crate::transport::Transport;

#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<dyn Transport>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/genai", post(relay))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Single stateless relay route: `{action, payload}` in, result fields or
/// `{error, details}` out. The credential never leaves this process.
#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    action: String,
    #[serde(default)]
    payload: serde_json::Value,
}

pub async fn relay(
    State(state): State<AppState>,
    body: Result<Json<RelayEnvelope>, JsonRejection>,
) -> Response {
    let Json(envelope) = match body {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!("⚠️ Rejected unparsable relay body: {}", rejection);
            return StudioError::InvalidRequest(format!("invalid JSON body: {rejection}"))
                .into_response();
        }
    };

    tracing::info!("📨 Relay action: {}", envelope.action);
    match dispatch(&state, envelope).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("❌ Relay action failed: {}", e);
            e.into_response()
        }
    }
}

async fn dispatch(state: &AppState, envelope: RelayEnvelope) -> Result<Response, StudioError> {
    match envelope.action.as_str() {
        "ping" => {
            let status = state.transport.ping().await?;
            Ok(Json(status).into_response())
        }
        "generateScenarios" => {
            let payload: ScenariosPayload = parse_payload(envelope.payload)?;
            validate_image_payload(&payload.asset_base64)?;
            let scenarios = state
                .transport
                .generate_scenarios(&payload.asset_base64, &payload.brief, payload.category)
                .await?;
            Ok(Json(ScenariosResponse { scenarios }).into_response())
        }
        "generateModelImages" => {
            let payload: ModelImagesPayload = parse_payload(envelope.payload)?;
            validate_image_payload(&payload.base64)?;
            let results = state
                .transport
                .generate_model_images(&payload.base64, &payload.scenarios, payload.category)
                .await?;
            Ok(Json(ModelImagesResponse { results }).into_response())
        }
        "editImage" => {
            let payload: EditPayload = parse_payload(envelope.payload)?;
            validate_image_payload(&payload.original_base64)?;
            let image = state
                .transport
                .edit_image(&payload.original_base64, &payload.edit_prompt)
                .await?;
            Ok(Json(EditResponse { image }).into_response())
        }
        other => Err(StudioError::InvalidRequest(format!("unknown action: {other}"))),
    }
}

fn parse_payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, StudioError> {
    serde_json::from_value(value)
        .map_err(|e| StudioError::InvalidRequest(format!("malformed payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioConfig;
    use crate::gemini::GeminiClient;
    use crate::transport::DirectTransport;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn app(dev_fallback: bool) -> Router {
        let config = StudioConfig {
            api_key: None,
            api_base: "http://127.0.0.1:0".into(),
            port: 0,
            dev_fallback,
        };
        let transport = Arc::new(DirectTransport::new(GeminiClient::new(&config)));
        router(AppState { transport })
    }

    async fn send(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/genai")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn ping_reports_dev_mode_without_a_model_call() {
        let (status, body) = send(app(true), r#"{"action":"ping"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], serde_json::json!(true));
        assert_eq!(body["mode"], serde_json::json!("dev"));
    }

    #[tokio::test]
    async fn unknown_action_is_a_bad_request() {
        let (status, body) = send(app(true), r#"{"action":"frobnicate","payload":{}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("unknown action"));
    }

    #[tokio::test]
    async fn unparsable_body_is_reported_not_crashed() {
        let (status, body) = send(app(true), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], serde_json::json!("Invalid request"));
    }

    #[tokio::test]
    async fn scenario_action_returns_exactly_three() {
        let request = r#"{"action":"generateScenarios","payload":{"assetBase64":"QQ==","brief":"","category":"JEWELRY"}}"#;
        let (status, body) = send(app(true), request).await;
        assert_eq!(status, StatusCode::OK);
        let scenarios = body["scenarios"].as_array().unwrap();
        assert_eq!(scenarios.len(), 3);
        assert!(scenarios.iter().all(|s| !s.as_str().unwrap().is_empty()));
    }

    #[tokio::test]
    async fn render_action_matches_results_to_scenarios() {
        let request = r#"{"action":"generateModelImages","payload":{"base64":"QQ==","scenarios":["A","B","C"],"category":"FASHION"}}"#;
        let (status, body) = send(app(true), request).await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        for (result, scenario) in results.iter().zip(["A", "B", "C"]) {
            assert_eq!(result["scenario"], serde_json::json!(scenario));
            assert!(result["url"].as_str().unwrap().starts_with("data:image/png;base64,"));
        }
    }

    #[tokio::test]
    async fn edit_action_returns_a_data_url() {
        let request = r#"{"action":"editImage","payload":{"originalBase64":"data:image/png;base64,QQ==","editPrompt":"add sparkle"}}"#;
        let (status, body) = send(app(true), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["image"], serde_json::json!("data:image/png;base64,QQ=="));
    }

    #[tokio::test]
    async fn undecodable_image_payload_is_rejected_before_the_vendor_call() {
        let request = r#"{"action":"editImage","payload":{"originalBase64":"!!!","editPrompt":"x"}}"#;
        let (status, _) = send(app(true), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_credential_surfaces_as_server_error() {
        let request = r#"{"action":"generateScenarios","payload":{"assetBase64":"QQ==","brief":"","category":"JEWELRY"}}"#;
        let (status, body) = send(app(false), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], serde_json::json!("Model credential missing"));

        let (status, body) = send(app(false), r#"{"action":"ping"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], serde_json::json!(false));
    }
}
