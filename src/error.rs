use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified failure taxonomy. Transport-level exceptions are reclassified
/// into one of these at the orchestrator boundary before reaching callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StudioError {
    #[error("no usable model-access credential")]
    CredentialMissing,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("upstream model call failed: {0}")]
    Upstream(String),
    #[error("synthesis produced no usable images")]
    EmptyResult,
    #[error("refinement failed: {0}")]
    Refinement(String),
}

/// Wire shape for relay error responses.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StudioError {
    pub fn status(&self) -> StatusCode {
        match self {
            StudioError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StudioError::CredentialMissing => StatusCode::INTERNAL_SERVER_ERROR,
            StudioError::Upstream(_) | StudioError::EmptyResult | StudioError::Refinement(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Human-readable text for end users. Raw vendor messages stay in the
    /// error value and the logs only.
    pub fn user_message(&self) -> &'static str {
        match self {
            StudioError::CredentialMissing => {
                "Secure studio access is not configured. Connect an authorized API key to continue."
            }
            StudioError::InvalidRequest(_) => {
                "The studio sent a malformed request. Please reload and try again."
            }
            StudioError::Upstream(_) => {
                "Studio pipeline error. Please check your connection and try again."
            }
            StudioError::EmptyResult => {
                "The render pipeline returned no results. This can indicate a credential or content-policy issue with the source asset."
            }
            StudioError::Refinement(_) => {
                "The refinement cycle failed. The original render was left untouched."
            }
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            StudioError::InvalidRequest(details) => ErrorBody {
                error: "Invalid request".into(),
                details: Some(details.clone()),
            },
            StudioError::CredentialMissing => ErrorBody {
                error: "Model credential missing".into(),
                details: None,
            },
            StudioError::Upstream(details) => ErrorBody {
                error: "Upstream generation failed".into(),
                details: Some(details.clone()),
            },
            StudioError::EmptyResult => ErrorBody {
                error: "Synthesis produced no usable images".into(),
                details: None,
            },
            StudioError::Refinement(details) => ErrorBody {
                error: "Neural refinement failed".into(),
                details: Some(details.clone()),
            },
        }
    }
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Authorization-shaped vendor messages mean the credential is the problem,
/// not the request.
pub fn is_auth_shaped(message: &str) -> bool {
    const MARKERS: [&str; 7] = [
        "API key",
        "API_KEY",
        "entity was not found",
        "PERMISSION_DENIED",
        "UNAUTHENTICATED",
        "status=401",
        "status=403",
    ];
    MARKERS.iter().any(|marker| message.contains(marker))
}

/// Reclassify a raw vendor failure message into the taxonomy.
pub fn classify_upstream(message: String) -> StudioError {
    if is_auth_shaped(&message) {
        StudioError::CredentialMissing
    } else {
        StudioError::Upstream(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn auth_shaped_failures_reclassify_to_credential_missing() {
        assert_eq!(
            classify_upstream("Requested entity was not found.".into()),
            StudioError::CredentialMissing
        );
        assert_eq!(
            classify_upstream("API key not valid. Please pass a valid API key.".into()),
            StudioError::CredentialMissing
        );
        assert_eq!(
            classify_upstream("status=403 body={\"error\":{\"status\":\"PERMISSION_DENIED\"}}".into()),
            StudioError::CredentialMissing
        );
    }

    #[test]
    fn other_failures_stay_upstream() {
        let err = classify_upstream("status=500 body=internal".into());
        assert_eq!(err, StudioError::Upstream("status=500 body=internal".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn status_mapping_follows_relay_contract() {
        assert_eq!(StudioError::InvalidRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(StudioError::CredentialMissing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(StudioError::EmptyResult.status(), StatusCode::BAD_GATEWAY);
    }
}
