use tracing::warn;

/// Minimum length for a credential to be considered plausible. Anything
/// shorter is treated the same as no credential at all.
const MIN_KEY_LEN: usize = 8;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub port: u16,
    /// Serve placeholder results instead of failing when no credential is
    /// configured. Off unless STUDIO_DEV_FALLBACK is set.
    pub dev_fallback: bool,
}

impl StudioConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .and_then(plausible_key);
        let api_base =
            std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let port = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
        let dev_fallback = std::env::var("STUDIO_DEV_FALLBACK")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        if api_key.is_none() && !dev_fallback {
            warn!("⚠️ No usable GEMINI_API_KEY/API_KEY found; model calls will report a missing credential");
        }

        Self { api_key, api_base, port, dev_fallback }
    }

    /// Read-only probe: is there a credential this process could use?
    pub fn has_usable_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

fn plausible_key(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() >= MIN_KEY_LEN {
        Some(trimmed.to_string())
    } else {
        None
    }
}
