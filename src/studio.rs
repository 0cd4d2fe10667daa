use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::error::StudioError;
use crate::models::{strip_data_url, GeneratedImage, ProductCategory};
use crate::prompts;
use crate::session::{reduce, SessionEvent, StudioPhase, StudioSession};
use crate::transport::Transport;

/// Drives one studio session against a transport. Sole mutator of the
/// session snapshot; every network call happens with the lock released.
pub struct StudioController {
    transport: Arc<dyn Transport>,
    session: RwLock<StudioSession>,
}

impl StudioController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, session: RwLock::new(StudioSession::new()) }
    }

    pub fn snapshot(&self) -> StudioSession {
        self.session.read().clone()
    }

    fn apply(&self, event: SessionEvent) -> StudioSession {
        let mut guard = self.session.write();
        let next = reduce(guard.clone(), event);
        *guard = next.clone();
        next
    }

    /// Startup credential probe. An unreachable relay is "not yet
    /// determined" and the session proceeds optimistically; the later call
    /// will fail and reclassify if the credential truly is absent.
    pub async fn check_access(&self) -> StudioSession {
        match self.transport.ping().await {
            Ok(status) if !status.ok => self.apply(SessionEvent::CredentialRequired),
            Ok(status) => {
                info!("🔑 Studio access confirmed (mode: {})", status.mode);
                self.apply(SessionEvent::CredentialReady)
            }
            Err(e) => {
                warn!("⚠️ Access probe inconclusive ({}), proceeding optimistically", e);
                self.apply(SessionEvent::CredentialReady)
            }
        }
    }

    pub fn upload_asset(&self, data_url: String) -> StudioSession {
        self.apply(SessionEvent::AssetUploaded(data_url))
    }

    pub fn clear_asset(&self) -> StudioSession {
        self.apply(SessionEvent::AssetCleared)
    }

    pub fn set_category(&self, category: ProductCategory) -> StudioSession {
        self.apply(SessionEvent::CategorySelected(category))
    }

    pub fn set_brief(&self, brief: String) -> StudioSession {
        self.apply(SessionEvent::BriefChanged(brief))
    }

    pub fn start_edit(&self, id: &str) -> StudioSession {
        self.apply(SessionEvent::EditStarted(id.to_string()))
    }

    pub fn cancel_edit(&self) -> StudioSession {
        self.apply(SessionEvent::EditCancelled)
    }

    /// "Initialize Synthesis": scenario generation, then the concurrent
    /// render fan-out, then one exit event back out of `Generating`.
    pub async fn initialize_synthesis(&self) -> StudioSession {
        let started = self.apply(SessionEvent::SynthesisStarted);
        if started.phase != StudioPhase::Generating {
            return started;
        }
        let Some(asset) = started.source_asset.clone() else {
            // Unreachable per the reducer's guard, but Generating must
            // always be exited.
            return self.apply(SessionEvent::SynthesisFailed(StudioError::InvalidRequest(
                "no source asset".into(),
            )));
        };
        let category = started.category;

        info!("🚀 Initializing synthesis round (category: {})", category);
        let scenarios = match self
            .transport
            .generate_scenarios(&asset, &started.brief, category)
            .await
        {
            Ok(scenarios) => scenarios,
            Err(StudioError::CredentialMissing) => {
                return self.apply(SessionEvent::SynthesisFailed(StudioError::CredentialMissing));
            }
            Err(e) => {
                warn!(category = %category, cause = %e, "🎬 scenario fallback engaged: serving full default set");
                prompts::default_scenarios(category).iter().map(|s| s.to_string()).collect()
            }
        };

        let results = match self
            .transport
            .generate_model_images(&asset, &scenarios, category)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                error!("❌ Synthesis round failed: {}", e);
                return self.apply(SessionEvent::SynthesisFailed(e));
            }
        };

        if results.is_empty() {
            return self.apply(SessionEvent::SynthesisFailed(StudioError::EmptyResult));
        }
        let images: Vec<GeneratedImage> = results.into_iter().map(GeneratedImage::adopt).collect();
        info!("✅ Synthesis round produced {} render(s)", images.len());
        self.apply(SessionEvent::SynthesisFinished(images))
    }

    /// "Refine": single edit call against the captured target. No retries,
    /// no fallback; failures surface immediately.
    pub async fn submit_edit(&self, instruction: &str) -> StudioSession {
        if instruction.trim().is_empty() {
            return self.snapshot();
        }
        let target = self.session.read().editing_target().cloned();
        let Some(target) = target else {
            return self.snapshot();
        };
        let submitted = self.apply(SessionEvent::EditSubmitted);
        if submitted.phase != StudioPhase::Generating {
            return submitted;
        }

        info!("🎨 Refining render {} ('{}')", target.id, target.scenario);
        match self.transport.edit_image(&target.url, instruction).await {
            Ok(url) => {
                let base64 = strip_data_url(&url).to_string();
                self.apply(SessionEvent::EditFinished { id: target.id, url, base64 })
            }
            Err(e) => {
                error!("❌ Refinement failed for {}: {}", target.id, e);
                self.apply(SessionEvent::EditFailed(e))
            }
        }
    }
}
