use serde::{Deserialize, Serialize};

use crate::error::StudioError;
use crate::models::{GeneratedImage, ProductCategory};

/// Messages cycled on a fixed timer while a round is in flight, purely for
/// perceived-progress feedback.
pub const LOADING_MESSAGES: [&str; 4] = [
    "Analyzing surface geometry...",
    "Calculating specular maps...",
    "Synthesizing environment...",
    "Applying ray-traced lighting...",
];

pub fn loading_message(tick: usize) -> &'static str {
    LOADING_MESSAGES[tick % LOADING_MESSAGES.len()]
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StudioPhase {
    /// No usable credential; pre-empts everything until one is supplied.
    CredentialRequired,
    /// No asset selected.
    Idle,
    /// Asset selected; awaiting a brief or showing results.
    Viewing,
    /// Initial synthesis or an edit in flight; interaction disabled.
    Generating,
    /// One render targeted for refinement.
    Editing,
}

/// Immutable snapshot of one browser-tab session. Every transition goes
/// through `reduce`; nothing mutates a snapshot in place.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudioSession {
    pub phase: StudioPhase,
    pub category: ProductCategory,
    pub source_asset: Option<String>,
    pub brief: String,
    pub renders: Vec<GeneratedImage>,
    pub editing: Option<String>,
    pub error: Option<String>,
}

impl StudioSession {
    pub fn new() -> Self {
        Self {
            phase: StudioPhase::Idle,
            category: ProductCategory::Jewelry,
            source_asset: None,
            brief: String::new(),
            renders: Vec::new(),
            editing: None,
            error: None,
        }
    }

    pub fn editing_target(&self) -> Option<&GeneratedImage> {
        let id = self.editing.as_deref()?;
        self.renders.iter().find(|img| img.id == id)
    }
}

impl Default for StudioSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CredentialRequired,
    CredentialReady,
    AssetUploaded(String),
    AssetCleared,
    CategorySelected(ProductCategory),
    BriefChanged(String),
    SynthesisStarted,
    SynthesisFinished(Vec<GeneratedImage>),
    SynthesisFailed(StudioError),
    EditStarted(String),
    EditCancelled,
    EditSubmitted,
    EditFinished { id: String, url: String, base64: String },
    EditFailed(StudioError),
}

/// Pure transition function. Illegal transitions return the snapshot
/// unchanged; every entry into `Generating` has exactly one exit event.
pub fn reduce(session: StudioSession, event: SessionEvent) -> StudioSession {
    use StudioPhase::*;

    match event {
        SessionEvent::CredentialRequired => {
            StudioSession { phase: CredentialRequired, editing: None, ..session }
        }
        SessionEvent::CredentialReady => match session.phase {
            CredentialRequired => StudioSession {
                phase: if session.source_asset.is_some() { Viewing } else { Idle },
                error: None,
                ..session
            },
            _ => session,
        },
        SessionEvent::AssetUploaded(asset) => match session.phase {
            Generating | CredentialRequired => session,
            _ => StudioSession {
                phase: Viewing,
                source_asset: Some(asset),
                renders: Vec::new(),
                editing: None,
                error: None,
                ..session
            },
        },
        SessionEvent::AssetCleared => match session.phase {
            Viewing => StudioSession {
                phase: Idle,
                source_asset: None,
                renders: Vec::new(),
                editing: None,
                error: None,
                ..session
            },
            _ => session,
        },
        SessionEvent::CategorySelected(category) => match session.phase {
            Generating | CredentialRequired => session,
            _ => StudioSession { category, ..session },
        },
        SessionEvent::BriefChanged(brief) => match session.phase {
            Generating | CredentialRequired => session,
            _ => StudioSession { brief, ..session },
        },
        SessionEvent::SynthesisStarted => match session.phase {
            Viewing if session.source_asset.is_some() => {
                StudioSession { phase: Generating, error: None, ..session }
            }
            _ => session,
        },
        SessionEvent::SynthesisFinished(renders) => match session.phase {
            Generating if session.editing.is_none() => {
                StudioSession { phase: Viewing, renders, ..session }
            }
            _ => session,
        },
        SessionEvent::SynthesisFailed(err) => match session.phase {
            Generating if session.editing.is_none() => fail(session, err),
            _ => session,
        },
        SessionEvent::EditStarted(id) => match session.phase {
            Viewing if session.renders.iter().any(|img| img.id == id) => {
                StudioSession { phase: Editing, editing: Some(id), error: None, ..session }
            }
            _ => session,
        },
        SessionEvent::EditCancelled => match session.phase {
            Editing => StudioSession { phase: Viewing, editing: None, ..session },
            _ => session,
        },
        SessionEvent::EditSubmitted => match session.phase {
            Editing => StudioSession { phase: Generating, ..session },
            _ => session,
        },
        SessionEvent::EditFinished { id, url, base64 } => match session.phase {
            Generating if session.editing.as_deref() == Some(id.as_str()) => {
                let renders = session
                    .renders
                    .iter()
                    .cloned()
                    .map(|mut img| {
                        if img.id == id {
                            img.url = url.clone();
                            img.base64 = base64.clone();
                        }
                        img
                    })
                    .collect();
                StudioSession { phase: Viewing, renders, editing: None, ..session }
            }
            _ => session,
        },
        SessionEvent::EditFailed(err) => match session.phase {
            Generating if session.editing.is_some() => {
                let session = StudioSession { editing: None, ..session };
                fail(session, err)
            }
            _ => session,
        },
    }
}

fn fail(session: StudioSession, err: StudioError) -> StudioSession {
    match err {
        StudioError::CredentialMissing => {
            StudioSession { phase: StudioPhase::CredentialRequired, ..session }
        }
        other => StudioSession {
            phase: StudioPhase::Viewing,
            error: Some(other.user_message().to_string()),
            ..session
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RenderResult;
    use pretty_assertions::assert_eq;

    fn render(id: &str, scenario: &str, base64: &str) -> GeneratedImage {
        let mut img = GeneratedImage::adopt(RenderResult {
            url: format!("data:image/png;base64,{base64}"),
            scenario: scenario.into(),
            base64: base64.into(),
            background_url: None,
        });
        img.id = id.into();
        img
    }

    fn viewing_with_renders() -> StudioSession {
        let session = reduce(StudioSession::new(), SessionEvent::AssetUploaded("data:asset".into()));
        let session = reduce(session, SessionEvent::SynthesisStarted);
        reduce(
            session,
            SessionEvent::SynthesisFinished(vec![render("x", "S", "AAAA"), render("y", "T", "BBBB")]),
        )
    }

    #[test]
    fn upload_moves_to_viewing_and_discards_results() {
        let session = viewing_with_renders();
        assert_eq!(session.phase, StudioPhase::Viewing);
        assert_eq!(session.renders.len(), 2);

        let session = reduce(session, SessionEvent::AssetUploaded("data:other".into()));
        assert_eq!(session.phase, StudioPhase::Viewing);
        assert_eq!(session.renders.len(), 0);
        assert_eq!(session.source_asset.as_deref(), Some("data:other"));
    }

    #[test]
    fn synthesis_requires_an_asset() {
        let idle = StudioSession::new();
        let unchanged = reduce(idle.clone(), SessionEvent::SynthesisStarted);
        assert_eq!(unchanged, idle);
    }

    #[test]
    fn empty_result_failure_returns_to_viewing_not_credential_gate() {
        let session = reduce(StudioSession::new(), SessionEvent::AssetUploaded("data:asset".into()));
        let session = reduce(session, SessionEvent::SynthesisStarted);
        assert_eq!(session.phase, StudioPhase::Generating);

        let session = reduce(session, SessionEvent::SynthesisFailed(StudioError::EmptyResult));
        assert_eq!(session.phase, StudioPhase::Viewing);
        assert!(session.error.as_deref().unwrap().contains("no results"));
    }

    #[test]
    fn credential_failure_preempts_to_the_gate() {
        let session = reduce(StudioSession::new(), SessionEvent::AssetUploaded("data:asset".into()));
        let session = reduce(session, SessionEvent::SynthesisStarted);
        let session = reduce(session, SessionEvent::SynthesisFailed(StudioError::CredentialMissing));
        assert_eq!(session.phase, StudioPhase::CredentialRequired);

        // Re-auth resumes where the asset left off.
        let session = reduce(session, SessionEvent::CredentialReady);
        assert_eq!(session.phase, StudioPhase::Viewing);
    }

    #[test]
    fn edit_preserves_identity_and_scenario() {
        let session = viewing_with_renders();
        let session = reduce(session, SessionEvent::EditStarted("x".into()));
        assert_eq!(session.phase, StudioPhase::Editing);
        assert_eq!(session.editing_target().unwrap().scenario, "S");

        let session = reduce(session, SessionEvent::EditSubmitted);
        assert_eq!(session.phase, StudioPhase::Generating);

        let session = reduce(
            session,
            SessionEvent::EditFinished {
                id: "x".into(),
                url: "data:image/png;base64,CCCC".into(),
                base64: "CCCC".into(),
            },
        );
        assert_eq!(session.phase, StudioPhase::Viewing);
        let edited: Vec<_> = session.renders.iter().filter(|img| img.id == "x").collect();
        assert_eq!(edited.len(), 1);
        assert_eq!(edited[0].scenario, "S");
        assert_eq!(edited[0].base64, "CCCC");
        // The untouched render is untouched.
        assert_eq!(session.renders[1].base64, "BBBB");
    }

    #[test]
    fn cancel_edit_returns_to_viewing() {
        let session = viewing_with_renders();
        let session = reduce(session, SessionEvent::EditStarted("y".into()));
        let session = reduce(session, SessionEvent::EditCancelled);
        assert_eq!(session.phase, StudioPhase::Viewing);
        assert_eq!(session.editing, None);
    }

    #[test]
    fn edit_failure_discards_target_and_attaches_message() {
        let session = viewing_with_renders();
        let session = reduce(session, SessionEvent::EditStarted("x".into()));
        let session = reduce(session, SessionEvent::EditSubmitted);
        let session =
            reduce(session, SessionEvent::EditFailed(StudioError::Refinement("no image".into())));
        assert_eq!(session.phase, StudioPhase::Viewing);
        assert_eq!(session.editing, None);
        assert!(session.error.is_some());
        // Original pixels untouched on failure.
        assert_eq!(session.renders[0].base64, "AAAA");
    }

    #[test]
    fn editing_a_foreign_id_is_ignored() {
        let session = viewing_with_renders();
        let unchanged = reduce(session.clone(), SessionEvent::EditStarted("nope".into()));
        assert_eq!(unchanged, session);
    }

    #[test]
    fn interaction_is_disabled_while_generating() {
        let session = reduce(StudioSession::new(), SessionEvent::AssetUploaded("data:asset".into()));
        let generating = reduce(session, SessionEvent::SynthesisStarted);
        for event in [
            SessionEvent::AssetUploaded("data:second".into()),
            SessionEvent::SynthesisStarted,
            SessionEvent::EditStarted("x".into()),
            SessionEvent::BriefChanged("new brief".into()),
            SessionEvent::CategorySelected(ProductCategory::Fashion),
        ] {
            assert_eq!(reduce(generating.clone(), event), generating);
        }
    }

    #[test]
    fn loading_messages_cycle() {
        assert_eq!(loading_message(0), LOADING_MESSAGES[0]);
        assert_eq!(loading_message(5), LOADING_MESSAGES[1]);
    }
}
