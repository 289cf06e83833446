//! Evidence fusion through a generative completion service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::llm::{LlmError, DEFAULT_FUSION_PROMPT};
use crate::models::{EvidenceError, EvidenceItem};

/// Prefix of the narrative returned when the completion service fails.
pub const FUSION_ERROR_PREFIX: &str = "Erreur pendant l'analyse fusionnée";

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
}

/// One role-tagged turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A service that turns a conversation into one completion.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, model: &str, turns: &[ChatTurn]) -> Result<String, LlmError>;
}

/// Result of fusing the evidence.
#[derive(Debug, Clone)]
pub struct Fusion {
    /// Narrative from the service, or the error sentinel.
    pub narrative: String,
    pub error: Option<EvidenceError>,
}

/// Builds the fusion conversation and submits it once.
pub struct FusionOrchestrator {
    service: Arc<dyn CompletionService>,
    model: String,
    system_prompt: String,
}

impl FusionOrchestrator {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            system_prompt: DEFAULT_FUSION_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// System instruction followed by one user turn per item with usable text.
    pub fn conversation(&self, evidence: &[EvidenceItem]) -> Vec<ChatTurn> {
        std::iter::once(ChatTurn::system(&self.system_prompt))
            .chain(
                evidence
                    .iter()
                    .filter(|item| item.has_usable_text())
                    .map(|item| ChatTurn::user(&item.text)),
            )
            .collect()
    }

    /// Fuse the evidence. Never fails: service errors become the sentinel.
    pub async fn fuse(&self, evidence: &[EvidenceItem]) -> Fusion {
        let turns = self.conversation(evidence);
        info!(
            "Fusing {} evidence turns with {}",
            turns.len() - 1,
            self.model
        );

        match self.service.complete(&self.model, &turns).await {
            Ok(narrative) => Fusion {
                narrative,
                error: None,
            },
            Err(e) => {
                warn!("Fusion failed: {}", e);
                Fusion {
                    narrative: format!("{} : {}", FUSION_ERROR_PREFIX, e),
                    error: Some(EvidenceError::CompletionServiceFailure(e.to_string())),
                }
            }
        }
    }
}
