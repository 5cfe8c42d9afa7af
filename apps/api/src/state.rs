use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::hub::ExtensionHub;
use crate::interview::prompt_config::InterviewerPrompt;
use crate::interview::store::SessionStore;
use crate::llm_client::ChatModel;
use crate::report::rubric::RubricScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Interviewer prompt config, loaded once at startup.
    pub prompt: Arc<InterviewerPrompt>,
    /// Model backend for model-mode sessions. Default: OpenRouter `LlmClient`.
    pub llm: Arc<dyn ChatModel>,
    /// Pluggable rubric scorer. Default: HeuristicRubricScorer.
    pub rubric_scorer: Arc<dyn RubricScorer>,
    pub sessions: SessionStore,
    pub hub: Arc<Mutex<ExtensionHub>>,
}
