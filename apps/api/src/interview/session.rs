//! Session Controller: owns one interview's context and conversation history,
//! picks the directive for each turn and, in model mode, delegates the wording
//! of the reply to the language model.
//!
//! Directive priority for a user turn:
//! 1. elapsed ≥ wrap threshold → wrap prompt, verbatim, no model call
//! 2. elapsed minute is a soft time check (once per mark) → time-check template
//! 3. the turn carries a code diff and diffs are followed up → diff-probe template
//! 4. problem or code missing → no-context template
//! 5. blank user text (empty transcript) → nudge-focus template
//! 6. otherwise → the current stage's canned prompt
//!
//! A failed model call leaves the history untouched: neither the user entry nor
//! an assistant entry is appended.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::interview::context::{
    whole_minutes, CodeContext, ContextUpdate, ProblemContext, SessionContext,
};
use crate::interview::prompt_config::{InterviewerPrompt, Stage};
use crate::interview::prompts::build_model_messages;
use crate::interview::stage::{select_stage, STAGE_INTRO, STAGE_WRAP};
use crate::interview::templates::MessageTemplateEngine;
use crate::llm_client::{ChatModel, LlmError};

/// Used when the configured flow has no `wrap` stage.
pub const WRAP_FALLBACK_MESSAGE: &str =
    "Let's wrap up this session. I'll provide feedback shortly.";

/// How assistant replies are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// The selected directive is the reply.
    #[default]
    Scripted,
    /// The directive steers a language-model reply.
    Model,
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scripted" => Ok(ResponseMode::Scripted),
            "model" | "llm" => Ok(ResponseMode::Model),
            other => Err(format!("unknown response mode '{other}'")),
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::Scripted => write!(f, "scripted"),
            ResponseMode::Model => write!(f, "model"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    User,
    Assistant,
}

/// One turn of the conversation. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: EntryRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Which rule produced the directive for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Wrap,
    TimeCheck,
    DiffProbe,
    NoContext,
    NudgeFocus,
    StagePrompt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("The interviewer could not respond right now ({0}). Please try again.")]
    Model(#[from] LlmError),
}

/// Result of a single user turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub message: String,
    pub stage: String,
    pub directive: DirectiveKind,
    pub elapsed_minutes: u32,
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub stage: String,
    pub mode: ResponseMode,
    pub started_at: DateTime<Utc>,
    pub elapsed_minutes: u32,
    pub wrapped: bool,
    pub context: SessionContext,
    pub history: Vec<ConversationEntry>,
}

pub struct InterviewSession {
    id: Uuid,
    prompt: Arc<InterviewerPrompt>,
    mode: ResponseMode,
    started_at: DateTime<Utc>,
    current_stage: String,
    last_code_diff: Option<String>,
    last_time_check: Option<u32>,
    wrapped: bool,
    history: Vec<ConversationEntry>,
    context: SessionContext,
}

impl InterviewSession {
    pub fn start(
        prompt: Arc<InterviewerPrompt>,
        mode: ResponseMode,
        problem: Option<ProblemContext>,
        code: Option<CodeContext>,
        session_cap_sec: u64,
    ) -> Self {
        Self::start_at(prompt, mode, problem, code, session_cap_sec, Utc::now())
    }

    /// Starts a fresh session: empty history, intro stage, one opening message.
    /// The opening is the no-context template until both problem and code are known,
    /// then the intro stage prompt.
    pub fn start_at(
        prompt: Arc<InterviewerPrompt>,
        mode: ResponseMode,
        problem: Option<ProblemContext>,
        code: Option<CodeContext>,
        session_cap_sec: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let context = SessionContext::new(problem, code, session_cap_sec);

        let intro = prompt
            .stage(STAGE_INTRO)
            .or_else(|| prompt.session_flow.first());
        let current_stage = intro
            .map(|s| s.stage.clone())
            .unwrap_or_else(|| STAGE_INTRO.to_string());

        let opening = match intro {
            Some(stage) if context.has_complete_context() => stage.prompt.clone(),
            _ => MessageTemplateEngine::new(&prompt.message_templates).no_context(),
        };

        let id = Uuid::new_v4();
        info!(
            "Session {id} started (mode={mode}, problem={}, code={})",
            context.has_problem(),
            context.has_code()
        );

        Self {
            id,
            prompt,
            mode,
            started_at,
            current_stage,
            last_code_diff: None,
            last_time_check: None,
            wrapped: false,
            history: vec![ConversationEntry {
                role: EntryRole::Assistant,
                content: opening,
                timestamp: started_at,
            }],
            context,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn prompt(&self) -> &InterviewerPrompt {
        &self.prompt
    }

    pub fn current_stage(&self) -> &str {
        &self.current_stage
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.history
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn last_code_diff(&self) -> Option<&str> {
        self.last_code_diff.as_deref()
    }

    pub fn system_prompt(&self) -> String {
        self.prompt.system_prompt()
    }

    /// Opening message of the session.
    pub fn opening_message(&self) -> &str {
        self.history
            .first()
            .map(|e| e.content.as_str())
            .unwrap_or_default()
    }

    /// Elapsed seconds at `now`: wall clock since start, or the client-reported
    /// telemetry if that is further along.
    pub fn elapsed_sec_at(&self, now: DateTime<Utc>) -> u64 {
        let clock = (now - self.started_at).num_seconds().max(0) as u64;
        clock.max(self.context.telemetry.elapsed_sec)
    }

    pub fn elapsed_minutes_at(&self, now: DateTime<Utc>) -> u32 {
        whole_minutes(self.elapsed_sec_at(now))
    }

    fn refresh_clock(&mut self, now: DateTime<Utc>) {
        self.context.telemetry.elapsed_sec = self.elapsed_sec_at(now);
    }

    fn resolve_stage(&mut self) -> Stage {
        let stage = select_stage(
            &self.prompt,
            self.context.elapsed_minutes(),
            self.context.has_problem(),
            self.context.has_code(),
        )
        .clone();
        if stage.stage != self.current_stage {
            debug!(
                "Session {} stage {} -> {}",
                self.id, self.current_stage, stage.stage
            );
        }
        self.current_stage = stage.stage.clone();
        stage
    }

    pub fn update_context(&mut self, update: ContextUpdate) -> &str {
        self.update_context_at(update, Utc::now())
    }

    /// Merges a partial context update and recomputes the stage.
    pub fn update_context_at(&mut self, update: ContextUpdate, now: DateTime<Utc>) -> &str {
        if let Some(diff) = update.code.as_ref().and_then(|c| c.last_diff.clone()) {
            self.last_code_diff = Some(diff);
        }
        self.context.apply(update);
        self.refresh_clock(now);
        self.resolve_stage();
        &self.current_stage
    }

    /// Picks the scripted directive for a turn. Pure with respect to session state.
    pub fn select_directive(
        &self,
        stage: &Stage,
        elapsed_minutes: u32,
        user_text: &str,
        new_diff: Option<&str>,
    ) -> Directive {
        let policies = &self.prompt.policies;
        let templates = MessageTemplateEngine::new(&self.prompt.message_templates);

        if elapsed_minutes >= policies.wrap_up_at_minutes {
            let text = self
                .prompt
                .stage(STAGE_WRAP)
                .map(|s| s.prompt.clone())
                .unwrap_or_else(|| WRAP_FALLBACK_MESSAGE.to_string());
            return Directive {
                kind: DirectiveKind::Wrap,
                text,
            };
        }

        if policies.soft_time_checks_minutes.contains(&elapsed_minutes)
            && self.last_time_check != Some(elapsed_minutes)
        {
            let remaining = self
                .context
                .session_cap_minutes()
                .saturating_sub(elapsed_minutes);
            return Directive {
                kind: DirectiveKind::TimeCheck,
                text: templates.time_check(elapsed_minutes, remaining),
            };
        }

        if let Some(diff) = new_diff.filter(|_| policies.follow_up_on_diffs) {
            return Directive {
                kind: DirectiveKind::DiffProbe,
                text: templates.diff_probe(diff),
            };
        }

        if !self.context.has_complete_context() {
            return Directive {
                kind: DirectiveKind::NoContext,
                text: templates.no_context(),
            };
        }

        if user_text.trim().is_empty() {
            return Directive {
                kind: DirectiveKind::NudgeFocus,
                text: templates.nudge_focus(),
            };
        }

        Directive {
            kind: DirectiveKind::StagePrompt,
            text: stage.prompt.clone(),
        }
    }

    pub async fn send_message(
        &mut self,
        model: &dyn ChatModel,
        user_text: &str,
        code_diff: Option<String>,
    ) -> Result<TurnOutcome, SessionError> {
        self.send_message_at(model, user_text, code_diff, Utc::now())
            .await
    }

    /// Handles one user turn and returns the assistant reply.
    pub async fn send_message_at(
        &mut self,
        model: &dyn ChatModel,
        user_text: &str,
        code_diff: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, SessionError> {
        let diff = code_diff.filter(|d| !d.trim().is_empty());
        if let Some(diff) = &diff {
            self.last_code_diff = Some(diff.clone());
            if let Some(code) = self.context.code.as_mut() {
                code.last_diff = Some(diff.clone());
            }
        }

        self.refresh_clock(now);
        let elapsed_minutes = self.context.elapsed_minutes();
        let stage = self.resolve_stage();
        let directive = self.select_directive(&stage, elapsed_minutes, user_text, diff.as_deref());

        debug!(
            "Session {} turn at {}m: stage={}, directive={:?}",
            self.id, elapsed_minutes, stage.stage, directive.kind
        );

        let reply = match (directive.kind, self.mode) {
            (DirectiveKind::Wrap, _) | (_, ResponseMode::Scripted) => directive.text.clone(),
            (_, ResponseMode::Model) => {
                let messages = build_model_messages(
                    &self.prompt,
                    &self.context,
                    &stage,
                    &directive.text,
                    &self.history,
                    user_text,
                );
                model.complete(&messages).await.map_err(|e| {
                    warn!("Session {} model call failed: {e}", self.id);
                    SessionError::Model(e)
                })?
            }
        };

        match directive.kind {
            DirectiveKind::TimeCheck => self.last_time_check = Some(elapsed_minutes),
            DirectiveKind::Wrap => self.wrapped = true,
            _ => {}
        }

        self.history.push(ConversationEntry {
            role: EntryRole::User,
            content: user_text.to_string(),
            timestamp: now,
        });
        self.history.push(ConversationEntry {
            role: EntryRole::Assistant,
            content: reply.clone(),
            timestamp: now,
        });

        Ok(TurnOutcome {
            message: reply,
            stage: stage.stage,
            directive: directive.kind,
            elapsed_minutes,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            stage: self.current_stage.clone(),
            mode: self.mode,
            started_at: self.started_at,
            elapsed_minutes: self.elapsed_minutes_at(now),
            wrapped: self.wrapped,
            context: self.context.clone(),
            history: self.history.clone(),
        }
    }
}
