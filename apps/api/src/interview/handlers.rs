//! Axum route handlers for interview sessions and reports.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::hub::apply_record;
use crate::interview::context::{
    CodeContext, ContextUpdate, ProblemContext, SessionContext, DEFAULT_SESSION_CAP_SEC,
};
use crate::interview::session::{
    DirectiveKind, InterviewSession, ResponseMode, SessionSnapshot,
};
use crate::report::generator::{generate_report, Report};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    pub problem: Option<ProblemContext>,
    pub code: Option<CodeContext>,
    pub session_cap_sec: Option<u64>,
    /// Overrides the configured default reply mode.
    pub mode: Option<ResponseMode>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub message: String,
    pub stage: String,
    pub mode: ResponseMode,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub code_diff: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: String,
    pub stage: String,
    pub directive: DirectiveKind,
    pub elapsed_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub stage: String,
    pub context: SessionContext,
}

#[derive(Debug, Serialize)]
pub struct SystemPromptResponse {
    pub system_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub session_id: Uuid,
    pub ended: bool,
    pub turns: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Starts a fresh session and binds the extension hub to it. Records the
/// extension pushed before the session existed are applied right away, but
/// the opening message reflects only the context given in the request.
pub async fn handle_start_session(
    State(state): State<AppState>,
    request: Option<Json<StartSessionRequest>>,
) -> Result<(StatusCode, Json<StartSessionResponse>), AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let cap = request.session_cap_sec.unwrap_or(DEFAULT_SESSION_CAP_SEC);
    if cap == 0 {
        return Err(AppError::Validation(
            "session_cap_sec must be greater than zero".to_string(),
        ));
    }

    let mode = request.mode.unwrap_or(state.config.response_mode);
    let session = InterviewSession::start(
        state.prompt.clone(),
        mode,
        request.problem,
        request.code,
        cap,
    );
    let session_id = session.id();
    let message = session.opening_message().to_string();
    let stage = session.current_stage().to_string();

    let shared = state.sessions.insert(session).await;

    let pending = state.hub.lock().await.bind(session_id);
    if !pending.is_empty() {
        let mut session = shared.lock().await;
        let now = Utc::now();
        for record in &pending {
            apply_record(&mut session, record, now);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id,
            message,
            stage,
            mode,
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let shared = state.sessions.get(session_id).await?;
    let session = shared.lock().await;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<EndSessionResponse>, AppError> {
    let shared = state.sessions.remove(session_id).await?;
    state.hub.lock().await.release(session_id);
    let turns = shared.lock().await.history().len();
    Ok(Json(EndSessionResponse {
        session_id,
        ended: true,
        turns,
    }))
}

/// POST /api/v1/sessions/:id/messages
///
/// One candidate turn. A model failure returns 502 with a user-facing message
/// and leaves the conversation as it was.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let shared = state.sessions.get(session_id).await?;
    let mut session = shared.lock().await;

    let outcome = session
        .send_message(state.llm.as_ref(), &request.text, request.code_diff)
        .await?;

    Ok(Json(SendMessageResponse {
        message: outcome.message,
        stage: outcome.stage,
        directive: outcome.directive,
        elapsed_minutes: outcome.elapsed_minutes,
    }))
}

/// PATCH /api/v1/sessions/:id/context
pub async fn handle_update_context(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(update): Json<ContextUpdate>,
) -> Result<Json<ContextResponse>, AppError> {
    if update
        .telemetry
        .as_ref()
        .is_some_and(|t| t.session_cap_sec == 0)
    {
        return Err(AppError::Validation(
            "telemetry.session_cap_sec must be greater than zero".to_string(),
        ));
    }

    let shared = state.sessions.get(session_id).await?;
    let mut session = shared.lock().await;
    let stage = session.update_context(update).to_string();

    Ok(Json(ContextResponse {
        stage,
        context: session.context().clone(),
    }))
}

/// GET /api/v1/sessions/:id/system-prompt
pub async fn handle_system_prompt(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SystemPromptResponse>, AppError> {
    let shared = state.sessions.get(session_id).await?;
    let session = shared.lock().await;
    Ok(Json(SystemPromptResponse {
        system_prompt: session.system_prompt(),
    }))
}

/// POST /api/v1/sessions/:id/report
pub async fn handle_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    let shared = state.sessions.get(session_id).await?;
    let session = shared.lock().await;
    let report = generate_report(&session, state.rubric_scorer.as_ref()).await?;
    Ok(Json(report))
}

/// GET /api/v1/sessions/:id/report.md
///
/// Same report as markdown, served as a file download.
pub async fn handle_report_markdown(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let shared = state.sessions.get(session_id).await?;
    let session = shared.lock().await;
    let report = generate_report(&session, state.rubric_scorer.as_ref()).await?;

    let disposition = format!(
        "attachment; filename=\"interview-report-{}.md\"",
        report.generated_at.format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.markdown,
    )
        .into_response())
}
