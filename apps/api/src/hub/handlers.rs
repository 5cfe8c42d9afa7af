//! Axum route handler for extension pushes.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::hub::{apply_record, ExtensionPayload, HubAction};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    Applied,
    Queued,
    Skipped,
    Ended,
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub status: PushStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub applied: usize,
    pub pending: usize,
    pub dropped_oldest: bool,
}

/// POST /api/hub/push
///
/// Receives a scraper record from the browser extension. Resolves the target
/// session (explicit `session_id`, else the bound one), applies the record and
/// anything queued before it, or queues it until a session exists.
pub async fn handle_push(
    State(state): State<AppState>,
    Json(payload): Json<ExtensionPayload>,
) -> Result<Json<PushResponse>, AppError> {
    let mut hub = state.hub.lock().await;

    // Session handle is resolved before `accept` drains the queue.
    let candidate = payload.session_id.or(hub.bound_session());
    let resolved = match candidate {
        Some(id) => match state.sessions.get(id).await {
            Ok(shared) => Some((id, shared)),
            Err(err) if payload.session_id.is_some() => return Err(err),
            Err(_) => None,
        },
        None => None,
    };
    let target = resolved.as_ref().map(|(id, _)| *id);

    let action = hub.accept(payload.kind, payload.data.unwrap_or_default(), target);

    let response = match action {
        HubAction::Apply {
            session_id,
            records,
        } => {
            let Some((_, shared)) = resolved else {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Hub resolved session {session_id} without a handle"
                )));
            };
            let mut session = shared.lock().await;
            let now = Utc::now();
            for record in &records {
                apply_record(&mut session, record, now);
            }
            info!(
                "Applied {} extension record(s) to session {session_id}",
                records.len()
            );
            PushResponse {
                status: PushStatus::Applied,
                session_id: Some(session_id),
                applied: records.len(),
                pending: hub.pending_len(),
                dropped_oldest: false,
            }
        }
        HubAction::Queued { dropped_oldest } => PushResponse {
            status: PushStatus::Queued,
            session_id: None,
            applied: 0,
            pending: hub.pending_len(),
            dropped_oldest,
        },
        HubAction::Skipped => PushResponse {
            status: PushStatus::Skipped,
            session_id: target,
            applied: 0,
            pending: hub.pending_len(),
            dropped_oldest: false,
        },
        HubAction::Ended => PushResponse {
            status: PushStatus::Ended,
            session_id: None,
            applied: 0,
            pending: 0,
            dropped_oldest: false,
        },
    };

    Ok(Json(response))
}
