//! Extension hub: receives problem/code records pushed by the browser
//! extension and routes them into the bound interview session.
//!
//! Records that arrive before any session exists wait in a bounded queue
//! (drop-oldest) and are flushed in order once a session is bound.

pub mod handlers;
pub mod queue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::hub::queue::BoundedQueue;
use crate::interview::context::{CodeContext, ContextUpdate, ProblemContext};
use crate::interview::session::InterviewSession;

const DIFF_CONTEXT_LINES: usize = 2;
const UNKNOWN_LANGUAGE: &str = "unknown";

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubEventType {
    SessionStart,
    CodeUpdate,
    SessionEnd,
}

/// Flat record produced by the extension's page scraper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedData {
    #[serde(default)]
    pub problem_title: Option<String>,
    #[serde(default)]
    pub problem_description: Option<String>,
    #[serde(default)]
    pub editor_code: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ScrapedData {
    pub fn is_empty(&self) -> bool {
        self.title().is_none() && self.editor_code.is_none()
    }

    fn title(&self) -> Option<&str> {
        self.problem_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionPayload {
    #[serde(rename = "type")]
    pub kind: HubEventType,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub data: Option<ScrapedData>,
}

/// Fields that decide whether a record is new.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    title: Option<String>,
    code: Option<String>,
    difficulty: Option<String>,
}

impl Fingerprint {
    fn of(data: &ScrapedData) -> Self {
        Self {
            title: data.problem_title.clone(),
            code: data.editor_code.clone(),
            difficulty: data.difficulty.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hub state
// ────────────────────────────────────────────────────────────────────────────

/// What the caller should do with an accepted payload.
#[derive(Debug, Clone, PartialEq)]
pub enum HubAction {
    /// Apply these records to the session, in order.
    Apply {
        session_id: Uuid,
        records: Vec<ScrapedData>,
    },
    Queued {
        dropped_oldest: bool,
    },
    /// Same title, code and difficulty as the last record.
    Skipped,
    Ended,
}

#[derive(Debug)]
pub struct ExtensionHub {
    bound_session: Option<Uuid>,
    pending: BoundedQueue<ScrapedData>,
    last_seen: Option<Fingerprint>,
}

impl ExtensionHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            bound_session: None,
            pending: BoundedQueue::new(queue_capacity),
            last_seen: None,
        }
    }

    pub fn bound_session(&self) -> Option<Uuid> {
        self.bound_session
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Binds the hub to a session and hands back everything queued so far.
    ///
    /// `last_seen` belongs to the bound session: it restarts on a new binding,
    /// then tracks the newest flushed record. Callers must apply every returned record.
    pub fn bind(&mut self, session_id: Uuid) -> Vec<ScrapedData> {
        if self.bound_session != Some(session_id) {
            info!("Extension hub bound to session {session_id}");
            self.bound_session = Some(session_id);
            self.last_seen = None;
        }
        if !self.pending.is_empty() {
            debug!("Flushing {} queued extension payload(s)", self.pending.len());
        }
        let records = self.pending.drain();
        if let Some(newest) = records.last() {
            self.last_seen = Some(Fingerprint::of(newest));
        }
        records
    }

    pub fn unbind(&mut self) {
        if let Some(id) = self.bound_session.take() {
            info!("Extension hub unbound from session {id}");
        }
        self.pending.clear();
        self.last_seen = None;
    }

    /// Unbinds only if currently bound to `session_id`.
    pub fn release(&mut self, session_id: Uuid) {
        if self.bound_session == Some(session_id) {
            self.unbind();
        }
    }

    /// Routes one payload. `target` is the session the payload resolves to, if
    /// that session exists.
    pub fn accept(
        &mut self,
        kind: HubEventType,
        data: ScrapedData,
        target: Option<Uuid>,
    ) -> HubAction {
        if kind == HubEventType::SessionEnd {
            self.unbind();
            return HubAction::Ended;
        }

        let fingerprint = Fingerprint::of(&data);

        match target {
            Some(session_id) => {
                let bound =
                    kind == HubEventType::SessionStart || self.bound_session == Some(session_id);
                if !bound {
                    // Explicit push to a session the hub is not following.
                    let records = if data.is_empty() { Vec::new() } else { vec![data] };
                    return HubAction::Apply {
                        session_id,
                        records,
                    };
                }

                let mut records = self.bind(session_id);
                let unchanged = kind == HubEventType::CodeUpdate
                    && self.last_seen.as_ref() == Some(&fingerprint);
                if unchanged && records.is_empty() {
                    debug!("Skipping unchanged extension payload for session {session_id}");
                    return HubAction::Skipped;
                }
                if !data.is_empty() && !unchanged {
                    self.last_seen = Some(fingerprint);
                    records.push(data);
                }
                HubAction::Apply {
                    session_id,
                    records,
                }
            }
            None => {
                if data.is_empty() {
                    return HubAction::Queued {
                        dropped_oldest: false,
                    };
                }
                if kind == HubEventType::CodeUpdate
                    && self.pending.back().map(Fingerprint::of).as_ref() == Some(&fingerprint)
                {
                    debug!("Skipping payload identical to the newest queued one");
                    return HubAction::Skipped;
                }
                let dropped_oldest = self.pending.push(data).is_some();
                if dropped_oldest {
                    warn!(
                        "Extension queue full ({}), dropped oldest payload ({} dropped so far)",
                        self.pending.capacity(),
                        self.pending.dropped()
                    );
                }
                HubAction::Queued { dropped_oldest }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Applying records to a session
// ────────────────────────────────────────────────────────────────────────────

/// Unified diff between two code snapshots, `None` when they are identical.
pub fn code_diff(before: &str, after: &str) -> Option<String> {
    if before == after {
        return None;
    }
    let diff = TextDiff::from_lines(before, after);
    Some(
        diff.unified_diff()
            .context_radius(DIFF_CONTEXT_LINES)
            .header("before", "after")
            .to_string(),
    )
}

/// Merges a scraped record into the session context.
///
/// A title replaces the problem (keeping the previous description when the
/// record has none for the same title). Code replaces the editor text and
/// records a diff against the previous text.
pub fn apply_record(session: &mut InterviewSession, record: &ScrapedData, now: DateTime<Utc>) {
    let context = session.context();
    let mut update = ContextUpdate::default();

    if let Some(title) = record.title() {
        let previous = context.problem.as_ref().filter(|p| p.title == title);
        let description = record
            .problem_description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| previous.map(|p| p.description.clone()))
            .unwrap_or_default();
        update.problem = Some(ProblemContext {
            title: title.to_string(),
            description,
            difficulty: record.difficulty.clone(),
            url: record.url.clone(),
        });
    }

    if let Some(text) = &record.editor_code {
        let previous = context.code.as_ref();
        let language = previous
            .map(|c| c.language.clone())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());
        let last_diff = match previous {
            Some(prev) => code_diff(&prev.text, text).or_else(|| prev.last_diff.clone()),
            None => None,
        };
        update.code = Some(CodeContext {
            language,
            text: text.clone(),
            last_diff,
        });
    }

    let stage = session.update_context_at(update, now);
    debug!("Applied extension record, stage now {stage}");
}
