//! Rubric scoring: pluggable, trait-based scorer over conversation features.
//!
//! Default: `HeuristicRubricScorer`, a declared deterministic function of
//! history length, code presence and per-dimension evidence in the candidate's
//! answers. Identical sessions always score identically.
//!
//! `AppState` holds an `Arc<dyn RubricScorer>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::interview::prompt_config::Rubric;
use crate::interview::session::{EntryRole, InterviewSession};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricScore {
    pub dimension: String,
    pub score: u8, // 1 – 5
    pub feedback: String,
}

/// What the scorer is allowed to look at.
#[derive(Debug, Clone, Default)]
pub struct ConversationFeatures {
    /// All entries, the opening message included.
    pub history_len: usize,
    pub has_code: bool,
    pub has_diff: bool,
    /// Candidate turns, lowercased.
    pub user_messages: Vec<String>,
}

impl ConversationFeatures {
    pub fn from_session(session: &InterviewSession) -> Self {
        Self {
            history_len: session.history().len(),
            has_code: session.context().has_code(),
            has_diff: session.last_code_diff().is_some(),
            user_messages: session
                .history()
                .iter()
                .filter(|e| e.role == EntryRole::User)
                .map(|e| e.content.to_lowercase())
                .collect(),
        }
    }

    pub fn average_user_words(&self) -> f32 {
        if self.user_messages.is_empty() {
            return 0.0;
        }
        let words: usize = self
            .user_messages
            .iter()
            .map(|m| m.split_whitespace().count())
            .sum();
        words as f32 / self.user_messages.len() as f32
    }

    fn mentions_any(&self, keywords: &[&str]) -> bool {
        self.user_messages
            .iter()
            .any(|m| keywords.iter().any(|k| m.contains(k)))
    }
}

/// Rubric dimensions are free text in config; scoring groups them by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionFamily {
    Understanding,
    Approach,
    Complexity,
    EdgeCases,
    CodeQuality,
    Communication,
    Other,
}

impl DimensionFamily {
    pub fn classify(dimension: &str) -> Self {
        let d = dimension.to_lowercase();
        if d.contains("understanding") {
            Self::Understanding
        } else if d.contains("approach") {
            Self::Approach
        } else if d.contains("complexity") {
            Self::Complexity
        } else if d.contains("edge") {
            Self::EdgeCases
        } else if d.contains("code") {
            Self::CodeQuality
        } else if d.contains("communication") {
            Self::Communication
        } else {
            Self::Other
        }
    }

    /// (strong, needs work)
    pub fn feedback(self) -> (&'static str, &'static str) {
        match self {
            Self::Understanding => (
                "Clarified inputs and constraints before diving in",
                "Ask clarifying questions about inputs and constraints before coding",
            ),
            Self::Approach => (
                "Explained the chosen approach and why it fits",
                "State your approach and compare alternatives before implementing",
            ),
            Self::Complexity => (
                "Analyzed time and space complexity accurately",
                "Discuss the time and space complexity of your solution",
            ),
            Self::EdgeCases => (
                "Identified and handled the important edge cases",
                "Walk through edge cases like empty input and duplicates",
            ),
            Self::CodeQuality => (
                "Code evolved in clean, readable increments",
                "Write code in small readable steps and revise as you go",
            ),
            Self::Communication => (
                "Communicated reasoning clearly throughout",
                "Think out loud so the interviewer can follow your reasoning",
            ),
            Self::Other => (
                "Good performance in this area",
                "Keep practicing this area",
            ),
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Understanding => "Restate the problem and confirm constraints before writing code",
            Self::Approach => "Practice comparing two candidate approaches out loud before committing",
            Self::Complexity => "Review Big-O analysis for common data structures and algorithms",
            Self::EdgeCases => "List edge cases explicitly before you start testing",
            Self::CodeQuality => "Refactor toward small, well-named helper functions",
            Self::Communication => "Narrate your reasoning while you code",
            Self::Other => "Revisit this area with targeted practice problems",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait RubricScorer: Send + Sync {
    async fn score(
        &self,
        rubric: &Rubric,
        features: &ConversationFeatures,
    ) -> Result<Vec<RubricScore>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicRubricScorer
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic scorer.
///
/// 1. Tier by conversation size:
///    - history > 10 entries with code → [4, 5]
///    - history > 5 entries → [3, 4]
///    - otherwise → [2, 3]
/// 2. Upper value of the tier when the dimension has evidence, lower otherwise.
/// 3. Clamped to the configured scale, which itself is bounded to 1..=5.
pub struct HeuristicRubricScorer;

pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 5;
const MIN_WORDS_FOR_COMMUNICATION: f32 = 12.0;
const MIN_TURNS_FOR_OTHER: usize = 3;

#[async_trait]
impl RubricScorer for HeuristicRubricScorer {
    async fn score(
        &self,
        rubric: &Rubric,
        features: &ConversationFeatures,
    ) -> Result<Vec<RubricScore>, AppError> {
        Ok(score_heuristically(rubric, features))
    }
}

pub fn score_heuristically(rubric: &Rubric, features: &ConversationFeatures) -> Vec<RubricScore> {
    let (low, high) = tier(features);
    let scale_min = rubric.scale.iter().copied().min().unwrap_or(1).clamp(SCORE_MIN, SCORE_MAX);
    let scale_max = rubric.scale.iter().copied().max().unwrap_or(5).clamp(SCORE_MIN, SCORE_MAX);

    rubric
        .dimensions
        .iter()
        .map(|dimension| {
            let family = DimensionFamily::classify(dimension);
            let raw = if has_evidence(family, features) { high } else { low };
            let score = raw.clamp(scale_min, scale_max.max(scale_min));
            let (strong, needs_work) = family.feedback();
            RubricScore {
                dimension: dimension.clone(),
                score,
                feedback: if score >= 4 { strong } else { needs_work }.to_string(),
            }
        })
        .collect()
}

fn tier(features: &ConversationFeatures) -> (u8, u8) {
    if features.history_len > 10 && features.has_code {
        (4, 5)
    } else if features.history_len > 5 {
        (3, 4)
    } else {
        (2, 3)
    }
}

fn has_evidence(family: DimensionFamily, features: &ConversationFeatures) -> bool {
    match family {
        DimensionFamily::Understanding => {
            features.user_messages.iter().any(|m| m.contains('?'))
                || features.mentions_any(&["constraint", "input", "output", "clarify"])
        }
        DimensionFamily::Approach => {
            features.mentions_any(&["approach", "algorithm", "data structure", "strategy"])
        }
        DimensionFamily::Complexity => {
            features.mentions_any(&["o(", "complexity", "time", "space", "linear", "log"])
        }
        DimensionFamily::EdgeCases => {
            features.mentions_any(&["edge", "empty", "null", "boundary", "overflow", "duplicate"])
        }
        DimensionFamily::CodeQuality => features.has_code && features.has_diff,
        DimensionFamily::Communication => {
            features.average_user_words() >= MIN_WORDS_FOR_COMMUNICATION
        }
        DimensionFamily::Other => features.user_messages.len() >= MIN_TURNS_FOR_OTHER,
    }
}
