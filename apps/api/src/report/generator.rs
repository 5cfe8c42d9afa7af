//! Report Generator: rubric scores, strengths and improvements, rendered through
//! the configured markdown and summary templates.
//!
//! Pipeline:
//!   session → conversation features → rubric scores → derived sections
//!   → template variables → markdown + summary

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::{EntryRole, InterviewSession};
use crate::interview::templates::{format_list, format_scores, substitute, TemplateVars};
use crate::report::rubric::{ConversationFeatures, DimensionFamily, RubricScore, RubricScorer};

const FALLBACK_STRENGTH: &str = "Good effort and engagement";
const FALLBACK_IMPROVEMENT: &str = "Continue practicing similar problems";
const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Keep practicing problems of increasing difficulty",
    "Try timed sessions to build pacing",
];
const FALLBACK_APPROACH: &str = "Standard algorithmic approach";
const NO_DIFF_POINTS: &str = "No significant code changes tracked";
const UNTITLED_PROBLEM: &str = "Untitled problem";
const MAX_APPROACH_CHARS: usize = 100;
const MAX_RECOMMENDATIONS: usize = 3;

const APPROACH_KEYWORDS: [&str; 6] = [
    "approach",
    "algorithm",
    "data structure",
    "strategy",
    "i would",
    "i'll use",
];

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub session_id: Uuid,
    pub problem_title: String,
    pub duration_minutes: u32,
    pub rubric: Vec<RubricScore>,
    /// Normalized dimension key → score.
    pub scores: BTreeMap<String, u8>,
    pub overall_score: f32,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub recommendations: Vec<String>,
    pub approach: String,
    pub diff_points: String,
    pub next_steps: String,
    pub summary: String,
    pub markdown: String,
    pub generated_at: DateTime<Utc>,
}

pub async fn generate_report(
    session: &InterviewSession,
    scorer: &dyn RubricScorer,
) -> Result<Report, AppError> {
    generate_report_at(session, scorer, Utc::now()).await
}

/// Builds the report for a session. Does not mutate the session.
pub async fn generate_report_at(
    session: &InterviewSession,
    scorer: &dyn RubricScorer,
    now: DateTime<Utc>,
) -> Result<Report, AppError> {
    let prompt = session.prompt();
    let features = ConversationFeatures::from_session(session);
    let rubric = scorer.score(&prompt.rubric, &features).await?;

    let overall_score = overall_score(&rubric);
    let strengths = strengths(&rubric);
    let improvements = improvements(&rubric);
    let recommendations = recommendations(&rubric);
    let approach = approach_summary(session);
    let diff_points = diff_points(session.last_code_diff());
    let next_steps = next_steps(&rubric);

    let problem_title = session
        .context()
        .problem_title()
        .unwrap_or(UNTITLED_PROBLEM)
        .to_string();
    let duration_minutes = session.elapsed_minutes_at(now);
    let user_turns = features.user_messages.len();

    let base_summary = format!(
        "{duration_minutes}-minute session on {problem_title} with {user_turns} candidate {}.",
        if user_turns == 1 { "answer" } else { "answers" }
    );

    let mut vars = TemplateVars::new();
    vars.insert("session_id", session.id().to_string());
    vars.insert("problem_title", problem_title.clone());
    vars.insert("duration_minutes", duration_minutes.to_string());
    vars.insert("overall_score", format!("{overall_score:.1}"));
    vars.insert("summary", base_summary);

    let summary = substitute(&prompt.report_templates.summary, &vars)
        .trim()
        .to_string();

    vars.insert("summary", summary.clone());
    vars.insert(
        "scores",
        format_scores(rubric.iter().map(|s| (s.dimension.as_str(), s.score))),
    );
    vars.insert("rubric_details", rubric_details(&rubric, &prompt.rubric.guidance));
    vars.insert("approach", approach.clone());
    vars.insert("diff_points", diff_points.clone());
    vars.insert("strengths", format_list(&strengths));
    vars.insert("improvements", format_list(&improvements));
    vars.insert("recommendations", format_list(&recommendations));
    vars.insert("next_steps", next_steps.clone());
    vars.insert("generated_at", now.format("%Y-%m-%d %H:%M UTC").to_string());

    let markdown = substitute(&prompt.report_templates.markdown, &vars);

    info!(
        "Report generated for session {}: overall {overall_score:.1} across {} dimensions",
        session.id(),
        rubric.len()
    );

    Ok(Report {
        session_id: session.id(),
        problem_title,
        duration_minutes,
        scores: rubric
            .iter()
            .map(|s| (dimension_key(&s.dimension), s.score))
            .collect(),
        rubric,
        overall_score,
        strengths,
        improvements,
        recommendations,
        approach,
        diff_points,
        next_steps,
        summary,
        markdown,
        generated_at: now,
    })
}

/// `"Time/space complexity"` → `"time_space_complexity"`.
pub fn dimension_key(dimension: &str) -> String {
    dimension
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Mean score rounded to one decimal; 0.0 for an empty rubric.
fn overall_score(rubric: &[RubricScore]) -> f32 {
    if rubric.is_empty() {
        return 0.0;
    }
    let total: u32 = rubric.iter().map(|s| u32::from(s.score)).sum();
    let mean = total as f32 / rubric.len() as f32;
    (mean * 10.0).round() / 10.0
}

fn strengths(rubric: &[RubricScore]) -> Vec<String> {
    let items: Vec<String> = rubric
        .iter()
        .filter(|s| s.score >= 4)
        .map(|s| format!("Strong {}: {}", s.dimension.to_lowercase(), s.feedback))
        .collect();
    non_empty_or(items, FALLBACK_STRENGTH)
}

fn improvements(rubric: &[RubricScore]) -> Vec<String> {
    let items: Vec<String> = rubric
        .iter()
        .filter(|s| s.score <= 3)
        .map(|s| format!("Focus on {}: {}", s.dimension.to_lowercase(), s.feedback))
        .collect();
    non_empty_or(items, FALLBACK_IMPROVEMENT)
}

fn non_empty_or(items: Vec<String>, fallback: &str) -> Vec<String> {
    if items.is_empty() {
        vec![fallback.to_string()]
    } else {
        items
    }
}

/// One recommendation per weak dimension family, weakest first.
fn recommendations(rubric: &[RubricScore]) -> Vec<String> {
    let mut weak: Vec<&RubricScore> = rubric.iter().filter(|s| s.score <= 3).collect();
    weak.sort_by_key(|s| s.score);

    let mut out: Vec<String> = Vec::new();
    for score in weak {
        let text = DimensionFamily::classify(&score.dimension)
            .recommendation()
            .to_string();
        if !out.contains(&text) {
            out.push(text);
        }
        if out.len() == MAX_RECOMMENDATIONS {
            break;
        }
    }

    if out.is_empty() {
        FALLBACK_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
    } else {
        out
    }
}

fn next_steps(rubric: &[RubricScore]) -> String {
    match rubric.iter().min_by_key(|s| s.score) {
        Some(lowest) if lowest.score < 5 => format!(
            "In your next session, focus on {}. {}.",
            lowest.dimension.to_lowercase(),
            DimensionFamily::classify(&lowest.dimension).recommendation()
        ),
        Some(_) => "Move on to harder problems and keep the same habits.".to_string(),
        None => "Schedule another practice session.".to_string(),
    }
}

/// First candidate answer that describes an approach.
fn approach_summary(session: &InterviewSession) -> String {
    session
        .history()
        .iter()
        .filter(|e| e.role == EntryRole::User)
        .map(|e| e.content.trim())
        .find(|content| {
            let lower = content.to_lowercase();
            APPROACH_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|content| match content.char_indices().nth(MAX_APPROACH_CHARS) {
            Some((idx, _)) => format!("{}...", &content[..idx]),
            None => content.to_string(),
        })
        .unwrap_or_else(|| FALLBACK_APPROACH.to_string())
}

fn diff_points(diff: Option<&str>) -> String {
    let Some(diff) = diff else {
        return NO_DIFF_POINTS.to_string();
    };

    let (added, removed) = diff
        .lines()
        .filter(|l| !l.starts_with("+++") && !l.starts_with("---"))
        .fold((0, 0), |(a, r), line| {
            if line.starts_with('+') {
                (a + 1, r)
            } else if line.starts_with('-') {
                (a, r + 1)
            } else {
                (a, r)
            }
        });

    if added == 0 && removed == 0 {
        NO_DIFF_POINTS.to_string()
    } else {
        format!("- Latest change: +{added}/-{removed} lines")
    }
}

fn rubric_details(rubric: &[RubricScore], guidance: &BTreeMap<String, String>) -> String {
    rubric
        .iter()
        .map(|s| {
            let anchor = match s.score {
                0..=2 => "1",
                3 => "3",
                _ => "5",
            };
            match guidance.get(anchor) {
                Some(g) => format!(
                    "### {}\n**Score**: {}/5 ({g})\n{}",
                    s.dimension, s.score, s.feedback
                ),
                None => format!("### {}\n**Score**: {}/5\n{}", s.dimension, s.score, s.feedback),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::context::{CodeContext, ProblemContext};
    use crate::interview::prompt_config::InterviewerPrompt;
    use crate::interview::session::tests::StubModel;
    use crate::interview::session::ResponseMode;
    use crate::report::rubric::HeuristicRubricScorer;
    use chrono::Duration;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn prompt() -> Arc<InterviewerPrompt> {
        Arc::new(InterviewerPrompt::embedded_default().unwrap())
    }

    fn session_with_context() -> InterviewSession {
        InterviewSession::start_at(
            prompt(),
            ResponseMode::Scripted,
            Some(ProblemContext {
                title: "Valid Parentheses".to_string(),
                ..Default::default()
            }),
            Some(CodeContext {
                language: "rust".to_string(),
                text: "fn is_valid(s: &str) -> bool { true }".to_string(),
                last_diff: None,
            }),
            1500,
            t0(),
        )
    }

    #[tokio::test]
    async fn test_empty_session_has_fallback_sections() {
        let session =
            InterviewSession::start_at(prompt(), ResponseMode::Scripted, None, None, 1500, t0());
        let report = generate_report_at(&session, &HeuristicRubricScorer, t0())
            .await
            .unwrap();

        assert!(!report.strengths.is_empty());
        assert!(!report.improvements.is_empty());
        assert!(!report.recommendations.is_empty());
        assert_eq!(report.strengths, vec![FALLBACK_STRENGTH.to_string()]);
        assert_eq!(report.problem_title, UNTITLED_PROBLEM);
        assert_eq!(report.approach, FALLBACK_APPROACH);
        assert_eq!(report.diff_points, NO_DIFF_POINTS);
        assert!(report.markdown.contains("## Key Strengths\n\n- Good effort and engagement"));
        assert!(!report.markdown.contains("{{"));
    }

    #[tokio::test]
    async fn test_report_renders_scores_and_summary() {
        let mut session = session_with_context();
        let model = StubModel::failing();
        let turns = [
            "What are the input constraints?",
            "My approach is a stack of open brackets",
            "It runs in O(n) time and O(n) space",
            "An empty string is valid, that's an edge case",
        ];
        for (i, text) in turns.iter().enumerate() {
            session
                .send_message_at(&model, text, None, t0() + Duration::minutes(4 + i as i64))
                .await
                .unwrap();
        }

        let now = t0() + Duration::minutes(9);
        let report = generate_report_at(&session, &HeuristicRubricScorer, now)
            .await
            .unwrap();

        assert_eq!(report.duration_minutes, 9);
        assert_eq!(report.rubric.len(), 6);
        assert_eq!(report.scores["problem_understanding"], 4);
        assert_eq!(report.scores["time_space_complexity"], 4);
        assert!(report.markdown.contains("**Problem**: Valid Parentheses"));
        assert!(report.markdown.contains("- Problem understanding: 4/5"));
        assert!(report.markdown.contains("My approach is a stack of open brackets"));
        assert!(report
            .summary
            .starts_with("9-minute session on Valid Parentheses with 4 candidate answers."));
        assert!(report
            .summary
            .ends_with(&format!("Overall score: {:.1}/5.0.", report.overall_score)));
        assert!(report.markdown.contains(&report.summary));
    }

    #[tokio::test]
    async fn test_report_is_deterministic() {
        let session = session_with_context();
        let a = generate_report_at(&session, &HeuristicRubricScorer, t0()).await.unwrap();
        let b = generate_report_at(&session, &HeuristicRubricScorer, t0()).await.unwrap();
        assert_eq!(a.markdown, b.markdown);
        assert_eq!(a.rubric, b.rubric);
    }

    #[test]
    fn test_overall_score_rounds_to_one_decimal() {
        let scores = [4, 3, 3].map(|score| RubricScore {
            dimension: "x".to_string(),
            score,
            feedback: String::new(),
        });
        assert_eq!(overall_score(&scores), 3.3);
        assert_eq!(overall_score(&[]), 0.0);
    }

    #[test]
    fn test_recommendations_dedupe_and_cap() {
        let scores: Vec<RubricScore> = ["Code quality", "Code style", "Communication", "Edge cases", "Approach"]
            .iter()
            .map(|d| RubricScore {
                dimension: d.to_string(),
                score: 2,
                feedback: String::new(),
            })
            .collect();
        let recs = recommendations(&scores);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], DimensionFamily::CodeQuality.recommendation());
        assert_eq!(recs[1], DimensionFamily::Communication.recommendation());
    }

    #[test]
    fn test_diff_points_counts_lines() {
        let diff = "--- before\n+++ after\n@@ -1,2 +1,2 @@\n-a\n+b\n+c\n d";
        assert_eq!(diff_points(Some(diff)), "- Latest change: +2/-1 lines");
        assert_eq!(diff_points(None), NO_DIFF_POINTS);
    }

    #[test]
    fn test_dimension_key() {
        assert_eq!(dimension_key("Time/space complexity"), "time_space_complexity");
        assert_eq!(dimension_key("Communication"), "communication");
    }

    #[test]
    fn test_next_steps_targets_lowest_dimension() {
        let scores = vec![
            RubricScore {
                dimension: "Communication".to_string(),
                score: 4,
                feedback: String::new(),
            },
            RubricScore {
                dimension: "Edge case handling".to_string(),
                score: 2,
                feedback: String::new(),
            },
        ];
        let steps = next_steps(&scores);
        assert!(steps.contains("edge case handling"));
        assert_eq!(next_steps(&[]), "Schedule another practice session.");
    }
}
