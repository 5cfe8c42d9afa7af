//! Stage selection: maps elapsed time and context completeness to a stage of
//! the configured session flow.
//!
//! Stateless: recomputed on every call. Inconsistent time inputs can therefore
//! move a session backward through the flow.

use tracing::warn;

use crate::interview::prompt_config::{InterviewerPrompt, Stage};

pub const STAGE_INTRO: &str = "intro";
pub const STAGE_APPROACH_PROBE: &str = "approach_probe";
pub const STAGE_EDGE_CASES: &str = "edge_cases";
pub const STAGE_WRAP: &str = "wrap";

/// Minutes after which a session with full context leaves the intro.
pub const APPROACH_PROBE_AFTER_MINUTES: u32 = 3;

/// Where to land when a named stage is missing from the configured flow.
#[derive(Debug, Clone, Copy)]
enum Fallback {
    Index(usize),
    Last,
}

/// Selects the current stage.
///
/// Priority:
/// 1. `elapsed >= wrap_up_at_minutes` → `wrap`, regardless of context
/// 2. problem or code missing → `intro`
/// 3. `elapsed >= edge_cases_after_minutes` → `edge_cases`
/// 4. `elapsed >= 3` → `approach_probe`
/// 5. otherwise → `intro`
///
/// A stage absent from the configuration falls back to its positional slot
/// (intro → first, approach_probe → second, edge_cases → third, wrap → last).
/// The session flow is never empty after config loading.
pub fn select_stage(
    prompt: &InterviewerPrompt,
    elapsed_minutes: u32,
    has_problem: bool,
    has_code: bool,
) -> &Stage {
    let policies = &prompt.policies;

    if elapsed_minutes >= policies.wrap_up_at_minutes {
        return find_or_fallback(prompt, STAGE_WRAP, Fallback::Last);
    }

    if !has_problem || !has_code {
        return find_or_fallback(prompt, STAGE_INTRO, Fallback::Index(0));
    }

    if elapsed_minutes >= policies.edge_cases_after_minutes {
        return find_or_fallback(prompt, STAGE_EDGE_CASES, Fallback::Index(2));
    }

    if elapsed_minutes >= APPROACH_PROBE_AFTER_MINUTES {
        return find_or_fallback(prompt, STAGE_APPROACH_PROBE, Fallback::Index(1));
    }

    find_or_fallback(prompt, STAGE_INTRO, Fallback::Index(0))
}

fn find_or_fallback<'a>(prompt: &'a InterviewerPrompt, name: &str, fallback: Fallback) -> &'a Stage {
    if let Some(stage) = prompt.stage(name) {
        return stage;
    }

    let flow = &prompt.session_flow;
    let last = flow.len().saturating_sub(1);
    let index = match fallback {
        Fallback::Index(i) => i.min(last),
        Fallback::Last => last,
    };
    warn!(
        "Stage '{name}' is not configured, falling back to '{}'",
        flow[index].stage
    );
    &flow[index]
}
