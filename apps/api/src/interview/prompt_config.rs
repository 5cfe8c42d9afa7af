//! Interviewer prompt configuration: roles, policies, session flow, templates and rubric.
//!
//! The embedded default is always parsed first. A user-supplied JSON file is
//! deep-merged over it, so a partial file only overrides the keys it names.
//! Unreadable or invalid user files are logged and ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::ChatRole;
use crate::report::rubric::{SCORE_MAX, SCORE_MIN};

/// Default configuration shipped with the binary.
pub const DEFAULT_PROMPT_JSON: &str = include_str!("../../config/ai_interviewer_prompt.json");

#[derive(Debug, Error)]
pub enum PromptConfigError {
    #[error("failed to read prompt config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid prompt config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRoles {
    pub system: String,
    pub safety: String,
    pub privacy_badge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policies {
    pub one_question_at_a_time: bool,
    pub follow_up_on_diffs: bool,
    pub edge_cases_after_minutes: u32,
    pub soft_time_checks_minutes: Vec<u32>,
    pub wrap_up_at_minutes: u32,
    pub allow_typed_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalModel {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudModel {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub local: LocalModel,
    pub cloud: CloudModel,
}

/// A named step in the scripted interview flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub stage: String,
    pub goal: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplates {
    pub no_context: String,
    pub diff_probe: String,
    pub time_check: String,
    pub nudge_focus: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    pub scale: Vec<u8>,
    pub dimensions: Vec<String>,
    /// Keyed by score ("1", "3", "5").
    pub guidance: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTemplates {
    pub markdown: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionPayloadContract {
    pub fields: Vec<String>,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsContract {
    pub extension_payload: ExtensionPayloadContract,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotExample {
    pub role: ChatRole,
    pub content: String,
}

/// Full interviewer configuration. Immutable after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewerPrompt {
    pub name: String,
    pub mode: String,
    pub roles: PromptRoles,
    pub policies: Policies,
    pub llm: LlmSettings,
    pub session_flow: Vec<Stage>,
    pub message_templates: MessageTemplates,
    pub rubric: Rubric,
    pub report_templates: ReportTemplates,
    pub tools_contract: ToolsContract,
    #[serde(default)]
    pub few_shot: Vec<FewShotExample>,
}

impl InterviewerPrompt {
    /// Parses the configuration embedded in the binary.
    pub fn embedded_default() -> Result<Self, PromptConfigError> {
        Ok(serde_json::from_str(DEFAULT_PROMPT_JSON)?)
    }

    /// Strict parse of a (possibly partial) JSON document merged over the default.
    pub fn from_json_str(overlay: &str) -> Result<Self, PromptConfigError> {
        let default = Self::embedded_default()?;
        let mut merged: Value = serde_json::from_str(DEFAULT_PROMPT_JSON)?;
        merge_json(&mut merged, serde_json::from_str(overlay)?);
        let parsed: InterviewerPrompt = serde_json::from_value(merged)?;
        Ok(parsed.repaired(&default))
    }

    /// Strict load from disk.
    pub fn from_file(path: &Path) -> Result<Self, PromptConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PromptConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads the user file when given, falling back to the embedded default on any error.
    /// Only a broken embedded default is returned as an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PromptConfigError> {
        let Some(path) = path else {
            info!("Using embedded interviewer prompt config");
            return Self::embedded_default();
        };

        match Self::from_file(path) {
            Ok(prompt) => {
                info!("Loaded interviewer prompt config from {}", path.display());
                Ok(prompt)
            }
            Err(e) => {
                warn!("{e}; falling back to embedded interviewer prompt config");
                Self::embedded_default()
            }
        }
    }

    /// Looks up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.session_flow.iter().find(|s| s.stage == name)
    }

    /// Base system prompt with the safety guidelines appended.
    pub fn system_prompt(&self) -> String {
        format!(
            "{}\n\nSafety Guidelines: {}",
            self.roles.system, self.roles.safety
        )
    }

    /// Replaces structurally unusable sections with the defaults.
    fn repaired(mut self, default: &InterviewerPrompt) -> Self {
        if self.session_flow.is_empty() {
            warn!("Prompt config has an empty session_flow, using the default flow");
            self.session_flow = default.session_flow.clone();
        }
        if self.rubric.dimensions.is_empty() {
            warn!("Prompt config has no rubric dimensions, using the defaults");
            self.rubric.dimensions = default.rubric.dimensions.clone();
        }
        let before = self.rubric.scale.len();
        self.rubric.scale.retain(|v| (SCORE_MIN..=SCORE_MAX).contains(v));
        if self.rubric.scale.len() != before {
            warn!("Prompt config rubric scale has values outside 1..=5, dropping them");
        }
        if self.rubric.scale.is_empty() {
            self.rubric.scale = default.rubric.scale.clone();
        }
        if self.policies.wrap_up_at_minutes <= self.policies.edge_cases_after_minutes {
            warn!(
                "wrap_up_at_minutes ({}) is not after edge_cases_after_minutes ({}); edge_cases will be skipped",
                self.policies.wrap_up_at_minutes, self.policies.edge_cases_after_minutes
            );
        }
        self
    }
}

/// Recursively merges `overlay` into `base`. Objects merge per key; nulls are ignored;
/// anything else replaces the base value.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_embedded_default_parses() {
        let prompt = InterviewerPrompt::embedded_default().unwrap();
        assert!(!prompt.session_flow.is_empty());
        assert_eq!(prompt.session_flow[0].stage, "intro");
        assert!(prompt.stage("wrap").is_some());
        assert_eq!(prompt.rubric.dimensions.len(), 6);
        assert!(prompt.policies.wrap_up_at_minutes > prompt.policies.edge_cases_after_minutes);
    }

    #[test]
    fn test_partial_overlay_keeps_defaults() {
        let prompt =
            InterviewerPrompt::from_json_str(r#"{"policies": {"wrap_up_at_minutes": 30}}"#).unwrap();
        assert_eq!(prompt.policies.wrap_up_at_minutes, 30);
        // Untouched sibling keys survive the merge
        assert!(prompt.policies.follow_up_on_diffs);
        assert_eq!(prompt.session_flow.len(), 4);
    }

    #[test]
    fn test_overlay_replaces_arrays_wholesale() {
        let prompt = InterviewerPrompt::from_json_str(
            r#"{"rubric": {"dimensions": ["Communication"]}}"#,
        )
        .unwrap();
        assert_eq!(prompt.rubric.dimensions, vec!["Communication".to_string()]);
    }

    #[test]
    fn test_empty_session_flow_is_repaired() {
        let prompt = InterviewerPrompt::from_json_str(r#"{"session_flow": []}"#).unwrap();
        assert_eq!(prompt.session_flow.len(), 4);
    }

    #[test]
    fn test_out_of_range_scale_is_repaired() {
        let prompt =
            InterviewerPrompt::from_json_str(r#"{"rubric": {"scale": [6, 7, 8]}}"#).unwrap();
        assert_eq!(prompt.rubric.scale, vec![1, 2, 3, 4, 5]);

        let prompt =
            InterviewerPrompt::from_json_str(r#"{"rubric": {"scale": [0, 2, 3, 9]}}"#).unwrap();
        assert_eq!(prompt.rubric.scale, vec![2, 3]);
    }

    #[test]
    fn test_null_values_are_ignored() {
        let prompt = InterviewerPrompt::from_json_str(r#"{"roles": {"system": null}}"#).unwrap();
        assert!(prompt.roles.system.contains("interviewer"));
    }

    #[test]
    fn test_invalid_type_is_an_error_in_strict_mode() {
        let result =
            InterviewerPrompt::from_json_str(r#"{"policies": {"wrap_up_at_minutes": "soon"}}"#);
        assert!(matches!(result, Err(PromptConfigError::Parse(_))));
    }

    #[test]
    fn test_load_or_default_falls_back_on_missing_file() {
        let prompt =
            InterviewerPrompt::load_or_default(Some(Path::new("/nonexistent/prompt.json"))).unwrap();
        assert_eq!(prompt.session_flow[0].stage, "intro");
    }

    #[test]
    fn test_load_or_default_falls_back_on_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let prompt = InterviewerPrompt::load_or_default(Some(file.path())).unwrap();
        assert_eq!(prompt.policies.wrap_up_at_minutes, 22);
    }

    #[test]
    fn test_load_or_default_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!({"policies": {"edge_cases_after_minutes": 5}})).unwrap();
        let prompt = InterviewerPrompt::load_or_default(Some(file.path())).unwrap();
        assert_eq!(prompt.policies.edge_cases_after_minutes, 5);
    }

    #[test]
    fn test_system_prompt_appends_safety() {
        let prompt = InterviewerPrompt::embedded_default().unwrap();
        let system = prompt.system_prompt();
        assert!(system.starts_with(&prompt.roles.system));
        assert!(system.contains("Safety Guidelines: "));
        assert!(system.ends_with(&prompt.roles.safety));
    }

    #[test]
    fn test_merge_json_inserts_new_keys() {
        let mut base = json!({"a": {"b": 1}});
        merge_json(&mut base, json!({"a": {"c": 2}, "d": 3}));
        assert_eq!(base, json!({"a": {"b": 1, "c": 2}, "d": 3}));
    }
}
