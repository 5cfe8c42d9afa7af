//! Session context: what the interviewer currently knows about the problem,
//! the candidate's code and the clock.

use serde::{Deserialize, Serialize};

/// Default session cap: 25 minutes.
pub const DEFAULT_SESSION_CAP_SEC: u64 = 1500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemContext {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeContext {
    #[serde(default)]
    pub language: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_diff: Option<String>,
}

/// Floors seconds to minutes, saturating at `u32::MAX`.
pub fn whole_minutes(secs: u64) -> u32 {
    u32::try_from(secs / 60).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub elapsed_sec: u64,
    pub session_cap_sec: u64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            elapsed_sec: 0,
            session_cap_sec: DEFAULT_SESSION_CAP_SEC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub stt: String,
    pub tts: String,
    pub screenshare: bool,
    pub extension_payload: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            stt: "chrome_web_speech_api".to_string(),
            tts: "speechSynthesis".to_string(),
            screenshare: true,
            extension_payload: true,
        }
    }
}

/// Per-field capability overrides; unset fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapabilitiesUpdate {
    pub stt: Option<String>,
    pub tts: Option<String>,
    pub screenshare: Option<bool>,
    pub extension_payload: Option<bool>,
}

/// Partial update applied by the controller. Present sections replace the
/// current ones wholesale, except capabilities which merge per field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextUpdate {
    pub problem: Option<ProblemContext>,
    pub code: Option<CodeContext>,
    pub telemetry: Option<Telemetry>,
    pub capabilities: Option<CapabilitiesUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub problem: Option<ProblemContext>,
    pub code: Option<CodeContext>,
    pub telemetry: Telemetry,
    pub capabilities: Capabilities,
}

impl SessionContext {
    pub fn new(problem: Option<ProblemContext>, code: Option<CodeContext>, session_cap_sec: u64) -> Self {
        Self {
            problem,
            code,
            telemetry: Telemetry {
                elapsed_sec: 0,
                session_cap_sec,
            },
            capabilities: Capabilities::default(),
        }
    }

    /// A problem counts only once it has a title.
    pub fn has_problem(&self) -> bool {
        self.problem
            .as_ref()
            .is_some_and(|p| !p.title.trim().is_empty())
    }

    /// Code counts only once the editor holds some text.
    pub fn has_code(&self) -> bool {
        self.code.as_ref().is_some_and(|c| !c.text.trim().is_empty())
    }

    pub fn has_complete_context(&self) -> bool {
        self.has_problem() && self.has_code()
    }

    pub fn elapsed_minutes(&self) -> u32 {
        whole_minutes(self.telemetry.elapsed_sec)
    }

    pub fn session_cap_minutes(&self) -> u32 {
        whole_minutes(self.telemetry.session_cap_sec)
    }

    pub fn problem_title(&self) -> Option<&str> {
        self.problem
            .as_ref()
            .map(|p| p.title.trim())
            .filter(|t| !t.is_empty())
    }

    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(problem) = update.problem {
            self.problem = Some(problem);
        }
        if let Some(code) = update.code {
            self.code = Some(code);
        }
        if let Some(telemetry) = update.telemetry {
            self.telemetry = telemetry;
        }
        if let Some(caps) = update.capabilities {
            if let Some(stt) = caps.stt {
                self.capabilities.stt = stt;
            }
            if let Some(tts) = caps.tts {
                self.capabilities.tts = tts;
            }
            if let Some(screenshare) = caps.screenshare {
                self.capabilities.screenshare = screenshare;
            }
            if let Some(extension_payload) = caps.extension_payload {
                self.capabilities.extension_payload = extension_payload;
            }
        }
    }
}
