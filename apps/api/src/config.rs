use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use crate::interview::session::ResponseMode;
use crate::llm_client::OPENROUTER_API_URL;

const DEFAULT_HUB_QUEUE_CAPACITY: usize = 16;

/// Application configuration loaded from environment variables.
/// Everything has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_api_url: String,
    /// Overrides `llm.cloud.model` from the interviewer prompt config.
    pub llm_model: Option<String>,
    pub prompt_path: Option<PathBuf>,
    pub response_mode: ResponseMode,
    pub hub_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let openrouter_api_key = optional_env("OPENROUTER_API_KEY");
        let response_mode = match optional_env("RESPONSE_MODE") {
            Some(raw) => raw.parse::<ResponseMode>().unwrap_or_else(|_| {
                warn!("Unknown RESPONSE_MODE '{raw}', falling back to scripted");
                ResponseMode::Scripted
            }),
            None if openrouter_api_key.is_some() => ResponseMode::Model,
            None => ResponseMode::Scripted,
        };

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            openrouter_api_key,
            openrouter_api_url: optional_env("OPENROUTER_API_URL")
                .unwrap_or_else(|| OPENROUTER_API_URL.to_string()),
            llm_model: optional_env("LLM_MODEL"),
            prompt_path: optional_env("INTERVIEWER_PROMPT_PATH").map(PathBuf::from),
            response_mode,
            hub_queue_capacity: match optional_env("HUB_QUEUE_CAPACITY") {
                Some(raw) => raw
                    .parse::<usize>()
                    .context("HUB_QUEUE_CAPACITY must be a positive integer")?
                    .max(1),
                None => DEFAULT_HUB_QUEUE_CAPACITY,
            },
        })
    }
}

/// Reads an env var, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
