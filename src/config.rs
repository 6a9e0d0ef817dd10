use std::collections::HashMap;
use std::env;
use std::fs;

use chrono_tz::Tz;

use crate::error::{CalendarError, Result};
use crate::timefmt;

/// `KEY=value` pairs read from a dotenv-style file.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CalendarError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(CalendarError::Config(format!(
                    "Invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// File value first, then the process environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Cli,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiBackend {
    Service,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    pub ai_backend: AiBackend,
    pub ai_service_url: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub timezone: Tz,
    pub api_bind: String,
    pub log_level: String,
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let get = |key: &str, default: &str| -> String {
            config
                .lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let run_mode = match get("RUN_MODE", "cli").to_lowercase().as_str() {
            "cli" => RunMode::Cli,
            "api" => RunMode::Api,
            other => {
                return Err(CalendarError::Config(format!("Invalid run mode {}", other)));
            }
        };
        let ai_backend = match get("AI_BACKEND", "service").to_lowercase().as_str() {
            "service" => AiBackend::Service,
            "openai" => AiBackend::OpenAI,
            other => {
                return Err(CalendarError::Config(format!("Invalid AI backend {}", other)));
            }
        };

        Ok(Self {
            run_mode,
            ai_backend,
            ai_service_url: get("AI_SERVICE_URL", "http://127.0.0.1:8000"),
            openai_base_url: get("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_api_key: get("OPENAI_API_KEY", "dummy"),
            openai_model: get("OPENAI_MODEL", "gpt-4o-mini"),
            timezone: timefmt::parse_timezone(&get("CALENDAR_TIMEZONE", "UTC"))?,
            api_bind: get("API_BIND", "127.0.0.1:3030"),
            log_level: get("LOG_LEVEL", "info"),
        })
    }
}
