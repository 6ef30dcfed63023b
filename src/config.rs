//! Environment-driven settings.
//!
//! Variables can come from the process environment or from `.env.local` /
//! `.env` (loaded in `run()` before this is read).

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::llm::prompts::DEFAULT_MODEL;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_SPREADSHEET_NAME: &str = "AI Listbuilder";
pub const DEFAULT_WORKSHEET_TITLE: &str = "Prospects";
pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "ai-listbuilder-service-account.json";
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// None when unset or blank; analysis is then unavailable.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub spreadsheet_name: String,
    pub worksheet_title: String,
    pub service_account_file: PathBuf,
    pub max_body_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key → value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let bind = or("LISTBUILDER_BIND", DEFAULT_BIND);
        let bind_addr = bind.parse().map_err(|_| ConfigError::InvalidAddress {
            var: "LISTBUILDER_BIND",
            value: bind.clone(),
        })?;

        let max_body_bytes = match get("LISTBUILDER_MAX_BODY_BYTES") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
                var: "LISTBUILDER_MAX_BODY_BYTES",
                value: raw.clone(),
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            bind_addr,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: or("GEMINI_MODEL", DEFAULT_MODEL),
            spreadsheet_name: or("GOOGLE_SPREADSHEET_NAME", DEFAULT_SPREADSHEET_NAME),
            worksheet_title: or("GOOGLE_WORKSHEET_TITLE", DEFAULT_WORKSHEET_TITLE),
            service_account_file: PathBuf::from(or(
                "GOOGLE_SERVICE_ACCOUNT_FILE",
                DEFAULT_SERVICE_ACCOUNT_FILE,
            )),
            max_body_bytes,
        })
    }
}
