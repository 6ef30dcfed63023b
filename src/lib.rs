//! Auto-Listbuilder — screenshot-to-prospect backend.
//!
//! This is the service shell that wires the domains together. No business
//! logic lives here: only module declarations, collaborator start-up, and
//! the server loop.
//!
//!   - llm/      — prompt, Gemini client, response parsing
//!   - pipeline  — screenshot analysis orchestration
//!   - sheets/   — record store (Google Sheets)
//!   - server    — HTTP routes for the browser extension
//!   - config    — environment-driven settings

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod sheets;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use chrono::{DateTime, TimeZone};

use config::Settings;
use error::ServerError;
use llm::GeminiVision;
use pipeline::AnalysisService;
use server::AppState;
use sheets::auth::ServiceAccountKey;
use sheets::{GoogleSheets, RecordStore};

/// Local ISO-8601 timestamp with microseconds, as reported in API responses.
pub fn iso_timestamp<Tz: TimeZone>(at: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Load settings, start collaborators, serve until killed.
pub async fn run() -> Result<(), ServerError> {
    // Load .env.local → .env from the working directory; first one wins.
    'env_load: for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }

    env_logger::init();

    let settings = Settings::from_env()?;
    log::info!("Auto-Listbuilder starting up");

    let state = AppState {
        analyzer: start_analyzer(&settings),
        store: connect_store(&settings).await,
    };

    log::info!(
        "[STARTUP] Vision model: {}",
        if state.analyzer.is_some() { settings.gemini_model.as_str() } else { "not configured" }
    );
    log::info!(
        "[STARTUP] Google Sheets: {}",
        if state.store.is_connected() { "connected" } else { "not configured" }
    );

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: settings.bind_addr,
            source,
        })?;
    log::info!("[STARTUP] Server running at http://{}", settings.bind_addr);

    axum::serve(listener, server::router(state, settings.max_body_bytes)).await?;
    Ok(())
}

/// Gemini client + pipeline, or None when no API key is configured.
fn start_analyzer(settings: &Settings) -> Option<Arc<AnalysisService>> {
    let model = GeminiVision::from_key(
        settings.gemini_api_key.as_deref(),
        Some(settings.gemini_model.as_str()),
    );
    match model {
        Some(model) => {
            log::info!("[STARTUP] Gemini Vision initialized ({})", model.model());
            Some(Arc::new(AnalysisService::new(Arc::new(model))))
        }
        None => {
            log::error!("[STARTUP] GEMINI_API_KEY not found — analysis disabled");
            None
        }
    }
}

/// Open the spreadsheet; any failure leaves the store disconnected.
async fn connect_store(settings: &Settings) -> RecordStore {
    let key = match ServiceAccountKey::from_file(&settings.service_account_file) {
        Ok(key) => key,
        Err(e) => {
            log::error!("[STARTUP] Google Sheets service account unavailable: {}", e);
            return RecordStore::default();
        }
    };

    match GoogleSheets::connect(key, &settings.spreadsheet_name, &settings.worksheet_title).await {
        Ok(sheets) => {
            log::info!("[STARTUP] Spreadsheet id: {}", sheets.spreadsheet_id());
            RecordStore::connected(Arc::new(sheets))
        }
        Err(e) => {
            log::error!("[STARTUP] Google Sheets setup failed: {}", e);
            RecordStore::default()
        }
    }
}
