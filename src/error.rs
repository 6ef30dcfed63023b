//! Error types for the analysis pipeline, the record store and configuration.
//!
//! None of these ever reach the HTTP layer as a fault: handlers render them
//! into `{success: false, error}` envelopes through `Display`.

use thiserror::Error;

/// Anything that can go wrong between receiving a screenshot and getting
/// text back from the vision model.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed data URI: no ',' separating header from payload")]
    DataUri,

    #[error("Invalid base64 screenshot: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Cannot decode screenshot image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Vision API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vision API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Vision API returned no text: {0}")]
    EmptyResponse(String),
}

/// Failures talking to (or setting up) the spreadsheet store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Google Sheets not configured")]
    NotConfigured,

    #[error("Cannot read service account file {path}: {source}")]
    CredentialsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service account JSON: {0}")]
    CredentialsJson(#[from] serde_json::Error),

    #[error("Cannot sign service account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Sheets request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{api} API returned {status}: {body}")]
    Api {
        api: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected {api} response: {detail}")]
    UnexpectedResponse { api: &'static str, detail: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidAddress { var: &'static str, value: String },

    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Startup failures that stop the server from listening.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keep error bodies from upstream APIs short enough to log and return.
pub(crate) fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
