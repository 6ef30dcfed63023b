//! Record store — prospects as rows in a spreadsheet.
//!
//!   - row.rs    — StoredRow shaping + stats aggregation (pure)
//!   - auth.rs   — service-account token source
//!   - google.rs — Google Sheets backend
//!   - memory.rs — in-process backend

pub mod auth;
pub mod google;
pub mod memory;
pub mod row;

pub use google::GoogleSheets;
pub use memory::MemorySheet;
pub use row::{ProspectStats, StoredRow, HEADERS};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::llm::{AnalysisContext, ProspectRecord};

/// Append-only row storage.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Append one row; returns its 1-based row number (header is row 1).
    async fn append_row(&self, cells: Vec<Value>) -> Result<u32, StoreError>;

    /// Every stored row, header row first.
    async fn read_rows(&self) -> Result<Vec<Vec<Value>>, StoreError>;
}

/// Result of storing one prospect, serialized into API responses.
#[derive(Debug, Clone, Serialize)]
pub struct StorageOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prospect_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StorageOutcome {
    fn failed(error: &StoreError) -> Self {
        Self {
            success: false,
            row_number: None,
            prospect_name: None,
            error: Some(error.to_string()),
        }
    }
}

/// Handle to the (optional) spreadsheet. Cheap to clone.
#[derive(Clone, Default)]
pub struct RecordStore {
    backend: Option<Arc<dyn SheetBackend>>,
}

impl RecordStore {
    pub fn new(backend: Option<Arc<dyn SheetBackend>>) -> Self {
        Self { backend }
    }

    pub fn connected(backend: Arc<dyn SheetBackend>) -> Self {
        Self::new(Some(backend))
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Flatten a record into a StoredRow and append it.
    pub async fn add_prospect(
        &self,
        record: &ProspectRecord,
        model_used: &str,
        context: &AnalysisContext,
    ) -> StorageOutcome {
        let Some(backend) = &self.backend else {
            return StorageOutcome::failed(&StoreError::NotConfigured);
        };

        let row = StoredRow::build(record, model_used, context, chrono::Local::now().naive_local());
        match backend.append_row(row.cells()).await {
            Ok(row_number) => {
                log::info!("[SHEETS] Added prospect to row {}", row_number);
                StorageOutcome {
                    success: true,
                    row_number: Some(row_number),
                    prospect_name: Some(
                        record.get_str("person_name").unwrap_or("Unknown").to_string(),
                    ),
                    error: None,
                }
            }
            Err(e) => {
                log::error!("[SHEETS] Failed to add prospect: {}", e);
                StorageOutcome::failed(&e)
            }
        }
    }

    /// Aggregate statistics over every stored row.
    pub async fn get_stats(&self) -> Result<ProspectStats, StoreError> {
        let backend = self.backend.as_ref().ok_or(StoreError::NotConfigured)?;
        let rows = backend.read_rows().await?;
        let now = chrono::Local::now();
        Ok(row::compute_stats(
            &rows,
            &now.format(row::DATE_FORMAT).to_string(),
            crate::iso_timestamp(now),
        ))
    }
}
