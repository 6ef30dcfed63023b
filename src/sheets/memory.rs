//! In-process SheetBackend. Behaves like a freshly initialized worksheet:
//! header row first, data rows appended after it.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::row::header_cells;
use super::SheetBackend;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<Value>>>,
}

impl MemorySheet {
    /// A sheet holding only the header row.
    pub fn with_headers() -> Self {
        Self {
            rows: Mutex::new(vec![header_cells()]),
        }
    }

    /// A sheet pre-filled with `rows` (header row included, if wanted).
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn snapshot(&self) -> Vec<Vec<Value>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<Value>>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SheetBackend for MemorySheet {
    async fn append_row(&self, cells: Vec<Value>) -> Result<u32, StoreError> {
        let mut rows = self.lock();
        rows.push(cells);
        Ok(rows.len() as u32)
    }

    async fn read_rows(&self) -> Result<Vec<Vec<Value>>, StoreError> {
        Ok(self.snapshot())
    }
}
