//! Google Sheets backend — Sheets v4 for values, Drive v3 to find the
//! spreadsheet by name.
//!
//! `connect` does the one-time setup: open (or create) the spreadsheet, then
//! open (or add) the worksheet and write the header row into a new one.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::auth::{ServiceAccountKey, TokenSource};
use super::row::header_cells;
use super::SheetBackend;
use crate::error::{truncate_body, StoreError};

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4";
pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLS: u32 = 20;

pub struct GoogleSheets {
    client: reqwest::Client,
    tokens: TokenSource,
    spreadsheet_id: String,
    worksheet: String,
}

impl GoogleSheets {
    /// Authenticate and make sure the spreadsheet and worksheet exist.
    pub async fn connect(
        key: ServiceAccountKey,
        spreadsheet_name: &str,
        worksheet: &str,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::new();
        let tokens = TokenSource::new(key, client.clone())?;
        let mut sheets = Self {
            client,
            tokens,
            spreadsheet_id: String::new(),
            worksheet: worksheet.to_string(),
        };

        sheets.spreadsheet_id = match sheets.find_spreadsheet(spreadsheet_name).await? {
            Some(id) => id,
            None => {
                let id = sheets.create_spreadsheet(spreadsheet_name).await?;
                log::info!("[SHEETS] Created new spreadsheet: {}", spreadsheet_name);
                id
            }
        };

        if !sheets.worksheet_titles().await?.iter().any(|t| t == worksheet) {
            sheets.add_worksheet().await?;
            sheets.append_row(header_cells()).await?;
            log::info!("[SHEETS] Sheet headers configured");
        }

        log::info!(
            "[SHEETS] Connected to '{}' / '{}' as {}",
            spreadsheet_name,
            worksheet,
            sheets.tokens.client_email()
        );
        Ok(sheets)
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    async fn find_spreadsheet(&self, name: &str) -> Result<Option<String>, StoreError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let request = self
            .client
            .get(format!("{}/files", DRIVE_API))
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);
        let body = self.send("Drive", request).await?;
        Ok(body["files"][0]["id"].as_str().map(str::to_string))
    }

    async fn create_spreadsheet(&self, name: &str) -> Result<String, StoreError> {
        let request = self
            .client
            .post(format!("{}/spreadsheets", SHEETS_API))
            .json(&json!({ "properties": { "title": name } }));
        let body = self.send("Sheets", request).await?;
        body["spreadsheetId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StoreError::UnexpectedResponse {
                api: "Sheets",
                detail: "create response has no spreadsheetId".to_string(),
            })
    }

    async fn worksheet_titles(&self) -> Result<Vec<String>, StoreError> {
        let url = self.url(&[self.spreadsheet_id.as_str()])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let body = self.send("Sheets", request).await?;
        Ok(body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_worksheet(&self) -> Result<(), StoreError> {
        let target = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url(&[target.as_str()])?;
        let request = self.client.post(url).json(&json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": self.worksheet,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS
                        }
                    }
                }
            }]
        }));
        self.send("Sheets", request).await?;
        log::info!("[SHEETS] Added worksheet '{}'", self.worksheet);
        Ok(())
    }

    /// `https://sheets.googleapis.com/v4/spreadsheets/<segments...>`, with
    /// each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, StoreError> {
        let bad_url = |detail: String| StoreError::UnexpectedResponse { api: "Sheets", detail };
        let mut url = reqwest::Url::parse(SHEETS_API).map_err(|e| bad_url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| bad_url("base URL cannot have path segments".to_string()))?
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, suffix: &str) -> Result<reqwest::Url, StoreError> {
        let range = format!("{}{}", a1_sheet_range(&self.worksheet), suffix);
        self.url(&[self.spreadsheet_id.as_str(), "values", range.as_str()])
    }

    /// Attach a bearer token, send, and decode the JSON body of a 2xx reply.
    async fn send(
        &self,
        api: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("[SHEETS] {} API returned {}: {}", api, status, truncate_body(&body, 200));
            return Err(StoreError::Api {
                api,
                status: status.as_u16(),
                body: truncate_body(&body, 500),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn append_row(&self, cells: Vec<Value>) -> Result<u32, StoreError> {
        let url = self.values_url(":append")?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": [cells] }));
        let body = self.send("Sheets", request).await?;

        match body["updates"]["updatedRange"].as_str().and_then(updated_row) {
            Some(row) => Ok(row),
            None => Ok(self.read_rows().await?.len() as u32),
        }
    }

    async fn read_rows(&self) -> Result<Vec<Vec<Value>>, StoreError> {
        let url = self.values_url("")?;
        let request = self.client.get(url).query(&[
            ("valueRenderOption", "UNFORMATTED_VALUE"),
            ("majorDimension", "ROWS"),
        ]);
        let body = self.send("Sheets", request).await?;
        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| row.as_array().cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

/// A1 range covering a whole worksheet: `'Title'`, quotes doubled.
pub fn a1_sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Last row number of an A1 range such as `'Prospects'!A7:S7`.
pub fn updated_row(range: &str) -> Option<u32> {
    let cells = range.rsplit('!').next()?;
    let last = cells.rsplit(':').next()?;
    last.trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}
