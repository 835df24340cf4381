use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::catalog::{is_retryable_error, is_retryable_status};
use crate::error::SynthError;
use crate::schema::SheetLayout;

pub const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com";

/// Append-only mirror of uploaded records, one tab per synthesis type.
///
/// Implementations own tab creation and header initialisation.
pub trait SheetMirror: Send + Sync {
    fn append_row(&self, layout: &SheetLayout, values: &[String]) -> Result<(), SynthError>;
}

#[derive(Clone)]
pub struct SheetsHttpClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsHttpClient {
    pub fn new(base_url: &str, spreadsheet_id: &str, access_token: &str) -> Result<Self, SynthError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("synth-upload/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SynthError::SheetsHttp(err.to_string()))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| SynthError::MissingSetting("a valid Google Sheets token".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SynthError::SheetsHttp(err.to_string()))?;
        let base_url =
            Url::parse(base_url).map_err(|err| SynthError::SheetsHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    fn url(&self, tail: &[&str]) -> Result<Url, SynthError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SynthError::SheetsHttp("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn send(&self, make_req: impl Fn() -> RequestBuilder) -> Result<Response, SynthError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    if attempt < MAX_RETRIES && is_retryable_status(resp.status().as_u16()) {
                        std::thread::sleep(Duration::from_millis(
                            BASE_DELAY_MS * (attempt as u64 + 1),
                        ));
                        attempt += 1;
                        continue;
                    }
                    return Self::handle_status(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        std::thread::sleep(Duration::from_millis(
                            BASE_DELAY_MS * (attempt as u64 + 1),
                        ));
                        attempt += 1;
                        continue;
                    }
                    return Err(SynthError::SheetsHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(response: Response) -> Result<Response, SynthError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Google Sheets request failed".to_string());
        Err(SynthError::SheetsStatus { status, message })
    }

    fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, SynthError> {
        response
            .json()
            .map_err(|err| SynthError::SheetsHttp(err.to_string()))
    }

    fn batch_update(&self, requests: Vec<Value>) -> Result<Value, SynthError> {
        let url = self.url(&[])?;
        let url = Url::parse(&format!("{url}:batchUpdate"))
            .map_err(|err| SynthError::SheetsHttp(err.to_string()))?;
        let body = json!({ "requests": requests });
        let response = self.send(|| self.client.post(url.clone()).json(&body))?;
        Self::parse(response)
    }

    /// Returns the numeric sheet id of the layout's tab, creating the tab if needed.
    fn ensure_tab(&self, layout: &SheetLayout) -> Result<i64, SynthError> {
        let url = self.url(&[])?;
        let response = self.send(|| {
            self.client
                .get(url.clone())
                .query(&[("fields", "sheets.properties")])
        })?;
        let info: SpreadsheetInfo = Self::parse(response)?;
        if let Some(entry) = info
            .sheets
            .iter()
            .find(|entry| entry.properties.title == layout.sheet_name)
        {
            debug!(sheet = layout.sheet_name, "found worksheet");
            return Ok(entry.properties.sheet_id);
        }

        info!(sheet = layout.sheet_name, "creating worksheet");
        let reply = self.batch_update(vec![json!({
            "addSheet": {
                "properties": {
                    "title": layout.sheet_name,
                    "gridProperties": {
                        "rowCount": 100,
                        "columnCount": layout.columns.len(),
                    }
                }
            }
        })])?;
        reply
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(Value::as_i64)
            .ok_or_else(|| SynthError::SheetsHttp("addSheet reply has no sheetId".to_string()))
    }

    /// Writes the two header rows when the tab holds no more than two rows.
    fn initialize_tab(&self, layout: &SheetLayout, sheet_id: i64) -> Result<(), SynthError> {
        let head_range = format!("{}!1:3", layout.sheet_name);
        let url = self.url(&["values", &head_range])?;
        let response = self.send(|| self.client.get(url.clone()))?;
        let existing: ValueRange = Self::parse(response)?;
        if existing.values.len() > 2 {
            debug!(sheet = layout.sheet_name, "worksheet already initialized");
            return Ok(());
        }

        let clear_url = Url::parse(&format!(
            "{}:clear",
            self.url(&["values", layout.sheet_name])?
        ))
        .map_err(|err| SynthError::SheetsHttp(err.to_string()))?;
        self.send(|| self.client.post(clear_url.clone()).json(&json!({})))?;

        let header_range = format!("{}!A1", layout.sheet_name);
        let url = self.url(&["values", &header_range])?;
        let body = json!({
            "range": header_range,
            "majorDimension": "ROWS",
            "values": [layout.section_row(), layout.column_row()],
        });
        self.send(|| {
            self.client
                .put(url.clone())
                .query(&[("valueInputOption", "RAW")])
                .json(&body)
        })?;

        let merges = layout
            .merge_ranges()
            .into_iter()
            .map(|(start, end)| {
                json!({
                    "mergeCells": {
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": 0,
                            "endRowIndex": 1,
                            "startColumnIndex": start - 1,
                            "endColumnIndex": end,
                        },
                        "mergeType": "MERGE_ALL",
                    }
                })
            })
            .collect();
        self.batch_update(merges)?;
        info!(sheet = layout.sheet_name, "initialized worksheet headers");
        Ok(())
    }
}

impl SheetMirror for SheetsHttpClient {
    fn append_row(&self, layout: &SheetLayout, values: &[String]) -> Result<(), SynthError> {
        let sheet_id = self.ensure_tab(layout)?;
        self.initialize_tab(layout, sheet_id)?;

        let range = format!("{}!A1", layout.sheet_name);
        let url = Url::parse(&format!("{}:append", self.url(&["values", &range])?))
            .map_err(|err| SynthError::SheetsHttp(err.to_string()))?;
        let body = json!({ "majorDimension": "ROWS", "values": [values] });
        // appends are not retried; a repeated append would duplicate the row
        let response = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body)
            .send()
            .map_err(|err| SynthError::SheetsHttp(err.to_string()))?;
        Self::handle_status(response)?;
        info!(sheet = layout.sheet_name, "appended row");
        Ok(())
    }
}
