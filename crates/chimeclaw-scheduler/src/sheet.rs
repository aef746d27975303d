//! Remote sheet source — fetches the published CSV and parses raw rows.

use async_trait::async_trait;
use chimeclaw_core::error::{ChimeClawError, Result};

/// Source of raw event table rows. Schedulers depend on this seam so
/// tests can feed canned tables.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch all rows in sheet order, header row included.
    async fn fetch(&self) -> Result<Vec<Vec<String>>>;
}

/// Published spreadsheet CSV over HTTP. No caching; every call re-fetches.
pub struct SheetSource {
    url: String,
    client: reqwest::Client,
}

impl SheetSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EventSource for SheetSource {
    async fn fetch(&self) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| ChimeClawError::Fetch(format!("Sheet request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ChimeClawError::Fetch(format!(
                "Sheet returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChimeClawError::Fetch(format!("Sheet body read failed: {e}")))?;

        parse_rows(&body)
    }
}

/// Parse CSV text into raw string rows. Field counts may differ between
/// rows; short rows are kept here and rejected row-locally downstream.
pub fn parse_rows(data: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| ChimeClawError::Parse(format!("Bad CSV record: {e}")))?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(rows)
}
