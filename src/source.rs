// src/source.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

use crate::{
    config::{ColumnMap, SourceConfig, SourceFormat},
    csv::{self, RawRow},
    error::CycleError,
};

/// Column layout of rows built from JSON objects.
pub const JSON_COLUMNS: ColumnMap = ColumnMap {
    name: 0,
    region: 1,
    status: Some(2),
    latitude: 3,
    longitude: 4,
    fuel_date: 5,
};

/// Accepted keys per JSON field, in `JSON_COLUMNS` order.
static JSON_KEYS: [&[&str]; 6] = [
    &["SiteName", "siteName", "name"],
    &["Region", "RegionName", "regionName", "region"],
    &["COWStatus", "status"],
    &["lat", "latitude", "Lat"],
    &["lng", "lon", "longitude", "Lng"],
    &["NextFuelingPlan", "nextFuelDate", "fuel_date"],
];

/// Where the rows in a [`Batch`] put their fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Sheet export: configured column map, header handling per config.
    Sheet,
    /// Built from JSON objects: [`JSON_COLUMNS`], never a header row.
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub rows: Vec<RawRow>,
    pub layout: Layout,
}

/// Anything that can produce one batch of rows per cycle.
pub trait FeedSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Batch, CycleError>> + Send;
}

/// Polls a URL over HTTP.
pub struct HttpSource {
    client: Client,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: SourceConfig) -> Self {
        Self { client, config }
    }

    async fn get_text_core(&self) -> Result<String, CycleError> {
        let url = &self.config.url;
        debug!("Fetching text from {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CycleError::Network {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CycleError::Status {
                url: url.clone(),
                status,
            });
        }
        resp.text().await.map_err(|source| CycleError::Network {
            url: url.clone(),
            source,
        })
    }

    async fn get_text_with_retry(&self) -> Result<String, CycleError> {
        let url = &self.config.url;
        let mut attempts = 0;
        loop {
            match self.get_text_core().await {
                Ok(t) => return Ok(t),
                Err(e) if attempts < self.config.max_retries => {
                    attempts += 1;
                    let backoff = self.config.initial_backoff_ms * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(%url, error = %e, "Exhausted retries");
                    return Err(e);
                }
            }
        }
    }
}

impl FeedSource for HttpSource {
    #[instrument(level = "info", skip(self), fields(url = %self.config.url))]
    async fn fetch(&self) -> Result<Batch, CycleError> {
        let body = self.get_text_with_retry().await?;
        decode(self.config.format, &body)
    }
}

/// Turn a response body into rows.
pub fn decode(format: SourceFormat, body: &str) -> Result<Batch, CycleError> {
    match format {
        SourceFormat::Csv => decode_csv(body),
        SourceFormat::Json => decode_json(body),
    }
}

fn decode_csv(body: &str) -> Result<Batch, CycleError> {
    let head = body.trim_start().get(..15).unwrap_or(body.trim_start());
    let head = head.to_ascii_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<html") {
        return Err(CycleError::Parse(
            "expected CSV but got an HTML page (is the sheet published?)".to_string(),
        ));
    }
    Ok(Batch {
        rows: csv::parse(body),
        layout: Layout::Sheet,
    })
}

fn decode_json(body: &str) -> Result<Batch, CycleError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CycleError::Parse(format!("invalid JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(CycleError::Parse("expected a JSON array of rows".to_string()));
    };

    let rows = items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(obj) => Ok(json_row(obj)),
            other => Err(CycleError::Parse(format!(
                "row {idx} is not an object: {other}"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Batch {
        rows,
        layout: Layout::Json,
    })
}

fn json_row(obj: &Map<String, Value>) -> RawRow {
    JSON_KEYS
        .iter()
        .map(|keys| {
            keys.iter()
                .find_map(|k| obj.get(*k))
                .map(json_text)
                .unwrap_or_default()
        })
        .collect::<Vec<String>>()
        .into()
}

fn json_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
