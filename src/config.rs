// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::classify::{BucketColors, Thresholds};

/// Everything the pipeline needs, loadable from a YAML file. Every section
/// has defaults, so a file only has to name what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: SourceConfig,
    pub columns: ColumnMap,
    pub filter: FilterConfig,
    pub urgency: Thresholds,
    pub colors: BucketColors,
    pub refresh_interval_ms: u64,
    /// When set, every successful cycle also writes the record list here.
    pub export_path: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            columns: ColumnMap::default(),
            filter: FilterConfig::default(),
            urgency: Thresholds::default(),
            colors: BucketColors::default(),
            refresh_interval_ms: 15 * 60 * 1000,
            export_path: None,
        }
    }
}

impl DashboardConfig {
    /// Read and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = Self::from_yaml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            bail!("source.url must be set");
        }
        url::Url::parse(&self.source.url)
            .with_context(|| format!("source.url {:?} is not a valid URL", self.source.url))?;
        if self.urgency.after_days < self.urgency.tomorrow_days {
            bail!(
                "urgency.after_days ({}) must not be below urgency.tomorrow_days ({})",
                self.urgency.after_days,
                self.urgency.tomorrow_days
            );
        }
        if self.refresh_interval_ms == 0 {
            bail!("refresh_interval_ms must be positive");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Payload shape served by the source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub format: SourceFormat,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            format: SourceFormat::Csv,
            timeout_secs: 30,
            max_retries: 2,
            initial_backoff_ms: 500,
        }
    }
}

/// Zero-based column positions in the sheet. The sheet layout is frozen, so
/// positions are configured rather than looked up from header names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub name: usize,
    pub region: usize,
    /// Optional status column; no status filtering when absent.
    pub status: Option<usize>,
    pub latitude: usize,
    pub longitude: usize,
    pub fuel_date: usize,
}

impl Default for ColumnMap {
    /// Energy Dashboard sheet: B, D, J, L, M, AJ.
    fn default() -> Self {
        Self {
            name: 1,
            region: 3,
            status: Some(9),
            latitude: 11,
            longitude: 12,
            fuel_date: 35,
        }
    }
}

/// How the first row is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// Skip the first row when its name cell contains the header marker.
    #[default]
    Detect,
    Present,
    Absent,
}

/// What happens to a site whose fuel date is blank or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDatePolicy {
    /// Keep it; it classifies as unknown and counts toward the total.
    #[default]
    Keep,
    /// Drop it during normalization.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Region to keep, compared trimmed and case-insensitively. `None` keeps all.
    pub region: Option<String>,
    /// Statuses to keep when a status column is configured. Empty keeps all.
    pub allowed_statuses: Vec<String>,
    pub header: HeaderMode,
    pub header_marker: String,
    pub missing_date: MissingDatePolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            region: Some("Central".to_string()),
            allowed_statuses: vec!["ON-AIR".to_string(), "IN PROGRESS".to_string()],
            header: HeaderMode::Detect,
            header_marker: "site".to_string(),
            missing_date: MissingDatePolicy::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg = DashboardConfig::from_yaml(
            r#"
source:
  url: "https://example.com/sheet.csv"
columns:
  name: 0
  region: 1
  status: null
  latitude: 2
  longitude: 3
  fuel_date: 4
filter:
  region: East
  missing_date: drop
urgency:
  after_days: 3
refresh_interval_ms: 60000
"#,
        )
        .unwrap();

        assert_eq!(cfg.source.format, SourceFormat::Csv);
        assert_eq!(cfg.source.max_retries, 2);
        assert_eq!(cfg.columns.status, None);
        assert_eq!(cfg.columns.fuel_date, 4);
        assert_eq!(cfg.filter.region.as_deref(), Some("East"));
        assert_eq!(cfg.filter.header, HeaderMode::Detect);
        assert_eq!(cfg.filter.missing_date, MissingDatePolicy::Drop);
        assert_eq!(cfg.urgency.tomorrow_days, 1);
        assert_eq!(cfg.urgency.after_days, 3);
        assert_eq!(cfg.colors, BucketColors::default());
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let cfg = DashboardConfig::from_yaml(include_str!("../fuelwatch.yaml")).unwrap();
        assert_eq!(cfg.columns, ColumnMap::default());
        assert_eq!(cfg.filter, FilterConfig::default());
        assert_eq!(cfg.colors, BucketColors::default());
        assert_eq!(cfg.export_path.as_deref(), Some("data.json"));
    }

    #[test]
    fn json_source_format() {
        let cfg = DashboardConfig::from_yaml(
            "source:\n  url: http://localhost:8000/data.json\n  format: json\n",
        )
        .unwrap();
        assert_eq!(cfg.source.format, SourceFormat::Json);
    }

    #[test]
    fn rejects_missing_url() {
        let err = DashboardConfig::from_yaml("refresh_interval_ms: 1000\n").unwrap_err();
        assert!(err.to_string().contains("source.url"));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = DashboardConfig::from_yaml(
            "source: { url: 'http://x.test/a.csv' }\nurgency: { tomorrow_days: 3, after_days: 2 }\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("after_days"));
    }

    #[test]
    fn load_reports_path_on_missing_file() {
        let err = DashboardConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
    }
}
