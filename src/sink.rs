// src/sink.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

use crate::{
    classify::UrgencyBucket,
    dashboard::{DashboardView, PresentationSink},
    error::CycleError,
    summary::ClassifiedSite,
};

/// Writes counters and the due list to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn render(&mut self, view: &DashboardView) {
        let s = &view.summary;
        info!(
            today = %view.today,
            total = s.total,
            due = s.due,
            tomorrow = s.tomorrow,
            after = s.after,
            "dashboard"
        );
        for site in &s.due_sites {
            let date = site
                .next_fuel_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(name = %site.name, region = %site.region_name, date = %date, "due");
        }
        if let Some(b) = view.bounds {
            let (lat, lng) = b.center();
            info!(
                south = b.south,
                west = b.west,
                north = b.north,
                east = b.east,
                center = %format!("{lat:.4},{lng:.4}"),
                "viewport"
            );
        }
    }

    fn report_error(&mut self, err: &CycleError) {
        warn!(error = %err, "refresh failed");
    }
}

/// One entry of the exported `data.json` marker list.
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    #[serde(rename = "SiteName")]
    site_name: &'a str,
    #[serde(rename = "Region")]
    region: &'a str,
    #[serde(rename = "COWStatus")]
    status: Option<&'a str>,
    #[serde(rename = "NextFuelingPlan")]
    next_fueling_plan: Option<String>,
    lat: f64,
    lng: f64,
    bucket: UrgencyBucket,
    color: &'a str,
}

impl<'a> From<&'a ClassifiedSite> for ExportRecord<'a> {
    fn from(c: &'a ClassifiedSite) -> Self {
        Self {
            site_name: &c.site.name,
            region: &c.site.region_name,
            status: c.site.status.as_deref(),
            next_fueling_plan: c
                .site
                .next_fuel_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
            lat: c.site.latitude,
            lng: c.site.longitude,
            bucket: c.classification.bucket,
            color: &c.classification.color,
        }
    }
}

/// Writes the classified site list as a JSON array for a static map page.
/// The file is only replaced after a successful cycle.
#[derive(Debug)]
pub struct JsonExportSink {
    path: PathBuf,
}

impl JsonExportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, view: &DashboardView) -> Result<()> {
        let records: Vec<ExportRecord<'_>> = view.sites.iter().map(ExportRecord::from).collect();
        if records.is_empty() {
            warn!(path = %self.path.display(), "no sites; exporting []");
        }
        let json = serde_json::to_string_pretty(&records).context("serializing sites")?;

        // write next to the target, then swap in
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        info!(path = %self.path.display(), sites = records.len(), "exported");
        Ok(())
    }
}

impl PresentationSink for JsonExportSink {
    fn render(&mut self, view: &DashboardView) {
        if let Err(e) = self.write(view) {
            error!("export failed: {:?}", e);
        }
    }

    fn report_error(&mut self, _err: &CycleError) {}
}

/// Fan out to several sinks in order.
impl PresentationSink for Vec<Box<dyn PresentationSink>> {
    fn render(&mut self, view: &DashboardView) {
        for sink in self.iter_mut() {
            sink.render(view);
        }
    }

    fn report_error(&mut self, err: &CycleError) {
        for sink in self.iter_mut() {
            sink.report_error(err);
        }
    }
}
