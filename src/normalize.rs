// src/normalize.rs

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::{ColumnMap, FilterConfig, HeaderMode, MissingDatePolicy},
    csv::RawRow,
    date_parser::parse_fuel_date,
};

/// One fuel site after normalization. Coordinates are always finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    pub name: String,
    pub region_name: String,
    pub status: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub next_fuel_date: Option<NaiveDate>,
}

/// Why rows were left out, per batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropReport {
    pub header: usize,
    pub region: usize,
    pub status: usize,
    pub coordinates: usize,
    pub date: usize,
    /// Rows kept but carrying no usable date.
    pub undated_kept: usize,
}

impl DropReport {
    pub fn dropped(&self) -> usize {
        self.header + self.region + self.status + self.coordinates + self.date
    }
}

/// Map raw rows onto site records, keeping input order.
pub fn normalize(rows: &[RawRow], columns: &ColumnMap, filter: &FilterConfig) -> Vec<SiteRecord> {
    normalize_with_report(rows, columns, filter).0
}

pub fn normalize_with_report(
    rows: &[RawRow],
    columns: &ColumnMap,
    filter: &FilterConfig,
) -> (Vec<SiteRecord>, DropReport) {
    let mut report = DropReport::default();
    let skip = usize::from(has_header(rows, columns, filter));
    report.header = skip;

    let region_filter = filter
        .region
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let statuses: Vec<String> = filter
        .allowed_statuses
        .iter()
        .map(|s| s.trim().to_uppercase())
        .collect();

    let mut sites = Vec::with_capacity(rows.len().saturating_sub(skip));
    for (idx, row) in rows.iter().enumerate().skip(skip) {
        let region = cell(row, columns.region);
        if let Some(wanted) = region_filter {
            if !region.eq_ignore_ascii_case(wanted) {
                trace_drop(idx, "region", region);
                report.region += 1;
                continue;
            }
        }

        let status = columns.status.map(|i| cell(row, i).to_string());
        if let Some(status) = &status {
            if !statuses.is_empty() && !statuses.contains(&status.to_uppercase()) {
                trace_drop(idx, "status", status);
                report.status += 1;
                continue;
            }
        }

        let (latitude, longitude) = match (
            parse_coordinate(cell(row, columns.latitude)),
            parse_coordinate(cell(row, columns.longitude)),
        ) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => {
                trace_drop(idx, "coordinates", cell(row, columns.latitude));
                report.coordinates += 1;
                continue;
            }
        };

        let next_fuel_date = parse_fuel_date(cell(row, columns.fuel_date));
        if next_fuel_date.is_none() {
            match filter.missing_date {
                MissingDatePolicy::Drop => {
                    trace_drop(idx, "date", cell(row, columns.fuel_date));
                    report.date += 1;
                    continue;
                }
                MissingDatePolicy::Keep => report.undated_kept += 1,
            }
        }

        sites.push(SiteRecord {
            name: cell(row, columns.name).to_string(),
            region_name: region.to_string(),
            status,
            latitude,
            longitude,
            next_fuel_date,
        });
    }

    info!(
        rows = rows.len(),
        kept = sites.len(),
        header = report.header,
        region = report.region,
        status = report.status,
        coordinates = report.coordinates,
        date = report.date,
        undated = report.undated_kept,
        "normalized rows"
    );
    (sites, report)
}

fn has_header(rows: &[RawRow], columns: &ColumnMap, filter: &FilterConfig) -> bool {
    let Some(first) = rows.first() else {
        return false;
    };
    match filter.header {
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
        HeaderMode::Detect => {
            let marker = filter.header_marker.trim().to_lowercase();
            !marker.is_empty() && cell(first, columns.name).to_lowercase().contains(&marker)
        }
    }
}

/// Trimmed cell text; missing cells read as empty.
fn cell(row: &RawRow, idx: usize) -> &str {
    row.cell(idx).map(str::trim).unwrap_or("")
}

fn parse_coordinate(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn trace_drop(idx: usize, reason: &str, value: &str) {
    debug!(row = idx, reason, value, "dropping row");
}
