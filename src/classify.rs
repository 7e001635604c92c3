// src/classify.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How close a site is to its next fueling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyBucket {
    /// Due today or overdue.
    Due,
    Tomorrow,
    After,
    Healthy,
    /// No usable fuel date.
    Unknown,
}

impl UrgencyBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyBucket::Due => "due",
            UrgencyBucket::Tomorrow => "tomorrow",
            UrgencyBucket::After => "after",
            UrgencyBucket::Healthy => "healthy",
            UrgencyBucket::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UrgencyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day cutoffs. `days <= 0` is always due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub tomorrow_days: i64,
    pub after_days: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            tomorrow_days: 1,
            after_days: 2,
        }
    }
}

/// Marker colour per bucket. Unknown shares the healthy colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketColors {
    pub due: String,
    pub tomorrow: String,
    pub after: String,
    pub healthy: String,
}

pub const DUE_COLOR: &str = "#e53935";
pub const TOMORROW_COLOR: &str = "#fb8c00";
pub const AFTER_COLOR: &str = "#fdd835";
pub const HEALTHY_COLOR: &str = "#43a047";

impl Default for BucketColors {
    fn default() -> Self {
        Self {
            due: DUE_COLOR.to_string(),
            tomorrow: TOMORROW_COLOR.to_string(),
            after: AFTER_COLOR.to_string(),
            healthy: HEALTHY_COLOR.to_string(),
        }
    }
}

impl BucketColors {
    pub fn color_for(&self, bucket: UrgencyBucket) -> &str {
        match bucket {
            UrgencyBucket::Due => self.due.as_str(),
            UrgencyBucket::Tomorrow => self.tomorrow.as_str(),
            UrgencyBucket::After => self.after.as_str(),
            UrgencyBucket::Healthy | UrgencyBucket::Unknown => self.healthy.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub bucket: UrgencyBucket,
    pub color: String,
    /// Whole days from today to the fuel date; `None` when the date is unknown.
    pub days: Option<i64>,
}

/// Whole days between two calendar dates. Both are already midnight-aligned,
/// so the difference is exact and no rounding is involved.
pub fn days_until(fuel_date: NaiveDate, today: NaiveDate) -> i64 {
    fuel_date.signed_duration_since(today).num_days()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifier {
    pub thresholds: Thresholds,
    pub colors: BucketColors,
}

impl Classifier {
    pub fn new(thresholds: Thresholds, colors: BucketColors) -> Self {
        Self { thresholds, colors }
    }

    pub fn bucket(&self, fuel_date: Option<NaiveDate>, today: NaiveDate) -> UrgencyBucket {
        match fuel_date.map(|d| days_until(d, today)) {
            None => UrgencyBucket::Unknown,
            Some(days) if days <= 0 => UrgencyBucket::Due,
            Some(days) if days <= self.thresholds.tomorrow_days => UrgencyBucket::Tomorrow,
            Some(days) if days <= self.thresholds.after_days => UrgencyBucket::After,
            Some(_) => UrgencyBucket::Healthy,
        }
    }

    pub fn classify(&self, fuel_date: Option<NaiveDate>, today: NaiveDate) -> Classification {
        let bucket = self.bucket(fuel_date, today);
        Classification {
            bucket,
            color: self.colors.color_for(bucket).to_string(),
            days: fuel_date.map(|d| days_until(d, today)),
        }
    }
}

/// Classify with the default 1/2-day cutoffs and colour table.
pub fn classify(fuel_date: Option<NaiveDate>, today: NaiveDate) -> Classification {
    Classifier::default().classify(fuel_date, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()
    }

    #[test]
    fn same_day_is_due() {
        for offset in [-400, -30, 0, 30, 400] {
            let d = today() + Duration::days(offset);
            assert_eq!(classify(Some(d), d).bucket, UrgencyBucket::Due);
        }
    }

    #[test]
    fn buckets_by_offset() {
        let at = |n: i64| classify(Some(today() + Duration::days(n)), today());
        assert_eq!(at(-3).bucket, UrgencyBucket::Due);
        assert_eq!(at(-3).days, Some(-3));
        assert_eq!(at(0).bucket, UrgencyBucket::Due);
        assert_eq!(at(1).bucket, UrgencyBucket::Tomorrow);
        assert_eq!(at(2).bucket, UrgencyBucket::After);
        assert_eq!(at(3).bucket, UrgencyBucket::Healthy);
        assert_eq!(at(90).bucket, UrgencyBucket::Healthy);
    }

    #[test]
    fn colors_come_from_table() {
        let at = |n: i64| classify(Some(today() + Duration::days(n)), today()).color;
        assert_eq!(at(0), DUE_COLOR);
        assert_eq!(at(1), TOMORROW_COLOR);
        assert_eq!(at(2), AFTER_COLOR);
        assert_eq!(at(5), HEALTHY_COLOR);
    }

    // Unknown dates are deliberately shown calm, not urgent.
    #[test]
    fn missing_date_is_unknown_with_healthy_color() {
        let c = classify(None, today());
        assert_eq!(c.bucket, UrgencyBucket::Unknown);
        assert_eq!(c.color, HEALTHY_COLOR);
        assert_eq!(c.days, None);
    }

    #[test]
    fn configured_thresholds_and_colors() {
        let classifier = Classifier::new(
            Thresholds {
                tomorrow_days: 2,
                after_days: 5,
            },
            BucketColors {
                due: "red".into(),
                tomorrow: "orange".into(),
                after: "yellow".into(),
                healthy: "green".into(),
            },
        );
        let at = |n: i64| classifier.classify(Some(today() + Duration::days(n)), today());
        assert_eq!(at(2).bucket, UrgencyBucket::Tomorrow);
        assert_eq!(at(5).bucket, UrgencyBucket::After);
        assert_eq!(at(6).bucket, UrgencyBucket::Healthy);
        assert_eq!(at(0).color, "red");
        assert_eq!(classifier.classify(None, today()).color, "green");
    }
}
