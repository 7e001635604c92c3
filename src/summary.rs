// src/summary.rs

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    classify::{Classification, Classifier, UrgencyBucket},
    normalize::SiteRecord,
};

/// Dashboard counters plus the due list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub due: usize,
    pub tomorrow: usize,
    pub after: usize,
    /// Sites in the due bucket, earliest fuel date first.
    pub due_sites: Vec<SiteRecord>,
}

/// A site paired with its classification for the current day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedSite {
    pub site: SiteRecord,
    pub classification: Classification,
}

/// Summary with the default thresholds.
pub fn summarize(sites: &[SiteRecord], today: NaiveDate) -> Summary {
    summarize_with(&Classifier::default(), sites, today)
}

pub fn summarize_with(classifier: &Classifier, sites: &[SiteRecord], today: NaiveDate) -> Summary {
    let mut summary = Summary {
        total: sites.len(),
        ..Summary::default()
    };

    for site in sites {
        match classifier.bucket(site.next_fuel_date, today) {
            UrgencyBucket::Due => {
                summary.due += 1;
                summary.due_sites.push(site.clone());
            }
            UrgencyBucket::Tomorrow => summary.tomorrow += 1,
            UrgencyBucket::After => summary.after += 1,
            UrgencyBucket::Healthy | UrgencyBucket::Unknown => {}
        }
    }

    // Stable, so equal dates keep sheet order. `None` sorts first, though a
    // due site always has a date.
    summary.due_sites.sort_by_key(|s| s.next_fuel_date);
    summary
}

pub fn classify_all(
    classifier: &Classifier,
    sites: &[SiteRecord],
    today: NaiveDate,
) -> Vec<ClassifiedSite> {
    sites
        .iter()
        .map(|site| ClassifiedSite {
            site: site.clone(),
            classification: classifier.classify(site.next_fuel_date, today),
        })
        .collect()
}

/// Map viewport enclosing every site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// `None` when there is nothing to fit.
    pub fn fit(sites: &[SiteRecord]) -> Option<Self> {
        let first = sites.first()?;
        let init = Bounds {
            south: first.latitude,
            west: first.longitude,
            north: first.latitude,
            east: first.longitude,
        };
        Some(sites.iter().skip(1).fold(init, |b, s| Bounds {
            south: b.south.min(s.latitude),
            west: b.west.min(s.longitude),
            north: b.north.max(s.latitude),
            east: b.east.max(s.longitude),
        }))
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    /// Grow each side by `fraction` of the span, so edge markers aren't clipped.
    pub fn padded(&self, fraction: f64) -> Self {
        let dlat = (self.north - self.south) * fraction;
        let dlng = (self.east - self.west) * fraction;
        Bounds {
            south: self.south - dlat,
            west: self.west - dlng,
            north: self.north + dlat,
            east: self.east + dlng,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()
    }

    fn site(name: &str, lat: f64, lng: f64, offset: Option<i64>) -> SiteRecord {
        SiteRecord {
            name: name.to_string(),
            region_name: "Central".to_string(),
            status: None,
            latitude: lat,
            longitude: lng,
            next_fuel_date: offset.map(|n| today() + Duration::days(n)),
        }
    }

    fn fleet() -> Vec<SiteRecord> {
        vec![
            site("today", 24.0, 45.0, Some(0)),
            site("late", 24.5, 46.0, Some(-4)),
            site("tomorrow", 23.0, 44.0, Some(1)),
            site("after", 25.0, 47.5, Some(2)),
            site("fine", 24.2, 45.2, Some(10)),
            site("undated", 24.1, 45.1, None),
            site("late-too", 24.3, 45.3, Some(-4)),
        ]
    }

    #[test]
    fn counts_and_due_order() {
        let summary = summarize(&fleet(), today());
        assert_eq!(summary.total, 7);
        assert_eq!(summary.due, 3);
        assert_eq!(summary.tomorrow, 1);
        assert_eq!(summary.after, 1);
        let names: Vec<_> = summary.due_sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["late", "late-too", "today"]);
    }

    #[test]
    fn summarize_is_idempotent_and_leaves_input_alone() {
        let sites = fleet();
        let before = sites.clone();
        let a = summarize(&sites, today());
        let b = summarize(&sites, today());
        assert_eq!(a, b);
        assert_eq!(sites, before);
    }

    #[test]
    fn empty_list() {
        assert_eq!(summarize(&[], today()), Summary::default());
        assert_eq!(Bounds::fit(&[]), None);
    }

    #[test]
    fn classify_all_pairs_every_site() {
        let classified = classify_all(&Classifier::default(), &fleet(), today());
        assert_eq!(classified.len(), 7);
        assert_eq!(classified[2].classification.bucket, UrgencyBucket::Tomorrow);
        assert_eq!(classified[5].classification.bucket, UrgencyBucket::Unknown);
    }

    #[test]
    fn bounds_enclose_all_sites() {
        let b = Bounds::fit(&fleet()).unwrap();
        assert_eq!(
            b,
            Bounds {
                south: 23.0,
                west: 44.0,
                north: 25.0,
                east: 47.5
            }
        );
        assert_eq!(b.center(), (24.0, 45.75));
        let p = b.padded(0.5);
        assert_eq!((p.south, p.north), (22.0, 26.0));
    }
}
