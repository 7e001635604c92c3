pub mod classify;
pub mod config;
pub mod csv;
pub mod dashboard;
pub mod date_parser;
pub mod error;
pub mod normalize;
pub mod sink;
pub mod source;
pub mod summary;

pub use classify::{classify, Classification, Classifier, UrgencyBucket};
pub use config::{ColumnMap, DashboardConfig};
pub use dashboard::{CycleOutcome, Dashboard, DashboardView, PresentationSink};
pub use error::CycleError;
pub use normalize::{normalize, SiteRecord};
pub use summary::{summarize, Bounds, Summary};
