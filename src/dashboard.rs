// src/dashboard.rs

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    classify::Classifier,
    config::{ColumnMap, DashboardConfig, FilterConfig, HeaderMode},
    error::CycleError,
    normalize::{normalize_with_report, DropReport, SiteRecord},
    source::{FeedSource, Layout, JSON_COLUMNS},
    summary::{classify_all, summarize_with, Bounds, ClassifiedSite, Summary},
};

/// Port to whatever draws the dashboard. The pipeline only hands it plain
/// data and never touches widgets itself.
pub trait PresentationSink: Send {
    fn render(&mut self, view: &DashboardView);
    fn report_error(&mut self, error: &CycleError);
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub today: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub summary: Summary,
    pub sites: Vec<ClassifiedSite>,
    pub bounds: Option<Bounds>,
}

impl DashboardView {
    pub fn build(
        classifier: &Classifier,
        sites: &[SiteRecord],
        today: NaiveDate,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            today,
            fetched_at,
            summary: summarize_with(classifier, sites, today),
            sites: classify_all(classifier, sites, today),
            bounds: Bounds::fit(sites),
        }
    }
}

/// Site list from one successful cycle. Replaced whole, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sites: Vec<SiteRecord>,
    pub report: DropReport,
    pub fetched_at: DateTime<Utc>,
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Rendered(Summary),
    /// A cycle started later already applied its result.
    Superseded,
    /// The dashboard was torn down while the fetch was in flight.
    Closed,
}

#[derive(Default)]
struct State {
    current: Option<Arc<Snapshot>>,
    applied: u64,
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct Dashboard<S, P> {
    source: S,
    sink: Mutex<P>,
    columns: ColumnMap,
    filter: FilterConfig,
    classifier: Classifier,
    clock: Clock,
    state: Mutex<State>,
    issued: AtomicU64,
    in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl<S: FeedSource, P: PresentationSink> Dashboard<S, P> {
    pub fn new(source: S, sink: P, config: &DashboardConfig) -> Self {
        Self {
            source,
            sink: Mutex::new(sink),
            columns: config.columns,
            filter: config.filter.clone(),
            classifier: Classifier::new(config.urgency, config.colors.clone()),
            clock: Box::new(|| Local::now().date_naive()),
            state: Mutex::new(State::default()),
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Replace the source of "today", mostly for tests.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// True while at least one fetch is outstanding; a UI can disable its
    /// refresh button on this.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting results. Fetches still in flight finish and are dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("dashboard closed");
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        lock(&self.state).current.clone()
    }

    /// View of the current snapshot, classified against today.
    pub fn current_view(&self) -> Option<DashboardView> {
        let snapshot = self.snapshot()?;
        Some(self.view_of(&snapshot))
    }

    /// Push the current snapshot again, reclassified for today. Nothing is
    /// fetched; useful when the date rolls over between fetches.
    pub fn rerender(&self) -> Option<Summary> {
        let snapshot = self.snapshot()?;
        let view = self.view_of(&snapshot);
        lock(&self.sink).render(&view);
        Some(view.summary)
    }

    /// One full fetch → normalize → classify → render pass.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh(&self) -> Result<CycleOutcome, CycleError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = {
            let _guard = InFlight::enter(&self.in_flight);
            self.source.fetch().await
        };

        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => return Err(self.fail(ticket, e)),
        };

        let (columns, filter) = self.layout_for(batch.layout);
        let (sites, report) = normalize_with_report(&batch.rows, &columns, &filter);
        let snapshot = Arc::new(Snapshot {
            sites,
            report,
            fetched_at: Utc::now(),
        });

        let mut state = lock(&self.state);
        if self.is_closed() {
            debug!(ticket, "ignoring result after close");
            return Ok(CycleOutcome::Closed);
        }
        if ticket < state.applied {
            debug!(ticket, applied = state.applied, "ignoring superseded result");
            return Ok(CycleOutcome::Superseded);
        }
        state.applied = ticket;
        state.current = Some(Arc::clone(&snapshot));

        let view = self.view_of(&snapshot);
        lock(&self.sink).render(&view);
        info!(
            ticket,
            total = view.summary.total,
            due = view.summary.due,
            tomorrow = view.summary.tomorrow,
            after = view.summary.after,
            "cycle complete"
        );
        Ok(CycleOutcome::Rendered(view.summary))
    }

    /// Tick every `period` until `shutdown` flips to true or its sender goes
    /// away. Each cycle runs on its own task so shutdown never waits on a
    /// slow fetch; late results are dropped by [`Dashboard::refresh`].
    pub async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>)
    where
        S: 'static,
        P: 'static,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "refresh loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dash = Arc::clone(&self);
                    tokio::spawn(async move {
                        // failures were already reported to the sink
                        let _ = dash.refresh().await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.close();
        info!("refresh loop stopped");
    }

    fn fail(&self, ticket: u64, err: CycleError) -> CycleError {
        if self.is_closed() {
            debug!(ticket, error = %err, "ignoring failure after close");
            return err;
        }
        let state = lock(&self.state);
        if ticket < state.applied {
            debug!(ticket, applied = state.applied, error = %err, "ignoring superseded failure");
            return err;
        }
        warn!(ticket, error = %err, "cycle failed; keeping previous state");
        lock(&self.sink).report_error(&err);
        err
    }

    fn layout_for(&self, layout: Layout) -> (ColumnMap, FilterConfig) {
        match layout {
            Layout::Sheet => (self.columns, self.filter.clone()),
            Layout::Json => (
                JSON_COLUMNS,
                FilterConfig {
                    header: HeaderMode::Absent,
                    ..self.filter.clone()
                },
            ),
        }
    }

    fn view_of(&self, snapshot: &Snapshot) -> DashboardView {
        DashboardView::build(
            &self.classifier,
            &snapshot.sites,
            self.today(),
            snapshot.fetched_at,
        )
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
