//! The polling loop that ties sources, triage and alerting together.

use crate::stats::DetectorStats;
use futures_util::future::join_all;
use futures_util::FutureExt;
use launch_alerts::AlertDispatcher;
use launch_engine::{CacheError, CandidateFilter, ResultCache, RiskScorer, SeenSet};
use launch_feeds::SourceFetcher;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Result cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Fetching = 1,
    ScoringAndDispatching = 2,
    Sleeping = 3,
    Stopped = 4,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LoopState::Idle,
            1 => LoopState::Fetching,
            2 => LoopState::ScoringAndDispatching,
            3 => LoopState::Sleeping,
            _ => LoopState::Stopped,
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Idle => "idle",
            LoopState::Fetching => "fetching",
            LoopState::ScoringAndDispatching => "scoring",
            LoopState::Sleeping => "sleeping",
            LoopState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Cloneable control handle: observe the loop state and request a stop.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    running: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    wake: Arc<Notify>,
}

impl LoopHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            state: Arc::new(AtomicU8::new(LoopState::Idle as u8)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Prevent the next iteration. An iteration already in progress finishes;
    /// a sleeping loop wakes up and exits.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Records returned by all sources
    pub fetched: usize,
    /// Rejected by the candidate filter
    pub filtered: usize,
    /// Already claimed, in this or an earlier iteration
    pub duplicates: usize,
    pub dispatched: usize,
    /// Delivery failed; the record stays claimed
    pub failed: usize,
}

/// Sleep lengths between iterations. After a failed iteration the loop backs
/// off: `error_cooldown` is never shorter than `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    interval: Duration,
    error_cooldown: Duration,
}

impl LoopSettings {
    /// A cooldown shorter than `interval` is raised to `interval`.
    pub fn new(interval: Duration, error_cooldown: Duration) -> Self {
        Self {
            interval,
            error_cooldown: error_cooldown.max(interval),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn error_cooldown(&self) -> Duration {
        self.error_cooldown
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(20), Duration::from_secs(60))
    }
}

pub struct PollLoop {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    filter: CandidateFilter,
    seen: Arc<SeenSet>,
    scorer: RiskScorer,
    dispatcher: AlertDispatcher,
    cache: Option<ResultCache>,
    settings: LoopSettings,
    stats: Arc<DetectorStats>,
    handle: LoopHandle,
}

impl PollLoop {
    pub fn new(
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        dispatcher: AlertDispatcher,
        stats: Arc<DetectorStats>,
    ) -> Self {
        Self {
            fetchers,
            filter: CandidateFilter::default(),
            seen: Arc::new(SeenSet::default()),
            scorer: RiskScorer::default(),
            dispatcher,
            cache: None,
            settings: LoopSettings::default(),
            stats,
            handle: LoopHandle::new(),
        }
    }

    pub fn with_filter(mut self, filter: CandidateFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_seen_set(mut self, seen: Arc<SeenSet>) -> Self {
        self.seen = seen;
        self
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> LoopState {
        self.handle.state()
    }

    /// Run until [`LoopHandle::stop`] is called.
    pub async fn run(mut self) {
        info!(
            sources = self.fetchers.len(),
            interval_secs = self.settings.interval().as_secs_f64(),
            channel = self.dispatcher.channel_name(),
            "Starting poll loop"
        );

        while self.handle.is_running() {
            let outcome = AssertUnwindSafe(self.run_iteration()).catch_unwind().await;

            let pause = match outcome {
                Ok(Ok(report)) => {
                    info!(
                        fetched = report.fetched,
                        filtered = report.filtered,
                        duplicates = report.duplicates,
                        dispatched = report.dispatched,
                        failed = report.failed,
                        "Scan complete"
                    );
                    self.settings.interval()
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Scan failed");
                    self.stats.record_loop_error();
                    self.settings.error_cooldown()
                }
                Err(panic) => {
                    error!(panic = panic_message(&*panic), "Scan panicked");
                    self.stats.record_loop_error();
                    self.settings.error_cooldown()
                }
            };

            // Created before the flag check so a concurrent stop() is not missed.
            let woken = self.handle.wake.notified();
            if !self.handle.is_running() {
                break;
            }
            self.handle.set_state(LoopState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = woken => {}
            }
        }

        self.handle.set_state(LoopState::Stopped);
        info!("Poll loop stopped");
    }

    /// Run exactly one iteration, then stop.
    pub async fn run_once(mut self) -> Result<IterationReport, LoopError> {
        let result = self.run_iteration().await;
        self.handle.stop();
        self.handle.set_state(LoopState::Stopped);
        result
    }

    /// Fetch from every source, then filter, claim, score and alert each record.
    pub async fn run_iteration(&mut self) -> Result<IterationReport, LoopError> {
        self.handle.set_state(LoopState::Fetching);

        let batches = join_all(self.fetchers.iter().map(|fetcher| async move {
            let source = fetcher.name().to_string();
            match AssertUnwindSafe(fetcher.fetch()).catch_unwind().await {
                Ok(records) => (source, records),
                Err(panic) => {
                    error!(source = source, panic = panic_message(&*panic), "Source panicked");
                    (source, Vec::new())
                }
            }
        }))
        .await;

        self.handle.set_state(LoopState::ScoringAndDispatching);
        let mut report = IterationReport::default();

        for (source, records) in batches {
            for record in records {
                report.fetched += 1;

                if let Err(reason) = self.filter.check(&record) {
                    debug!(source = source, address = %record.address, reason = %reason, "Filtered");
                    report.filtered += 1;
                    continue;
                }
                if !self.seen.try_claim(&record.address) {
                    report.duplicates += 1;
                    continue;
                }

                let assessment = self.scorer.score(&record);
                match self.dispatcher.dispatch(&record, &assessment, &source).await {
                    Ok(()) => report.dispatched += 1,
                    Err(_) => report.failed += 1,
                }

                if let Some(cache) = self.cache.as_mut() {
                    cache.insert(&source, &record, &assessment);
                }
            }
        }

        if let Some(cache) = self.cache.as_mut() {
            cache.flush().await?;
        }

        if report.failed > 0 {
            warn!(failed = report.failed, "Some alerts were not delivered");
        }
        self.stats.record_iteration(&report);
        Ok(report)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
