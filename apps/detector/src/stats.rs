//! Detector statistics.

use crate::performance::{FollowUp, Performer};
use crate::poll_loop::{IterationReport, LoopHandle};
use dashmap::DashMap;
use launch_alerts::{DeliveryError, DispatchObserver};
use launch_core::{RiskAssessment, TokenRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Running counters, shared between the poll loop, the dispatcher and the
/// stats reporter.
#[derive(Debug, Default)]
pub struct DetectorStats {
    /// Completed poll iterations.
    pub iterations: AtomicU64,
    /// Records returned by all sources.
    pub records_fetched: AtomicU64,
    /// Records rejected by the candidate filter.
    pub records_filtered: AtomicU64,
    /// Records already claimed.
    pub duplicates: AtomicU64,
    pub alerts_sent: AtomicU64,
    pub alerts_failed: AtomicU64,
    /// Iterations that errored or panicked.
    pub loop_errors: AtomicU64,
    /// Time of the last delivered alert in milliseconds, 0 if none.
    pub last_alert_ms: AtomicU64,
    /// Start time in milliseconds.
    pub started_at_ms: AtomicU64,
    /// Delivered alerts per source name.
    pub alerts_by_source: DashMap<String, AtomicU64>,
    /// Follow-up checks that found the token again.
    pub follow_ups: AtomicU64,
    pub pumped: AtomicU64,
    pub rugged: AtomicU64,
    best_performer: RwLock<Option<Performer>>,
}

impl DetectorStats {
    pub fn new() -> Self {
        Self {
            started_at_ms: AtomicU64::new(now_ms()),
            ..Default::default()
        }
    }

    pub fn record_iteration(&self, report: &IterationReport) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.records_fetched
            .fetch_add(report.fetched as u64, Ordering::Relaxed);
        self.records_filtered
            .fetch_add(report.filtered as u64, Ordering::Relaxed);
        self.duplicates
            .fetch_add(report.duplicates as u64, Ordering::Relaxed);
    }

    pub fn record_loop_error(&self) {
        self.loop_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_follow_up(&self, follow_up: &FollowUp) {
        self.follow_ups.fetch_add(1, Ordering::Relaxed);
        if follow_up.pumped {
            self.pumped.fetch_add(1, Ordering::Relaxed);
        }
        if follow_up.rugged {
            self.rugged.fetch_add(1, Ordering::Relaxed);
        }

        let Some(return_pct) = follow_up.return_pct else {
            return;
        };
        let mut best = match self.best_performer.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if best.as_ref().map_or(true, |b| return_pct > b.return_pct) {
            *best = Some(Performer {
                symbol: follow_up.symbol.clone(),
                address: follow_up.address.clone(),
                return_pct,
            });
        }
    }

    pub fn best_performer(&self) -> Option<Performer> {
        match self.best_performer.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Delivered alerts per source, sorted by source name.
    pub fn alerts_by_source(&self) -> Vec<(String, u64)> {
        let mut counts: Vec<(String, u64)> = self
            .alerts_by_source
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        counts.sort();
        counts
    }

    pub fn uptime_secs(&self) -> u64 {
        now_ms().saturating_sub(self.started_at_ms.load(Ordering::Relaxed)) / 1000
    }

    pub fn summary(&self) -> StatsSummary {
        let last_alert_ms = self.last_alert_ms.load(Ordering::Relaxed);
        StatsSummary {
            iterations: self.iterations.load(Ordering::Relaxed),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
            records_filtered: self.records_filtered.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            alerts_failed: self.alerts_failed.load(Ordering::Relaxed),
            loop_errors: self.loop_errors.load(Ordering::Relaxed),
            uptime_secs: self.uptime_secs(),
            mins_since_last_alert: (last_alert_ms > 0)
                .then(|| now_ms().saturating_sub(last_alert_ms) / 60_000),
            alerts_by_source: self.alerts_by_source(),
            follow_ups: self.follow_ups.load(Ordering::Relaxed),
            pumped: self.pumped.load(Ordering::Relaxed),
            rugged: self.rugged.load(Ordering::Relaxed),
            best_performer: self.best_performer(),
        }
    }
}

impl DispatchObserver for DetectorStats {
    fn on_delivered(&self, _record: &TokenRecord, _assessment: &RiskAssessment, source: &str) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
        self.alerts_by_source
            .entry(source.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
        self.last_alert_ms.store(now_ms(), Ordering::Relaxed);
    }

    fn on_failed(&self, _record: &TokenRecord, _source: &str, _error: &DeliveryError) {
        self.alerts_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Summary of statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub iterations: u64,
    pub records_fetched: u64,
    pub records_filtered: u64,
    pub duplicates: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub loop_errors: u64,
    pub uptime_secs: u64,
    pub mins_since_last_alert: Option<u64>,
    pub alerts_by_source: Vec<(String, u64)>,
    pub follow_ups: u64,
    pub pumped: u64,
    pub rugged: u64,
    pub best_performer: Option<Performer>,
}

/// Log a stats summary every `interval` until the loop stops.
pub async fn run_stats_reporter(handle: LoopHandle, stats: Arc<DetectorStats>, interval: Duration) {
    info!("Starting stats reporter");
    let ticks = (interval.as_millis() / 100).max(1);

    loop {
        // Check every 100ms if we should stop, but only log every interval
        for _ in 0..ticks {
            if !handle.is_running() {
                info!("Stats reporter stopped");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let summary = stats.summary();
        let by_source = summary
            .alerts_by_source
            .iter()
            .map(|(source, count)| format!("{}={}", source, count))
            .collect::<Vec<_>>()
            .join(" ");
        info!(
            uptime_secs = summary.uptime_secs,
            scans = summary.iterations,
            fetched = summary.records_fetched,
            filtered = summary.records_filtered,
            duplicates = summary.duplicates,
            alerts = summary.alerts_sent,
            failed = summary.alerts_failed,
            errors = summary.loop_errors,
            last_alert_mins_ago = ?summary.mins_since_last_alert,
            by_source = %by_source,
            state = %handle.state(),
            "📊 Stats"
        );
        if summary.follow_ups > 0 {
            info!(
                checked = summary.follow_ups,
                pumped = summary.pumped,
                rugged = summary.rugged,
                best = ?summary.best_performer.as_ref().map(|b| format!("{} {:+.1}%", b.symbol, b.return_pct)),
                "📈 Performance"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_core::RiskLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_observer_counts_outcomes() {
        let stats = DetectorStats::new();
        let record = TokenRecord::new("Mint111", "BONK", "Bonk");
        let assessment = RiskAssessment::new(50, RiskLevel::Moderate, Vec::new());

        stats.on_delivered(&record, &assessment, "DexScreener");
        stats.on_delivered(&record, &assessment, "Raydium");
        stats.on_failed(&record, "Raydium", &DeliveryError::Rejected("blocked".into()));

        let summary = stats.summary();
        assert_eq!(summary.alerts_sent, 2);
        assert_eq!(summary.alerts_failed, 1);
        assert_eq!(summary.mins_since_last_alert, Some(0));
        assert_eq!(
            summary.alerts_by_source,
            vec![("DexScreener".to_string(), 1), ("Raydium".to_string(), 1)]
        );
    }

    #[test]
    fn test_record_iteration() {
        let stats = DetectorStats::new();
        stats.record_iteration(&IterationReport {
            fetched: 7,
            filtered: 3,
            duplicates: 2,
            dispatched: 1,
            failed: 1,
        });
        stats.record_loop_error();

        let summary = stats.summary();
        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.records_fetched, 7);
        assert_eq!(summary.records_filtered, 3);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.loop_errors, 1);
        assert_eq!(summary.mins_since_last_alert, None);
    }

    fn follow_up(symbol: &str, return_pct: Option<f64>, pumped: bool, rugged: bool) -> FollowUp {
        FollowUp {
            symbol: symbol.to_string(),
            address: format!("{}Mint", symbol),
            return_pct,
            pumped,
            rugged,
        }
    }

    #[test]
    fn test_record_follow_ups_tracks_best_performer() {
        let stats = DetectorStats::new();
        stats.record_follow_up(&follow_up("WIF", Some(40.0), false, false));
        stats.record_follow_up(&follow_up("BONK", Some(250.0), true, false));
        stats.record_follow_up(&follow_up("RUG", Some(-95.0), false, true));
        stats.record_follow_up(&follow_up("FREE", None, false, false));

        let summary = stats.summary();
        assert_eq!(summary.follow_ups, 4);
        assert_eq!(summary.pumped, 1);
        assert_eq!(summary.rugged, 1);
        assert_eq!(
            summary.best_performer,
            Some(Performer {
                symbol: "BONK".to_string(),
                address: "BONKMint".to_string(),
                return_pct: 250.0,
            })
        );
    }
}
