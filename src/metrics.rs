//! Service statistics: decision counts, latency and score distribution.

use crate::types::{AnomalyReport, ScoreSource};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for the scoring service
pub struct ServiceMetrics {
    pub risk_lookups: AtomicU64,
    pub anomaly_checks: AtomicU64,
    pub anomalies_flagged: AtomicU64,
    pub model_decisions: AtomicU64,
    pub mock_decisions: AtomicU64,
    /// Model path attempted but failed, answered by the mock scorer
    pub model_fallbacks: AtomicU64,
    pub portfolio_assessments: AtomicU64,
    pub transactions_observed: AtomicU64,
    flagged_by_severity: RwLock<HashMap<String, u64>>,
    /// Anomaly check latency in microseconds
    check_times: RwLock<Vec<u64>>,
    /// Histogram of reported anomaly scores, 0.1 wide
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            risk_lookups: AtomicU64::new(0),
            anomaly_checks: AtomicU64::new(0),
            anomalies_flagged: AtomicU64::new(0),
            model_decisions: AtomicU64::new(0),
            mock_decisions: AtomicU64::new(0),
            model_fallbacks: AtomicU64::new(0),
            portfolio_assessments: AtomicU64::new(0),
            transactions_observed: AtomicU64::new(0),
            flagged_by_severity: RwLock::new(HashMap::new()),
            check_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    pub fn record_risk_lookup(&self) {
        self.risk_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_portfolio(&self) {
        self.portfolio_assessments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_observed(&self, count: usize) {
        self.transactions_observed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_model_fallback(&self) {
        self.model_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished anomaly check
    pub fn record_anomaly_check(&self, elapsed: Duration, report: &AnomalyReport) {
        self.anomaly_checks.fetch_add(1, Ordering::Relaxed);

        match report.source {
            ScoreSource::Model => self.model_decisions.fetch_add(1, Ordering::Relaxed),
            ScoreSource::Mock => self.mock_decisions.fetch_add(1, Ordering::Relaxed),
        };

        {
            let mut times = self.check_times.write().unwrap_or_else(PoisonError::into_inner);
            times.push(elapsed.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }

        if let Some(score) = report.anomaly_score {
            let bucket = (score.max(0.0) * 10.0).min(9.0) as usize;
            self.score_buckets.write().unwrap_or_else(PoisonError::into_inner)[bucket] += 1;
        }

        if report.anomaly_detected {
            self.anomalies_flagged.fetch_add(1, Ordering::Relaxed);
            if let Some(severity) = report.severity {
                *self
                    .flagged_by_severity
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(severity.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    /// Anomaly check latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = self.check_times.read().unwrap_or_else(PoisonError::into_inner).clone();
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            risk_lookups: self.risk_lookups.load(Ordering::Relaxed),
            anomaly_checks: self.anomaly_checks.load(Ordering::Relaxed),
            anomalies_flagged: self.anomalies_flagged.load(Ordering::Relaxed),
            model_decisions: self.model_decisions.load(Ordering::Relaxed),
            mock_decisions: self.mock_decisions.load(Ordering::Relaxed),
            model_fallbacks: self.model_fallbacks.load(Ordering::Relaxed),
            portfolio_assessments: self.portfolio_assessments.load(Ordering::Relaxed),
            transactions_observed: self.transactions_observed.load(Ordering::Relaxed),
            flagged_by_severity: self
                .flagged_by_severity
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            score_distribution: *self.score_buckets.read().unwrap_or_else(PoisonError::into_inner),
            latency: self.latency_stats(),
        }
    }

    /// Log a summary of everything recorded so far
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let flag_rate = if snapshot.anomaly_checks > 0 {
            snapshot.anomalies_flagged as f64 / snapshot.anomaly_checks as f64 * 100.0
        } else {
            0.0
        };

        info!(
            uptime_secs = snapshot.uptime_secs,
            risk_lookups = snapshot.risk_lookups,
            anomaly_checks = snapshot.anomaly_checks,
            flagged = snapshot.anomalies_flagged,
            flag_rate = format!("{:.1}%", flag_rate),
            model = snapshot.model_decisions,
            mock = snapshot.mock_decisions,
            fallbacks = snapshot.model_fallbacks,
            portfolios = snapshot.portfolio_assessments,
            observed = snapshot.transactions_observed,
            "Service metrics summary"
        );
        info!(
            mean_us = snapshot.latency.mean_us,
            p50_us = snapshot.latency.p50_us,
            p95_us = snapshot.latency.p95_us,
            p99_us = snapshot.latency.p99_us,
            "Anomaly check latency"
        );
        for (severity, count) in &snapshot.flagged_by_severity {
            info!(severity = %severity, count = count, "Flagged anomalies by severity");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics in microseconds
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub risk_lookups: u64,
    pub anomaly_checks: u64,
    pub anomalies_flagged: u64,
    pub model_decisions: u64,
    pub mock_decisions: u64,
    pub model_fallbacks: u64,
    pub portfolio_assessments: u64,
    pub transactions_observed: u64,
    pub flagged_by_severity: HashMap<String, u64>,
    pub score_distribution: [u64; 10],
    pub latency: LatencyStats,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnomalyKind, Severity};

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        let flagged = AnomalyReport::flagged(
            "0xa",
            ScoreSource::Model,
            0.9,
            AnomalyKind::MlDetected,
            Severity::High,
            "x",
        );
        metrics.record_anomaly_check(Duration::from_micros(100), &flagged);
        metrics.record_anomaly_check(
            Duration::from_micros(300),
            &AnomalyReport::clear("0xb", ScoreSource::Mock),
        );
        metrics.record_risk_lookup();
        metrics.record_model_fallback();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.anomaly_checks, 2);
        assert_eq!(snapshot.anomalies_flagged, 1);
        assert_eq!(snapshot.model_decisions, 1);
        assert_eq!(snapshot.mock_decisions, 1);
        assert_eq!(snapshot.model_fallbacks, 1);
        assert_eq!(snapshot.risk_lookups, 1);
        assert_eq!(snapshot.flagged_by_severity.get("high"), Some(&1));
        assert_eq!(snapshot.score_distribution[9], 1);
        assert_eq!(snapshot.latency.count, 2);
        assert_eq!(snapshot.latency.max_us, 300);
    }

    #[test]
    fn test_empty_latency_stats() {
        let stats = ServiceMetrics::new().latency_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_us, 0);
    }
}
