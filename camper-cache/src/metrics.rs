//! Fetch telemetry for the status bar.
//!
//! Records the last hundred fetch and mutation events, keeps running
//! per-pool counts, and reduces them to a short summary: how many pools are
//! active, median latency, error rate, and how often navigation landed on
//! fresh data.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use camper_core::Timestamp;
use chrono::Utc;

use crate::message::{Completion, CompletionKind};
use crate::snapshot::{Snapshot, SnapshotState};

const MAX_EVENTS: usize = 100;
const MAX_NAVIGATIONS: usize = 20;
const LATENCY_SAMPLE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEventKind {
    FetchComplete,
    FetchError,
    MutationComplete,
    MutationError,
}

impl PoolEventKind {
    fn is_error(self) -> bool {
        matches!(self, Self::FetchError | Self::MutationError)
    }

    fn is_fetch(self) -> bool {
        matches!(self, Self::FetchComplete | Self::FetchError)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolEvent {
    pub at: Timestamp,
    pub key: String,
    pub kind: PoolEventKind,
    pub duration: Duration,
}

/// Running totals for one pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStats {
    pub fetch_count: u64,
    pub error_count: u64,
    pub total_time: Duration,
    pub last_fetch: Option<Timestamp>,
}

impl PoolStats {
    pub fn average_latency(&self) -> Duration {
        if self.fetch_count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / u128::from(self.fetch_count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Status bar numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub active_pools: usize,
    pub p50_latency: Duration,
    pub error_rate: f64,
    /// Share of navigations that found fresh data (stale counts half).
    pub apdex: f64,
}

/// How good the data was when a screen opened.
pub fn snapshot_quality<T>(snap: &Snapshot<T>) -> f64 {
    match (snap.state(), snap.has_data()) {
        (SnapshotState::Fresh, _) => 1.0,
        (_, true) => 0.5,
        (_, false) => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Navigation {
    view: String,
    quality: f64,
}

/// Collector owned by the event loop.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    events: VecDeque<PoolEvent>,
    stats: HashMap<String, PoolStats>,
    navigations: VecDeque<Navigation>,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: PoolEvent) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        if event.kind.is_fetch() {
            let stats = self.stats.entry(event.key.clone()).or_default();
            stats.fetch_count += 1;
            stats.total_time += event.duration;
            stats.last_fetch = Some(event.at);
            if event.kind.is_error() {
                stats.error_count += 1;
            }
        }
        self.events.push_back(event);
    }

    /// Record a completion as it passes through the loop. Cancellations are skipped.
    pub fn record_completion(&mut self, completion: &Completion) {
        if completion.canceled() {
            return;
        }
        let kind = match (completion.kind(), completion.failed()) {
            (CompletionKind::Fetch, false) => PoolEventKind::FetchComplete,
            (CompletionKind::Fetch, true) => PoolEventKind::FetchError,
            (CompletionKind::Mutation, false) => PoolEventKind::MutationComplete,
            (CompletionKind::Mutation, true) => PoolEventKind::MutationError,
        };
        self.record(PoolEvent {
            at: Utc::now(),
            key: completion.key().to_string(),
            kind,
            duration: completion.elapsed(),
        });
    }

    /// Log which view opened and how good its data was at that moment.
    pub fn record_navigation(&mut self, view: impl Into<String>, quality: f64) {
        if self.navigations.len() >= MAX_NAVIGATIONS {
            self.navigations.pop_front();
        }
        self.navigations.push_back(Navigation {
            view: view.into(),
            quality: quality.clamp(0.0, 1.0),
        });
    }

    pub fn stats(&self, key: &str) -> Option<&PoolStats> {
        self.stats.get(key)
    }

    pub fn events(&self) -> impl Iterator<Item = &PoolEvent> {
        self.events.iter()
    }

    /// Forget a pool that no longer exists.
    pub fn forget(&mut self, key: &str) {
        self.stats.remove(key);
    }

    /// Keep stats only for pools whose key passes `keep`.
    pub fn retain_stats<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.stats.retain(|key, _| keep(key));
    }

    pub fn summary(&self) -> MetricsSummary {
        let mut latencies = Vec::new();
        let mut errors = 0usize;
        let mut total = 0usize;

        for event in self.events.iter().rev() {
            if latencies.len() >= LATENCY_SAMPLE {
                break;
            }
            match event.kind {
                PoolEventKind::FetchComplete => {
                    latencies.push(event.duration);
                    total += 1;
                }
                PoolEventKind::FetchError => {
                    errors += 1;
                    total += 1;
                }
                PoolEventKind::MutationComplete | PoolEventKind::MutationError => {}
            }
        }

        latencies.sort();
        let p50_latency = latencies.get(latencies.len() / 2).copied().unwrap_or(Duration::ZERO);
        let error_rate = if total == 0 {
            0.0
        } else {
            errors as f64 / total as f64
        };
        let apdex = if self.navigations.is_empty() {
            1.0
        } else {
            self.navigations.iter().map(|n| n.quality).sum::<f64>() / self.navigations.len() as f64
        };

        MetricsSummary {
            active_pools: self.stats.len(),
            p50_latency,
            error_rate,
            apdex,
        }
    }

    /// Most recently opened view, if any.
    pub fn last_view(&self) -> Option<&str> {
        self.navigations.back().map(|n| n.view.as_str())
    }
}
