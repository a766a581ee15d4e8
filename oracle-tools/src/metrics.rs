//! Per-tool invocation counters

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Counters for a single tool. All updates are atomic.
#[derive(Debug, Default)]
pub struct ToolMetrics {
    invocations: AtomicU64,
    total_duration_micros: AtomicU64,
    errors: AtomicU64,
    /// Unix millis of the last invocation, 0 when never invoked
    last_invocation_ms: AtomicI64,
}

impl ToolMetrics {
    fn record(&self, duration: Duration, failed: bool) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.total_duration_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.last_invocation_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn snapshot(&self, tool: &str) -> ToolMetricsSnapshot {
        let last_ms = self.last_invocation_ms.load(Ordering::Relaxed);
        ToolMetricsSnapshot {
            tool: tool.to_string(),
            invocations: self.invocations.load(Ordering::Relaxed),
            total_duration: Duration::from_micros(self.total_duration_micros.load(Ordering::Relaxed)),
            errors: self.errors.load(Ordering::Relaxed),
            last_invocation: (last_ms != 0)
                .then(|| Utc.timestamp_millis_opt(last_ms).single())
                .flatten(),
        }
    }
}

/// Point-in-time copy of a tool's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolMetricsSnapshot {
    pub tool: String,
    pub invocations: u64,
    pub total_duration: Duration,
    pub errors: u64,
    pub last_invocation: Option<DateTime<Utc>>,
}

impl ToolMetricsSnapshot {
    pub fn average_duration(&self) -> Duration {
        if self.invocations == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.invocations as u32
        }
    }
}

/// Shared collector keyed by tool name
#[derive(Debug, Default)]
pub struct MetricsCollector {
    tools: DashMap<String, Arc<ToolMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tool: &str, duration: Duration, failed: bool) {
        // Release the read guard before taking the shard's write lock
        let existing = self.tools.get(tool).map(|entry| Arc::clone(entry.value()));
        let metrics = match existing {
            Some(metrics) => metrics,
            None => Arc::clone(self.tools.entry(tool.to_string()).or_default().value()),
        };
        metrics.record(duration, failed);
    }

    pub fn snapshot(&self, tool: &str) -> Option<ToolMetricsSnapshot> {
        self.tools.get(tool).map(|entry| entry.value().snapshot(tool))
    }

    /// Snapshots of every tool seen so far, sorted by name
    pub fn snapshots(&self) -> Vec<ToolMetricsSnapshot> {
        let mut all: Vec<_> = self
            .tools
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        all.sort_by(|a, b| a.tool.cmp(&b.tool));
        all
    }

    pub fn reset(&self) {
        self.tools.clear();
    }
}
