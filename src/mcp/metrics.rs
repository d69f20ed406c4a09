//! Per-tool invocation counters. Advisory only, never behavior-affecting.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const TOOL_NAMES: [&str; 5] = [
    "add_task",
    "list_tasks",
    "update_task",
    "complete_task",
    "delete_task",
];

#[derive(Default)]
struct ToolEntry {
    count: AtomicU64,
    errors: AtomicU64,
    total_latency_us: AtomicU64,
}

/// Counters are atomics because tool invocations run concurrently; a lost
/// update would undercount, and nothing here may block a call.
#[derive(Default)]
pub struct ToolMetrics {
    entries: [ToolEntry; TOOL_NAMES.len()],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStats {
    pub count: u64,
    pub errors: u64,
    pub total_latency_us: u64,
}

impl ToolMetrics {
    pub fn new() -> ToolMetrics {
        ToolMetrics::default()
    }

    pub fn record(&self, tool_name: &str, latency: Duration, success: bool) {
        let Some(index) = TOOL_NAMES.iter().position(|name| *name == tool_name) else {
            return;
        };

        let entry = &self.entries[index];
        let count = entry.count.fetch_add(1, Ordering::Relaxed) + 1;
        let total_latency_us = entry
            .total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed)
            + latency.as_micros() as u64;
        if !success {
            entry.errors.fetch_add(1, Ordering::Relaxed);
        }

        let errors = entry.errors.load(Ordering::Relaxed);
        let avg_latency_us = total_latency_us / count;
        info!(
            "Tool '{tool_name}' invoked | Success: {success} | Latency: {:.3}s | \
             Avg Latency: {:.3}s | Total Calls: {count} | Errors: {errors}",
            latency.as_secs_f64(),
            avg_latency_us as f64 / 1_000_000.0,
        );
    }

    pub fn stats(&self, tool_name: &str) -> Option<ToolStats> {
        let index = TOOL_NAMES.iter().position(|name| *name == tool_name)?;
        let entry = &self.entries[index];

        Some(ToolStats {
            count: entry.count.load(Ordering::Relaxed),
            errors: entry.errors.load(Ordering::Relaxed),
            total_latency_us: entry.total_latency_us.load(Ordering::Relaxed),
        })
    }
}
