use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use dashmap::DashMap;

/// Per-user running totals. Cost is stored as micro-dollars in an atomic
/// integer so concurrent adds never need a lock (spec §4.1 "Concurrency").
#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    cost_micros: AtomicI64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// Tracks per-user LLM usage for the life of the process (spec §3
/// "Ownership and lifecycle": "Per-user LLM usage counters live in the
/// Adapter for the life of the process").
#[derive(Debug, Default)]
pub struct UsageTracker {
    by_user: DashMap<String, Counters>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call's contribution. Even failed calls are recorded with
    /// zero cost (spec §4.1 "Accounting").
    pub fn record(&self, user_id: &str, input_tokens: u32, output_tokens: u32, cost_usd: f64) {
        let entry = self.by_user.entry(user_id.to_string()).or_default();
        entry.calls.fetch_add(1, Ordering::Relaxed);
        entry.input_tokens.fetch_add(input_tokens as u64, Ordering::Relaxed);
        entry.output_tokens.fetch_add(output_tokens as u64, Ordering::Relaxed);
        entry.cost_micros.fetch_add((cost_usd * 1_000_000.0).round() as i64, Ordering::Relaxed);
    }

    pub fn usage(&self, user_id: &str) -> Usage {
        match self.by_user.get(user_id) {
            Some(entry) => Usage {
                calls: entry.calls.load(Ordering::Relaxed),
                input_tokens: entry.input_tokens.load(Ordering::Relaxed),
                output_tokens: entry.output_tokens.load(Ordering::Relaxed),
                cost_usd: entry.cost_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            },
            None => Usage::default(),
        }
    }
}
