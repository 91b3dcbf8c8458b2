//! Per-rule execution metering.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Default)]
struct RuleCounters {
    time_ns: AtomicU64,
    runs: AtomicU64,
    effective_runs: AtomicU64,
    effective_time_ns: AtomicU64,
}

impl RuleCounters {
    fn load(&self) -> RuleMetrics {
        RuleMetrics {
            total_time_ns: self.time_ns.load(Ordering::Relaxed),
            total_runs: self.runs.load(Ordering::Relaxed),
            effective_runs: self.effective_runs.load(Ordering::Relaxed),
            effective_time_ns: self.effective_time_ns.load(Ordering::Relaxed),
        }
    }
}

/// Accumulated counters for one rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleMetrics {
    pub total_time_ns: u64,
    pub total_runs: u64,
    /// Runs that changed the plan.
    pub effective_runs: u64,
    pub effective_time_ns: u64,
}

impl RuleMetrics {
    fn saturating_sub(self, earlier: Self) -> Self {
        Self {
            total_time_ns: self.total_time_ns.saturating_sub(earlier.total_time_ns),
            total_runs: self.total_runs.saturating_sub(earlier.total_runs),
            effective_runs: self.effective_runs.saturating_sub(earlier.effective_runs),
            effective_time_ns: self
                .effective_time_ns
                .saturating_sub(earlier.effective_time_ns),
        }
    }

    pub const fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_time_ns)
    }
}

/// Point-in-time copy of the metering counters, ordered by rule name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeteringSnapshot {
    pub rules: BTreeMap<String, RuleMetrics>,
}

impl MeteringSnapshot {
    /// Counters accumulated since `earlier`. Rules that did not run in
    /// between are left out.
    pub fn diff(&self, earlier: &Self) -> Self {
        let rules = self
            .rules
            .iter()
            .filter_map(|(name, now)| {
                let before = earlier.rules.get(name).copied().unwrap_or_default();
                let delta = now.saturating_sub(before);
                (delta.total_runs > 0).then(|| (name.clone(), delta))
            })
            .collect();
        Self { rules }
    }

    pub fn get(&self, rule: &str) -> Option<&RuleMetrics> {
        self.rules.get(rule)
    }

    pub fn total_runs(&self) -> u64 {
        self.rules.values().map(|m| m.total_runs).sum()
    }

    pub fn total_effective_runs(&self) -> u64 {
        self.rules.values().map(|m| m.effective_runs).sum()
    }

    pub fn total_time(&self) -> Duration {
        self.rules.values().map(RuleMetrics::total_time).sum()
    }
}

/// Counters keyed by rule name, safe to update from concurrent analyses.
#[derive(Debug, Default)]
pub struct QueryExecutionMetering {
    rules: RwLock<HashMap<String, Arc<RuleCounters>>>,
}

impl QueryExecutionMetering {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide metering instance executors use unless given one.
    pub fn instance() -> Arc<Self> {
        static INSTANCE: OnceLock<Arc<QueryExecutionMetering>> = OnceLock::new();
        Arc::clone(INSTANCE.get_or_init(|| Arc::new(Self::new())))
    }

    fn counters(&self, rule: &str) -> Arc<RuleCounters> {
        if let Some(c) = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(rule)
        {
            return Arc::clone(c);
        }
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guard.entry(rule.to_string()).or_default())
    }

    /// Record one run of `rule`.
    pub fn record(&self, rule: &str, elapsed: Duration, effective: bool) {
        let counters = self.counters(rule);
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        counters.time_ns.fetch_add(ns, Ordering::Relaxed);
        counters.runs.fetch_add(1, Ordering::Relaxed);
        if effective {
            counters.effective_runs.fetch_add(1, Ordering::Relaxed);
            counters.effective_time_ns.fetch_add(ns, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MeteringSnapshot {
        let guard = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        MeteringSnapshot {
            rules: guard
                .iter()
                .map(|(name, c)| (name.clone(), c.load()))
                .collect(),
        }
    }

    /// Clear all counters.
    pub fn reset(&self) {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Human-readable report of time spent per rule, slowest first.
    pub fn dump_time_spent(&self) -> String {
        let snapshot = self.snapshot();
        let mut rows: Vec<_> = snapshot.rules.iter().collect();
        rows.sort_by(|a, b| b.1.total_time_ns.cmp(&a.1.total_time_ns).then(a.0.cmp(b.0)));

        let width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Rule".len());

        let mut out = String::new();
        let _ = writeln!(out, "=== Metrics of Executed Rules ===");
        let _ = writeln!(out, "Total number of runs: {}", snapshot.total_runs());
        let _ = writeln!(
            out,
            "Total time: {:.6} seconds",
            snapshot.total_time().as_secs_f64()
        );
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<width$} {:>40} {:>40}",
            "Rule", "Effective Time / Total Time", "Effective Runs / Total Runs"
        );
        for (name, m) in rows {
            let _ = writeln!(
                out,
                "{:<width$} {:>40} {:>40}",
                name,
                format!("{} / {}", m.effective_time_ns, m.total_time_ns),
                format!("{} / {}", m.effective_runs, m.total_runs),
            );
        }
        out
    }
}
