//! Run statistics - per request name counters with latency tracking

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::response::{RequestOutcome, Verdict};

struct NameStats {
    requests: u64,
    successes: u64,
    failures: u64,
    failure_reasons: BTreeMap<String, u64>,
    latencies_ms: Histogram<u64>,
}

impl NameStats {
    fn new() -> Self {
        Self {
            requests: 0,
            successes: 0,
            failures: 0,
            failure_reasons: BTreeMap::new(),
            // 3 significant digits is a valid precision, construction cannot fail
            latencies_ms: Histogram::new(3).expect("Failed to create latency histogram"),
        }
    }
}

#[derive(Default)]
struct Counters {
    by_name: BTreeMap<String, NameStats>,
    isolated_faults: u64,
    aborted_users: u64,
    started_users: u64,
}

/// Shared sink for explicit request outcomes. Cheap to clone.
#[derive(Clone)]
pub struct StatsCollector {
    counters: Arc<RwLock<Counters>>,
    start_time: Instant,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(Counters::default())),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        let mut counters = self.counters.write();
        let entry = counters
            .by_name
            .entry(outcome.name.clone())
            .or_insert_with(NameStats::new);

        entry.requests += 1;
        match &outcome.verdict {
            Verdict::Success => entry.successes += 1,
            Verdict::Failure(reason) => {
                entry.failures += 1;
                *entry.failure_reasons.entry(reason.clone()).or_insert(0) += 1;
            }
        }
        let ms = outcome.elapsed.as_millis().min(u64::MAX as u128) as u64;
        let _ = entry.latencies_ms.record(ms);
    }

    /// An error swallowed at a task boundary. Not part of pass/fail.
    pub fn isolated_fault(&self) {
        self.counters.write().isolated_faults += 1;
    }

    pub fn user_started(&self) {
        self.counters.write().started_users += 1;
    }

    pub fn user_aborted(&self) {
        self.counters.write().aborted_users += 1;
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn report(&self) -> StatsReport {
        let counters = self.counters.read();
        let requests = counters
            .by_name
            .iter()
            .map(|(name, s)| {
                let h = &s.latencies_ms;
                let latency = if h.len() == 0 {
                    None
                } else {
                    Some(LatencyStats {
                        min: h.min(),
                        p50: h.value_at_quantile(0.50),
                        p95: h.value_at_quantile(0.95),
                        p99: h.value_at_quantile(0.99),
                        max: h.max(),
                        mean: h.mean(),
                    })
                };
                RequestSummary {
                    name: name.clone(),
                    requests: s.requests,
                    successes: s.successes,
                    failures: s.failures,
                    failure_reasons: s.failure_reasons.clone(),
                    latency_ms: latency,
                }
            })
            .collect();

        StatsReport {
            elapsed_secs: self.elapsed_seconds(),
            requests,
            isolated_faults: counters.isolated_faults,
            started_users: counters.started_users,
            aborted_users: counters.aborted_users,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub min: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub name: String,
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub failure_reasons: BTreeMap<String, u64>,
    pub latency_ms: Option<LatencyStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub elapsed_secs: f64,
    pub requests: Vec<RequestSummary>,
    /// Upload errors that were logged and swallowed instead of reported.
    pub isolated_faults: u64,
    pub started_users: u64,
    pub aborted_users: u64,
}

impl StatsReport {
    pub fn total_requests(&self) -> u64 {
        self.requests.iter().map(|r| r.requests).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.requests.iter().map(|r| r.failures).sum()
    }

    pub fn get(&self, name: &str) -> Option<&RequestSummary> {
        self.requests.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "Name", "# reqs", "# fails", "avg", "min", "p95", "max"
        )?;
        writeln!(f, "{}", "-".repeat(80))?;
        for r in &self.requests {
            match &r.latency_ms {
                Some(l) => writeln!(
                    f,
                    "{:<24} {:>8} {:>8} {:>8.0} {:>8} {:>8} {:>8}",
                    r.name, r.requests, r.failures, l.mean, l.min, l.p95, l.max
                )?,
                None => writeln!(
                    f,
                    "{:<24} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
                    r.name, r.requests, r.failures, "-", "-", "-", "-"
                )?,
            }
        }
        writeln!(f, "{}", "-".repeat(80))?;
        writeln!(
            f,
            "{:<24} {:>8} {:>8}",
            "Aggregated",
            self.total_requests(),
            self.total_failures()
        )?;

        let failures: Vec<_> = self
            .requests
            .iter()
            .flat_map(|r| r.failure_reasons.iter().map(move |(m, n)| (&r.name, m, n)))
            .collect();
        if !failures.is_empty() {
            writeln!(f, "\nFailures:")?;
            for (name, msg, n) in failures {
                writeln!(f, "  {:>6}  {}: {}", n, name, msg)?;
            }
        }

        write!(
            f,
            "\nusers started={} aborted={}  isolated faults={}  elapsed={:.1}s",
            self.started_users, self.aborted_users, self.isolated_faults, self.elapsed_secs
        )
    }
}
