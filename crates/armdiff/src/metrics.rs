//! Metrics collection and reporting using metrics-rs.
//!
//! Case outcomes are counted and engine execution time is recorded as a
//! histogram per engine label. With `--metrics` the CLI installs
//! [`CliRecorder`] and prints a summary at exit.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_histogram, histogram,
};
use parking_lot::RwLock;
use tracing::warn;

/// Case result status for metrics recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed,
    Aborted,
}

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "armdiff_cases_passed_total",
        Unit::Count,
        "Cases whose engines agreed"
    );
    describe_counter!(
        "armdiff_cases_failed_total",
        Unit::Count,
        "Cases whose engines diverged"
    );
    describe_counter!(
        "armdiff_cases_aborted_total",
        Unit::Count,
        "Cases aborted by an engine fault"
    );
    describe_histogram!(
        "armdiff_engine_duration_seconds",
        Unit::Seconds,
        "Single-instruction execution time per engine"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

/// Record the outcome of one case.
pub fn record_case(mnemonic: &str, status: CaseStatus) {
    let labels = [("case", mnemonic.to_string())];
    match status {
        CaseStatus::Passed => counter!("armdiff_cases_passed_total", &labels).increment(1),
        CaseStatus::Failed => counter!("armdiff_cases_failed_total", &labels).increment(1),
        CaseStatus::Aborted => counter!("armdiff_cases_aborted_total", &labels).increment(1),
    }
}

/// Record how long one engine took to set up, execute and extract.
pub fn record_engine_time(engine: &str, secs: f64) {
    let labels = [("engine", engine.to_string())];
    histogram!("armdiff_engine_duration_seconds", &labels).record(secs);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct HistogramStorage {
    values: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<HistogramStorage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.entry(self.key.clone()).or_default().push(value);
    }
}

/// Recorder that keeps counters and histograms in memory for a terminal
/// summary. Gauges are not used and are discarded.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder.
    ///
    /// Returns `None` if another recorder is already installed.
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }

    fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            histograms: Arc::clone(&self.histograms),
        }
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let labels = key.labels();
    if labels.len() == 0 {
        name.to_string()
    } else {
        let label_str: Vec<String> = labels
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        format!("{}{{{}}}", name, label_str.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.histograms),
        }))
    }
}

/// Access to metrics recorded by an installed [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorderHandle {
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    pub fn get_histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.histograms.values.read().get(key).cloned()
    }

    /// Write all collected metrics in a human-readable format.
    pub fn write_summary(&self, out: &mut impl Write) -> io::Result<()> {
        let counters = self.counters.values.read();
        let histograms = self.histograms.values.read();

        if counters.is_empty() && histograms.is_empty() {
            return writeln!(out, "No metrics collected.");
        }

        writeln!(out)?;
        writeln!(out, "## Metrics Summary")?;
        writeln!(out)?;

        if !counters.is_empty() {
            writeln!(out, "### Counters")?;
            let mut keys: Vec<_> = counters.keys().collect();
            keys.sort();
            for key in keys {
                writeln!(out, "  {}: {}", key, counters[key])?;
            }
            writeln!(out)?;
        }

        if !histograms.is_empty() {
            writeln!(out, "### Histograms")?;
            let mut keys: Vec<_> = histograms.keys().collect();
            keys.sort();
            for key in keys {
                let values = &histograms[key];
                if values.is_empty() {
                    continue;
                }
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                writeln!(
                    out,
                    "  {}: count={}, min={:.6}, max={:.6}, avg={:.6}",
                    key,
                    values.len(),
                    min,
                    max,
                    avg
                )?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Print the summary to stdout.
    pub fn print_summary(&self) {
        let stdout = io::stdout();
        self.emit_summary(&mut stdout.lock());
    }

    /// Write the summary, logging a warning instead of failing.
    /// Returns whether the summary was written.
    fn emit_summary(&self, out: &mut impl Write) -> bool {
        match self.write_summary(out) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to write metrics summary");
                false
            }
        }
    }
}
