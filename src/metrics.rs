//! Step counters and timings for pipeline runs.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use std::fmt;

/// Every metric the pipeline emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RunsTotal,
    RowsFetched,
    RowsNormalized,
    StepDuration,
    StepFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsTotal => "cereal_runs_total",
            MetricName::RowsFetched => "cereal_rows_fetched_total",
            MetricName::RowsNormalized => "cereal_rows_normalized_total",
            MetricName::StepDuration => "cereal_step_duration_seconds",
            MetricName::StepFailures => "cereal_step_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn run_started() {
    ::metrics::counter!(MetricName::RunsTotal.as_str()).increment(1);
}

pub fn rows_fetched(rows: usize) {
    ::metrics::counter!(MetricName::RowsFetched.as_str()).increment(rows as u64);
}

pub fn rows_normalized(rows: usize) {
    ::metrics::counter!(MetricName::RowsNormalized.as_str()).increment(rows as u64);
}

pub fn step_finished(step: &'static str, duration_secs: f64, ok: bool) {
    ::metrics::histogram!(MetricName::StepDuration.as_str(), "step" => step).record(duration_secs);
    if !ok {
        ::metrics::counter!(MetricName::StepFailures.as_str(), "step" => step).increment(1);
    }
}
