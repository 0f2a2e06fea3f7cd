// Prometheus metrics for the API, served on GET /metrics

use arena_core::{Language, RunReport};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arena_runs_total",
        "Comparison runs requested, by outcome",
        &["outcome"]
    )
    .expect("arena_runs_total registers once");
    pub static ref SLOT_RESULTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "arena_slot_results_total",
        "Settled slots, by language and outcome",
        &["language", "outcome"]
    )
    .expect("arena_slot_results_total registers once");
    pub static ref RUN_DURATION_SECONDS: Histogram = register_histogram!(
        "arena_run_duration_seconds",
        "Wall time from dispatch until both slots settled"
    )
    .expect("arena_run_duration_seconds registers once");
}

pub fn record_run_outcome(outcome: &str) {
    RUNS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_report(report: &RunReport) {
    for (_, result) in report.results.iter() {
        // Free-form language names would explode label cardinality
        let language = result
            .language
            .parse::<Language>()
            .map(|lang| lang.value())
            .unwrap_or("unsupported");
        let outcome = if result.success { "success" } else { "failure" };
        SLOT_RESULTS_TOTAL
            .with_label_values(&[language, outcome])
            .inc();
    }

    let elapsed = report.finished_at - report.started_at;
    RUN_DURATION_SECONDS.observe(elapsed.num_milliseconds() as f64 / 1000.0);
}

pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
