//! Lightweight metrics helpers for the dispatcher.
//!
//! Thin wrappers over the `metrics` crate macros. No exporter is embedded; the
//! application may install any compatible recorder. Without one, the macros are
//! no-ops and only the in-process outcome tally below is kept.
//!
//! Provided metrics:
//! * `mvc_dispatch_requests_total` (counter; labels `outcome`, `status`, `mode`)
//! * `mvc_dispatch_duration_seconds` (histogram; label `mode`)
//! * `mvc_config_reloads_total` (counter; label `result`)
//!
//! [`DispatchTimer`] records through `Drop`, so early returns are still counted.
use std::{
    collections::HashMap,
    sync::{LazyLock, Mutex},
    time::Instant,
};

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};

pub const MVC_DISPATCH_REQUESTS_TOTAL: &str = "mvc_dispatch_requests_total";
pub const MVC_DISPATCH_DURATION_SECONDS: &str = "mvc_dispatch_duration_seconds";
pub const MVC_CONFIG_RELOADS_TOTAL: &str = "mvc_config_reloads_total";

/// Mode label for requests that never reached a dispatcher branch
pub const MODE_UNRESOLVED: &str = "unresolved";

/// Outcome counts keyed by outcome label, independent of any recorder
static OUTCOME_TALLY: LazyLock<Mutex<HashMap<String, u64>>> = LazyLock::new(|| {
    describe_counter!(
        MVC_DISPATCH_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests dispatched, by outcome."
    );
    describe_histogram!(
        MVC_DISPATCH_DURATION_SECONDS,
        Unit::Seconds,
        "Time from request arrival to rendered response."
    );
    describe_counter!(
        MVC_CONFIG_RELOADS_TOTAL,
        Unit::Count,
        "Configuration reload attempts, by result."
    );

    Mutex::new(HashMap::new())
});

/// Count one dispatched request.
pub fn increment_dispatch_total(outcome: &str, status: u16, mode: &str) {
    if let Ok(mut tally) = OUTCOME_TALLY.lock() {
        *tally.entry(outcome.to_string()).or_default() += 1;
    } else {
        tracing::error!("Failed to acquire lock for dispatch outcome tally");
    }

    counter!(
        MVC_DISPATCH_REQUESTS_TOTAL,
        "outcome" => outcome.to_string(),
        "status" => status.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
}

pub fn record_dispatch_duration(mode: &str, duration: std::time::Duration) {
    histogram!(MVC_DISPATCH_DURATION_SECONDS, "mode" => mode.to_string())
        .record(duration.as_secs_f64());
}

pub fn increment_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(MVC_CONFIG_RELOADS_TOTAL, "result" => result).increment(1);
}

/// RAII helper measuring one dispatch, from arrival to response.
///
/// Outcome, status and mode default to an internal failure and are filled in
/// with [`DispatchTimer::finish`] once the response is known.
pub struct DispatchTimer {
    start: Instant,
    outcome: &'static str,
    status: u16,
    mode: &'static str,
}

impl DispatchTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            outcome: "internal",
            status: 500,
            mode: MODE_UNRESOLVED,
        }
    }

    pub fn finish(&mut self, outcome: &'static str, status: u16, mode: &'static str) {
        self.outcome = outcome;
        self.status = status;
        self.mode = mode;
    }
}

impl Default for DispatchTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DispatchTimer {
    fn drop(&mut self) {
        increment_dispatch_total(self.outcome, self.status, self.mode);
        record_dispatch_duration(self.mode, self.start.elapsed());
    }
}

/// Initialize metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    tracing::info!("Initializing dispatcher metrics");
    LazyLock::force(&OUTCOME_TALLY);
    Ok(())
}

/// Snapshot of the outcome tally, for status output and tests.
pub fn get_current_metrics() -> HashMap<String, u64> {
    OUTCOME_TALLY
        .lock()
        .map(|tally| tally.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_timer_records_outcome_on_drop() {
        let before = get_current_metrics()
            .get("test_outcome")
            .copied()
            .unwrap_or(0);

        let mut timer = DispatchTimer::new();
        timer.finish("test_outcome", 200, "mapped");
        drop(timer);

        let after = get_current_metrics()["test_outcome"];
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_unfinished_timer_counts_as_internal() {
        drop(DispatchTimer::new());
        assert!(get_current_metrics().contains_key("internal"));
    }

    #[test]
    fn test_init_metrics() {
        assert!(init_metrics().is_ok());
        increment_config_reload(true);
    }
}
