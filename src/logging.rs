//! Logging for the overlay pipeline.
//!
//! `show_raster_map` brackets a whole run with start/end events, and each
//! stage inside it (reprojection, rendering) is timed under its own run id
//! so interleaved overlays in one log can be told apart.

use std::fmt::Display;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::OverlayError;

/// Install the fmt subscriber; `RUST_LOG` wins over the configured level.
///
/// Safe to call more than once: later calls leave the first subscriber in place.
pub fn init_tracing(log_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

/// Mark the start of a pipeline run, with the raster it works on
pub fn log_operation_start(operation: &str, source: Option<&str>) {
    match source {
        Some(source) => info!(operation = operation, source = source, "Pipeline started"),
        None => info!(operation = operation, "Pipeline started"),
    }
}

/// Mark the end of a pipeline run and its wall time
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    if success {
        info!(operation = operation, duration_ms = duration_ms, "Pipeline finished");
    } else {
        warn!(operation = operation, duration_ms = duration_ms, "Pipeline failed");
    }
}

/// Run one pipeline stage, logging its duration and whether it failed
pub fn log_timed_operation<F, T, E>(stage: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let start = Instant::now();
    let run_id = Uuid::new_v4();
    debug!(stage = stage, run_id = %run_id, "Stage started");

    let result = f();
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(_) => info!(
            stage = stage,
            run_id = %run_id,
            duration_ms = duration_ms,
            "Stage completed"
        ),
        Err(e) => warn!(
            stage = stage,
            run_id = %run_id,
            duration_ms = duration_ms,
            error = %e,
            "Stage failed"
        ),
    }
    result
}

/// Log a pipeline error against the raster it concerns
pub fn log_error(error: &OverlayError, source: &str) {
    error!(error = %error, source = source, "Overlay failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_log_timed_operation_passes_result_through() {
        let result: Result<u32, OverlayError> = log_timed_operation("render", || {
            std::thread::sleep(Duration::from_millis(1));
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_log_timed_operation_keeps_error() {
        let result: Result<(), OverlayError> =
            log_timed_operation("reproject", || Err(OverlayError::EmptyBoundary));
        assert!(matches!(result, Err(OverlayError::EmptyBoundary)));
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing("debug");
        init_tracing("info");
        log_operation_start("noop", Some("twice.tif"));
        log_operation_end("noop", Instant::now(), true);
    }
}
