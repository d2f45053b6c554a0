//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Print jobs (outcomes, duration, tickets printed)
//! - Image rendering (calls, retries, failures)
//! - Point of sale (decisions by outcome)
//! - Legacy migration

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Print Jobs
// =============================================================================

/// Jobs created total.
pub static JOBS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("raffle_print_jobs_created_total", "Total print jobs created").unwrap()
});

/// Jobs finished total by terminal status.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "raffle_print_jobs_finished_total",
            "Total print jobs that reached a terminal status",
        ),
        &["status"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Job run duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("raffle_print_job_duration_seconds", "Duration of print job runs")
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0]),
        &["status"],
    )
    .unwrap()
});

/// Tickets marked printed total.
pub static TICKETS_PRINTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "raffle_tickets_printed_total",
        "Total tickets marked printed",
    )
    .unwrap()
});

/// Canonical barcodes assigned total.
pub static CODES_ASSIGNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "raffle_codes_assigned_total",
        "Total tickets that received a canonical barcode during a print run",
    )
    .unwrap()
});

// =============================================================================
// Rendering
// =============================================================================

/// Renderer calls by result.
pub static RENDER_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("raffle_render_calls_total", "Total image renderer calls"),
        &["result"], // "success", "retried", "failed"
    )
    .unwrap()
});

/// Tickets that could not be rendered.
pub static RENDER_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "raffle_render_failures_total",
        "Total tickets recorded with a rendering error",
    )
    .unwrap()
});

// =============================================================================
// Sales
// =============================================================================

/// Sale validation decisions by outcome.
pub static SALE_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("raffle_sale_decisions_total", "Total sale validations"),
        &["outcome"], // "accepted", "invalid_format", "not_found", "superseded_ticket", "already_sold"
    )
    .unwrap()
});

// =============================================================================
// Legacy Migration
// =============================================================================

/// Legacy tickets processed by result.
pub static LEGACY_MIGRATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "raffle_legacy_migrations_total",
            "Total legacy tickets seen by the migration pass",
        ),
        &["result"], // "converted", "skipped", "error"
    )
    .unwrap()
});

/// All core metrics, for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_CREATED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(TICKETS_PRINTED.clone()),
        Box::new(CODES_ASSIGNED.clone()),
        // Rendering
        Box::new(RENDER_CALLS.clone()),
        Box::new(RENDER_FAILURES.clone()),
        // Sales
        Box::new(SALE_DECISIONS.clone()),
        // Migration
        Box::new(LEGACY_MIGRATIONS.clone()),
    ]
}
