//! Print job lifecycle integration tests.
//!
//! These tests drive jobs through the orchestrator end to end:
//! scheduled -> generating -> printing -> completed (or failed)

use std::sync::{Arc, Mutex};
use std::time::Duration;

use raffle_core::{
    testing::{fixtures, MockImageRenderer},
    Category, JobStatus, JobStore, OrchestratorConfig, OrchestratorError, PrintJob, PrintRequest,
    TicketStore,
};

const TEMPLATE: &str = "a4-grid-3x8";

async fn wait_for_status(
    h: &fixtures::OrchestratorHarness,
    job_id: &str,
    expected: JobStatus,
    timeout: Duration,
) -> Option<PrintJob> {
    let start = std::time::Instant::now();
    let poll_interval = Duration::from_millis(20);

    while start.elapsed() < timeout {
        if let Ok(job) = h.orchestrator.get_job_status(job_id) {
            if job.status == expected {
                return Some(job);
            }
            // Stop if we hit a different terminal state
            if job.status.is_terminal() {
                return None;
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
    None
}

async fn wait_until_running(h: &fixtures::OrchestratorHarness, job_id: &str) {
    for _ in 0..100 {
        if h.orchestrator.is_running(job_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never started", job_id);
}

fn print_counts(h: &fixtures::OrchestratorHarness, first: u32, last: u32) -> Vec<u32> {
    (first..=last)
        .map(|seq| fixtures::ticket(h.tickets.as_ref(), Category::A, seq).print.print_count)
        .collect()
}

// =============================================================================
// Completion
// =============================================================================

#[tokio::test]
async fn test_background_job_completes() {
    let renderer = Arc::new(MockImageRenderer::new());
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(5),
        renderer.clone(),
        Category::A,
        1,
        23,
    );

    let job_id = h
        .orchestrator
        .request_print_job(&PrintRequest::new(Category::A, 1, 23, "a4-stub-2x5"))
        .unwrap();

    let done = wait_for_status(&h, &job_id, JobStatus::Completed, Duration::from_secs(5))
        .await
        .expect("job should complete");

    assert_eq!(done.total_tickets, 23);
    assert_eq!(done.total_pages, 3);
    assert_eq!(done.printed_count, 23);
    assert_eq!(done.progress_percent, 100);
    assert!(done.errors.is_empty());
    assert!(!h.orchestrator.is_running(&job_id));
    assert_eq!(renderer.call_count().await, 46);
    assert!(print_counts(&h, 1, 23).iter().all(|&c| c == 1));
}

#[tokio::test]
async fn test_render_fan_out_respects_concurrency_cap() {
    let renderer = Arc::new(MockImageRenderer::new());
    renderer.set_delay_ms(15).await;
    let config = OrchestratorConfig {
        max_concurrency: 3,
        call_timeout_ms: 1_000,
        batch_size: 50,
        progress_step: 1,
    };
    let h = fixtures::orchestrator(config, renderer.clone(), Category::A, 1, 12);

    let job = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 12, TEMPLATE))
        .unwrap();
    let done = h.orchestrator.run(&job.id).await.unwrap();

    assert_eq!(done.printed_count, 12);
    assert_eq!(renderer.call_count().await, 12);
    assert_eq!(renderer.in_flight(), 0);
    let peak = renderer.peak_in_flight();
    assert!(peak > 1, "renders never overlapped");
    assert!(peak <= 3, "peak of {} renders exceeds the cap", peak);
}

#[tokio::test]
async fn test_rerun_of_completed_job_is_noop() {
    let renderer = Arc::new(MockImageRenderer::new());
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(4),
        renderer.clone(),
        Category::A,
        1,
        8,
    );

    let job = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 8, TEMPLATE))
        .unwrap();
    let first = h.orchestrator.run(&job.id).await.unwrap();
    let calls = renderer.call_count().await;

    let second = h.orchestrator.run(&job.id).await.unwrap();
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.printed_count, first.printed_count);
    assert_eq!(second.completed_at, first.completed_at);
    assert_eq!(renderer.call_count().await, calls);
    assert!(print_counts(&h, 1, 8).iter().all(|&c| c == 1));
}

#[tokio::test]
async fn test_second_job_over_same_range_reprints() {
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(4),
        Arc::new(MockImageRenderer::new()),
        Category::A,
        1,
        4,
    );
    let request = PrintRequest::new(Category::A, 1, 4, TEMPLATE);

    let first = h.orchestrator.create_job(&request).unwrap();
    h.orchestrator.run(&first.id).await.unwrap();
    let barcode = fixtures::ticket(h.tickets.as_ref(), Category::A, 2).barcode;

    let second = h.orchestrator.create_job(&request).unwrap();
    let done = h.orchestrator.run(&second.id).await.unwrap();

    assert_eq!(done.printed_count, 4);
    assert_eq!(print_counts(&h, 1, 4), vec![2, 2, 2, 2]);
    // Codes are stable across reprints.
    assert_eq!(
        fixtures::ticket(h.tickets.as_ref(), Category::A, 2).barcode,
        barcode
    );
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let renderer = Arc::new(MockImageRenderer::new());
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(2),
        renderer.clone(),
        Category::A,
        1,
        12,
    );
    let job = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 12, TEMPLATE))
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let jobs = Arc::clone(&h.jobs);
    let job_id = job.id.clone();
    renderer
        .set_hook(move |_| {
            let mut seen = sink.lock().unwrap();
            let job = jobs.get(&job_id).unwrap().unwrap();
            seen.push(job.progress_percent);
        })
        .await;

    h.orchestrator.run(&job.id).await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 12);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().all(|&p| (50..=95).contains(&p)));
}

// =============================================================================
// Item errors
// =============================================================================

#[tokio::test]
async fn test_failed_render_leaves_ticket_unprinted() {
    let renderer = Arc::new(MockImageRenderer::new());
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(3),
        renderer.clone(),
        Category::A,
        1,
        6,
    );
    let broken = fixtures::ticket(h.tickets.as_ref(), Category::A, 4);
    renderer.fail_ticket(&broken.id).await;

    let job = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 6, TEMPLATE))
        .unwrap();
    let done = h.orchestrator.run(&job.id).await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.printed_count, 5);
    assert_eq!(done.errors.len(), 1);
    assert_eq!(done.errors[0].ticket_id, broken.id);
    assert_eq!(done.errors[0].ticket_number, "A000004");
    // One call plus one retry.
    assert_eq!(renderer.calls_for(&broken.id).await.len(), 2);
    assert_eq!(print_counts(&h, 1, 6), vec![1, 1, 1, 0, 1, 1]);
}

// =============================================================================
// Cancellation and retry
// =============================================================================

#[tokio::test]
async fn test_cancel_mid_run_marks_nothing() {
    let renderer = Arc::new(MockImageRenderer::new());
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(2),
        renderer.clone(),
        Category::A,
        1,
        10,
    );
    let job = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 10, TEMPLATE))
        .unwrap();

    let jobs = Arc::clone(&h.jobs);
    let job_id = job.id.clone();
    renderer
        .set_hook(move |_| {
            let _ = jobs.request_cancel(&job_id);
        })
        .await;

    let result = h.orchestrator.run(&job.id).await;
    assert!(matches!(result, Err(OrchestratorError::Cancelled)));

    let failed = h.orchestrator.get_job_status(&job.id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("Cancelled"));
    assert_eq!(failed.printed_count, 0);
    // Only the first batch reached the renderer.
    assert_eq!(renderer.call_count().await, 2);
    assert!(print_counts(&h, 1, 10).iter().all(|&c| c == 0));
    assert_eq!(h.tickets.printed_by_job(&job.id).unwrap(), 0);
}

#[tokio::test]
async fn test_retry_after_cancel_prints_once() {
    let renderer = Arc::new(MockImageRenderer::new());
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(2),
        renderer.clone(),
        Category::A,
        1,
        6,
    );
    let job = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 6, TEMPLATE))
        .unwrap();

    let jobs = Arc::clone(&h.jobs);
    let job_id = job.id.clone();
    renderer
        .set_hook(move |_| {
            let _ = jobs.request_cancel(&job_id);
        })
        .await;
    assert!(h.orchestrator.run(&job.id).await.is_err());

    renderer.set_hook(|_| {}).await;
    let done = h.orchestrator.retry(&job.id).await.unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert!(!done.cancel_requested);
    assert!(done.error.is_none());
    assert_eq!(done.printed_count, 6);
    assert!(print_counts(&h, 1, 6).iter().all(|&c| c == 1));

    // A completed job cannot be retried.
    assert!(matches!(
        h.orchestrator.retry(&job.id).await,
        Err(OrchestratorError::InvalidState {
            status: JobStatus::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_cancel_running_background_job() {
    let renderer = Arc::new(MockImageRenderer::new());
    renderer.set_delay_ms(50).await;
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(2),
        renderer.clone(),
        Category::A,
        1,
        20,
    );

    let job_id = h
        .orchestrator
        .request_print_job(&PrintRequest::new(Category::A, 1, 20, TEMPLATE))
        .unwrap();
    wait_until_running(&h, &job_id).await;

    let flagged = h.orchestrator.cancel(&job_id).unwrap();
    assert!(flagged.cancel_requested);
    assert!(!flagged.status.is_terminal());

    let failed = wait_for_status(&h, &job_id, JobStatus::Failed, Duration::from_secs(5))
        .await
        .expect("job should fail");
    assert_eq!(failed.error.as_deref(), Some("Cancelled"));
    assert_eq!(failed.printed_count, 0);
    assert!(renderer.call_count().await < 20);
}

#[tokio::test]
async fn test_concurrent_run_rejected() {
    let renderer = Arc::new(MockImageRenderer::new());
    renderer.set_delay_ms(50).await;
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(2),
        renderer.clone(),
        Category::A,
        1,
        6,
    );

    let job_id = h
        .orchestrator
        .request_print_job(&PrintRequest::new(Category::A, 1, 6, TEMPLATE))
        .unwrap();
    wait_until_running(&h, &job_id).await;

    assert!(matches!(
        h.orchestrator.run(&job_id).await,
        Err(OrchestratorError::AlreadyRunning(_))
    ));

    let done = wait_for_status(&h, &job_id, JobStatus::Completed, Duration::from_secs(5))
        .await
        .expect("job should complete");
    assert_eq!(done.printed_count, 6);
}

#[tokio::test]
async fn test_list_jobs_newest_first() {
    let h = fixtures::orchestrator(
        fixtures::small_batch_config(10),
        Arc::new(MockImageRenderer::new()),
        Category::A,
        1,
        10,
    );

    let first = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 5, TEMPLATE))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 6, 10, TEMPLATE))
        .unwrap();

    let jobs = h.orchestrator.list_jobs(10, 0).unwrap();
    let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

    assert_eq!(h.orchestrator.list_jobs(1, 1).unwrap()[0].id, first.id);
}
