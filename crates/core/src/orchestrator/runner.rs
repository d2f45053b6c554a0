//! Print job orchestrator implementation.
//!
//! One run of a job:
//! - Generating: fetches the printable tickets of the range and assigns
//!   missing barcodes, in batches with bounded concurrency
//! - Printing: computes the layout once, then renders placements batch by
//!   batch; a ticket whose placements fail twice is recorded, not fatal
//! - Completing: marks every fully rendered ticket printed in a single
//!   transaction keyed by job, so retries never double-count

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::codec::{Category, IdentifierCodec};
use crate::job::{JobError, JobItemError, JobItemErrorKind, JobStatus, JobStore, PrintJob};
use crate::layout::{LayoutPlan, PageLayoutEngine, Placement};
use crate::metrics::{
    CODES_ASSIGNED, JOBS_CREATED, JOBS_FINISHED, JOB_DURATION, RENDER_CALLS, RENDER_FAILURES,
    TICKETS_PRINTED,
};
use crate::renderer::{ImageRenderer, RenderRequest, RendererError};
use crate::template::{PaperTemplate, TemplateCatalog};
use crate::ticket::{
    ensure_codes, CodeAssignmentError, Ticket, TicketFilter, TicketStatus, TicketStore,
};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, PrintRequest};

const CANCELLED_REASON: &str = "Cancelled";

/// A ticket with both codes present.
#[derive(Debug, Clone)]
struct CodedTicket {
    ticket: Ticket,
    barcode: String,
    verification_ref: String,
}

impl CodedTicket {
    fn from_ticket(ticket: Ticket) -> Option<Self> {
        let barcode = ticket.barcode.as_ref()?.as_str().to_string();
        let verification_ref = ticket.verification_ref.clone()?;
        Some(Self {
            ticket,
            barcode,
            verification_ref,
        })
    }
}

/// Persists progress, skipping increases smaller than the configured step.
struct ProgressReporter<'a> {
    store: &'a dyn JobStore,
    job_id: &'a str,
    step: u8,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    fn new(store: &'a dyn JobStore, job: &'a PrintJob, step: u8) -> Self {
        Self {
            store,
            job_id: &job.id,
            step: step.max(1),
            last: job.progress_percent,
        }
    }

    /// Phase boundaries pass `force` so they are always written.
    fn report(&mut self, percent: u8, force: bool) -> Result<(), JobError> {
        if percent <= self.last {
            return Ok(());
        }
        if !force && percent < self.last.saturating_add(self.step) {
            return Ok(());
        }
        self.last = self.store.raise_progress(self.job_id, percent)?;
        Ok(())
    }
}

/// `base + floor(span * done / total)`.
fn phase_percent(base: u8, span: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return base + span;
    }
    base + (span as usize * done.min(total) / total) as u8
}

/// Removes a job from the active set when the run ends.
struct ActiveRun {
    job_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active.lock().unwrap().remove(&self.job_id);
    }
}

/// Drives print jobs from creation to completion.
pub struct PrintJobOrchestrator {
    config: OrchestratorConfig,
    codec: Arc<IdentifierCodec>,
    templates: Arc<TemplateCatalog>,
    ticket_store: Arc<dyn TicketStore>,
    job_store: Arc<dyn JobStore>,
    renderer: Arc<dyn ImageRenderer>,
    layout: PageLayoutEngine,
    active: Arc<Mutex<HashSet<String>>>,
}

impl PrintJobOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        codec: Arc<IdentifierCodec>,
        templates: Arc<TemplateCatalog>,
        ticket_store: Arc<dyn TicketStore>,
        job_store: Arc<dyn JobStore>,
        renderer: Arc<dyn ImageRenderer>,
    ) -> Self {
        Self {
            config,
            codec,
            templates,
            ticket_store,
            job_store,
            renderer,
            layout: PageLayoutEngine::new(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub(super) fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    pub(super) fn ticket_store(&self) -> &dyn TicketStore {
        self.ticket_store.as_ref()
    }

    /// Validates `request` and persists a `scheduled` job.
    ///
    /// Legacy tickets in the range are migrated first. Tickets imported
    /// under the legacy scheme are never printed and do not count towards
    /// the range.
    pub fn create_job(&self, request: &PrintRequest) -> Result<PrintJob, OrchestratorError> {
        let template = self
            .templates
            .get(&request.template)
            .map_err(|_| OrchestratorError::UnknownTemplate(request.template.clone()))?;

        let empty = || OrchestratorError::EmptyRange {
            category: request.category,
            start: request.range_start,
            end: request.range_end,
        };

        if request.range_start == 0 || request.range_start > request.range_end {
            return Err(empty());
        }

        self.migrate_range(request.category, request.range_start, request.range_end)?;

        let total = self.ticket_store.count(&printable_filter(
            request.category,
            request.range_start,
            request.range_end,
        ))?;
        if total == 0 {
            return Err(empty());
        }

        let total_tickets = total as u32;
        let total_pages = self.layout.sheet_count(total as usize, template);
        let job = PrintJob::new(
            request.category,
            request.range_start,
            request.range_end,
            &template.name,
            total_tickets,
            total_pages,
        );
        self.job_store.create(&job)?;
        JOBS_CREATED.inc();

        info!(
            job_id = %job.id,
            category = %job.category,
            range_start = job.range_start,
            range_end = job.range_end,
            template = %job.template,
            total_tickets,
            total_pages,
            "Print job created"
        );

        Ok(job)
    }

    /// Creates a job and runs it in the background. Returns the job id;
    /// progress is observable through [`get_job_status`](Self::get_job_status).
    pub fn request_print_job(
        self: &Arc<Self>,
        request: &PrintRequest,
    ) -> Result<String, OrchestratorError> {
        let job = self.create_job(request)?;
        let job_id = job.id.clone();

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let job_id = job.id;
            if let Err(e) = orchestrator
                .run_from(&job_id, &[JobStatus::Scheduled])
                .await
            {
                warn!(job_id = %job_id, error = %e, "Print job did not complete");
            }
        });

        Ok(job_id)
    }

    pub fn get_job_status(&self, job_id: &str) -> Result<PrintJob, OrchestratorError> {
        self.job_store
            .get(job_id)?
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.to_string()))
    }

    /// Most recent jobs first.
    pub fn list_jobs(&self, limit: i64, offset: i64) -> Result<Vec<PrintJob>, OrchestratorError> {
        Ok(self.job_store.list(limit, offset)?)
    }

    /// Whether a run of `job_id` is in progress in this process.
    pub fn is_running(&self, job_id: &str) -> bool {
        self.active.lock().unwrap().contains(job_id)
    }

    /// Number of job runs in progress in this process.
    pub fn running_jobs(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    /// Runs a job to completion.
    ///
    /// A completed job is returned unchanged. A failed job is re-run: codes
    /// already assigned are kept and tickets this job already marked printed
    /// are not marked again.
    pub async fn run(&self, job_id: &str) -> Result<PrintJob, OrchestratorError> {
        self.run_from(
            job_id,
            &[
                JobStatus::Scheduled,
                JobStatus::Generating,
                JobStatus::Printing,
                JobStatus::Failed,
            ],
        )
        .await
    }

    /// Re-runs a failed job.
    pub async fn retry(&self, job_id: &str) -> Result<PrintJob, OrchestratorError> {
        let job = self.get_job_status(job_id)?;
        if job.status != JobStatus::Failed {
            return Err(OrchestratorError::InvalidState {
                job_id: job_id.to_string(),
                status: job.status,
                operation: "retry".to_string(),
            });
        }
        info!(job_id = %job_id, previous_error = ?job.error, "Retrying print job");
        self.run_from(job_id, &[JobStatus::Failed]).await
    }

    /// Checks that `job_id` failed and retries it in the background.
    /// Returns the job as it was before the retry started.
    pub fn request_retry(self: &Arc<Self>, job_id: &str) -> Result<PrintJob, OrchestratorError> {
        let job = self.get_job_status(job_id)?;
        if job.status != JobStatus::Failed {
            return Err(OrchestratorError::InvalidState {
                job_id: job_id.to_string(),
                status: job.status,
                operation: "retry".to_string(),
            });
        }

        let orchestrator = Arc::clone(self);
        let id = job.id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.retry(&id).await {
                warn!(job_id = %id, error = %e, "Print job retry did not complete");
            }
        });

        Ok(job)
    }

    /// Requests cancellation.
    ///
    /// A running job stops at its next batch boundary and fails with reason
    /// `Cancelled`. A job that is not running fails right away.
    pub fn cancel(&self, job_id: &str) -> Result<PrintJob, OrchestratorError> {
        let job = self.get_job_status(job_id)?;
        if job.is_terminal() {
            return Err(OrchestratorError::InvalidState {
                job_id: job_id.to_string(),
                status: job.status,
                operation: "cancel".to_string(),
            });
        }

        // Held until the job is flagged or failed so no run can start in between.
        let active = self.active.lock().unwrap();
        if active.contains(job_id) {
            let flagged = self.job_store.request_cancel(job_id)?;
            info!(job_id = %job_id, "Cancellation requested");
            return Ok(flagged);
        }

        let failed = self.job_store.fail(job_id, CANCELLED_REASON)?;
        drop(active);
        JOBS_FINISHED.with_label_values(&["cancelled"]).inc();
        info!(job_id = %job_id, "Idle job cancelled");
        Ok(failed)
    }

    async fn run_from(
        &self,
        job_id: &str,
        from: &[JobStatus],
    ) -> Result<PrintJob, OrchestratorError> {
        let job = self.get_job_status(job_id)?;
        if job.status == JobStatus::Completed {
            debug!(job_id = %job_id, "Job already completed, nothing to do");
            return Ok(job);
        }

        let _active = self.claim(job_id)?;
        let job = self
            .job_store
            .transition(job_id, from, JobStatus::Generating)?;
        self.job_store.clear_errors(job_id)?;

        let started = Instant::now();
        info!(job_id = %job_id, total_tickets = job.total_tickets, "Print job started");

        match self.execute(&job).await {
            Ok(done) => {
                let elapsed = started.elapsed().as_secs_f64();
                JOBS_FINISHED.with_label_values(&["completed"]).inc();
                JOB_DURATION
                    .with_label_values(&["completed"])
                    .observe(elapsed);
                info!(
                    job_id = %job_id,
                    printed = done.printed_count,
                    errors = done.errors.len(),
                    elapsed_secs = elapsed,
                    "Print job completed"
                );
                Ok(done)
            }
            Err(e) => {
                let (label, reason) = match &e {
                    OrchestratorError::Cancelled => ("cancelled", CANCELLED_REASON.to_string()),
                    other => ("failed", other.to_string()),
                };

                match self.job_store.fail(job_id, &reason) {
                    Ok(_) => {}
                    Err(fail_err) => {
                        error!(job_id = %job_id, error = %fail_err, "Failed to record job failure")
                    }
                }

                JOBS_FINISHED.with_label_values(&[label]).inc();
                JOB_DURATION
                    .with_label_values(&[label])
                    .observe(started.elapsed().as_secs_f64());

                if matches!(e, OrchestratorError::Cancelled) {
                    info!(job_id = %job_id, "Print job cancelled");
                } else {
                    error!(job_id = %job_id, error = %e, "Print job failed");
                }
                Err(e)
            }
        }
    }

    fn claim(&self, job_id: &str) -> Result<ActiveRun, OrchestratorError> {
        let mut active = self.active.lock().unwrap();
        if !active.insert(job_id.to_string()) {
            return Err(OrchestratorError::AlreadyRunning(job_id.to_string()));
        }
        Ok(ActiveRun {
            job_id: job_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    async fn execute(&self, job: &PrintJob) -> Result<PrintJob, OrchestratorError> {
        let template = self
            .templates
            .get(&job.template)
            .map_err(|_| OrchestratorError::UnknownTemplate(job.template.clone()))?;

        let mut progress =
            ProgressReporter::new(self.job_store.as_ref(), job, self.config.progress_step);
        progress.report(10, true)?;

        let tickets = self.fetch_batch(job)?;
        if tickets.is_empty() {
            return Err(OrchestratorError::EmptyRange {
                category: job.category,
                start: job.range_start,
                end: job.range_end,
            });
        }

        let coded = self.generate_codes(job, tickets, &mut progress).await?;

        self.job_store
            .transition(&job.id, &[JobStatus::Generating], JobStatus::Printing)?;
        progress.report(50, true)?;

        let plan = self.layout.plan(coded.len(), template);
        debug!(
            job_id = %job.id,
            sheets = plan.sheets,
            physical_pages = plan.physical_pages,
            placements = plan.placements.len(),
            perforations = plan.perforations.len(),
            "Layout computed"
        );

        let rendered = self
            .render_placements(job, template, &coded, &plan, &mut progress)
            .await?;

        self.check_cancelled(&job.id)?;

        let newly_marked = self.ticket_store.mark_printed(&job.id, &rendered)?;
        let printed = self.ticket_store.printed_by_job(&job.id)?;
        self.job_store.set_printed_count(&job.id, printed as u32)?;
        TICKETS_PRINTED.inc_by(newly_marked as u64);
        debug!(job_id = %job.id, newly_marked, printed, "Tickets marked printed");

        self.job_store
            .transition(&job.id, &[JobStatus::Printing], JobStatus::Completed)?;
        progress.report(100, true)?;

        self.get_job_status(&job.id)
    }

    fn fetch_batch(&self, job: &PrintJob) -> Result<Vec<Ticket>, OrchestratorError> {
        let span = (job.range_end - job.range_start) as i64 + 1;
        let filter =
            printable_filter(job.category, job.range_start, job.range_end).with_limit(span);
        Ok(self.ticket_store.list(&filter)?)
    }

    fn check_cancelled(&self, job_id: &str) -> Result<(), OrchestratorError> {
        if self.job_store.is_cancel_requested(job_id)? {
            return Err(OrchestratorError::Cancelled);
        }
        Ok(())
    }

    /// Generating phase. Returns coded tickets in identifier order; tickets
    /// whose codes could not be assigned are recorded as job errors.
    async fn generate_codes(
        &self,
        job: &PrintJob,
        tickets: Vec<Ticket>,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<Vec<CodedTicket>, OrchestratorError> {
        let total = tickets.len();
        let batch_size = self.config.batch_size.max(1);
        let mut coded = Vec::with_capacity(total);
        let mut processed = 0;

        for batch in tickets.chunks(batch_size) {
            self.check_cancelled(&job.id)?;

            let results: Vec<Result<Ticket, (Ticket, String)>> = stream::iter(batch.iter().cloned())
                .map(|ticket| self.assign_codes(ticket))
                .buffer_unordered(self.config.max_concurrency.max(1))
                .collect()
                .await;

            let mut errors = Vec::new();
            for result in results {
                match result {
                    Ok(ticket) => match CodedTicket::from_ticket(ticket.clone()) {
                        Some(c) => coded.push(c),
                        None => errors.push(item_error(
                            &ticket,
                            JobItemErrorKind::CodeAssignment,
                            "codes missing after assignment".to_string(),
                        )),
                    },
                    Err((ticket, message)) => {
                        warn!(
                            job_id = %job.id,
                            ticket = %ticket.identifier,
                            error = %message,
                            "Code assignment failed"
                        );
                        errors.push(item_error(&ticket, JobItemErrorKind::CodeAssignment, message));
                    }
                }
            }
            self.job_store.record_errors(&job.id, &errors)?;

            processed += batch.len();
            progress.report(phase_percent(10, 30, processed, total), false)?;
        }

        coded.sort_by_key(|c| c.ticket.identifier);
        Ok(coded)
    }

    /// Assigns codes to one ticket, retrying a store failure once. Codec
    /// errors are caller errors and are not retried.
    async fn assign_codes(&self, ticket: Ticket) -> Result<Ticket, (Ticket, String)> {
        if !ticket.needs_codes() {
            return Ok(ticket);
        }

        let mut last_error = String::new();
        for attempt in 1..=2 {
            let store = Arc::clone(&self.ticket_store);
            let codec = Arc::clone(&self.codec);
            let candidate = ticket.clone();

            let outcome = tokio::task::spawn_blocking(move || {
                ensure_codes(store.as_ref(), &codec, candidate)
            })
            .await;

            match outcome {
                Ok(Ok(updated)) => {
                    CODES_ASSIGNED.inc();
                    return Ok(updated);
                }
                Ok(Err(CodeAssignmentError::Codec(e))) => return Err((ticket, e.to_string())),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(e) => last_error = e.to_string(),
            }
            debug!(
                ticket = %ticket.identifier,
                attempt,
                error = %last_error,
                "Code assignment attempt failed"
            );
        }

        Err((ticket, last_error))
    }

    /// Printing phase. Returns the ids of tickets whose placements all
    /// rendered.
    async fn render_placements(
        &self,
        job: &PrintJob,
        template: &PaperTemplate,
        coded: &[CodedTicket],
        plan: &LayoutPlan,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<Vec<String>, OrchestratorError> {
        let mut faces: BTreeMap<usize, Vec<Placement>> = BTreeMap::new();
        for placement in &plan.placements {
            faces
                .entry(placement.ticket_index)
                .or_default()
                .push(*placement);
        }

        let indices: Vec<usize> = (0..coded.len()).collect();
        let batch_size = self.config.batch_size.max(1);
        let mut rendered = Vec::with_capacity(coded.len());
        let mut done = 0;

        for batch in indices.chunks(batch_size) {
            self.check_cancelled(&job.id)?;

            let requests: Vec<(usize, RenderRequest)> = batch
                .iter()
                .flat_map(|&index| {
                    let ticket = &coded[index];
                    faces
                        .get(&index)
                        .into_iter()
                        .flatten()
                        .map(move |placement| {
                            (
                                index,
                                RenderRequest::for_placement(
                                    &job.id,
                                    &ticket.ticket.id,
                                    *placement,
                                    &ticket.barcode,
                                    &ticket.verification_ref,
                                ),
                            )
                        })
                })
                .collect();

            let outcomes: Vec<(usize, Result<(), RendererError>)> = stream::iter(requests)
                .map(|(index, request)| async move {
                    (index, self.render_with_retry(request).await)
                })
                .buffer_unordered(self.config.max_concurrency.max(1))
                .collect()
                .await;

            let mut failures: BTreeMap<usize, String> = BTreeMap::new();
            for (index, outcome) in outcomes {
                if let Err(e) = outcome {
                    failures.entry(index).or_insert_with(|| e.to_string());
                }
            }

            let mut errors = Vec::new();
            for &index in batch {
                let ticket = &coded[index].ticket;
                match failures.remove(&index) {
                    Some(message) => {
                        RENDER_FAILURES.inc();
                        warn!(
                            job_id = %job.id,
                            ticket = %ticket.identifier,
                            template = %template.name,
                            error = %message,
                            "Rendering failed"
                        );
                        errors.push(item_error(ticket, JobItemErrorKind::Rendering, message));
                    }
                    None => rendered.push(ticket.id.clone()),
                }
            }
            self.job_store.record_errors(&job.id, &errors)?;

            done += batch.len();
            progress.report(phase_percent(50, 45, done, coded.len()), false)?;
        }

        Ok(rendered)
    }

    async fn render_with_retry(&self, request: RenderRequest) -> Result<(), RendererError> {
        match self.render_once(request.clone()).await {
            Ok(()) => {
                RENDER_CALLS.with_label_values(&["success"]).inc();
                Ok(())
            }
            Err(first) => {
                debug!(
                    ticket_id = %request.ticket_id,
                    error = %first,
                    "Render failed, retrying once"
                );
                match self.render_once(request).await {
                    Ok(()) => {
                        RENDER_CALLS.with_label_values(&["retried"]).inc();
                        Ok(())
                    }
                    Err(second) => {
                        RENDER_CALLS.with_label_values(&["failed"]).inc();
                        Err(second)
                    }
                }
            }
        }
    }

    async fn render_once(&self, request: RenderRequest) -> Result<(), RendererError> {
        let timeout = Duration::from_millis(self.config.call_timeout_ms);
        match tokio::time::timeout(timeout, self.renderer.render(request)).await {
            Ok(Ok(_image)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RendererError::Timeout),
        }
    }
}

fn printable_filter(category: Category, first: u32, last: u32) -> TicketFilter {
    TicketFilter::in_range(category, first, last)
        .without_status(TicketStatus::Invalid)
        .native_only()
}

fn item_error(ticket: &Ticket, kind: JobItemErrorKind, message: String) -> JobItemError {
    JobItemError {
        ticket_id: ticket.id.clone(),
        ticket_number: ticket.identifier.ticket_number(),
        kind,
        message,
    }
}
