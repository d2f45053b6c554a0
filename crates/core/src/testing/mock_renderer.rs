//! Mock image renderer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::renderer::{ImageRenderer, RenderRequest, RenderedImage, RendererError};

type RenderHook = Arc<dyn Fn(&RenderRequest) + Send + Sync>;

/// Mock implementation of the ImageRenderer trait.
///
/// Provides controllable behavior for testing:
/// - Track render requests for assertions
/// - Fail permanently or a fixed number of times per ticket
/// - Simulate slow renders and observe how many run at once
/// - Run a hook on every call (e.g. to request cancellation mid-job)
///
/// # Example
///
/// ```rust,ignore
/// use raffle_core::testing::MockImageRenderer;
///
/// let renderer = MockImageRenderer::new();
/// renderer.fail_ticket("ticket-id").await;
///
/// // ... run a job ...
///
/// assert_eq!(renderer.call_count().await, 20);
/// ```
pub struct MockImageRenderer {
    calls: Arc<RwLock<Vec<RenderRequest>>>,
    failing_tickets: Arc<RwLock<HashSet<String>>>,
    flaky_tickets: Arc<RwLock<HashMap<String, u32>>>,
    delay_ms: Arc<RwLock<u64>>,
    hook: Arc<RwLock<Option<RenderHook>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when a render returns.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockImageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageRenderer {
    /// Create a renderer that succeeds instantly.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            failing_tickets: Arc::new(RwLock::new(HashSet::new())),
            flaky_tickets: Arc::new(RwLock::new(HashMap::new())),
            delay_ms: Arc::new(RwLock::new(0)),
            hook: Arc::new(RwLock::new(None)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every render for `ticket_id` fails.
    pub async fn fail_ticket(&self, ticket_id: &str) {
        self.failing_tickets
            .write()
            .await
            .insert(ticket_id.to_string());
    }

    /// The next `times` renders for `ticket_id` fail, later ones succeed.
    pub async fn fail_ticket_times(&self, ticket_id: &str, times: u32) {
        self.flaky_tickets
            .write()
            .await
            .insert(ticket_id.to_string(), times);
    }

    /// Stop failing any ticket.
    pub async fn clear_failures(&self) {
        self.failing_tickets.write().await.clear();
        self.flaky_tickets.write().await.clear();
    }

    /// Delay every render by `ms` milliseconds.
    pub async fn set_delay_ms(&self, ms: u64) {
        *self.delay_ms.write().await = ms;
    }

    /// Run `hook` at the start of every render call.
    pub async fn set_hook(&self, hook: impl Fn(&RenderRequest) + Send + Sync + 'static) {
        *self.hook.write().await = Some(Arc::new(hook));
    }

    /// All requests received, including failed ones.
    pub async fn recorded_calls(&self) -> Vec<RenderRequest> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Requests received for `ticket_id`.
    pub async fn calls_for(&self, ticket_id: &str) -> Vec<RenderRequest> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    /// Renders currently in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of renders observed in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn should_fail(&self, ticket_id: &str) -> bool {
        if self.failing_tickets.read().await.contains(ticket_id) {
            return true;
        }
        let mut flaky = self.flaky_tickets.write().await;
        match flaky.get_mut(ticket_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ImageRenderer for MockImageRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderedImage, RendererError> {
        let hook = self.hook.read().await.clone();
        if let Some(hook) = hook {
            hook(&request);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        self.calls.write().await.push(request.clone());

        let delay = *self.delay_ms.read().await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.should_fail(&request.ticket_id).await {
            return Err(RendererError::ApiError(format!(
                "mock failure for ticket {}",
                request.ticket_id
            )));
        }

        Ok(RenderedImage {
            content_type: "image/png".to_string(),
            data: format!("{}:{}", request.symbology.as_str(), request.payload).into_bytes(),
        })
    }
}
