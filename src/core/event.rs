//! Event system

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{QuillError, Result};

/// Discriminant for response submissions arriving over different channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseChannel {
    Comment,
    Trackback,
    Pingback,
}

/// A reader-submitted response awaiting moderation or notification.
#[derive(Debug, Clone)]
pub struct ResponseSubmission {
    pub channel: ResponseChannel,
    pub submitter: String,
    pub submitter_item1: String,
    pub submitter_item2: String,
    pub content: String,
    pub entry_id: Option<i64>,
    pub metadata: HashMap<String, Value>,
}

/// Widget dispatch request. Intentionally a mutable carrier: a listener
/// writes the rendered fragment back through the shared slot and the
/// publisher reads it after the synchronous delivery completes.
#[derive(Debug, Clone)]
pub struct WidgetRequest {
    pub widget: String,
    fragment: Arc<RwLock<String>>,
}

impl WidgetRequest {
    pub fn new(widget: impl Into<String>) -> Self {
        Self {
            widget: widget.into(),
            fragment: Arc::new(RwLock::new(String::new())),
        }
    }

    pub fn fragment(&self) -> String {
        self.fragment.read().clone()
    }

    pub fn set_fragment(&self, fragment: impl Into<String>) {
        *self.fragment.write() = fragment.into();
    }
}

/// Everything that can be announced through the broadcaster, as a single
/// tagged type rather than a subtype hierarchy.
#[derive(Debug, Clone)]
pub enum EventKind {
    Authorization { username: String, passed: bool },
    ResponseSubmission(ResponseSubmission),
    WidgetRequest(WidgetRequest),
    EntryUpdated { entry_id: i64 },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Authorization { .. } => "authorization",
            EventKind::ResponseSubmission(_) => "response-submission",
            EventKind::WidgetRequest(_) => "widget-request",
            EventKind::EntryUpdated { .. } => "entry-updated",
        }
    }
}

/// An immutable record of something that happened: who raised it, when,
/// and the event-specific payload.
#[derive(Debug, Clone)]
pub struct Event {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(source: impl Into<String>, kind: EventKind) -> Self {
        Self {
            source: source.into(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Event consumer registered with the broadcaster. The name is the
/// listener's identity: registering another listener under the same name
/// replaces the earlier registration.
#[async_trait]
pub trait Listener: Send + Sync {
    fn name(&self) -> &str;

    async fn handle_event(&self, event: &Event) -> Result<()>;
}

/// Predicate deciding whether a registered listener sees an event.
pub trait EventFilter: Send + Sync {
    fn accepts(&self, event: &Event) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    fn accepts(&self, event: &Event) -> bool {
        self(event)
    }
}

/// Closure listener wrapper
pub struct ClosureListener<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> Listener for ClosureListener<F>
where
    F: Fn(&Event) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_event(&self, event: &Event) -> Result<()> {
        (self.f)(event).await
    }
}

pub fn listener<F, Fut>(name: impl Into<String>, f: F) -> ClosureListener<F>
where
    F: Fn(&Event) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    ClosureListener { name: name.into(), f }
}

/// What to do when the delivery queue is full at broadcast time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the delivery being enqueued, count it, and keep going. The
    /// request path never waits on listeners.
    #[default]
    DropNewest,
    /// Wait for queue space. Broadcast can then stall the caller.
    Block,
}

#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    pub overflow: OverflowPolicy,
    pub listener_timeout: Duration,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            workers: 4,
            overflow: OverflowPolicy::default(),
            listener_timeout: Duration::from_secs(10),
        }
    }
}

impl BroadcasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_listener_timeout(mut self, listener_timeout: Duration) -> Self {
        self.listener_timeout = listener_timeout;
        self
    }
}

/// One failed listener invocation from a synchronous delivery.
#[derive(Debug)]
pub struct ListenerFailure {
    pub listener: String,
    pub error: QuillError,
}

/// Outcome of a synchronous `process_event` call. Failures are isolated
/// per listener and collected here instead of aborting later listeners.
#[derive(Debug, Default)]
pub struct SyncDelivery {
    pub invoked: usize,
    pub failures: Vec<ListenerFailure>,
}

impl SyncDelivery {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Registration {
    listener: Arc<dyn Listener>,
    filter: Option<Box<dyn EventFilter>>,
}

impl Registration {
    fn accepts(&self, event: &Event) -> bool {
        self.filter.as_ref().map_or(true, |f| f.accepts(event))
    }
}

struct Delivery {
    listener: Arc<dyn Listener>,
    event: Arc<Event>,
}

/// Process-wide publish/subscribe hub.
///
/// `broadcast_event` is fire-and-forget: matching listeners are snapshotted
/// under a brief lock and their deliveries queued to a bounded worker pool,
/// so a slow listener never delays the caller or another listener.
/// `process_event` runs matching listeners in the calling task and returns
/// only once all have completed. Deliveries only flow once `start` has
/// spawned the worker pool.
pub struct EventBroadcaster {
    registrations: RwLock<HashMap<String, Registration>>,
    delivery_tx: RwLock<Option<tokio::sync::mpsc::Sender<Delivery>>>,
    delivery_rx: Mutex<Option<tokio::sync::mpsc::Receiver<Delivery>>>,
    config: BroadcasterConfig,
    is_running: RwLock<bool>,
    delivered: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_config(BroadcasterConfig::default())
    }

    pub fn with_config(config: BroadcasterConfig) -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(config.queue_capacity.max(1));

        Self {
            registrations: RwLock::new(HashMap::new()),
            delivery_tx: RwLock::new(Some(tx)),
            delivery_rx: Mutex::new(Some(rx)),
            config,
            is_running: RwLock::new(false),
            delivered: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a listener that receives every event.
    pub fn add_listener<L: Listener + 'static>(&self, listener: L) {
        self.add_registration(Arc::new(listener), None);
    }

    /// Register a listener that only receives events accepted by `filter`.
    pub fn add_listener_with_filter<L, F>(&self, listener: L, filter: F)
    where
        L: Listener + 'static,
        F: EventFilter + 'static,
    {
        self.add_registration(Arc::new(listener), Some(Box::new(filter)));
    }

    pub(crate) fn add_registration(&self, listener: Arc<dyn Listener>, filter: Option<Box<dyn EventFilter>>) {
        let name = listener.name().to_string();
        let replaced = self
            .registrations
            .write()
            .insert(name.clone(), Registration { listener, filter });

        if replaced.is_some() {
            debug!(listener = %name, "replaced listener registration");
        } else {
            debug!(listener = %name, "added listener");
        }
    }

    /// Unregister a listener by name. No-op when absent.
    pub fn remove_listener(&self, name: &str) {
        if self.registrations.write().remove(name).is_some() {
            debug!(listener = %name, "removed listener");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registrations.read().len()
    }

    /// Broadcast an event to all matching listeners without waiting for any
    /// of them. Delivery is not guaranteed: queue overflow under the
    /// `DropNewest` policy drops deliveries (counted via `dropped`), and
    /// queued work dies with the process.
    pub async fn broadcast_event(&self, event: Event) -> Result<()> {
        let event = Arc::new(event);
        let matching = self.snapshot_matching(&event);

        let tx = self
            .delivery_tx
            .read()
            .clone()
            .ok_or_else(|| QuillError::Runtime("event broadcaster stopped".to_string()))?;

        for listener in matching {
            let delivery = Delivery {
                listener,
                event: Arc::clone(&event),
            };

            match self.config.overflow {
                OverflowPolicy::DropNewest => {
                    use tokio::sync::mpsc::error::TrySendError;
                    match tx.try_send(delivery) {
                        Ok(()) => {}
                        Err(TrySendError::Full(dropped)) => {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                            warn!(
                                listener = %dropped.listener.name(),
                                event = %event.kind.name(),
                                "delivery queue full, dropping broadcast"
                            );
                        }
                        Err(TrySendError::Closed(_)) => {
                            return Err(QuillError::Runtime("event broadcaster stopped".to_string()));
                        }
                    }
                }
                OverflowPolicy::Block => {
                    if tx.send(delivery).await.is_err() {
                        return Err(QuillError::Runtime("event broadcaster stopped".to_string()));
                    }
                }
            }
        }

        Ok(())
    }

    /// Deliver an event to all matching listeners in the calling task,
    /// returning once every listener has completed. Each invocation is
    /// bounded by the configured listener timeout; failures and timeouts
    /// are isolated per listener and reported, never propagated.
    pub async fn process_event(&self, event: &Event) -> SyncDelivery {
        let matching = self.snapshot_matching(event);
        let mut report = SyncDelivery::default();

        for listener in matching {
            report.invoked += 1;

            match tokio::time::timeout(self.config.listener_timeout, listener.handle_event(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(listener = %listener.name(), event = %event.kind.name(), error = %e, "listener failed");
                    report.failures.push(ListenerFailure {
                        listener: listener.name().to_string(),
                        error: e,
                    });
                }
                Err(_) => {
                    error!(listener = %listener.name(), event = %event.kind.name(), "listener timed out");
                    report.failures.push(ListenerFailure {
                        listener: listener.name().to_string(),
                        error: QuillError::Timeout(format!(
                            "listener {} exceeded {:?}",
                            listener.name(),
                            self.config.listener_timeout
                        )),
                    });
                }
            }
        }

        report
    }

    fn snapshot_matching(&self, event: &Event) -> Vec<Arc<dyn Listener>> {
        let registrations = self.registrations.read();
        registrations
            .values()
            .filter(|registration| registration.accepts(event))
            .map(|registration| Arc::clone(&registration.listener))
            .collect()
    }

    /// Spawn the delivery worker pool.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.is_running.write();
        if *running {
            return Err(QuillError::Runtime("event broadcaster already running".to_string()));
        }

        let rx = self
            .delivery_rx
            .lock()
            .take()
            .ok_or_else(|| QuillError::Runtime("delivery queue already taken".to_string()))?;
        *running = true;
        drop(running);

        let shared_rx = Arc::new(tokio::sync::Mutex::new(rx));

        for worker in 0..self.config.workers.max(1) {
            let shared_rx = Arc::clone(&shared_rx);
            let delivered = Arc::clone(&self.delivered);

            tokio::spawn(async move {
                loop {
                    let delivery = {
                        let mut rx = shared_rx.lock().await;
                        rx.recv().await
                    };

                    let Some(delivery) = delivery else { break };

                    let listener = delivery.listener;
                    let event = delivery.event;
                    let name = listener.name().to_string();

                    // Spawned so a panicking listener cannot take the worker
                    // down with it.
                    let outcome =
                        tokio::spawn(async move { listener.handle_event(&event).await }).await;

                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!(listener = %name, error = %e, "listener failed"),
                        Err(_) => error!(listener = %name, "listener panicked"),
                    }

                    delivered.fetch_add(1, Ordering::Relaxed);
                }

                debug!(worker, "delivery worker stopped");
            });
        }

        Ok(())
    }

    /// Close the delivery queue. Workers drain what is already queued and
    /// exit; subsequent broadcasts fail.
    pub async fn stop(&self) -> Result<()> {
        self.delivery_tx.write().take();
        *self.is_running.write() = false;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    /// Completed delivery attempts (including listener failures).
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Broadcasts dropped on queue overflow under `DropNewest`.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
