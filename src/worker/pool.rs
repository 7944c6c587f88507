//! Worker pool: a fixed set of reusable pages with exclusive assignment.
//!
//! A worker is busy while a task name is stored in its slot. `acquire` claims
//! the first free slot in pool order under the pool mutex, so two acquirers
//! can never claim the same worker. The returned [`WorkerGuard`] hands the
//! worker back on drop, whichever way the driver exits.
//!
//! Each worker has a listener task draining its page's event stream. Events
//! only touch the slot's scratch state (byte count, first error) while a task
//! is assigned, and only for the assignment they were observed under. Before
//! each navigation [`WorkerGuard::begin_load`] has the listener discard events
//! still queued from the previous document, so nothing leaks across tasks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::{Page, PageEvent};
use crate::error::PoolError;
use crate::worker::diagnostics::DiagnosticFilter;

/// Only complete responses count towards a task's payload size.
const COUNTED_STATUS: u16 = 200;

#[derive(Debug, Default)]
struct Slot {
    task: Option<String>,
    /// Bumped on every assignment; scopes events to one task.
    generation: u64,
    bytes: u64,
    error: Option<String>,
}

struct PoolInner {
    slots: Mutex<Vec<Slot>>,
    pages: Vec<Arc<dyn Page>>,
    released: Notify,
    closed: AtomicBool,
    busy: AtomicUsize,
    peak_busy: AtomicUsize,
    releases: AtomicUsize,
    poll_interval: Duration,
    filter: Arc<DiagnosticFilter>,
    /// Per-worker requests to drop queued events, acknowledged by the listener.
    flushes: Vec<mpsc::UnboundedSender<oneshot::Sender<usize>>>,
}

impl PoolInner {
    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        // A panicking holder cannot leave a slot half-updated.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_claim(self: &Arc<Self>, task: &str) -> Option<WorkerGuard> {
        let mut slots = self.slots();
        let (id, slot) = slots.iter_mut().enumerate().find(|(_, s)| s.task.is_none())?;

        slot.task = Some(task.to_string());
        slot.generation += 1;
        slot.bytes = 0;
        slot.error = None;
        let generation = slot.generation;

        let busy = self.busy.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_busy.fetch_max(busy, Ordering::SeqCst);
        drop(slots);

        debug!(task = %task, worker = id, "Worker acquired");
        Some(WorkerGuard {
            pool: Arc::clone(self),
            id,
            generation,
            task: task.to_string(),
            page: Arc::clone(&self.pages[id]),
        })
    }

    fn release(&self, id: usize, generation: u64) {
        let mut slots = self.slots();
        let slot = &mut slots[id];
        if slot.generation != generation || slot.task.is_none() {
            return;
        }
        let task = slot.task.take();
        slot.bytes = 0;
        slot.error = None;
        self.busy.fetch_sub(1, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
        drop(slots);

        debug!(task = ?task, worker = id, "Worker released");
        self.released.notify_waiters();
    }

    fn reset_scratch(&self, id: usize, generation: u64) {
        let mut slots = self.slots();
        let slot = &mut slots[id];
        if slot.generation == generation {
            slot.bytes = 0;
            slot.error = None;
        }
    }

    fn apply(&self, id: usize, event: PageEvent) {
        match event {
            PageEvent::DataTransfer { status, bytes } => {
                if status != COUNTED_STATUS {
                    return;
                }
                let mut slots = self.slots();
                let slot = &mut slots[id];
                if slot.task.is_some() {
                    slot.bytes = slot.bytes.saturating_add(bytes);
                }
            }
            PageEvent::Diagnostic { level, args } => {
                let (task, generation) = {
                    let slots = self.slots();
                    match &slots[id].task {
                        Some(task) => (task.clone(), slots[id].generation),
                        None => return,
                    }
                };

                let Some(line) = self.filter.observe(&task, level, &args) else {
                    return;
                };

                let mut slots = self.slots();
                let slot = &mut slots[id];
                if slot.generation == generation && slot.task.is_some() && slot.error.is_none() {
                    slot.error = Some(line);
                }
            }
        }
    }
}

/// Exclusive hold on one worker for one task.
pub struct WorkerGuard {
    pool: Arc<PoolInner>,
    id: usize,
    generation: u64,
    task: String,
    page: Arc<dyn Page>,
}

impl WorkerGuard {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    /// Start a fresh document on this worker.
    ///
    /// Waits until the listener has discarded every event queued before this
    /// call, then clears the byte count and error slot. Call right before
    /// navigating.
    pub async fn begin_load(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.pool.flushes[self.id].send(ack_tx).is_ok() {
            // A stopped listener drops the sender; nothing is queued then.
            match ack_rx.await {
                Ok(stale) if stale > 0 => debug!(
                    task = %self.task,
                    worker = self.id,
                    stale,
                    "Dropped events from previous document"
                ),
                _ => {}
            }
        }
        self.pool.reset_scratch(self.id, self.generation);
    }

    /// Bytes transferred for this task so far.
    pub fn bytes(&self) -> u64 {
        let slots = self.pool.slots();
        let slot = &slots[self.id];
        if slot.generation == self.generation { slot.bytes } else { 0 }
    }

    /// First error the content reported for this task, if any.
    pub fn error(&self) -> Option<String> {
        let slots = self.pool.slots();
        let slot = &slots[self.id];
        if slot.generation == self.generation {
            slot.error.clone()
        } else {
            None
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.pool.release(self.id, self.generation);
    }
}

impl std::fmt::Debug for WorkerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerGuard")
            .field("id", &self.id)
            .field("task", &self.task)
            .finish()
    }
}

/// Fixed-size pool of workers.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Build a pool over `pages` and start one event listener per page.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        pages: Vec<Arc<dyn Page>>,
        filter: Arc<DiagnosticFilter>,
        poll_interval: Duration,
    ) -> Result<Self, PoolError> {
        if pages.is_empty() {
            return Err(PoolError::Empty);
        }

        let (flushes, flush_rxs): (Vec<_>, Vec<_>) =
            (0..pages.len()).map(|_| mpsc::unbounded_channel()).unzip();

        let inner = Arc::new(PoolInner {
            slots: Mutex::new((0..pages.len()).map(|_| Slot::default()).collect()),
            pages,
            released: Notify::new(),
            closed: AtomicBool::new(false),
            busy: AtomicUsize::new(0),
            peak_busy: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            poll_interval,
            filter,
            flushes,
        });

        let listeners = inner
            .pages
            .iter()
            .zip(flush_rxs)
            .enumerate()
            .map(|(id, (page, flush_rx))| {
                spawn_listener(Arc::clone(&inner), id, page.subscribe(), flush_rx)
            })
            .collect();

        info!(size = inner.pages.len(), "Worker pool ready");
        Ok(Self {
            inner,
            listeners: Mutex::new(listeners),
        })
    }

    /// Wait for a free worker and assign it to `task`.
    ///
    /// First free worker in pool order wins. Fails once the pool is closed.
    pub async fn acquire(&self, task: &str) -> Result<WorkerGuard, PoolError> {
        loop {
            let notified = self.inner.released.notified();
            tokio::pin!(notified);
            // Register before scanning so a release in between is not missed.
            notified.as_mut().enable();

            if self.inner.closed.load(Ordering::SeqCst) {
                return Err(PoolError::Closed);
            }
            if let Some(guard) = self.inner.try_claim(task) {
                return Ok(guard);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(self.inner.poll_interval) => {}
            }
        }
    }

    /// Stop handing out workers and stop the event listeners.
    ///
    /// Guards still held stay valid; they release into a closed pool.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.released.notify_waiters();
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for handle in listeners.drain(..) {
            handle.abort();
        }
        info!("Worker pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn size(&self) -> usize {
        self.inner.pages.len()
    }

    /// Workers currently assigned to a task.
    pub fn busy_count(&self) -> usize {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously assigned workers seen so far.
    pub fn peak_busy(&self) -> usize {
        self.inner.peak_busy.load(Ordering::SeqCst)
    }

    /// Total releases since the pool was built.
    pub fn release_count(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_listener(
    inner: Arc<PoolInner>,
    id: usize,
    mut events: mpsc::UnboundedReceiver<PageEvent>,
    mut flushes: mpsc::UnboundedReceiver<oneshot::Sender<usize>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                Some(ack) = flushes.recv() => {
                    let mut stale = 0;
                    while events.try_recv().is_ok() {
                        stale += 1;
                    }
                    let _ = ack.send(stale);
                }
                event = events.recv() => match event {
                    Some(event) => inner.apply(id, event),
                    None => break,
                },
            }
        }
        debug!(worker = id, "Page event stream ended");
    })
}
