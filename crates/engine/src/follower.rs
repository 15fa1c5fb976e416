//! Per-source follower
//!
//! A follower drives one [`SizedSource`]: it probes the size, fetches any
//! gap in bounded chunks, appends the bytes to its rotating cache and emits
//! events towards the manager. One task per follower; all state lives in
//! that task except the cache and a read-only snapshot.
//!
//! The loop, in terms of the observed outcome of each pass:
//!
//! - size grew: fetch `known_size - total_fetched` in chunks of at most
//!   [`CHUNK_MAX`], then probe again immediately
//! - size shrank: the file was rotated or replaced; rewind counters, clear
//!   the cache and start over from zero
//! - read error: Degraded, keep probing on the poll period
//! - transport error: Failed, final state event, exit
//! - cancellation: Stopped, exit
//!
//! The event channel is small and bounded. When it fills, data events
//! coalesce into one pending range; state events are never dropped while
//! the manager is alive.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tailmux_protocol::{FollowerEvent, Health, SourceId, StateTracker};
use tailmux_source::{SizedSource, SourceError};

use crate::cache::{CacheError, ReadStatus, RotatingCache, CACHE_CAP};

/// Largest single byte fetch: 100 KiB
pub const CHUNK_MAX: usize = 100 * 1024;

/// Time between size probes while the source is idle
pub const SIZE_PERIOD: Duration = Duration::from_secs(1);

/// Bound of the follower → manager event channel
const EVENT_QUEUE: usize = 16;

/// Follower tuning
#[derive(Debug, Clone)]
pub struct FollowerConfig {
    /// Time between size probes while idle
    pub poll_period: Duration,

    /// Largest single byte fetch
    pub chunk_max: usize,

    /// Cache capacity
    pub cache_cap: usize,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            poll_period: SIZE_PERIOD,
            chunk_max: CHUNK_MAX,
            cache_cap: CACHE_CAP,
        }
    }
}

/// Read-only snapshot of a follower's state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowerState {
    /// Current health
    pub health: Health,
    /// Error text, meaningful in Degraded and Failed
    pub error: Option<String>,
    /// Monotonic count of bytes drawn from the source (rewinds to 0 on
    /// truncation)
    pub total_fetched: u64,
    /// Last observed source size
    pub known_size: u64,
}

/// State shared between the follower task and its handle
struct Shared {
    cache: RotatingCache,
    state: Mutex<FollowerState>,
}

/// Handle to a running follower
///
/// Owned by the manager. Dropping the handle does not stop the task; call
/// [`Follower::stop`].
pub struct Follower {
    id: SourceId,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Follower {
    /// Spawn a follower over `source`
    ///
    /// Returns the handle and the event stream the manager drains.
    pub fn spawn(
        id: SourceId,
        source: Box<dyn SizedSource>,
        config: FollowerConfig,
    ) -> (Self, mpsc::Receiver<FollowerEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_QUEUE);
        let shared = Arc::new(Shared {
            cache: RotatingCache::with_capacity(config.cache_cap),
            state: Mutex::new(FollowerState::default()),
        });
        let cancel = CancellationToken::new();

        let worker = FollowerWorker {
            id: id.clone(),
            source,
            config,
            shared: Arc::clone(&shared),
            cancel: cancel.clone(),
            events,
            tracker: StateTracker::new(),
            total_fetched: 0,
            known_size: 0,
            pending: None,
            channel_open: true,
        };
        let task = tokio::spawn(worker.run());

        let follower = Self {
            id,
            shared,
            cancel,
            task: Mutex::new(Some(task)),
        };
        (follower, events_rx)
    }

    /// The source this follower drives
    #[inline]
    pub fn id(&self) -> &SourceId {
        &self.id
    }

    /// Number of bytes currently cached
    pub fn cache_len(&self) -> usize {
        self.shared.cache.len()
    }

    /// Read from the cache; offsets are cache-relative
    pub fn read_cache(
        &self,
        offset: i64,
        buf: &mut [u8],
    ) -> Result<(usize, ReadStatus), CacheError> {
        self.shared.cache.read_at(offset, buf)
    }

    /// Copy of the current state
    pub fn state_snapshot(&self) -> FollowerState {
        self.shared.state.lock().clone()
    }

    /// Current health
    pub fn health(&self) -> Health {
        self.shared.state.lock().health
    }

    /// Stop the follower and wait for its task to exit
    ///
    /// Idempotent; an in-flight remote command is allowed to complete, its
    /// result is discarded. The cache is cleared once the task is gone.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if task.await.is_err() {
                tracing::warn!(source_id = %self.id, "follower task panicked");
            }
            self.shared.cache.clear();
        }
    }
}

impl std::fmt::Debug for Follower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Follower")
            .field("id", &self.id)
            .field("state", &self.state_snapshot())
            .finish()
    }
}

/// Outcome of one fetch pass
enum FetchOutcome {
    /// Probe again immediately (done, or a short read that made progress)
    Reprobe,
    /// Wait a poll period first (stalled read or read error)
    Wait,
    /// Transport death or cancellation; leave the loop
    Exit,
}

/// The follower task's private state
struct FollowerWorker {
    id: SourceId,
    source: Box<dyn SizedSource>,
    config: FollowerConfig,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    events: mpsc::Sender<FollowerEvent>,
    tracker: StateTracker,
    total_fetched: u64,
    known_size: u64,
    /// Data event held back by a full channel, coalesced until it fits
    pending: Option<FollowerEvent>,
    channel_open: bool,
}

impl FollowerWorker {
    async fn run(mut self) {
        tracing::debug!(source_id = %self.id, "follower started");

        // No wait before the very first probe
        let mut wait = false;

        loop {
            self.flush_pending();
            if !self.channel_open {
                break;
            }

            if wait {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_period) => {}
                }
            } else if self.cancel.is_cancelled() {
                break;
            }

            wait = true;
            match self.source.size().await {
                Ok(new_size) => {
                    if new_size < self.known_size {
                        self.rewind(new_size).await;
                    } else {
                        self.known_size = new_size;
                        self.observe(None, None).await;
                    }

                    if self.total_fetched < self.known_size {
                        match self.fetch_delta().await {
                            FetchOutcome::Reprobe => wait = false,
                            FetchOutcome::Wait => {}
                            FetchOutcome::Exit => break,
                        }
                    }
                }
                Err(SourceError::Read(msg)) => {
                    self.observe(Some(&msg), None).await;
                }
                Err(SourceError::Transport(msg)) => {
                    self.observe(None, Some(&msg)).await;
                    break;
                }
            }
        }

        self.finish().await;
    }

    /// Fetch `known_size - total_fetched` in bounded chunks
    async fn fetch_delta(&mut self) -> FetchOutcome {
        while self.total_fetched < self.known_size {
            if self.cancel.is_cancelled() {
                return FetchOutcome::Exit;
            }

            let need = self.known_size - self.total_fetched;
            let want = need.min(self.config.chunk_max as u64) as usize;

            match self.source.read_at(self.total_fetched, want).await {
                Ok(bytes) => {
                    let n = bytes.len();
                    if n == 0 {
                        // Nothing came back although the probe said there
                        // is more; back off and let a later probe reconcile.
                        return FetchOutcome::Wait;
                    }

                    self.shared.cache.write(&bytes);
                    self.total_fetched += n as u64;

                    let cache_len = self.shared.cache.len() as u64;
                    self.emit_data(cache_len - n as u64, cache_len);
                    self.observe(None, None).await;

                    tracing::trace!(
                        source_id = %self.id,
                        fetched = n,
                        total_fetched = self.total_fetched,
                        known_size = self.known_size,
                        "chunk fetched"
                    );

                    if n < want {
                        // Short read at the end of the source; more next pass
                        return FetchOutcome::Reprobe;
                    }
                }
                Err(SourceError::Read(msg)) => {
                    self.observe(Some(&msg), None).await;
                    return FetchOutcome::Wait;
                }
                Err(SourceError::Transport(msg)) => {
                    self.observe(None, Some(&msg)).await;
                    return FetchOutcome::Exit;
                }
            }
        }

        FetchOutcome::Reprobe
    }

    /// Reset after a detected truncation
    ///
    /// The file shrank, so it was rotated or replaced; the old content is
    /// not recoverable and not wanted. Counters and cache restart from
    /// zero, and a Running state event announces the reset even when the
    /// health did not change.
    async fn rewind(&mut self, new_size: u64) {
        tracing::info!(
            source_id = %self.id,
            old_size = self.known_size,
            new_size,
            "source truncated, rewinding"
        );

        self.total_fetched = 0;
        self.known_size = new_size;
        // Any coalesced range points into the cleared cache
        self.pending = None;
        self.shared.cache.clear();

        self.tracker.observe(None, None);
        self.send_state().await;
    }

    /// Feed an observation into the tracker, emitting on transitions
    async fn observe(&mut self, read_err: Option<&str>, transport_err: Option<&str>) {
        if self.tracker.observe(read_err, transport_err) {
            self.send_state().await;
        } else {
            self.sync_shared();
        }
    }

    /// Send the current health, flushing pending data first so per-source
    /// ordering holds
    async fn send_state(&mut self) {
        if let Some(ev) = self.pending.take() {
            self.send_event(ev).await;
        }
        let ev = FollowerEvent::state(
            self.tracker.health(),
            self.tracker.error().map(str::to_owned),
        );
        self.send_event(ev).await;
        self.sync_shared();
    }

    /// Blocking send, abandoned on cancellation
    async fn send_event(&mut self, event: FollowerEvent) {
        if !self.channel_open {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            res = self.events.send(event) => {
                if res.is_err() {
                    self.channel_open = false;
                }
            }
        }
    }

    /// Queue a data event, coalescing under backpressure
    fn emit_data(&mut self, prev: u64, new: u64) {
        let event = FollowerEvent::data(prev, new);
        match &mut self.pending {
            Some(pending) => pending.coalesce_data(&event),
            None => self.pending = Some(event),
        }
        self.flush_pending();
    }

    /// Try to hand the pending data event to the manager without blocking
    fn flush_pending(&mut self) {
        if let Some(event) = self.pending.take() {
            match self.events.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(event)) => {
                    self.pending = Some(event);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.channel_open = false;
                }
            }
        }
    }

    /// Publish counters and health for snapshot readers
    fn sync_shared(&self) {
        let mut state = self.shared.state.lock();
        state.health = self.tracker.health();
        state.error = self.tracker.error().map(str::to_owned);
        state.total_fetched = self.total_fetched;
        state.known_size = self.known_size;
    }

    /// Exit path: close the source and, on a clean stop, announce it
    async fn finish(mut self) {
        self.source.close().await;

        if !self.tracker.health().is_terminal() {
            self.tracker.force(Health::Stopped);
            self.flush_pending();
            // Best effort; on full shutdown the manager may already be gone
            let _ = self
                .events
                .try_send(FollowerEvent::state(Health::Stopped, None));
        }
        self.sync_shared();

        tracing::debug!(source_id = %self.id, health = %self.tracker.health(), "follower exited");
    }
}

#[cfg(test)]
#[path = "follower_test.rs"]
mod tests;
