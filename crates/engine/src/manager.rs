//! Follower manager
//!
//! The manager owns the followers and the subscriber registry and runs the
//! single coordinator task that multiplexes follower events out to sinks.
//! Followers are materialised lazily: the first attach for a source dials
//! its host (through the factory's pool) and spawns the follower; later
//! attaches reuse it, and a detach leaves it running so the cache keeps
//! accumulating for the next subscriber.
//!
//! # Delivery
//!
//! A data event names a range of the follower's cache; the manager reads
//! the payload once and writes it to every sink registered for that
//! source. A state event fans out the same way. A sink that fails is
//! detached and logged; the others are unaffected. Per-source ordering is
//! preserved, nothing is promised across sources.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};

use tailmux_config::{EngineConfig, SourceEntry};
use tailmux_protocol::{FollowerEvent, SourceId};

use crate::error::{EngineError, Result};
use crate::factory::{PooledSourceFactory, SourceFactory};
use crate::follower::{Follower, FollowerConfig};
use crate::sink::{Sink, SubscriptionId};

/// Most-recent bytes replayed to a newly attached sink: 150 KiB
pub const REPLAY_MAX: usize = 150 * 1024;

/// Bound of the public-API → coordinator command channel
const COMMAND_QUEUE: usize = 64;

/// Commands from the public handle to the coordinator task
enum Command {
    Attach {
        source_id: SourceId,
        sink: Arc<dyn Sink>,
        reply: oneshot::Sender<Result<SubscriptionId>>,
    },
    Detach {
        source_id: SourceId,
        subscription: SubscriptionId,
        reply: oneshot::Sender<()>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Public handle to the engine
///
/// Cheap to share behind an `Arc`. All methods are safe to call from any
/// task; they talk to the coordinator over a channel.
pub struct FollowerManager {
    commands: mpsc::Sender<Command>,
    sources: Arc<Vec<SourceEntry>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FollowerManager {
    /// Create a manager over the configured sources, dialing through a
    /// pooled SSH transport
    pub fn new(sources: Vec<SourceEntry>, engine: EngineConfig) -> Self {
        Self::with_factory(sources, engine, Arc::new(PooledSourceFactory::new()))
    }

    /// Create a manager with a custom source factory
    ///
    /// This is the transport seam: production uses the pooled factory,
    /// tests inject scripted sources.
    pub fn with_factory(
        sources: Vec<SourceEntry>,
        engine: EngineConfig,
        factory: Arc<dyn SourceFactory>,
    ) -> Self {
        let sources = Arc::new(sources);
        let (commands, commands_rx) = mpsc::channel(COMMAND_QUEUE);

        let actor = ManagerActor {
            descriptors: sources
                .iter()
                .map(|entry| (SourceId::new(&entry.name), entry.clone()))
                .collect(),
            factory,
            follower_config: FollowerConfig {
                poll_period: engine.poll_period,
                ..Default::default()
            },
            followers: HashMap::new(),
            events: StreamMap::new(),
            sinks: HashMap::new(),
            next_subscription: 0,
        };
        let task = tokio::spawn(actor.run(commands_rx));

        Self {
            commands,
            sources,
            task: Mutex::new(Some(task)),
        }
    }

    /// The configured source descriptors
    pub fn list_sources(&self) -> Vec<SourceEntry> {
        self.sources.as_ref().clone()
    }

    /// Subscribe a sink to a source
    ///
    /// Materialises the follower if this is the source's first subscriber;
    /// a dial failure surfaces here and records nothing. The sink
    /// immediately receives up to [`REPLAY_MAX`] of recent bytes and the
    /// follower's current health.
    pub async fn attach(&self, source_id: &SourceId, sink: Arc<dyn Sink>) -> Result<SubscriptionId> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Attach {
                source_id: source_id.clone(),
                sink,
                reply,
            })
            .await
            .map_err(|_| EngineError::Stopped)?;
        reply_rx.await.map_err(|_| EngineError::Stopped)?
    }

    /// Remove a subscription
    ///
    /// The follower keeps running and accumulating into its cache; unknown
    /// subscriptions are ignored.
    pub async fn detach(&self, source_id: &SourceId, subscription: SubscriptionId) {
        let (reply, reply_rx) = oneshot::channel();
        let sent = self
            .commands
            .send(Command::Detach {
                source_id: source_id.clone(),
                subscription,
                reply,
            })
            .await;
        if sent.is_ok() {
            let _ = reply_rx.await;
        }
    }

    /// Stop everything: followers, registry, pooled sessions
    ///
    /// Idempotent; concurrent and repeated calls are no-ops after the
    /// first completes.
    pub async fn stop(&self) {
        let (reply, reply_rx) = oneshot::channel();
        let sent = self.commands.send(Command::Stop { reply }).await;
        if sent.is_ok() {
            let _ = reply_rx.await;
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if task.await.is_err() {
                tracing::warn!("manager task panicked");
            }
        }
    }
}

impl std::fmt::Debug for FollowerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowerManager")
            .field("sources", &self.sources.len())
            .finish()
    }
}

/// The coordinator task's state
struct ManagerActor {
    descriptors: HashMap<SourceId, SourceEntry>,
    factory: Arc<dyn SourceFactory>,
    follower_config: FollowerConfig,
    followers: HashMap<SourceId, Follower>,
    /// Per-follower event streams, multiplexed into the coordinator
    events: StreamMap<SourceId, ReceiverStream<FollowerEvent>>,
    sinks: HashMap<SourceId, Vec<(SubscriptionId, Arc<dyn Sink>)>>,
    next_subscription: u64,
}

impl ManagerActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!(sources = self.descriptors.len(), "manager started");

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Attach { source_id, sink, reply }) => {
                        let result = self.attach(source_id, sink).await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Detach { source_id, subscription, reply }) => {
                        self.detach(&source_id, subscription);
                        let _ = reply.send(());
                    }
                    Some(Command::Stop { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    // Handle dropped without stop(): shut down anyway
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some((source_id, event)) = self.events.next(), if !self.events.is_empty() => {
                    self.deliver(&source_id, event);
                }
            }
        }

        tracing::debug!("manager exited");
    }

    /// Handle an attach: ensure the follower, register, replay, report
    async fn attach(&mut self, source_id: SourceId, sink: Arc<dyn Sink>) -> Result<SubscriptionId> {
        self.ensure_follower(&source_id).await?;

        // Snapshot the catch-up payload and health before registering so a
        // faulting sink cannot disturb the registry mid-update.
        let (replay, state) = match self.followers.get(&source_id) {
            Some(follower) => {
                let cache_len = follower.cache_len();
                let take = cache_len.min(REPLAY_MAX);
                let mut buf = vec![0u8; take];
                if take > 0 {
                    let offset = (cache_len - take) as i64;
                    match follower.read_cache(offset, &mut buf) {
                        Ok((n, _)) => buf.truncate(n),
                        Err(err) => {
                            tracing::warn!(source_id = %source_id, %err, "catch-up read failed");
                            buf.clear();
                        }
                    }
                }
                (buf, follower.state_snapshot())
            }
            None => return Err(EngineError::SourceNotFound(source_id)),
        };

        let subscription = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.sinks
            .entry(source_id.clone())
            .or_default()
            .push((subscription, Arc::clone(&sink)));

        tracing::debug!(
            source_id = %source_id,
            subscription = subscription.0,
            replay_bytes = replay.len(),
            "sink attached"
        );

        let caught_up = (replay.is_empty() || sink.write(&replay).is_ok())
            && sink.set_state(state.health, state.error.as_deref()).is_ok();
        if !caught_up {
            tracing::warn!(source_id = %source_id, "sink faulted during catch-up, detaching");
            self.detach(&source_id, subscription);
        }

        Ok(subscription)
    }

    /// Handle a detach; the follower stays up
    fn detach(&mut self, source_id: &SourceId, subscription: SubscriptionId) {
        if let Some(sinks) = self.sinks.get_mut(source_id) {
            let before = sinks.len();
            sinks.retain(|(id, _)| *id != subscription);
            if sinks.len() < before {
                tracing::debug!(
                    source_id = %source_id,
                    subscription = subscription.0,
                    "sink detached"
                );
            }
        }
    }

    /// Materialise the follower for a source if it is missing or terminal
    async fn ensure_follower(&mut self, source_id: &SourceId) -> Result<()> {
        let terminal = match self.followers.get(source_id) {
            Some(follower) => {
                if !follower.health().is_terminal() {
                    return Ok(());
                }
                true
            }
            None => false,
        };
        if terminal {
            // Failed or stopped: a corpse serves no new subscriber. Drop it
            // and dial fresh; the pool evicts the dead session.
            tracing::info!(source_id = %source_id, "replacing terminal follower");
            if let Some(old) = self.followers.remove(source_id) {
                old.stop().await;
            }
            self.events.remove(source_id);
        }

        let entry = self
            .descriptors
            .get(source_id)
            .ok_or_else(|| EngineError::SourceNotFound(source_id.clone()))?;
        let source = self.factory.create(entry).await?;

        let (follower, events) = Follower::spawn(
            source_id.clone(),
            source,
            self.follower_config.clone(),
        );
        self.events
            .insert(source_id.clone(), ReceiverStream::new(events));
        self.followers.insert(source_id.clone(), follower);

        tracing::info!(source_id = %source_id, "follower started");
        Ok(())
    }

    /// Fan one follower event out to the source's sinks
    fn deliver(&mut self, source_id: &SourceId, event: FollowerEvent) {
        let Some(sinks) = self.sinks.get_mut(source_id) else {
            return;
        };
        if sinks.is_empty() {
            return;
        }

        match event {
            FollowerEvent::Data { prev, new } => {
                let Some(follower) = self.followers.get(source_id) else {
                    return;
                };

                let mut buf = vec![0u8; new.saturating_sub(prev) as usize];
                if buf.is_empty() {
                    return;
                }
                match follower.read_cache(prev as i64, &mut buf) {
                    Ok((n, _)) => buf.truncate(n),
                    Err(err) => {
                        tracing::warn!(source_id = %source_id, %err, "delta read failed");
                        return;
                    }
                }
                if buf.is_empty() {
                    return;
                }

                sinks.retain(|(id, sink)| match sink.write(&buf) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(
                            source_id = %source_id,
                            subscription = id.0,
                            %err,
                            "sink write failed, detaching"
                        );
                        false
                    }
                });
            }
            FollowerEvent::State { health, error } => {
                sinks.retain(|(id, sink)| match sink.set_state(health, error.as_deref()) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(
                            source_id = %source_id,
                            subscription = id.0,
                            %err,
                            "sink state update failed, detaching"
                        );
                        false
                    }
                });
            }
        }
    }

    /// Stop every follower, clear the registry, release the transport
    async fn shutdown(&mut self) {
        tracing::info!(followers = self.followers.len(), "manager stopping");

        for (_, follower) in self.followers.drain() {
            follower.stop().await;
        }
        self.sinks.clear();
        self.events = StreamMap::new();
        self.factory.shutdown().await;
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
