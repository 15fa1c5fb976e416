//! Tests for the follower state machine
//!
//! All tests run on tokio's paused clock; the follower's poll sleeps
//! auto-advance, so scripted sources drive the loop deterministically.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::*;

/// A step of a scripted size probe
#[derive(Debug, Clone)]
enum Step {
    /// Report this size
    Size(u64),
    /// Fail the probe with a read error
    ReadError(&'static str),
    /// Fail the probe with a transport error
    TransportError(&'static str),
}

/// Scripted source: size probes follow a step list, reads serve a byte
/// vector the test can swap out between events
struct ScriptedSource {
    steps: parking_lot::Mutex<VecDeque<Step>>,
    data: parking_lot::Mutex<Vec<u8>>,
    last_size: parking_lot::Mutex<u64>,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            steps: parking_lot::Mutex::new(steps.into()),
            data: parking_lot::Mutex::new(data),
            last_size: parking_lot::Mutex::new(0),
        })
    }

    /// Replace the served content (a rotated file)
    fn set_data(&self, data: Vec<u8>) {
        *self.data.lock() = data;
    }
}

/// Box-able handle so the test keeps a reference to the script
struct SourceHandle(Arc<ScriptedSource>);

#[async_trait]
impl SizedSource for SourceHandle {
    async fn size(&self) -> Result<u64, SourceError> {
        let step = self.0.steps.lock().pop_front();
        match step {
            Some(Step::Size(n)) => {
                *self.0.last_size.lock() = n;
                Ok(n)
            }
            Some(Step::ReadError(msg)) => Err(SourceError::read(msg)),
            Some(Step::TransportError(msg)) => Err(SourceError::transport(msg)),
            // Script exhausted: hold the last reported size
            None => Ok(*self.0.last_size.lock()),
        }
    }

    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, SourceError> {
        let data = self.0.data.lock();
        let offset = (offset as usize).min(data.len());
        let end = (offset + len).min(data.len());
        Ok(Bytes::copy_from_slice(&data[offset..end]))
    }
}

fn spawn_scripted(
    steps: Vec<Step>,
    data: Vec<u8>,
    config: FollowerConfig,
) -> (Arc<ScriptedSource>, Follower, mpsc::Receiver<FollowerEvent>) {
    let script = ScriptedSource::new(steps, data);
    let (follower, events) = Follower::spawn(
        SourceId::new("test"),
        Box::new(SourceHandle(Arc::clone(&script))),
        config,
    );
    (script, follower, events)
}

/// Receive events until `n` data events have arrived, returning everything
/// seen on the way
async fn collect_until_data(events: &mut mpsc::Receiver<FollowerEvent>, n: usize) -> Vec<FollowerEvent> {
    let mut seen = Vec::new();
    let mut data = 0;
    while data < n {
        let ev = events.recv().await.expect("event stream ended early");
        if matches!(ev, FollowerEvent::Data { .. }) {
            data += 1;
        }
        seen.push(ev);
    }
    seen
}

fn healths(events: &[FollowerEvent]) -> Vec<Health> {
    events
        .iter()
        .filter_map(|ev| match ev {
            FollowerEvent::State { health, .. } => Some(*health),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Steady growth
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_steady_growth_delivers_three_deltas() {
    let steps = vec![
        Step::Size(0),
        Step::Size(3),
        Step::Size(6),
        Step::Size(6),
        Step::Size(9),
    ];
    let (_script, follower, mut events) =
        spawn_scripted(steps, vec![0x01; 9], FollowerConfig::default());

    let seen = collect_until_data(&mut events, 3).await;

    let data: Vec<_> = seen
        .iter()
        .filter(|ev| matches!(ev, FollowerEvent::Data { .. }))
        .cloned()
        .collect();
    assert_eq!(
        data,
        vec![
            FollowerEvent::data(0, 3),
            FollowerEvent::data(3, 6),
            FollowerEvent::data(6, 9),
        ]
    );

    // One transition into Running, nothing else
    assert_eq!(healths(&seen), vec![Health::Running]);

    let state = follower.state_snapshot();
    assert_eq!(state.health, Health::Running);
    assert_eq!(state.total_fetched, 9);
    assert_eq!(state.known_size, 9);

    assert_eq!(follower.cache_len(), 9);
    let mut buf = [0u8; 9];
    let (n, status) = follower.read_cache(0, &mut buf).unwrap();
    assert_eq!((n, status), (9, ReadStatus::Ok));
    assert_eq!(buf, [0x01; 9]);

    follower.stop().await;
}

// ============================================================================
// Read blip recovers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_read_blip_degrades_then_recovers() {
    let steps = vec![
        Step::Size(3),
        Step::ReadError("file vanished"),
        Step::ReadError("file vanished"),
        Step::Size(6),
    ];
    let (_script, follower, mut events) =
        spawn_scripted(steps, vec![0x02; 6], FollowerConfig::default());

    let seen = collect_until_data(&mut events, 2).await;

    // Degraded appears once despite two failing probes with the same text
    assert_eq!(
        healths(&seen),
        vec![Health::Running, Health::Degraded, Health::Running]
    );

    assert_eq!(follower.cache_len(), 6);
    let state = follower.state_snapshot();
    assert_eq!(state.total_fetched, 6);
    assert!(state.error.is_none());

    follower.stop().await;
}

// ============================================================================
// Transport death
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transport_death_is_final() {
    let steps = vec![Step::Size(3), Step::TransportError("session closed")];
    let (_script, follower, mut events) =
        spawn_scripted(steps, vec![0x03; 3], FollowerConfig::default());

    let mut seen = Vec::new();
    while let Some(ev) = events.recv().await {
        seen.push(ev);
    }

    // The Failed transition is the last event, and the stream ends
    assert_eq!(
        seen.last(),
        Some(&FollowerEvent::state(
            Health::Failed,
            Some("session closed".into())
        ))
    );
    assert!(seen.contains(&FollowerEvent::data(0, 3)));

    let state = follower.state_snapshot();
    assert_eq!(state.health, Health::Failed);
    assert_eq!(state.error.as_deref(), Some("session closed"));

    // Stopping an already-dead follower is a no-op
    follower.stop().await;
    assert_eq!(follower.state_snapshot().health, Health::Failed);
}

// ============================================================================
// Truncation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_truncation_rewinds_and_refetches() {
    // The second Size(10) gives the test a quiet probe to swap the
    // content behind, before the shrunken size is reported.
    let steps = vec![Step::Size(10), Step::Size(10), Step::Size(4)];
    let (script, follower, mut events) =
        spawn_scripted(steps, vec![0xAA; 10], FollowerConfig::default());

    let seen = collect_until_data(&mut events, 1).await;
    assert_eq!(seen.last(), Some(&FollowerEvent::data(0, 10)));

    // The file is rotated: new, smaller content
    script.set_data(vec![0xBB; 4]);

    // Rewind announces itself with a Running state event even though the
    // health never left Running
    let ev = events.recv().await.unwrap();
    assert_eq!(ev, FollowerEvent::state(Health::Running, None));

    // Then the new content arrives from offset zero
    let ev = events.recv().await.unwrap();
    assert_eq!(ev, FollowerEvent::data(0, 4));

    let state = follower.state_snapshot();
    assert_eq!(state.total_fetched, 4);
    assert_eq!(state.known_size, 4);

    assert_eq!(follower.cache_len(), 4);
    let mut buf = [0u8; 4];
    follower.read_cache(0, &mut buf).unwrap();
    assert_eq!(buf, [0xBB; 4]);

    follower.stop().await;
}

// ============================================================================
// Chunking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_large_delta_fetched_in_chunks() {
    let config = FollowerConfig {
        chunk_max: 4,
        ..Default::default()
    };
    let content: Vec<u8> = (0..10u8).collect();
    let (_script, follower, mut events) = spawn_scripted(vec![Step::Size(10)], content.clone(), config);

    let seen = collect_until_data(&mut events, 3).await;
    let data: Vec<_> = seen
        .iter()
        .filter(|ev| matches!(ev, FollowerEvent::Data { .. }))
        .cloned()
        .collect();
    assert_eq!(
        data,
        vec![
            FollowerEvent::data(0, 4),
            FollowerEvent::data(4, 8),
            FollowerEvent::data(8, 10),
        ]
    );

    // Bytes arrive in source order
    let mut buf = [0u8; 10];
    follower.read_cache(0, &mut buf).unwrap();
    assert_eq!(buf.to_vec(), content);

    follower.stop().await;
}

// ============================================================================
// Short reads
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_short_read_reconciles_on_next_probe() {
    // The probe claims 10 bytes but only 6 are served; the remainder
    // appears later.
    let steps = vec![Step::Size(10), Step::Size(10)];
    let (script, follower, mut events) =
        spawn_scripted(steps, vec![0x04; 6], FollowerConfig::default());

    let seen = collect_until_data(&mut events, 1).await;
    assert_eq!(seen.last(), Some(&FollowerEvent::data(0, 6)));

    // The rest of the file shows up
    script.set_data(vec![0x04; 10]);

    let ev = events.recv().await.unwrap();
    assert_eq!(ev, FollowerEvent::data(6, 10));

    let state = follower.state_snapshot();
    assert_eq!(state.total_fetched, 10);
    assert_eq!(state.known_size, 10);

    follower.stop().await;
}

// ============================================================================
// Backpressure coalescing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_data_events_coalesce_when_channel_is_full() {
    // 40 one-byte chunks against a 16-slot channel, drained only after the
    // fetch is done: the overflow must fold into one trailing range.
    let config = FollowerConfig {
        chunk_max: 1,
        ..Default::default()
    };
    let (_script, follower, mut events) =
        spawn_scripted(vec![Step::Size(40)], vec![0x05; 40], config);

    // Let the follower fetch everything and go idle before draining
    while follower.state_snapshot().total_fetched < 40 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut last_end = 0u64;
    loop {
        let ev = events.recv().await.unwrap();
        if let FollowerEvent::Data { prev, new } = ev {
            // Contiguous, in-order coverage with no gaps or overlap
            assert_eq!(prev, last_end);
            last_end = new;
            if new == 40 {
                break;
            }
        }
    }

    follower.stop().await;
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_clears_cache() {
    let (_script, follower, mut events) =
        spawn_scripted(vec![Step::Size(5)], vec![0x06; 5], FollowerConfig::default());

    collect_until_data(&mut events, 1).await;
    assert_eq!(follower.cache_len(), 5);

    follower.stop().await;
    follower.stop().await;

    assert_eq!(follower.state_snapshot().health, Health::Stopped);
    assert_eq!(follower.cache_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_follower_announces_it() {
    let (_script, follower, mut events) =
        spawn_scripted(vec![Step::Size(2)], vec![0x07; 2], FollowerConfig::default());

    collect_until_data(&mut events, 1).await;
    follower.stop().await;

    // Drain whatever is left; the final event is the Stopped transition
    let mut last = None;
    while let Some(ev) = events.recv().await {
        last = Some(ev);
    }
    assert_eq!(last, Some(FollowerEvent::state(Health::Stopped, None)));
}
