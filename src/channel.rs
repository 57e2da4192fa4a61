//! The sync channel port and its in-process implementations.
//!
//! The session engine never talks to a transport directly: it publishes and
//! drains opaque snapshot frames through the [`SnapshotChannel`] trait. The
//! [`LocalBroadcastHub`] here *simulates* a replicated real-time store with a
//! process-local bus; a production deployment swaps in an implementation
//! backed by a genuine low-latency replicated channel without touching the
//! state machine. Last-write-wins is the documented consistency model either
//! way, not a property of this particular adapter.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::rng::Pcg32;

/// This [`SnapshotChannel`] trait is used when you want to drive a session
/// with your own transport. However frames travel, the contract is:
///
/// - [`publish`] broadcasts a frame to **every** participant, including the
///   publisher's own other views.
/// - [`drain`] returns each frame delivered since the last call exactly once.
///   Order across publishers is not guaranteed; order within a single
///   publisher's causal chain is.
///
/// Frames are opaque bytes. Delivery may be lossy; the engine tolerates
/// dropped frames by converging on the next publish.
///
/// [`publish`]: SnapshotChannel::publish
/// [`drain`]: SnapshotChannel::drain
pub trait SnapshotChannel {
    /// Broadcasts one encoded snapshot frame to all participants.
    fn publish(&mut self, frame: &[u8]);

    /// Returns all frames delivered since the last call, oldest first.
    fn drain(&mut self) -> Vec<Vec<u8>>;
}

#[derive(Debug, Default)]
struct HubInner {
    queues: Vec<VecDeque<Vec<u8>>>,
}

/// An in-process broadcast bus connecting any number of participants.
///
/// Every frame published by one participant is appended to every
/// participant's inbound queue, the publisher's included.
#[derive(Debug, Clone, Default)]
pub struct LocalBroadcastHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LocalBroadcastHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a new participant and returns its channel endpoint.
    #[must_use]
    pub fn participant(&self) -> LocalBroadcast {
        let mut inner = self.inner.lock();
        inner.queues.push(VecDeque::new());
        LocalBroadcast {
            hub: self.inner.clone(),
            index: inner.queues.len() - 1,
        }
    }

    /// Number of connected participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.inner.lock().queues.len()
    }
}

/// One participant's endpoint on a [`LocalBroadcastHub`].
#[derive(Debug)]
pub struct LocalBroadcast {
    hub: Arc<Mutex<HubInner>>,
    index: usize,
}

impl SnapshotChannel for LocalBroadcast {
    fn publish(&mut self, frame: &[u8]) {
        let mut inner = self.hub.lock();
        for queue in &mut inner.queues {
            queue.push_back(frame.to_vec());
        }
    }

    fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut inner = self.hub.lock();
        match inner.queues.get_mut(self.index) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

/// A chaos wrapper that randomly drops inbound frames.
///
/// Useful in tests for exercising the engine's tolerance of the weak
/// consistency model: a dropped snapshot must only ever delay convergence
/// until the next publish, never wedge a participant.
#[derive(Debug)]
pub struct LossyChannel<C> {
    inner: C,
    rng: Pcg32,
    drop_chance: f32,
}

impl<C: SnapshotChannel> LossyChannel<C> {
    /// Wraps `inner`, dropping each inbound frame with probability
    /// `drop_chance` (clamped to `[0.0, 1.0]`), deterministically from
    /// `seed`.
    #[must_use]
    pub fn new(inner: C, drop_chance: f32, seed: u64) -> Self {
        Self {
            inner,
            rng: Pcg32::seed_from_u64(seed),
            drop_chance: drop_chance.clamp(0.0, 1.0),
        }
    }
}

impl<C: SnapshotChannel> SnapshotChannel for LossyChannel<C> {
    fn publish(&mut self, frame: &[u8]) {
        self.inner.publish(frame);
    }

    fn drain(&mut self) -> Vec<Vec<u8>> {
        self.inner
            .drain()
            .into_iter()
            .filter(|_| self.rng.unit_f32() >= self.drop_chance)
            .collect()
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_every_participant_exactly_once() {
        let hub = LocalBroadcastHub::new();
        let mut a = hub.participant();
        let mut b = hub.participant();
        let mut c = hub.participant();

        a.publish(b"frame-1");

        assert_eq!(a.drain(), vec![b"frame-1".to_vec()]);
        assert_eq!(b.drain(), vec![b"frame-1".to_vec()]);
        assert_eq!(c.drain(), vec![b"frame-1".to_vec()]);

        // A second drain yields nothing.
        assert!(a.drain().is_empty());
        assert!(b.drain().is_empty());
        assert!(c.drain().is_empty());
    }

    #[test]
    fn frames_arrive_in_publish_order_per_publisher() {
        let hub = LocalBroadcastHub::new();
        let mut a = hub.participant();
        let mut b = hub.participant();

        a.publish(b"one");
        a.publish(b"two");
        a.publish(b"three");

        assert_eq!(
            b.drain(),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn late_joiner_misses_earlier_frames() {
        let hub = LocalBroadcastHub::new();
        let mut a = hub.participant();
        a.publish(b"early");

        let mut b = hub.participant();
        assert!(b.drain().is_empty());

        a.publish(b"late");
        assert_eq!(b.drain(), vec![b"late".to_vec()]);
    }

    #[test]
    fn lossy_channel_drops_deterministically() {
        let hub = LocalBroadcastHub::new();
        let mut publisher = hub.participant();
        let mut lossy_a = LossyChannel::new(hub.participant(), 0.5, 1234);
        let mut lossy_b = LossyChannel::new(hub.participant(), 0.5, 1234);

        for i in 0..32u8 {
            publisher.publish(&[i]);
        }

        let got_a = lossy_a.drain();
        let got_b = lossy_b.drain();
        assert_eq!(got_a, got_b);
        assert!(got_a.len() < 32);
        assert!(!got_a.is_empty());
    }

    #[test]
    fn lossy_channel_with_zero_chance_drops_nothing() {
        let hub = LocalBroadcastHub::new();
        let mut publisher = hub.participant();
        let mut lossy = LossyChannel::new(hub.participant(), 0.0, 99);

        publisher.publish(b"kept");
        assert_eq!(lossy.drain(), vec![b"kept".to_vec()]);
    }
}
