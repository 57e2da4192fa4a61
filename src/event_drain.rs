use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::BlockpartyEvent;

/// A zero-allocation opaque iterator that drains events from a session.
///
/// This type wraps the internal event queue drain, providing a stable public
/// API that doesn't expose `std::collections::vec_deque::Drain` directly. It
/// implements [`Iterator`], [`DoubleEndedIterator`], [`ExactSizeIterator`],
/// and [`FusedIterator`].
///
/// Obtain an `EventDrain` by calling [`CoopSession::events()`].
///
/// # Examples
///
/// ```ignore
/// for event in session.events() {
///     match event {
///         BlockpartyEvent::PhaseChanged { from, to } => {
///             println!("phase moved from {from:?} to {to:?}");
///         }
///         _ => { /* handle other events */ }
///     }
/// }
/// ```
///
/// [`CoopSession::events()`]: crate::CoopSession::events
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a> {
    inner: EventDrainInner<'a>,
}

enum EventDrainInner<'a> {
    Queue(Drain<'a, BlockpartyEvent>),
    #[allow(dead_code)]
    Empty,
}

impl<'a> EventDrain<'a> {
    pub(crate) fn from_drain(drain: Drain<'a, BlockpartyEvent>) -> Self {
        Self {
            inner: EventDrainInner::Queue(drain),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn empty() -> Self {
        Self {
            inner: EventDrainInner::Empty,
        }
    }
}

impl Iterator for EventDrain<'_> {
    type Item = BlockpartyEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventDrainInner::Queue(drain) => drain.next(),
            EventDrainInner::Empty => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            EventDrainInner::Queue(drain) => drain.size_hint(),
            EventDrainInner::Empty => (0, Some(0)),
        }
    }
}

impl DoubleEndedIterator for EventDrain<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventDrainInner::Queue(drain) => drain.next_back(),
            EventDrainInner::Empty => None,
        }
    }
}

impl ExactSizeIterator for EventDrain<'_> {
    fn len(&self) -> usize {
        match &self.inner {
            EventDrainInner::Queue(drain) => drain.len(),
            EventDrainInner::Empty => 0,
        }
    }
}

impl FusedIterator for EventDrain<'_> {}

impl std::fmt::Debug for EventDrain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::iter_with_drain
)]
mod tests {
    use super::*;
    use crate::SessionPhase;
    use std::collections::VecDeque;

    fn make_event(revision: u64) -> BlockpartyEvent {
        BlockpartyEvent::SnapshotReplaced {
            generation: 1,
            revision,
        }
    }

    #[test]
    fn empty_drain_returns_none() {
        let mut drain = EventDrain::empty();
        assert!(drain.next().is_none());
    }

    #[test]
    fn empty_drain_has_zero_len() {
        let drain = EventDrain::empty();
        assert_eq!(drain.len(), 0);
    }

    #[test]
    fn drain_from_queue_yields_all_events() {
        let mut queue: VecDeque<BlockpartyEvent> = VecDeque::new();
        queue.push_back(make_event(1));
        queue.push_back(make_event(2));
        queue.push_back(make_event(3));

        let drain = EventDrain::from_drain(queue.drain(..));
        let events: Vec<_> = drain.collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], make_event(1));
        assert_eq!(events[1], make_event(2));
        assert_eq!(events[2], make_event(3));
    }

    #[test]
    fn drain_is_fused() {
        let mut queue: VecDeque<BlockpartyEvent> = VecDeque::new();
        queue.push_back(BlockpartyEvent::PhaseChanged {
            from: SessionPhase::Lobby,
            to: SessionPhase::Playing,
        });

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert!(drain.next().is_some());
        assert!(drain.next().is_none());
        assert!(drain.next().is_none());
    }

    #[test]
    fn double_ended_iteration() {
        let mut queue: VecDeque<BlockpartyEvent> = VecDeque::new();
        queue.push_back(make_event(1));
        queue.push_back(make_event(2));
        queue.push_back(make_event(3));

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.next_back(), Some(make_event(3)));
        assert_eq!(drain.next(), Some(make_event(1)));
        assert_eq!(drain.next_back(), Some(make_event(2)));
        assert!(drain.next().is_none());
    }

    #[test]
    fn exact_size_is_accurate() {
        let mut queue: VecDeque<BlockpartyEvent> = VecDeque::new();
        queue.push_back(make_event(1));
        queue.push_back(make_event(2));

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.len(), 2);
        let _ = drain.next();
        assert_eq!(drain.len(), 1);
        let _ = drain.next();
        assert_eq!(drain.len(), 0);
    }

    #[test]
    fn debug_format_shows_remaining_count() {
        let mut queue: VecDeque<BlockpartyEvent> = VecDeque::new();
        queue.push_back(make_event(1));
        queue.push_back(make_event(2));
        let drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 2 }");
    }
}
