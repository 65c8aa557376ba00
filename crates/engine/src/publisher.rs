//! State Publisher (§4.14): the observer registry that fans every drained
//! event out to subscribers, in registration order, with a bounded history
//! any subscriber can backfill from (§9 Design Notes: the observer pattern
//! the teacher already uses for its own state broadcast).

use std::collections::VecDeque;

use tracing::error;
use wrldbldr_domain::DomainEvent;

/// Maximum number of past events retained for late subscribers (§4.14).
pub const DEFAULT_EVENT_HISTORY: usize = 1000;

pub type SubscriberId = u64;

pub trait StateObserver: Send {
    fn on_game_event(&mut self, event: &DomainEvent);
}

pub struct StatePublisher {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Box<dyn StateObserver>)>,
    history: VecDeque<DomainEvent>,
    history_cap: usize,
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
            history: VecDeque::new(),
            history_cap: DEFAULT_EVENT_HISTORY,
        }
    }
}

impl StatePublisher {
    pub fn new(history_cap: usize) -> Self {
        Self {
            history_cap,
            ..Self::default()
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn StateObserver>) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Broadcasts every event in `events` to subscribers in registration
    /// order, catching panics so one broken subscriber doesn't stop the
    /// rest (§4.14), and appends them to the bounded history.
    pub fn broadcast(&mut self, events: &[DomainEvent]) {
        for event in events {
            for (id, observer) in self.subscribers.iter_mut() {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    observer.on_game_event(event)
                }));
                if result.is_err() {
                    error!(subscriber_id = id, event_kind = %event.kind, "subscriber panicked on event");
                }
            }
            if self.history.len() >= self.history_cap {
                self.history.pop_front();
            }
            self.history.push_back(event.clone());
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &DomainEvent> {
        self.history.iter()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingObserver(Arc<AtomicUsize>);
    impl StateObserver for CountingObserver {
        fn on_game_event(&mut self, _event: &DomainEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingObserver;
    impl StateObserver for PanickingObserver {
        fn on_game_event(&mut self, _event: &DomainEvent) {
            panic!("boom");
        }
    }

    fn event() -> DomainEvent {
        DomainEvent::new(0, "frame_update", serde_json::json!({}), None)
    }

    #[test]
    fn every_subscriber_receives_every_broadcast_event() {
        let mut publisher = StatePublisher::default();
        let counter = Arc::new(AtomicUsize::new(0));
        publisher.subscribe(Box::new(CountingObserver(counter.clone())));
        publisher.broadcast(&[event(), event()]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn a_panicking_subscriber_does_not_stop_the_rest() {
        let mut publisher = StatePublisher::default();
        let counter = Arc::new(AtomicUsize::new(0));
        publisher.subscribe(Box::new(PanickingObserver));
        publisher.subscribe(Box::new(CountingObserver(counter.clone())));
        publisher.broadcast(&[event()]);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut publisher = StatePublisher::new(3);
        for _ in 0..10 {
            publisher.broadcast(&[event()]);
        }
        assert_eq!(publisher.history().count(), 3);
    }
}
