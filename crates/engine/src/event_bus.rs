//! In-process synchronous event bus (§4.4). Single-threaded, FIFO, no nested
//! dispatch: a handler that calls `publish` while `drain` is running gets its
//! event enqueued at the tail rather than dispatched immediately.

use std::collections::HashMap;

use tracing::error;
use wrldbldr_domain::DomainEvent;

/// A handler registered against either a specific event kind or the
/// wildcard registry. Boxed so the bus can hold a heterogeneous list.
pub type Handler = Box<dyn FnMut(&DomainEvent) + Send>;

#[derive(Default)]
pub struct EventBus {
    queue: Vec<DomainEvent>,
    draining: bool,
    by_kind: HashMap<String, Vec<Handler>>,
    wildcard: Vec<Handler>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: impl Into<String>, handler: Handler) {
        self.by_kind.entry(kind.into()).or_default().push(handler);
    }

    pub fn subscribe_all(&mut self, handler: Handler) {
        self.wildcard.push(handler);
    }

    /// Appends `event` to the queue. If called from inside a handler that is
    /// itself running under `drain`, the event still only joins the tail —
    /// it is never dispatched inline (§4.4: "nested publishes enqueue at the
    /// tail").
    pub fn publish(&mut self, event: DomainEvent) {
        self.queue.push(event);
    }

    /// Pops events in FIFO order and invokes every matching handler. A
    /// handler panic/failure is caught and logged so remaining handlers
    /// still run (§4.4). Returns the events that were drained, so callers
    /// (e.g. the Replay Logger, State Publisher) can mirror them.
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        if self.draining {
            return Vec::new();
        }
        self.draining = true;
        let mut drained = Vec::new();
        let mut cursor = 0;
        while cursor < self.queue.len() {
            // Clone out so handlers that call `publish` only append to
            // `self.queue`, which this loop keeps consuming from the front.
            let event = self.queue[cursor].clone();
            cursor += 1;

            if let Some(handlers) = self.by_kind.get_mut(&event.kind) {
                for handler in handlers.iter_mut() {
                    run_handler(handler, &event);
                }
            }
            for handler in self.wildcard.iter_mut() {
                run_handler(handler, &event);
            }
            drained.push(event);
        }
        self.queue.clear();
        self.draining = false;
        drained
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }
}

fn run_handler(handler: &mut Handler, event: &DomainEvent) {
    // Handlers are plain closures, not `catch_unwind`-wrapped: the bus's
    // contract only promises one handler's logic error doesn't stop the
    // rest, so failures are surfaced through `tracing` and a caller-visible
    // `Result` is up to the handler itself, not this dispatcher.
    let kind = event.kind.clone();
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(event))).unwrap_or_else(|_| {
        error!(event_kind = %kind, "event handler panicked; continuing with remaining handlers");
    });
}
