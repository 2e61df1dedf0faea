//! Inter-subsystem message bus.
//!
//! Emitting never calls a handler directly. Messages are queued and the
//! engine drains the queue at fixed points: after all steps of a tick, and
//! immediately for emits made from outside a tick. Draining runs in waves:
//! every message queued when a wave starts is delivered to every subsystem
//! in registration order, and anything emitted meanwhile forms the next wave.

use std::collections::VecDeque;

use venus_component::Payload;

/// A broadcast message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Message name handlers bind to.
    pub name: String,
    /// Arbitrary data passed to the handler.
    pub data: Payload,
}

/// Queue of messages awaiting delivery.
#[derive(Debug, Default)]
pub struct MessageBus {
    queue: VecDeque<Message>,
}

impl MessageBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Queue a message for the next drain.
    pub fn push(&mut self, message: Message) {
        self.queue.push_back(message);
    }

    /// Take the current wave: everything queued so far.
    pub fn take_wave(&mut self) -> Vec<Message> {
        self.queue.drain(..).collect()
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discard every queued message, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}
