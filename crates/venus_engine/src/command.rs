//! Deferred structural changes.
//!
//! Subsystem steps and message handlers run while the engine iterates a
//! snapshot of filtered ids, so they never mutate entity structure directly.
//! They queue [`Command`]s instead, and the engine applies the queue in FIFO
//! order at the end of the tick.

use std::fmt;

use venus_component::{AnyComponent, ComponentTypeId, EntityId};

/// A pending structural change.
pub enum Command {
    /// Create an entity under an id reserved when the command was queued.
    Spawn { id: EntityId, layer: usize },
    /// Attach a component, replacing any of the same kind.
    AddComponent {
        id: EntityId,
        component: Box<dyn AnyComponent>,
    },
    /// Detach a component by kind.
    RemoveComponent { id: EntityId, kind: ComponentTypeId },
    /// Destroy an entity and drop it from the index.
    Destroy { id: EntityId },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { id, layer } => write!(f, "Spawn({id}, layer {layer})"),
            Self::AddComponent { id, component } => {
                write!(f, "AddComponent({id}, {})", component.name())
            }
            Self::RemoveComponent { id, kind } => write!(f, "RemoveComponent({id}, {kind})"),
            Self::Destroy { id } => write!(f, "Destroy({id})"),
        }
    }
}

/// FIFO queue of pending commands.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
}

impl CommandQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queue a command.
    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued command, leaving the queue empty.
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }
}
