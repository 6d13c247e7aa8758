// Controller notifications and listener dispatch
//
// Dispatch is strictly one-way: the controller publishes, listeners observe.
// Listeners never get a handle back into the controller.

use glam::Vec2;

/// Kind of jump that was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum JumpKind {
    /// Jump from solid ground
    Grounded,
    /// Jump shortly after walking off a ledge
    Coyote,
    /// Extra jump while airborne
    Air,
}

/// Notification emitted by a character controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// A jump was executed this tick
    Jumped(JumpKind),
    /// Grounded state changed; `impact` is the vertical speed on landing, 0 when leaving
    GroundedChanged { grounded: bool, impact: f32 },
    /// Character was teleported
    Repositioned(Vec2),
    /// Character was activated or frozen
    ActiveToggled(bool),
}

/// Identifier returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

type Listener = Box<dyn FnMut(&ControllerEvent)>;

/// Listener registration table
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u32,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, called for every event in registration order
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ControllerEvent) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener
    pub fn emit(&mut self, event: ControllerEvent) {
        log::debug!("Controller event: {:?}", event);
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
