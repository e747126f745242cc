//! Connection lifecycle state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Subscribing -> Subscribed
//!       ^                                                       |
//!       +-------------------- transport lost -------------------+
//! ```
//!
//! `ShutDown` is terminal and reachable from every state.

use log::debug;
use strum::Display;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Subscribing,
    Subscribed,
    ShutDown,
}

/// Named inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Transition {
    ConnectAttempt,
    ConnectAccepted,
    SubscribeRequested,
    SubscribeGranted,
    SubscribeFailed,
    TransportLost,
    Shutdown,
}

impl ConnectionState {
    /// State after applying `transition`. Transitions that make no sense in
    /// the current state leave it unchanged.
    pub fn apply(self, transition: Transition) -> ConnectionState {
        use ConnectionState::*;

        match (self, transition) {
            (ShutDown, _) | (_, Transition::Shutdown) => ShutDown,
            (Disconnected, Transition::ConnectAttempt) => Connecting,
            (_, Transition::ConnectAccepted) => Connected,
            (Connected, Transition::SubscribeRequested) => Subscribing,
            (Subscribing, Transition::SubscribeGranted) => Subscribed,
            (Subscribing, Transition::SubscribeFailed) => Connected,
            (_, Transition::TransportLost) => Disconnected,
            (state, _) => state,
        }
    }

    /// Whether a session is established with the broker.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Subscribing | ConnectionState::Subscribed
        )
    }
}

/// Holds the current state and publishes changes to watchers.
pub struct ConnectionTracker {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Apply a transition and return the resulting state.
    pub fn transition(&self, transition: Transition) -> ConnectionState {
        let mut next = ConnectionState::Disconnected;
        self.tx.send_if_modified(|state| {
            let previous = *state;
            next = previous.apply(transition);
            if next == previous {
                return false;
            }
            debug!("[MQTT] {} --{}--> {}", previous, transition, next);
            *state = next;
            true
        });
        next
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
