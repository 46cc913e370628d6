//! Fire-and-forget event fan-out for lifecycle changes
//!
//! Lifecycle services buffer events in a PendingEvents while their
//! transaction is open and dispatch only after commit, so a notification
//! failure can never roll back a committed state change. Publishing is
//! do_send to the EventServer actor; if no server is running (tests, the
//! seed binary) events are dropped with a debug log.

pub mod server;
pub mod types;

use actix::Addr;
use once_cell::sync::OnceCell;
use server::{EventServer, Publish};

pub use types::BoardEvent;

static EVENT_SERVER: OnceCell<Addr<EventServer>> = OnceCell::new();

/// Install the global EventServer address. Called once at startup, after
/// the actor is started.
pub fn init_event_server(addr: Addr<EventServer>) {
    if EVENT_SERVER.set(addr).is_err() {
        log::warn!("init_event_server called twice; keeping existing address");
    }
}

/// Publish one event, best-effort. Never blocks, never fails the caller.
pub fn publish(event: BoardEvent) {
    match EVENT_SERVER.get() {
        Some(addr) => addr.do_send(Publish(event)),
        None => log::debug!("no event server running, dropping {}", event.as_str()),
    }
}

/// Events collected during a transaction, dispatched after commit.
#[derive(Default)]
pub struct PendingEvents {
    events: Vec<BoardEvent>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: BoardEvent) {
        self.events.push(event);
    }

    /// Fan the buffered events out. Call only after the owning transaction
    /// has committed.
    pub fn dispatch(self) {
        for event in self.events {
            publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = BoardEvent::ThreadRetired {
            board_id: 3,
            thread_id: 44,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"thread_retired\""));
        assert!(json.contains("\"board_id\":3"));
        assert!(json.contains("\"thread_id\":44"));
    }

    #[test]
    fn test_pending_events_dispatch_without_server() {
        // No EventServer in unit tests; dispatch must be a silent no-op.
        let mut pending = PendingEvents::new();
        pending.push(BoardEvent::PostCreated {
            board_id: 1,
            thread_id: 2,
            post_id: 3,
        });
        pending.dispatch();
    }
}
