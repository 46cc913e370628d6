//! EventServer actor for fanning lifecycle events out to subscribers
//!
//! Subscribers register an interest in a board or a single thread; each
//! published event is pushed to everyone watching its thread and its board.
//! Delivery uses do_send and is fire-and-forget.

use super::types::BoardEvent;
use actix::prelude::*;
use std::collections::HashMap;

/// Serialized event pushed to a subscriber.
#[derive(Message)]
#[rtype(result = "()")]
pub struct EventPush(pub String);

/// Register a subscriber; responds with its connection id.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct Connect {
    pub recipient: Recipient<EventPush>,
}

/// Remove a subscriber and all of its watches.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: usize,
}

/// What a subscriber wants to hear about.
#[derive(Debug, Clone, Copy)]
pub enum Watch {
    Board(i32),
    Thread(i32),
}

/// Add a watch for an existing connection.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub id: usize,
    pub watch: Watch,
}

/// Publish an event to everyone watching its board or thread.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish(pub BoardEvent);

/// EventServer manages subscriber connections for real-time board events.
pub struct EventServer {
    next_id: usize,
    connections: HashMap<usize, Recipient<EventPush>>,
    /// board id -> connection ids
    board_watchers: HashMap<i32, Vec<usize>>,
    /// thread id -> connection ids
    thread_watchers: HashMap<i32, Vec<usize>>,
}

impl EventServer {
    pub fn new() -> Self {
        log::info!("EventServer starting up.");
        Self {
            next_id: 0,
            connections: HashMap::new(),
            board_watchers: HashMap::new(),
            thread_watchers: HashMap::new(),
        }
    }

    fn push_to(&self, conn_ids: &[usize], payload: &str) {
        for conn_id in conn_ids {
            if let Some(recipient) = self.connections.get(conn_id) {
                recipient.do_send(EventPush(payload.to_string()));
            }
        }
    }
}

impl Default for EventServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for EventServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for EventServer {
    type Result = usize;

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.insert(id, msg.recipient);
        id
    }
}

impl Handler<Disconnect> for EventServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        self.connections.remove(&msg.id);
        for watchers in self.board_watchers.values_mut() {
            watchers.retain(|id| *id != msg.id);
        }
        for watchers in self.thread_watchers.values_mut() {
            watchers.retain(|id| *id != msg.id);
        }
    }
}

impl Handler<Subscribe> for EventServer {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _: &mut Context<Self>) {
        if !self.connections.contains_key(&msg.id) {
            return;
        }
        match msg.watch {
            Watch::Board(board_id) => {
                self.board_watchers.entry(board_id).or_default().push(msg.id)
            }
            Watch::Thread(thread_id) => self
                .thread_watchers
                .entry(thread_id)
                .or_default()
                .push(msg.id),
        }
    }
}

impl Handler<Publish> for EventServer {
    type Result = ();

    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) {
        let event = msg.0;
        let payload = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("dropping undeliverable event {}: {}", event.as_str(), e);
                return;
            }
        };

        if let Some(watchers) = self.thread_watchers.get(&event.thread_id()) {
            self.push_to(watchers, &payload);
        }
        if let Some(watchers) = self.board_watchers.get(&event.board_id()) {
            self.push_to(watchers, &payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Collector {
        received: Arc<Mutex<Vec<String>>>,
    }

    impl Actor for Collector {
        type Context = Context<Self>;
    }

    impl Handler<EventPush> for Collector {
        type Result = ();

        fn handle(&mut self, msg: EventPush, _: &mut Context<Self>) {
            self.received.lock().unwrap().push(msg.0);
        }
    }

    #[actix_rt::test]
    async fn test_board_watcher_receives_published_events() {
        let server = EventServer::new().start();
        let received = Arc::new(Mutex::new(Vec::new()));
        let collector = Collector {
            received: received.clone(),
        }
        .start();

        let id = server
            .send(Connect {
                recipient: collector.recipient(),
            })
            .await
            .unwrap();
        server
            .send(Subscribe {
                id,
                watch: Watch::Board(1),
            })
            .await
            .unwrap();

        server
            .send(Publish(BoardEvent::ThreadRetired {
                board_id: 1,
                thread_id: 99,
            }))
            .await
            .unwrap();
        // Publish fans out with do_send; give the mailbox a beat.
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;

        let messages = received.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("thread_retired"));
        assert!(messages[0].contains("\"thread_id\":99"));
    }

    #[actix_rt::test]
    async fn test_unrelated_boards_receive_nothing() {
        let server = EventServer::new().start();
        let received = Arc::new(Mutex::new(Vec::new()));
        let collector = Collector {
            received: received.clone(),
        }
        .start();

        let id = server
            .send(Connect {
                recipient: collector.recipient(),
            })
            .await
            .unwrap();
        server
            .send(Subscribe {
                id,
                watch: Watch::Board(2),
            })
            .await
            .unwrap();

        server
            .send(Publish(BoardEvent::PostCreated {
                board_id: 1,
                thread_id: 5,
                post_id: 6,
            }))
            .await
            .unwrap();
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;

        assert!(received.lock().unwrap().is_empty());
    }
}
