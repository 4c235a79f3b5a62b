use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::voting::Poll;

/// A full-snapshot push to viewers. Wire names match what the client
/// subscribes to: `new-poll` for creations, `update-poll` for any
/// accepted vote or like. No deltas; a viewer that misses a push
/// converges on the next one.
#[derive(Clone, Serialize, Debug)]
#[serde(tag = "event", content = "poll")]
pub enum PollEvent {
    #[serde(rename = "new-poll")]
    PollCreated(Poll),
    #[serde(rename = "update-poll")]
    PollUpdated(Poll),
}

impl PollEvent {
    pub fn poll(&self) -> &Poll {
        match self {
            PollEvent::PollCreated(poll) | PollEvent::PollUpdated(poll) => poll,
        }
    }
}

/// Fan-out to every connected viewer session.
///
/// Each session gets its own unbounded channel; `publish` offers the
/// event to every channel without ever awaiting, so a slow or gone
/// viewer cannot stall the committer or its neighbors. Sessions whose
/// receiving end has hung up are pruned on the next publish.
#[derive(Default)]
pub struct Broadcaster {
    sessions: RwLock<HashMap<Uuid, mpsc::UnboundedSender<PollEvent>>>,
}

impl Broadcaster {
    pub fn new() -> Broadcaster {
        Broadcaster::default()
    }

    /// Add a viewer session. The caller owns the receiving end and is
    /// expected to pull full state separately before relying on pushes.
    pub fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<PollEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.insert(session_id, tx);
                debug!(%session_id, viewers = sessions.len(), "viewer session registered");
            }
            Err(_) => warn!(%session_id, "session registry poisoned, viewer not registered"),
        }
        (session_id, rx)
    }

    /// Drop a viewer session, normally on disconnect.
    pub fn remove(&self, session_id: Uuid) {
        if let Ok(mut sessions) = self.sessions.write() {
            if sessions.remove(&session_id).is_some() {
                debug!(%session_id, viewers = sessions.len(), "viewer session removed");
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|sessions| sessions.len()).unwrap_or(0)
    }

    /// Push an event to every current session. Returns how many sessions
    /// it reached. Never blocks, never fails the caller.
    pub fn publish(&self, event: &PollEvent) -> usize {
        let mut sessions = match self.sessions.write() {
            Ok(sessions) => sessions,
            Err(_) => {
                warn!("session registry poisoned, event dropped");
                return 0;
            }
        };

        let mut gone = vec![];
        let mut reached = 0;
        for (session_id, tx) in sessions.iter() {
            if tx.send(event.clone()).is_ok() {
                reached += 1;
            } else {
                gone.push(*session_id);
            }
        }
        for session_id in gone {
            sessions.remove(&session_id);
            debug!(%session_id, "pruned disconnected viewer session");
        }

        debug!(
            poll_id = %event.poll().id,
            version = event.poll().version,
            reached,
            "event published"
        );
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::{CreatePoll, PollSettings};

    fn poll() -> Poll {
        Poll::new(CreatePoll {
            question: String::from("Lunch?"),
            options: vec![String::from("A"), String::from("B")],
            settings: PollSettings::default(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn every_session_receives_every_event() {
        let broadcaster = Broadcaster::new();
        let (_, mut rx1) = broadcaster.register();
        let (_, mut rx2) = broadcaster.register();

        let reached = broadcaster.publish(&PollEvent::PollCreated(poll()));
        assert_eq!(reached, 2);

        assert!(matches!(rx1.recv().await, Some(PollEvent::PollCreated(_))));
        assert!(matches!(rx2.recv().await, Some(PollEvent::PollCreated(_))));
    }

    #[tokio::test]
    async fn removed_session_stops_receiving() {
        let broadcaster = Broadcaster::new();
        let (id, mut rx) = broadcaster.register();
        broadcaster.remove(id);
        assert_eq!(broadcaster.session_count(), 0);

        broadcaster.publish(&PollEvent::PollUpdated(poll()));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_not_fatal() {
        let broadcaster = Broadcaster::new();
        let (_, rx) = broadcaster.register();
        let (_, mut live_rx) = broadcaster.register();
        drop(rx);

        let reached = broadcaster.publish(&PollEvent::PollUpdated(poll()));
        assert_eq!(reached, 1);
        assert_eq!(broadcaster.session_count(), 1);
        assert!(live_rx.recv().await.is_some());
    }

    #[test]
    fn wire_shape_matches_client_contract() {
        let event = PollEvent::PollCreated(poll());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "new-poll");
        assert_eq!(json["poll"]["question"], "Lunch?");
        assert!(json["poll"]["voteLedger"].as_array().unwrap().is_empty());
    }
}
