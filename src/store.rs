use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::voting::Poll;

/// Keyed storage of poll aggregates.
///
/// `update` is conditional on the aggregate's `version` field: it commits
/// only if the stored poll still carries the version the caller read, so
/// two writers racing on one poll cannot silently overwrite each other.
/// A durable backend slots in behind this trait; the schema it would use
/// is somebody else's problem.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Poll>, StoreError>;

    /// All polls, newest first.
    async fn list(&self) -> Result<Vec<Poll>, StoreError>;

    async fn insert(&self, poll: Poll) -> Result<Poll, StoreError>;

    /// Conditional write. Succeeds only if the stored version equals
    /// `poll.version`; the committed aggregate comes back with its
    /// version bumped. A lost race is `StoreError::Contention`.
    async fn update(&self, poll: Poll) -> Result<Poll, StoreError>;
}

/// In-memory store. The whole-map lock is held only for the duration of
/// a clone or a version compare, never across an await.
#[derive(Default)]
pub struct MemoryStore {
    polls: RwLock<HashMap<Uuid, Poll>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        Ok(self.polls.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Poll>, StoreError> {
        let mut polls: Vec<Poll> = self.polls.read().await.values().cloned().collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }

    async fn insert(&self, poll: Poll) -> Result<Poll, StoreError> {
        self.polls.write().await.insert(poll.id, poll.clone());
        Ok(poll)
    }

    async fn update(&self, mut poll: Poll) -> Result<Poll, StoreError> {
        let mut polls = self.polls.write().await;
        // A missing poll also counts as a lost race: polls are never
        // deleted in normal operation.
        let stored_version = polls.get(&poll.id).map(|stored| stored.version);
        match stored_version {
            Some(version) if version == poll.version => {
                poll.version += 1;
                polls.insert(poll.id, poll.clone());
                Ok(poll)
            }
            _ => Err(StoreError::Contention),
        }
    }
}
