use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::broadcast::{Broadcaster, PollEvent};
use crate::error::{CreateError, StoreError, VoteError};
use crate::store::PollStore;
use crate::voting::{self, CreatePoll, OriginFingerprint, Poll};

/// How many times a conditional write may lose its race before the
/// request is given up as contended.
const WRITE_RETRIES: u32 = 3;

/// Orchestrates every poll mutation: read, decide, conditional write,
/// broadcast.
///
/// A per-poll mutex serializes the read-to-publish window, so broadcasts
/// for one poll go out in commit order and two votes can never both be
/// decided against the same base tally. Distinct polls take distinct
/// mutexes and never contend. The store's version check stays on as a
/// second line: if a writer ever gets past the lock, the write loses
/// cleanly and is retried from a fresh read.
pub struct PollService {
    store: Arc<dyn PollStore>,
    broadcaster: Arc<Broadcaster>,
    poll_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PollService {
    pub fn new(store: Arc<dyn PollStore>, broadcaster: Arc<Broadcaster>) -> PollService {
        PollService {
            store,
            broadcaster,
            poll_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub async fn list_polls(&self) -> Result<Vec<Poll>, StoreError> {
        self.store.list().await
    }

    /// Create a poll and announce it. Creation bypasses admission: the
    /// aggregate starts with zeroed counters and empty ledgers.
    pub async fn create_poll(&self, settings: CreatePoll) -> Result<Poll, CreateError> {
        let poll = Poll::new(settings)?;
        let poll = self.store.insert(poll).await?;
        info!(poll_id = %poll.id, options = poll.options.len(), "poll created");
        self.broadcaster.publish(&PollEvent::PollCreated(poll.clone()));
        Ok(poll)
    }

    /// Cast a vote: fetch, decide, apply, conditionally write, broadcast.
    ///
    /// Rejections come back verbatim with no state change and no
    /// broadcast. Only a lost conditional write is retried, from a fresh
    /// read each time, and the admission decision is re-made against the
    /// new snapshot.
    pub async fn cast_vote(
        &self,
        poll_id: Uuid,
        voter_token: &str,
        origin: &OriginFingerprint,
        option_id: Uuid,
    ) -> Result<Poll, VoteError> {
        let lock = self.poll_lock(poll_id).await?;
        let _serialized = lock.lock().await;

        let mut attempts = 0;
        loop {
            let mut poll = self
                .store
                .get(poll_id)
                .await?
                .ok_or(VoteError::PollNotFound)?;

            let delta = voting::decide(&poll, voter_token, origin, option_id)?;
            delta.apply(&mut poll);

            match self.store.update(poll).await {
                Ok(committed) => {
                    info!(
                        %poll_id,
                        %option_id,
                        version = committed.version,
                        "vote accepted"
                    );
                    self.broadcaster.publish(&PollEvent::PollUpdated(committed.clone()));
                    return Ok(committed);
                }
                Err(StoreError::Contention) if attempts < WRITE_RETRIES => {
                    attempts += 1;
                }
                Err(err) => {
                    error!(%poll_id, %err, "vote could not be persisted");
                    return Err(err.into());
                }
            }
        }
    }

    /// Bump a poll's like counter. No admission and no dedup, but the
    /// same conditional-write and broadcast protocol as voting.
    pub async fn like_poll(&self, poll_id: Uuid) -> Result<Poll, VoteError> {
        let lock = self.poll_lock(poll_id).await?;
        let _serialized = lock.lock().await;

        let mut attempts = 0;
        loop {
            let mut poll = self
                .store
                .get(poll_id)
                .await?
                .ok_or(VoteError::PollNotFound)?;
            poll.likes += 1;

            match self.store.update(poll).await {
                Ok(committed) => {
                    self.broadcaster.publish(&PollEvent::PollUpdated(committed.clone()));
                    return Ok(committed);
                }
                Err(StoreError::Contention) if attempts < WRITE_RETRIES => {
                    attempts += 1;
                }
                Err(err) => {
                    error!(%poll_id, %err, "like could not be persisted");
                    return Err(err.into());
                }
            }
        }
    }

    /// Look up (or lazily create) the serialization lock for a poll.
    ///
    /// Ids that were never created get no entry: the map may only grow
    /// with real polls, not with whatever a caller puts in the URL. A
    /// poll created between the existence check and the locked re-read
    /// just reports not-found, same as if the vote had arrived first.
    async fn poll_lock(&self, poll_id: Uuid) -> Result<Arc<Mutex<()>>, VoteError> {
        if self.store.get(poll_id).await?.is_none() {
            return Err(VoteError::PollNotFound);
        }
        let mut locks = self.poll_locks.lock().await;
        Ok(locks.entry(poll_id).or_default().clone())
    }
}
