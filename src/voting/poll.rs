use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::origin::OriginFingerprint;
use crate::error::{self, ValidationError};

pub const OPTION_LIMITS: RangeInclusive<usize> = 2..=64;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<PollOption>,
    pub settings: PollSettings,
    pub likes: u64,

    /// Every accepted individual vote, append-only.
    pub vote_ledger: Vec<LedgerEntry>,
    /// Canonical origins that have cast a single-choice vote, append-only.
    pub origin_ledger: Vec<String>,

    pub created_at: DateTime<Utc>,
    /// Optimistic-lock field, bumped by the store on every committed update.
    pub version: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PollOption {
    pub id: Uuid,
    pub text: String,
    pub votes: u64,
}

#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollSettings {
    #[serde(default)]
    pub multi_select: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub voter_token: String,
    pub option_id: Uuid,
}

/// Client-supplied settings for a new poll, unvalidated.
#[derive(Deserialize, Debug)]
pub struct CreatePoll {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub settings: PollSettings,
}

impl Poll {
    pub fn new(CreatePoll { question, options, settings }: CreatePoll) -> Result<Poll, ValidationError> {
        if question.trim().is_empty() {
            return Err(error::poll_question_empty());
        }
        if !OPTION_LIMITS.contains(&options.len()) {
            return Err(error::poll_option_limit_exceeded(OPTION_LIMITS, options.len()));
        }
        if let Some(blank) = options.iter().position(|text| text.trim().is_empty()) {
            return Err(error::poll_option_empty(blank));
        }

        Ok(Poll {
            id: Uuid::new_v4(),
            question,
            options: options
                .into_iter()
                .map(|text| PollOption {
                    id: Uuid::new_v4(),
                    text,
                    votes: 0,
                })
                .collect(),
            settings,
            likes: 0,
            vote_ledger: vec![],
            origin_ledger: vec![],
            created_at: Utc::now(),
            version: 0,
        })
    }

    pub fn option(&self, option_id: Uuid) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn option_mut(&mut self, option_id: Uuid) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|option| option.id == option_id)
    }

    pub fn origin_voted(&self, origin: &OriginFingerprint) -> bool {
        self.origin_ledger.iter().any(|o| o == origin.as_str())
    }

    pub fn token_voted(&self, voter_token: &str) -> bool {
        self.vote_ledger.iter().any(|entry| entry.voter_token == voter_token)
    }

    pub fn token_voted_for(&self, voter_token: &str, option_id: Uuid) -> bool {
        self.vote_ledger
            .iter()
            .any(|entry| entry.voter_token == voter_token && entry.option_id == option_id)
    }
}
