use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;

use thiserror::Error as ThisError;

/// A vote that the admission engine turned away. These are expected,
/// user-caused outcomes: the poll is left untouched and nothing is
/// retried or broadcast.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VoteRejection {
    #[error("no such option on this poll")]
    UnknownOption,
    #[error("your network address already voted on this poll")]
    OriginAlreadyVoted,
    #[error("you may only choose one option")]
    TokenAlreadyVoted,
    #[error("you already chose this option")]
    OptionAlreadyChosen,
}

/// Failures of the poll store itself, as opposed to decisions about a vote.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
    /// The conditional write lost its race more times than the retry
    /// budget allows. The whole request is safe to retry.
    #[error("poll was concurrently modified too many times, try again")]
    Contention,
    #[error("poll storage is unavailable")]
    Unavailable,
}

/// Everything that can come out of the vote apply pipeline.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VoteError {
    #[error(transparent)]
    Rejected(#[from] VoteRejection),
    #[error("poll not found")]
    PollNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Poll creation can fail on bad input or a store fault; there is no
/// admission step to reject it.
#[derive(Debug, ThisError)]
pub enum CreateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct ValidationError {
    message: String,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.message)
    }
}

impl Error for ValidationError {}

pub fn poll_question_empty() -> ValidationError {
    ValidationError {
        message: String::from("poll's question must not be empty"),
    }
}

pub fn poll_option_limit_exceeded(limits: RangeInclusive<usize>, count: usize) -> ValidationError {
    ValidationError {
        message: format!(
            "poll must have between {} and {} options, got {count}",
            limits.start(),
            limits.end()
        ),
    }
}

pub fn poll_option_empty(index: usize) -> ValidationError {
    ValidationError {
        message: format!("poll option {index} must not be empty"),
    }
}
