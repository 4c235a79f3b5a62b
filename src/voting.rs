mod admission;
mod origin;
mod poll;

pub use admission::{decide, VoteDelta};
pub use origin::OriginFingerprint;
pub use poll::{CreatePoll, LedgerEntry, Poll, PollOption, PollSettings, OPTION_LIMITS};
