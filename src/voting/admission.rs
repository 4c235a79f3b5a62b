use uuid::Uuid;

use super::origin::OriginFingerprint;
use super::poll::{LedgerEntry, Poll};
use crate::error::VoteRejection;

/// The state change an admitted vote makes to its poll: one option counter
/// up by one, one ledger entry, and (single-choice only) the origin added
/// to the origin ledger. Applied as a unit or not at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteDelta {
    pub option_id: Uuid,
    pub voter_token: String,
    pub origin: Option<OriginFingerprint>,
}

/// Decide whether a vote is admissible against a poll snapshot.
///
/// Pure function of its inputs. Checks run broadest first: option
/// existence, then the per-origin guard (single-choice only), then the
/// per-token ledger checks. Multi-select polls deliberately skip the
/// origin guard and dedup per (token, option) pair only.
pub fn decide(
    poll: &Poll,
    voter_token: &str,
    origin: &OriginFingerprint,
    option_id: Uuid,
) -> Result<VoteDelta, VoteRejection> {
    if poll.option(option_id).is_none() {
        return Err(VoteRejection::UnknownOption);
    }

    if poll.settings.multi_select {
        if poll.token_voted_for(voter_token, option_id) {
            return Err(VoteRejection::OptionAlreadyChosen);
        }
    } else {
        // Origin first: blocks repeat votes from one network address even
        // across different voter tokens. Token check second so a client
        // that kept its token gets the friendlier message.
        if poll.origin_voted(origin) {
            return Err(VoteRejection::OriginAlreadyVoted);
        }
        if poll.token_voted(voter_token) {
            return Err(VoteRejection::TokenAlreadyVoted);
        }
    }

    Ok(VoteDelta {
        option_id,
        voter_token: String::from(voter_token),
        origin: if poll.settings.multi_select {
            None
        } else {
            Some(origin.clone())
        },
    })
}

impl VoteDelta {
    /// Apply this delta to the poll it was decided against. The whole
    /// delta lands or none of it does: nothing is written unless the
    /// option resolved by `decide` is still present.
    pub fn apply(self, poll: &mut Poll) {
        let Some(option) = poll.option_mut(self.option_id) else {
            return;
        };
        option.votes += 1;
        poll.vote_ledger.push(LedgerEntry {
            voter_token: self.voter_token,
            option_id: self.option_id,
        });
        if let Some(origin) = self.origin {
            if !poll.origin_voted(&origin) {
                poll.origin_ledger.push(String::from(origin.as_str()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::poll::{CreatePoll, PollSettings};

    fn poll(multi_select: bool) -> Poll {
        Poll::new(CreatePoll {
            question: String::from("Team lunch?"),
            options: vec![String::from("A"), String::from("B")],
            settings: PollSettings { multi_select },
        })
        .unwrap()
    }

    fn origin(s: &str) -> OriginFingerprint {
        OriginFingerprint::from_ip(s.parse().unwrap())
    }

    fn vote(poll: &mut Poll, token: &str, from: &str, option_id: Uuid) -> Result<(), VoteRejection> {
        decide(poll, token, &origin(from), option_id).map(|delta| delta.apply(poll))
    }

    #[test]
    fn unknown_option_rejected_first() {
        let mut p = poll(false);
        let missing = Uuid::new_v4();
        assert_eq!(vote(&mut p, "t1", "1.1.1.1", missing), Err(VoteRejection::UnknownOption));
        assert!(p.vote_ledger.is_empty());
    }

    #[test]
    fn single_choice_scenario() {
        // Scenario from the product brief: t1/o1 votes A, then every
        // second attempt is turned away until a fresh token and origin
        // pair shows up.
        let mut p = poll(false);
        let (a, b) = (p.options[0].id, p.options[1].id);

        assert_eq!(vote(&mut p, "t1", "1.1.1.1", a), Ok(()));
        assert_eq!(p.option(a).unwrap().votes, 1);

        assert_eq!(
            vote(&mut p, "t2", "1.1.1.1", b),
            Err(VoteRejection::OriginAlreadyVoted)
        );
        assert_eq!(vote(&mut p, "t2", "2.2.2.2", b), Ok(()));
        assert_eq!(p.option(b).unwrap().votes, 1);
        assert_eq!(p.vote_ledger.len(), 2);
        assert_eq!(p.origin_ledger.len(), 2);
    }

    #[test]
    fn token_check_runs_when_origin_is_fresh() {
        let mut p = poll(false);
        let (a, b) = (p.options[0].id, p.options[1].id);
        assert_eq!(vote(&mut p, "t1", "1.1.1.1", a), Ok(()));
        // Same token from a new address: the origin guard passes, the
        // token ledger still blocks it.
        assert_eq!(
            vote(&mut p, "t1", "3.3.3.3", b),
            Err(VoteRejection::TokenAlreadyVoted)
        );
    }

    #[test]
    fn origin_guard_outranks_token_guard() {
        let mut p = poll(false);
        let (a, b) = (p.options[0].id, p.options[1].id);
        assert_eq!(vote(&mut p, "t1", "1.1.1.1", a), Ok(()));
        assert_eq!(
            vote(&mut p, "t1", "1.1.1.1", b),
            Err(VoteRejection::OriginAlreadyVoted)
        );
    }

    #[test]
    fn multi_select_scenario() {
        let mut p = poll(true);
        let (x, y) = (p.options[0].id, p.options[1].id);

        assert_eq!(vote(&mut p, "t1", "1.1.1.1", x), Ok(()));
        assert_eq!(
            vote(&mut p, "t1", "1.1.1.1", x),
            Err(VoteRejection::OptionAlreadyChosen)
        );
        assert_eq!(vote(&mut p, "t1", "1.1.1.1", y), Ok(()));

        assert_eq!(p.option(x).unwrap().votes, 1);
        assert_eq!(p.option(y).unwrap().votes, 1);
        assert_eq!(p.vote_ledger.len(), 2);
    }

    #[test]
    fn multi_select_has_no_origin_guard() {
        let mut p = poll(true);
        let (x, y) = (p.options[0].id, p.options[1].id);
        assert_eq!(vote(&mut p, "t1", "1.1.1.1", x), Ok(()));
        // Different token, same address: admitted under multi-select.
        assert_eq!(vote(&mut p, "t2", "1.1.1.1", x), Ok(()));
        assert_eq!(vote(&mut p, "t2", "1.1.1.1", y), Ok(()));
        assert!(p.origin_ledger.is_empty());
    }

    #[test]
    fn rejection_is_idempotent() {
        let mut p = poll(false);
        let a = p.options[0].id;
        assert_eq!(vote(&mut p, "t1", "1.1.1.1", a), Ok(()));
        let before = p.vote_ledger.clone();
        for _ in 0..3 {
            assert_eq!(
                vote(&mut p, "t1", "1.1.1.1", a),
                Err(VoteRejection::OriginAlreadyVoted)
            );
        }
        assert_eq!(p.vote_ledger, before);
        assert_eq!(p.option(a).unwrap().votes, 1);
    }

    #[test]
    fn mapped_origin_matches_plain_origin() {
        let mut p = poll(false);
        let (a, b) = (p.options[0].id, p.options[1].id);
        assert_eq!(vote(&mut p, "t1", "1.2.3.4", a), Ok(()));
        assert_eq!(
            vote(&mut p, "t2", "::ffff:1.2.3.4", b),
            Err(VoteRejection::OriginAlreadyVoted)
        );
    }

    #[test]
    fn sum_of_votes_tracks_ledger() {
        let mut p = poll(true);
        let (x, y) = (p.options[0].id, p.options[1].id);
        for (token, option) in [("t1", x), ("t1", y), ("t2", x), ("t3", y)] {
            vote(&mut p, token, "9.9.9.9", option).unwrap();
        }
        let total: u64 = p.options.iter().map(|option| option.votes).sum();
        assert_eq!(total, p.vote_ledger.len() as u64);
    }
}
