//! The "play again?" vote.
//!
//! After a win, every connected participant may vote. A full house of yes
//! votes restarts the game; a single no wipes the tally. Either way the
//! counters go back to zero.

use std::collections::HashMap;

use crate::ParticipantId;

/// Result of casting or rechecking a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotOutcome {
    /// Counted; not enough yes votes yet.
    Pending { yes: usize, needed: usize },
    /// Everyone connected said yes. The ballot has been cleared.
    Quorum,
    /// A no vote. The ballot has been cleared.
    Vetoed,
    /// This participant already said yes this round; not counted.
    AlreadyVoted,
}

/// Restart vote counters.
#[derive(Debug, Clone)]
pub struct RestartBallot {
    yes: usize,
    no: usize,
    /// Yes votes counted per voter this round.
    voted: HashMap<ParticipantId, usize>,
    one_vote_per_round: bool,
}

impl RestartBallot {
    /// With `one_vote_per_round` off, the same participant may say yes
    /// repeatedly and every vote counts.
    pub fn new(one_vote_per_round: bool) -> Self {
        Self {
            yes: 0,
            no: 0,
            voted: HashMap::new(),
            one_vote_per_round,
        }
    }

    /// Counts a yes vote against a quorum of `quorum` participants.
    pub fn cast_affirmative(&mut self, voter: ParticipantId, quorum: usize) -> BallotOutcome {
        let cast = self.voted.entry(voter).or_insert(0);
        if self.one_vote_per_round && *cast > 0 {
            tracing::debug!(%voter, "duplicate restart vote ignored");
            return BallotOutcome::AlreadyVoted;
        }
        *cast += 1;
        self.yes += 1;
        tracing::debug!(%voter, yes = self.yes, quorum, "restart vote");
        self.recheck(quorum)
    }

    /// Counts a no vote. Any no clears the ballot.
    pub fn cast_negative(&mut self, voter: ParticipantId) -> BallotOutcome {
        self.no += 1;
        tracing::debug!(%voter, "restart vetoed");
        self.clear();
        BallotOutcome::Vetoed
    }

    /// Takes back every yes vote `voter` cast this round. Called when the
    /// voter leaves, before [`recheck`](Self::recheck) with the smaller
    /// quorum. Returns how many votes were withdrawn.
    pub fn withdraw(&mut self, voter: ParticipantId) -> usize {
        let withdrawn = self.voted.remove(&voter).unwrap_or(0);
        self.yes -= withdrawn;
        if withdrawn > 0 {
            tracing::debug!(%voter, withdrawn, yes = self.yes, "restart votes withdrawn");
        }
        withdrawn
    }

    /// Re-evaluates the tally, e.g. after the quorum shrank because someone
    /// left.
    pub fn recheck(&mut self, quorum: usize) -> BallotOutcome {
        if self.yes > 0 && self.yes >= quorum {
            self.clear();
            BallotOutcome::Quorum
        } else {
            BallotOutcome::Pending {
                yes: self.yes,
                needed: quorum,
            }
        }
    }

    /// Zeroes both counters and forgets who voted.
    pub fn clear(&mut self) {
        self.yes = 0;
        self.no = 0;
        self.voted.clear();
    }

    pub fn yes(&self) -> usize {
        self.yes
    }

    pub fn no(&self) -> usize {
        self.no
    }
}

impl Default for RestartBallot {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> ParticipantId {
        ParticipantId::new(n)
    }

    #[test]
    fn test_full_house_reaches_quorum_once() {
        let mut ballot = RestartBallot::default();
        assert_eq!(
            ballot.cast_affirmative(id(1), 3),
            BallotOutcome::Pending { yes: 1, needed: 3 }
        );
        assert_eq!(
            ballot.cast_affirmative(id(2), 3),
            BallotOutcome::Pending { yes: 2, needed: 3 }
        );
        assert_eq!(ballot.cast_affirmative(id(3), 3), BallotOutcome::Quorum);
        assert_eq!(ballot.yes(), 0);
        assert_eq!(ballot.no(), 0);
    }

    #[test]
    fn test_single_no_clears_everything() {
        let mut ballot = RestartBallot::default();
        ballot.cast_affirmative(id(1), 3);
        ballot.cast_affirmative(id(2), 3);

        assert_eq!(ballot.cast_negative(id(3)), BallotOutcome::Vetoed);
        assert_eq!(ballot.yes(), 0);
        assert_eq!(ballot.no(), 0);

        // Earlier voters may vote again after a veto.
        assert_eq!(
            ballot.cast_affirmative(id(1), 3),
            BallotOutcome::Pending { yes: 1, needed: 3 }
        );
    }

    #[test]
    fn test_duplicate_vote_rejected_by_default() {
        let mut ballot = RestartBallot::default();
        ballot.cast_affirmative(id(1), 2);
        assert_eq!(ballot.cast_affirmative(id(1), 2), BallotOutcome::AlreadyVoted);
        assert_eq!(ballot.yes(), 1);
    }

    #[test]
    fn test_duplicate_vote_counts_when_allowed() {
        let mut ballot = RestartBallot::new(false);
        ballot.cast_affirmative(id(1), 2);
        assert_eq!(ballot.cast_affirmative(id(1), 2), BallotOutcome::Quorum);
    }

    #[test]
    fn test_voters_are_forgotten_after_quorum() {
        let mut ballot = RestartBallot::default();
        ballot.cast_affirmative(id(1), 1);
        assert_eq!(ballot.cast_affirmative(id(1), 1), BallotOutcome::Quorum);
    }

    #[test]
    fn test_withdrawn_vote_no_longer_counts() {
        let mut ballot = RestartBallot::default();
        ballot.cast_affirmative(id(1), 3);
        assert_eq!(ballot.withdraw(id(1)), 1);
        assert_eq!(ballot.recheck(2), BallotOutcome::Pending { yes: 0, needed: 2 });

        // The two who stayed both have to say yes.
        assert_eq!(
            ballot.cast_affirmative(id(2), 2),
            BallotOutcome::Pending { yes: 1, needed: 2 }
        );
        assert_eq!(ballot.cast_affirmative(id(3), 2), BallotOutcome::Quorum);
    }

    #[test]
    fn test_withdraw_takes_back_repeated_votes() {
        let mut ballot = RestartBallot::new(false);
        ballot.cast_affirmative(id(1), 3);
        ballot.cast_affirmative(id(1), 3);
        ballot.cast_affirmative(id(2), 3);
        assert_eq!(ballot.withdraw(id(1)), 2);
        assert_eq!(ballot.yes(), 1);
        assert_eq!(ballot.withdraw(id(9)), 0);
    }

    #[test]
    fn test_recheck_after_quorum_shrinks() {
        let mut ballot = RestartBallot::default();
        ballot.cast_affirmative(id(1), 3);
        ballot.cast_affirmative(id(2), 3);
        assert_eq!(ballot.recheck(2), BallotOutcome::Quorum);
        assert_eq!(ballot.recheck(2), BallotOutcome::Pending { yes: 0, needed: 2 });
    }
}
