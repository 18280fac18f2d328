use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::config::{BallotSpec, Conflict, TallyResult, VoteString};
use crate::quorum::evaluate_quorum;

/// Where a ballot stands at a given instant.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BallotState {
    Upcoming,
    Voting,
    ExtendedVoting,
    ConcludedPendingTally,
    Tallied,
}

/// What driving a ballot one step produced. The caller persists the
/// decision and sends any notifications; the engine only computes it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Decision {
    NoChange,
    ExtensionDecided(bool),
    Tallied(TallyResult),
}

/// One ballot together with the externally sourced figures its next
/// transition depends on. The caller reads them atomically before the
/// call so a single decision never sees skewed state.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotSnapshot {
    pub spec: BallotSpec,
    pub votes_cast: u64,
    /// Size of the electorate, needed for relative quorums.
    pub eligible_voters: u64,
}

/// The persistence collaborator. Vote storage, secret handling and
/// notification live behind this boundary; the engine only reads canonical
/// vote strings and writes transition outcomes.
///
/// The persist calls are compare-and-set on the ballot's previous state:
/// they fail with [`Conflict`] when another driver already recorded the
/// transition.
pub trait BallotStore {
    fn fetch_vote_count(&self, ballot_id: &str) -> u64;
    fn fetch_all_votes(&self, ballot_id: &str) -> Vec<VoteString>;
    fn persist_extension_decision(&mut self, ballot_id: &str, extended: bool)
        -> Result<(), Conflict>;
    fn persist_tally(&mut self, ballot_id: &str, result: &TallyResult) -> Result<(), Conflict>;
}

impl BallotSpec {
    /// The ballot's state as of `now`.
    ///
    /// Between `vote_end` and the recorded extension decision the window is
    /// not closed yet, so the ballot still reports `Voting`.
    pub fn state_at(&self, now: DateTime<Utc>) -> BallotState {
        if self.is_tallied {
            return BallotState::Tallied;
        }
        if now < self.vote_begin {
            return BallotState::Upcoming;
        }
        if now < self.vote_end {
            return BallotState::Voting;
        }
        match (self.extended, self.vote_extension_end) {
            (None, _) => BallotState::Voting,
            (Some(true), Some(extension_end)) if now < extension_end => {
                BallotState::ExtendedVoting
            }
            _ => BallotState::ConcludedPendingTally,
        }
    }

    /// Whether a vote submitted at `now` may still be accepted.
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.state_at(now),
            BallotState::Voting | BallotState::ExtendedVoting
        )
    }
}

/// Computes the pending transition for every ballot in the set.
///
/// At most one transition is reported per ballot per call: first the
/// extension decision when the voting window is reached, then, once the
/// window is truly closed, the tally. A tallied ballot always yields
/// [`Decision::NoChange`], which makes re-invocation on the same input
/// harmless. Nothing is persisted; see [`advance_and_persist`].
pub fn advance<S: BallotStore + ?Sized>(
    now: DateTime<Utc>,
    ballots: &[BallotSnapshot],
    store: &S,
) -> Vec<Decision> {
    ballots.iter().map(|snap| step(now, snap, store)).collect()
}

/// Drives the ballot set and writes each decision back through the store.
///
/// A [`Conflict`] from the store means another driver won the race for
/// that transition; the decision is downgraded to [`Decision::NoChange`]
/// so the caller does not act on it twice.
pub fn advance_and_persist<S: BallotStore>(
    now: DateTime<Utc>,
    ballots: &[BallotSnapshot],
    store: &mut S,
) -> Vec<Decision> {
    let mut decisions = Vec::with_capacity(ballots.len());
    for snap in ballots.iter() {
        let decision = step(now, snap, &*store);
        let decision = match decision {
            Decision::ExtensionDecided(extended) => {
                match store.persist_extension_decision(&snap.spec.id, extended) {
                    Ok(()) => Decision::ExtensionDecided(extended),
                    Err(Conflict) => {
                        info!(
                            "advance: ballot {:?}: extension decision raced, keeping the stored one",
                            snap.spec.id
                        );
                        Decision::NoChange
                    }
                }
            }
            Decision::Tallied(result) => match store.persist_tally(&snap.spec.id, &result) {
                Ok(()) => Decision::Tallied(result),
                Err(Conflict) => {
                    info!(
                        "advance: ballot {:?}: already tallied elsewhere",
                        snap.spec.id
                    );
                    Decision::NoChange
                }
            },
            Decision::NoChange => Decision::NoChange,
        };
        decisions.push(decision);
    }
    decisions
}

fn step<S: BallotStore + ?Sized>(
    now: DateTime<Utc>,
    snap: &BallotSnapshot,
    store: &S,
) -> Decision {
    let spec = &snap.spec;
    debug!(
        "step: ballot {:?} at {:?}: state {:?}",
        spec.id,
        now,
        spec.state_at(now)
    );
    if spec.is_tallied {
        // Tallying again is a no-op, not an error.
        return Decision::NoChange;
    }
    if now < spec.vote_end {
        return Decision::NoChange;
    }
    match spec.extended {
        None => {
            let extend = evaluate_quorum(spec, snap.votes_cast, snap.eligible_voters);
            info!(
                "step: ballot {:?}: voting window closed with {:?} votes, extend: {:?}",
                spec.id, snap.votes_cast, extend
            );
            Decision::ExtensionDecided(extend)
        }
        Some(true) => {
            let extension_end = match spec.vote_extension_end {
                Some(t) => t,
                None => unreachable!("extended ballots always have an extension window"),
            };
            if now < extension_end {
                Decision::NoChange
            } else {
                conclude(snap, store)
            }
        }
        Some(false) => conclude(snap, store),
    }
}

fn conclude<S: BallotStore + ?Sized>(snap: &BallotSnapshot, store: &S) -> Decision {
    let votes = store.fetch_all_votes(&snap.spec.id);
    info!(
        "conclude: ballot {:?}: tallying {:?} votes",
        snap.spec.id,
        votes.len()
    );
    Decision::Tallied(crate::tally(&snap.spec, &votes))
}
