// ********* Core identifiers ***********

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The reserved shortname under which the rejection option travels in
/// canonical vote strings and exported artifacts.
pub const REJECTION_TOKEN: &str = "BAR";

pub type BallotId = String;

/// A vote in its canonical string form, e.g. `a>b=c>BAR`.
pub type VoteString = String;

/// An option a voter can rank: a declared candidate or the synthetic
/// rejection option.
///
/// Keeping the rejection option outside the candidate namespace makes a
/// collision with a real shortname impossible by construction; the string
/// form only appears at the encoding boundary.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum CandidateRef {
    Real(String),
    Rejection,
}

impl CandidateRef {
    pub fn as_str(&self) -> &str {
        match self {
            CandidateRef::Real(shortname) => shortname.as_str(),
            CandidateRef::Rejection => REJECTION_TOKEN,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, CandidateRef::Rejection)
    }
}

// Canonical order: real candidates lexicographically, the rejection option
// always last. Encoded tied levels rely on this order.
impl Ord for CandidateRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (CandidateRef::Real(a), CandidateRef::Real(b)) => a.cmp(b),
            (CandidateRef::Real(_), CandidateRef::Rejection) => std::cmp::Ordering::Less,
            (CandidateRef::Rejection, CandidateRef::Real(_)) => std::cmp::Ordering::Greater,
            (CandidateRef::Rejection, CandidateRef::Rejection) => std::cmp::Ordering::Equal,
        }
    }
}

impl PartialOrd for CandidateRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for CandidateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ********* Ballot description ***********

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub shortname: String,
    pub title: String,
}

/// The immutable description of one question put to the assembly.
///
/// Instances are produced by [`crate::BallotBuilder`], which enforces the
/// configuration invariants once. After that only `extended`, `is_tallied`
/// and, before voting starts, the timing fields may change, each through
/// its dedicated method.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotSpec {
    pub id: BallotId,
    pub candidates: Vec<Candidate>,
    /// Whether the rejection option participates in this ballot.
    pub use_bar: bool,
    /// Set for classical fixed-selection ballots: the maximum number of
    /// candidates a voter may select. Absent for preferential ballots.
    pub fixed_selection_count: Option<u32>,
    pub vote_begin: DateTime<Utc>,
    pub vote_end: DateTime<Utc>,
    /// End of the extension window. Present exactly when a quorum is set.
    pub vote_extension_end: Option<DateTime<Utc>>,
    /// Extend unless at least this many votes were cast.
    pub abs_quorum: Option<u32>,
    /// Extend unless this percentage of eligible voters cast a vote.
    pub rel_quorum: Option<u8>,
    /// The recorded extension decision. `None` until the voting window
    /// first closes.
    pub extended: Option<bool>,
    pub is_tallied: bool,
}

impl BallotSpec {
    /// Checks the configuration invariants. Called once at the builder
    /// boundary; lifecycle code may assume a validated spec.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        let mut seen: Vec<&str> = Vec::new();
        for c in self.candidates.iter() {
            let s = c.shortname.as_str();
            if s.is_empty() || s.contains(|c| c == '>' || c == '=') || s.contains(char::is_whitespace)
            {
                return Err(ConfigError::BadShortname(c.shortname.clone()));
            }
            if s == REJECTION_TOKEN {
                return Err(ConfigError::ReservedShortname(c.shortname.clone()));
            }
            if seen.contains(&s) {
                return Err(ConfigError::DuplicateShortname(c.shortname.clone()));
            }
            seen.push(s);
        }
        if self.vote_end <= self.vote_begin {
            return Err(ConfigError::EmptyVotingWindow);
        }
        if let Some(ext_end) = self.vote_extension_end {
            if ext_end <= self.vote_end {
                return Err(ConfigError::BadExtensionWindow);
            }
        }
        match (self.abs_quorum, self.rel_quorum) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingQuorums),
            (Some(0), None) => return Err(ConfigError::ZeroQuorum),
            (None, Some(r)) if !(1..=100).contains(&r) => {
                return Err(ConfigError::BadRelQuorum(r));
            }
            _ => {}
        }
        let has_quorum = self.abs_quorum.is_some() || self.rel_quorum.is_some();
        if has_quorum != self.vote_extension_end.is_some() {
            return Err(ConfigError::QuorumExtensionMismatch);
        }
        if self.fixed_selection_count == Some(0) {
            return Err(ConfigError::ZeroSelectionCount);
        }
        Ok(())
    }

    pub fn is_classical(&self) -> bool {
        self.fixed_selection_count.is_some()
    }

    /// Records the extension decision. The decision is final; recording it
    /// twice is a programming error in the driver.
    pub fn decide_extension(&mut self, extended: bool) {
        assert!(
            self.extended.is_none(),
            "extension already decided for ballot {:?}",
            self.id
        );
        self.extended = Some(extended);
    }

    /// Marks the ballot as tallied. Marking it twice is a programming
    /// error in the driver.
    pub fn mark_tallied(&mut self) {
        assert!(!self.is_tallied, "ballot {:?} already tallied", self.id);
        self.is_tallied = true;
    }

    /// Moves the voting window. Only allowed while the ballot is still
    /// upcoming; the new timing must satisfy the same invariants as at
    /// creation.
    pub fn reschedule(
        &mut self,
        now: DateTime<Utc>,
        vote_begin: DateTime<Utc>,
        vote_end: DateTime<Utc>,
        vote_extension_end: Option<DateTime<Utc>>,
    ) -> Result<(), ConfigError> {
        if now >= self.vote_begin {
            return Err(ConfigError::VotingAlreadyStarted);
        }
        let mut updated = self.clone();
        updated.vote_begin = vote_begin;
        updated.vote_end = vote_end;
        updated.vote_extension_end = vote_extension_end;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

// ********* Tally output ***********

/// The binding outcome of a ballot.
///
/// A pure function of the canonical vote multiset: two vote collections
/// with the same multiset produce equal results, whatever the submission
/// order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyResult {
    /// Ranking levels, best first. Candidates within a level are tied.
    pub ranking: Vec<Vec<CandidateRef>>,
    /// `(a, b) -> number of votes ranking a strictly above b`.
    pub pairwise_preference: BTreeMap<(CandidateRef, CandidateRef), u64>,
    /// Top-level selection counts, present for classical ballots only.
    pub classical_counts: Option<BTreeMap<CandidateRef, u64>>,
    /// Votes that tie every option in a single level.
    pub abstentions: u64,
    /// The canonical vote strings cast, with multiplicities.
    pub vote_multiset: BTreeMap<VoteString, u64>,
}

impl TallyResult {
    /// The candidates ranked strictly above the rejection option. When the
    /// ranking carries no rejection option, every candidate is accepted.
    pub fn accepted(&self) -> Vec<CandidateRef> {
        let mut out = Vec::new();
        for level in self.ranking.iter() {
            if level.iter().any(|c| c.is_rejection()) {
                return out;
            }
            out.extend(level.iter().cloned());
        }
        out
    }
}

// ********* Errors ***********

/// Rejection of a submitted vote. Always recoverable by the voter: the
/// message names the offending selection so a corrected vote can be
/// resubmitted.
#[derive(Eq, PartialEq, Debug, Clone, Error)]
pub enum VoteError {
    #[error("malformed vote: {reason}")]
    MalformedVote { reason: String },
    #[error("the rejection option cannot be combined with other selections")]
    ConflictingSelection,
    #[error("{got} candidates selected, at most {max} allowed")]
    TooManySelections { got: usize, max: u32 },
    #[error("{got} preference levels, a fixed-selection ballot allows at most 2")]
    TooManyLevels { got: usize },
    #[error("the rejection option must stand alone above the rejected candidates")]
    MisplacedBar,
}

/// Rejection of a ballot configuration. Caught at creation or
/// modification time; a validated ballot never fails to tally.
#[derive(Eq, PartialEq, Debug, Clone, Error)]
pub enum ConfigError {
    #[error("a ballot needs at least one candidate")]
    NoCandidates,
    #[error("shortname {0:?} is not a valid token")]
    BadShortname(String),
    #[error("shortname {0:?} collides with the rejection option")]
    ReservedShortname(String),
    #[error("shortname {0:?} appears more than once")]
    DuplicateShortname(String),
    #[error("vote_end must lie after vote_begin")]
    EmptyVotingWindow,
    #[error("vote_extension_end must lie after vote_end")]
    BadExtensionWindow,
    #[error("absolute and relative quorums are mutually exclusive")]
    ConflictingQuorums,
    #[error("a quorum of zero can never extend a ballot")]
    ZeroQuorum,
    #[error("relative quorum must be a percentage between 1 and 100, got {0}")]
    BadRelQuorum(u8),
    #[error("a quorum requires an extension window and an extension window requires a quorum")]
    QuorumExtensionMismatch,
    #[error("fixed_selection_count must be positive")]
    ZeroSelectionCount,
    #[error("the voting window can only change before voting starts")]
    VotingAlreadyStarted,
}

/// The optimistic-concurrency precondition of a persist call failed:
/// another driver already transitioned the ballot. Callers re-fetch the
/// ballot instead of retrying blindly.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Error)]
#[error("ballot was transitioned concurrently")]
pub struct Conflict;
