use chrono::{DateTime, Utc};

use crate::config::*;

/// A builder for describing a ballot.
///
/// The invariants of [`BallotSpec`] are checked once, in [`build`], so an
/// inconsistent description never leaves this boundary.
///
/// ```
/// pub use assembly_voting::BallotBuilder;
/// use chrono::{Duration, TimeZone, Utc};
/// # use assembly_voting::ConfigError;
///
/// let begin = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let ballot = BallotBuilder::new("board-election")
///     .candidate("alice", "Alice Anderson")
///     .candidate("bob", "Bob Brown")
///     .window(begin, begin + Duration::days(7))
///     .abs_quorum(10)
///     .extension(begin + Duration::days(14))
///     .build()?;
///
/// assert!(ballot.use_bar);
/// assert_eq!(ballot.extended, None);
/// # Ok::<(), ConfigError>(())
/// ```
///
/// [`build`]: BallotBuilder::build
pub struct BallotBuilder {
    id: BallotId,
    candidates: Vec<Candidate>,
    use_bar: bool,
    fixed_selection_count: Option<u32>,
    vote_begin: DateTime<Utc>,
    vote_end: DateTime<Utc>,
    vote_extension_end: Option<DateTime<Utc>>,
    abs_quorum: Option<u32>,
    rel_quorum: Option<u8>,
}

impl BallotBuilder {
    /// Starts a ballot description. The rejection option is enabled by
    /// default; a voting window must be set before building.
    pub fn new(id: &str) -> BallotBuilder {
        BallotBuilder {
            id: id.to_string(),
            candidates: Vec::new(),
            use_bar: true,
            fixed_selection_count: None,
            vote_begin: DateTime::<Utc>::MIN_UTC,
            vote_end: DateTime::<Utc>::MIN_UTC,
            vote_extension_end: None,
            abs_quorum: None,
            rel_quorum: None,
        }
    }

    pub fn candidate(mut self, shortname: &str, title: &str) -> BallotBuilder {
        self.candidates.push(Candidate {
            shortname: shortname.to_string(),
            title: title.to_string(),
        });
        self
    }

    pub fn use_bar(mut self, use_bar: bool) -> BallotBuilder {
        self.use_bar = use_bar;
        self
    }

    /// Switches the ballot to classical mode: voters select up to `count`
    /// candidates with equal weight instead of ranking freely.
    pub fn fixed_selection_count(mut self, count: u32) -> BallotBuilder {
        self.fixed_selection_count = Some(count);
        self
    }

    pub fn window(mut self, vote_begin: DateTime<Utc>, vote_end: DateTime<Utc>) -> BallotBuilder {
        self.vote_begin = vote_begin;
        self.vote_end = vote_end;
        self
    }

    pub fn extension(mut self, vote_extension_end: DateTime<Utc>) -> BallotBuilder {
        self.vote_extension_end = Some(vote_extension_end);
        self
    }

    /// Requires at least `count` votes for the ballot to conclude without
    /// extension.
    pub fn abs_quorum(mut self, count: u32) -> BallotBuilder {
        self.abs_quorum = Some(count);
        self
    }

    /// Requires at least `percent` percent of the eligible voters to cast
    /// a vote for the ballot to conclude without extension.
    pub fn rel_quorum(mut self, percent: u8) -> BallotBuilder {
        self.rel_quorum = Some(percent);
        self
    }

    pub fn build(self) -> Result<BallotSpec, ConfigError> {
        let spec = BallotSpec {
            id: self.id,
            candidates: self.candidates,
            use_bar: self.use_bar,
            fixed_selection_count: self.fixed_selection_count,
            vote_begin: self.vote_begin,
            vote_end: self.vote_end,
            vote_extension_end: self.vote_extension_end,
            abs_quorum: self.abs_quorum,
            rel_quorum: self.rel_quorum,
            extended: None,
            is_tallied: false,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn begin() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn base() -> BallotBuilder {
        BallotBuilder::new("b1")
            .candidate("a", "A")
            .candidate("b", "B")
            .window(begin(), begin() + Duration::hours(1))
    }

    #[test]
    fn builds_a_minimal_ballot() {
        let spec = base().build().unwrap();
        assert_eq!(spec.id, "b1");
        assert!(spec.use_bar);
        assert!(!spec.is_classical());
        assert!(!spec.is_tallied);
    }

    #[test]
    fn quorum_without_extension_is_rejected() {
        let res = base().abs_quorum(5).build();
        assert_eq!(res.unwrap_err(), ConfigError::QuorumExtensionMismatch);
    }

    #[test]
    fn extension_without_quorum_is_rejected() {
        let res = base().extension(begin() + Duration::hours(2)).build();
        assert_eq!(res.unwrap_err(), ConfigError::QuorumExtensionMismatch);
    }

    #[test]
    fn two_quorums_are_rejected() {
        let res = base()
            .abs_quorum(5)
            .rel_quorum(10)
            .extension(begin() + Duration::hours(2))
            .build();
        assert_eq!(res.unwrap_err(), ConfigError::ConflictingQuorums);
    }

    #[test]
    fn reserved_and_duplicate_shortnames_are_rejected() {
        let res = BallotBuilder::new("b1")
            .candidate("BAR", "Bar")
            .window(begin(), begin() + Duration::hours(1))
            .build();
        assert_eq!(
            res.unwrap_err(),
            ConfigError::ReservedShortname("BAR".to_string())
        );

        let res = base().candidate("a", "A again").build();
        assert_eq!(
            res.unwrap_err(),
            ConfigError::DuplicateShortname("a".to_string())
        );
    }

    #[test]
    fn grammar_characters_are_not_valid_shortnames() {
        for bad in ["", "a=b", "a>b", "a b"] {
            let res = BallotBuilder::new("b1")
                .candidate(bad, "Bad")
                .window(begin(), begin() + Duration::hours(1))
                .build();
            assert_eq!(res.unwrap_err(), ConfigError::BadShortname(bad.to_string()));
        }
    }

    #[test]
    fn windows_must_be_ordered() {
        let res = BallotBuilder::new("b1")
            .candidate("a", "A")
            .window(begin(), begin())
            .build();
        assert_eq!(res.unwrap_err(), ConfigError::EmptyVotingWindow);

        let res = base()
            .abs_quorum(5)
            .extension(begin() + Duration::hours(1))
            .build();
        assert_eq!(res.unwrap_err(), ConfigError::BadExtensionWindow);
    }

    #[test]
    fn reschedule_only_before_voting_starts() {
        let mut spec = base().build().unwrap();
        let before = begin() - Duration::hours(1);
        spec.reschedule(
            before,
            begin() + Duration::hours(1),
            begin() + Duration::hours(2),
            None,
        )
        .unwrap();
        assert_eq!(spec.vote_end, begin() + Duration::hours(2));

        let mut spec = base().build().unwrap();
        let res = spec.reschedule(
            begin(),
            begin() + Duration::hours(1),
            begin() + Duration::hours(2),
            None,
        );
        assert_eq!(res.unwrap_err(), ConfigError::VotingAlreadyStarted);
    }
}
