use log::debug;

use crate::config::BallotSpec;

/// Decides whether a ballot's voting window must extend, from the vote
/// count at `vote_end`.
///
/// The comparison is exact integer arithmetic: a relative quorum of `r`
/// percent extends iff `votes_cast * 100 < r * eligible_voters`. Without a
/// configured quorum a ballot never extends.
///
/// The decision is made at most once per ballot. Calling this after
/// `extended` has been recorded is a programming error, not a recoverable
/// condition.
pub fn evaluate_quorum(spec: &BallotSpec, votes_cast: u64, eligible_voters: u64) -> bool {
    assert!(
        spec.extended.is_none(),
        "extension already decided for ballot {:?}",
        spec.id
    );
    let extend = match (spec.abs_quorum, spec.rel_quorum) {
        (None, None) => false,
        (Some(abs), None) => votes_cast < u64::from(abs),
        (None, Some(rel)) => {
            assert!(
                eligible_voters > 0,
                "relative quorum needs the electorate size for ballot {:?}",
                spec.id
            );
            votes_cast * 100 < u64::from(rel) * eligible_voters
        }
        (Some(_), Some(_)) => unreachable!("validated ballots never carry two quorums"),
    };
    debug!(
        "evaluate_quorum: ballot {:?}: votes_cast {:?}, extend {:?}",
        spec.id, votes_cast, extend
    );
    extend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BallotBuilder;
    use chrono::{Duration, TimeZone, Utc};

    fn quorum_ballot(abs: Option<u32>, rel: Option<u8>) -> BallotSpec {
        let begin = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut b = BallotBuilder::new("q")
            .candidate("a", "A")
            .window(begin, begin + Duration::hours(1));
        if abs.is_some() || rel.is_some() {
            b = b.extension(begin + Duration::hours(2));
        }
        if let Some(n) = abs {
            b = b.abs_quorum(n);
        }
        if let Some(p) = rel {
            b = b.rel_quorum(p);
        }
        b.build().unwrap()
    }

    #[test]
    fn absolute_quorum_boundary() {
        let spec = quorum_ballot(Some(10), None);
        assert!(evaluate_quorum(&spec, 9, 100));
        assert!(!evaluate_quorum(&spec, 10, 100));
        assert!(!evaluate_quorum(&spec, 11, 100));
    }

    #[test]
    fn relative_quorum_uses_integer_arithmetic() {
        // 33 percent of 7 voters: 3 * 100 = 300 >= 33 * 7 = 231.
        let spec = quorum_ballot(None, Some(33));
        assert!(evaluate_quorum(&spec, 2, 7));
        assert!(!evaluate_quorum(&spec, 3, 7));
    }

    #[test]
    fn relative_quorum_boundary_is_exact() {
        // 50 percent of 10: exactly 5 votes meet the quorum.
        let spec = quorum_ballot(None, Some(50));
        assert!(evaluate_quorum(&spec, 4, 10));
        assert!(!evaluate_quorum(&spec, 5, 10));
    }

    #[test]
    fn no_quorum_never_extends() {
        let spec = quorum_ballot(None, None);
        assert!(!evaluate_quorum(&spec, 0, 1));
    }

    #[test]
    #[should_panic(expected = "already decided")]
    fn re_evaluation_is_a_programming_error() {
        let mut spec = quorum_ballot(Some(10), None);
        spec.decide_extension(true);
        evaluate_quorum(&spec, 9, 100);
    }
}
