use std::collections::BTreeSet;

use log::debug;

use crate::codec::Vote;
use crate::config::{BallotSpec, CandidateRef, VoteError, VoteString, REJECTION_TOKEN};

/// A vote as submitted, before canonicalization.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RawVote {
    /// A preferential ranking in the string grammar. `None` or an empty
    /// string is the abstention.
    Ranking(Option<String>),
    /// A classical selection of candidate shortnames. `None` is the
    /// abstain sentinel; the reserved rejection token selects rejection.
    Selection(Option<BTreeSet<String>>),
}

/// Checks a raw vote against a ballot and produces its canonical string.
///
/// Validation is all or nothing: either the full vote is translated or a
/// [`VoteError`] names what the voter has to correct.
pub fn validate_vote(spec: &BallotSpec, raw: &RawVote) -> Result<VoteString, VoteError> {
    let canonical = match raw {
        RawVote::Ranking(ranking) => validate_ranking(spec, ranking.as_deref())?,
        RawVote::Selection(selection) => validate_selection(spec, selection.as_ref())?,
    };
    debug!(
        "validate_vote: ballot {:?}: {:?} -> {:?}",
        spec.id, raw, canonical
    );
    Ok(canonical)
}

fn options(spec: &BallotSpec) -> BTreeSet<CandidateRef> {
    spec.candidates
        .iter()
        .map(|c| CandidateRef::Real(c.shortname.clone()))
        .chain(spec.use_bar.then_some(CandidateRef::Rejection))
        .collect()
}

fn validate_ranking(spec: &BallotSpec, raw: Option<&str>) -> Result<VoteString, VoteError> {
    let all = options(spec);
    let vote = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Vote::abstention(all.iter().cloned()),
        Some(s) => Vote::decode(s)?,
    };
    check_membership(&vote, &all)?;
    if let Some(k) = spec.fixed_selection_count {
        check_classical_shape(&vote, k)?;
    }
    Ok(vote.encode())
}

// A vote must rank the ballot's option set exactly: no unknown names, no
// rejection option on ballots without one, no omissions. Repeats are
// already rejected by the codec.
fn check_membership(vote: &Vote, all: &BTreeSet<CandidateRef>) -> Result<(), VoteError> {
    for c in vote.levels.iter().flatten() {
        if !all.contains(c) {
            let reason = match c {
                CandidateRef::Rejection => {
                    "the rejection option is not enabled for this ballot".to_string()
                }
                CandidateRef::Real(name) => format!("unknown candidate {:?}", name),
            };
            return Err(VoteError::MalformedVote { reason });
        }
    }
    if vote.ranked_count() != all.len() {
        // All members known and none repeated, so something is missing.
        let missing = all
            .iter()
            .find(|c| !vote.levels.iter().any(|level| level.contains(c)))
            .map(|c| c.as_str().to_string())
            .unwrap_or_default();
        return Err(VoteError::MalformedVote {
            reason: format!("vote does not rank {:?}", missing),
        });
    }
    Ok(())
}

// The ranking grammar used directly on a classical ballot may only encode
// what a selection could: one all-tied level (the abstention) or a
// preferred level over a rejected level.
fn check_classical_shape(vote: &Vote, k: u32) -> Result<(), VoteError> {
    if vote.is_abstention() {
        return Ok(());
    }
    if vote.levels.len() > 2 {
        return Err(VoteError::TooManyLevels {
            got: vote.levels.len(),
        });
    }
    let top = &vote.levels[0];
    let top_has_rejection = top.iter().any(|c| c.is_rejection());
    if top_has_rejection && top.len() > 1 {
        return Err(VoteError::MisplacedBar);
    }
    if !top_has_rejection && top.len() > k as usize {
        return Err(VoteError::TooManySelections {
            got: top.len(),
            max: k,
        });
    }
    Ok(())
}

fn validate_selection(
    spec: &BallotSpec,
    selection: Option<&BTreeSet<String>>,
) -> Result<VoteString, VoteError> {
    let k = match spec.fixed_selection_count {
        Some(k) => k,
        None => {
            return Err(VoteError::MalformedVote {
                reason: "this ballot expects a ranked vote, not a selection".to_string(),
            })
        }
    };
    let all = options(spec);
    let selection = match selection {
        None => return Ok(Vote::abstention(all.iter().cloned()).encode()),
        Some(s) => s,
    };

    let mut picked: BTreeSet<CandidateRef> = BTreeSet::new();
    for name in selection.iter() {
        let c = if name == REJECTION_TOKEN {
            CandidateRef::Rejection
        } else {
            CandidateRef::Real(name.clone())
        };
        if !all.contains(&c) {
            let reason = match c {
                CandidateRef::Rejection => {
                    "the rejection option is not enabled for this ballot".to_string()
                }
                CandidateRef::Real(name) => format!("unknown candidate {:?}", name),
            };
            return Err(VoteError::MalformedVote { reason });
        }
        picked.insert(c);
    }

    if picked.iter().any(|c| c.is_rejection()) {
        if picked.len() > 1 {
            return Err(VoteError::ConflictingSelection);
        }
        // Explicit rejection: the bar above everything else.
        let rest: BTreeSet<CandidateRef> =
            all.iter().filter(|c| !c.is_rejection()).cloned().collect();
        return Ok(Vote::new(vec![BTreeSet::from([CandidateRef::Rejection]), rest]).encode());
    }
    if picked.is_empty() {
        return Ok(Vote::abstention(all.iter().cloned()).encode());
    }
    if picked.len() > k as usize {
        return Err(VoteError::TooManySelections {
            got: picked.len(),
            max: k,
        });
    }
    let rejected: BTreeSet<CandidateRef> = all.difference(&picked).cloned().collect();
    let mut levels = vec![picked];
    if !rejected.is_empty() {
        levels.push(rejected);
    }
    Ok(Vote::new(levels).encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BallotBuilder;
    use chrono::{Duration, TimeZone, Utc};

    fn ballot(use_bar: bool, fixed: Option<u32>) -> BallotSpec {
        let begin = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut b = BallotBuilder::new("test")
            .candidate("A", "Candidate A")
            .candidate("B", "Candidate B")
            .candidate("C", "Candidate C")
            .use_bar(use_bar)
            .window(begin, begin + Duration::hours(1));
        if let Some(k) = fixed {
            b = b.fixed_selection_count(k);
        }
        b.build().unwrap()
    }

    fn selection(names: &[&str]) -> RawVote {
        RawVote::Selection(Some(names.iter().map(|n| n.to_string()).collect()))
    }

    fn ranking(s: &str) -> RawVote {
        RawVote::Ranking(Some(s.to_string()))
    }

    #[test]
    fn ranked_votes_are_canonicalized() {
        let spec = ballot(true, None);
        assert_eq!(
            validate_vote(&spec, &ranking("B=A>BAR=C")).unwrap(),
            "A=B>C=BAR"
        );
    }

    #[test]
    fn empty_rankings_become_the_abstention() {
        let spec = ballot(true, None);
        assert_eq!(
            validate_vote(&spec, &RawVote::Ranking(None)).unwrap(),
            "A=B=C=BAR"
        );
        assert_eq!(validate_vote(&spec, &ranking("  ")).unwrap(), "A=B=C=BAR");

        let spec = ballot(false, None);
        assert_eq!(
            validate_vote(&spec, &RawVote::Ranking(None)).unwrap(),
            "A=B=C"
        );
    }

    #[test]
    fn incomplete_or_unknown_rankings_are_malformed() {
        let spec = ballot(true, None);
        for raw in ["A>B", "A>B>C>D", "A>B>C>BAR>D"] {
            assert!(matches!(
                validate_vote(&spec, &ranking(raw)),
                Err(VoteError::MalformedVote { .. })
            ));
        }
    }

    #[test]
    fn the_rejection_option_needs_to_be_enabled() {
        let spec = ballot(false, None);
        let res = validate_vote(&spec, &ranking("A>B>C>BAR"));
        assert!(matches!(res, Err(VoteError::MalformedVote { .. })));
    }

    #[test]
    fn classical_selection_encoding() {
        let spec = ballot(true, Some(2));
        assert_eq!(
            validate_vote(&spec, &selection(&["A", "B"])).unwrap(),
            "A=B>C=BAR"
        );
        assert_eq!(validate_vote(&spec, &selection(&[])).unwrap(), "A=B=C=BAR");
        assert_eq!(
            validate_vote(&spec, &RawVote::Selection(None)).unwrap(),
            "A=B=C=BAR"
        );
        assert_eq!(
            validate_vote(&spec, &selection(&["BAR"])).unwrap(),
            "BAR>A=B=C"
        );
    }

    #[test]
    fn classical_selection_without_rejection_option() {
        let spec = ballot(false, Some(1));
        assert_eq!(validate_vote(&spec, &selection(&["B"])).unwrap(), "B>A=C");
        assert!(matches!(
            validate_vote(&spec, &selection(&["BAR"])),
            Err(VoteError::MalformedVote { .. })
        ));
    }

    #[test]
    fn rejection_is_exclusive() {
        let spec = ballot(true, Some(2));
        assert_eq!(
            validate_vote(&spec, &selection(&["BAR", "A"])),
            Err(VoteError::ConflictingSelection)
        );
    }

    #[test]
    fn selection_size_is_limited() {
        let spec = ballot(true, Some(2));
        assert_eq!(
            validate_vote(&spec, &selection(&["A", "B", "C"])),
            Err(VoteError::TooManySelections { got: 3, max: 2 })
        );
    }

    #[test]
    fn classical_grammar_votes_are_shape_checked() {
        let spec = ballot(true, Some(2));
        // At most two levels.
        assert_eq!(
            validate_vote(&spec, &ranking("A>B>C=BAR")),
            Err(VoteError::TooManyLevels { got: 3 })
        );
        // The bar cannot share the preferred level with a candidate.
        assert_eq!(
            validate_vote(&spec, &ranking("A=BAR>B=C")),
            Err(VoteError::MisplacedBar)
        );
        // The selection limit also applies through the grammar.
        assert_eq!(
            validate_vote(&spec, &ranking("A=B=C>BAR")),
            Err(VoteError::TooManySelections { got: 3, max: 2 })
        );
        // Well formed two-level votes pass.
        assert_eq!(
            validate_vote(&spec, &ranking("A=B>C=BAR")).unwrap(),
            "A=B>C=BAR"
        );
        assert_eq!(
            validate_vote(&spec, &ranking("BAR>A=B=C")).unwrap(),
            "BAR>A=B=C"
        );
    }

    #[test]
    fn selections_on_preferential_ballots_are_rejected() {
        let spec = ballot(true, None);
        assert!(matches!(
            validate_vote(&spec, &selection(&["A"])),
            Err(VoteError::MalformedVote { .. })
        ));
    }
}
