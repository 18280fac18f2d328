use std::collections::BTreeSet;

use crate::config::{CandidateRef, VoteError, VoteString, REJECTION_TOKEN};

/// A decoded vote: preference levels ordered best first, candidates within
/// a level tied.
///
/// The string grammar is `vote := level ('>' level)* ; level := shortname
/// ('=' shortname)*`. Encoding is canonical: within a level, real
/// candidates come in lexicographic order and the rejection option last,
/// so semantically equal votes compare equal as strings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vote {
    pub levels: Vec<BTreeSet<CandidateRef>>,
}

impl Vote {
    pub fn new(levels: Vec<BTreeSet<CandidateRef>>) -> Vote {
        Vote { levels }
    }

    /// The canonical abstention over the given options: a single level
    /// tying everything.
    pub fn abstention<I: IntoIterator<Item = CandidateRef>>(options: I) -> Vote {
        Vote {
            levels: vec![options.into_iter().collect()],
        }
    }

    /// Whether this vote expresses no preference. Canonical votes rank the
    /// full option set, so a single level means everything is tied.
    pub fn is_abstention(&self) -> bool {
        self.levels.len() == 1
    }

    /// The number of options ranked across all levels.
    pub fn ranked_count(&self) -> usize {
        self.levels.iter().map(|level| level.len()).sum()
    }

    pub fn encode(&self) -> VoteString {
        self.levels
            .iter()
            .map(|level| {
                level
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<&str>>()
                    .join("=")
            })
            .collect::<Vec<String>>()
            .join(">")
    }

    /// Parses a vote string. This checks the grammar and that no shortname
    /// repeats; whether the shortnames fit a particular ballot is the
    /// validator's concern.
    pub fn decode(raw: &str) -> Result<Vote, VoteError> {
        if raw.is_empty() {
            return Err(VoteError::MalformedVote {
                reason: "empty vote string".to_string(),
            });
        }
        let mut seen: BTreeSet<CandidateRef> = BTreeSet::new();
        let mut levels: Vec<BTreeSet<CandidateRef>> = Vec::new();
        for raw_level in raw.split('>') {
            let mut level: BTreeSet<CandidateRef> = BTreeSet::new();
            for token in raw_level.split('=') {
                if token.is_empty() {
                    return Err(VoteError::MalformedVote {
                        reason: "empty shortname".to_string(),
                    });
                }
                let c = if token == REJECTION_TOKEN {
                    CandidateRef::Rejection
                } else {
                    CandidateRef::Real(token.to_string())
                };
                if !seen.insert(c.clone()) {
                    return Err(VoteError::MalformedVote {
                        reason: format!("{:?} appears more than once", token),
                    });
                }
                level.insert(c);
            }
            levels.push(level);
        }
        Ok(Vote { levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(s: &str) -> CandidateRef {
        CandidateRef::Real(s.to_string())
    }

    #[test]
    fn round_trip() {
        for raw in ["a", "a>b", "a=b>c", "a>b=c>BAR", "alpha=beta"] {
            let vote = Vote::decode(raw).unwrap();
            assert_eq!(vote.encode(), raw);
            assert_eq!(Vote::decode(&vote.encode()).unwrap(), vote);
        }
    }

    #[test]
    fn encoding_is_canonical() {
        // Unordered input levels come out sorted, rejection last.
        assert_eq!(Vote::decode("b=a>c").unwrap().encode(), "a=b>c");
        assert_eq!(Vote::decode("BAR=a>c").unwrap().encode(), "a=BAR>c");
        let vote = Vote::new(vec![BTreeSet::from([
            CandidateRef::Rejection,
            real("z"),
            real("a"),
        ])]);
        assert_eq!(vote.encode(), "a=z=BAR");
    }

    #[test]
    fn rejection_token_decodes_to_the_sum_variant() {
        let vote = Vote::decode("a>BAR").unwrap();
        assert!(vote.levels[1].contains(&CandidateRef::Rejection));
        assert!(!vote.levels[1].contains(&real("BAR")));
    }

    #[test]
    fn abstention_is_a_single_full_tie() {
        let vote = Vote::abstention([real("a"), real("b"), CandidateRef::Rejection]);
        assert!(vote.is_abstention());
        assert_eq!(vote.encode(), "a=b=BAR");
    }

    #[test]
    fn malformed_strings_are_rejected() {
        for raw in ["", ">", "a>", "a>>b", "a=>b", "=a", "a=a", "a>b>a", "BAR>BAR"] {
            let res = Vote::decode(raw);
            assert!(
                matches!(res, Err(VoteError::MalformedVote { .. })),
                "{:?} -> {:?}",
                raw,
                res
            );
        }
    }

    #[test]
    fn ranked_count_spans_levels() {
        assert_eq!(Vote::decode("a=b>c>BAR").unwrap().ranked_count(), 4);
    }
}
