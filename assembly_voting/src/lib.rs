mod artifact;
mod builder;
mod codec;
mod config;
mod lifecycle;
pub mod manual;
pub mod quick_start;
mod quorum;
mod validate;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap};

pub use crate::artifact::ResultArtifact;
pub use crate::builder::BallotBuilder;
pub use crate::codec::Vote;
pub use crate::config::*;
pub use crate::lifecycle::{
    advance, advance_and_persist, BallotSnapshot, BallotState, BallotStore, Decision,
};
pub use crate::quorum::evaluate_quorum;
pub use crate::validate::{validate_vote, RawVote};

// **** Private structures ****

// An option's position in the tally roster. The roster is the candidate
// list in ballot order, followed by the rejection option when enabled.
type OptionId = usize;

struct Roster {
    options: Vec<CandidateRef>,
    index: HashMap<CandidateRef, OptionId>,
}

impl Roster {
    fn new(candidates: &[Candidate], use_bar: bool) -> Roster {
        let options: Vec<CandidateRef> = candidates
            .iter()
            .map(|c| CandidateRef::Real(c.shortname.clone()))
            .chain(use_bar.then_some(CandidateRef::Rejection))
            .collect();
        let index = options
            .iter()
            .enumerate()
            .map(|(id, c)| (c.clone(), id))
            .collect();
        Roster { options, index }
    }

    fn len(&self) -> usize {
        self.options.len()
    }
}

/// Computes the binding result of a ballot from the canonical votes cast.
///
/// The votes must be canonical strings produced by [`validate_vote`] for
/// this ballot; a stored vote that no longer decodes or fits the ballot is
/// corrupted state and aborts the tally. Given valid input the computation
/// cannot fail and depends only on the vote multiset, not on the order of
/// the slice.
pub fn tally(spec: &BallotSpec, votes: &[VoteString]) -> TallyResult {
    run_tally(&spec.candidates, spec.use_bar, spec.fixed_selection_count, votes)
}

pub(crate) fn run_tally(
    candidates: &[Candidate],
    use_bar: bool,
    fixed_selection_count: Option<u32>,
    votes: &[VoteString],
) -> TallyResult {
    info!(
        "run_tally: processing {:?} votes over {:?} candidates, rejection option: {:?}",
        votes.len(),
        candidates.len(),
        use_bar
    );
    let roster = Roster::new(candidates, use_bar);
    let n = roster.len();

    let mut vote_multiset: BTreeMap<VoteString, u64> = BTreeMap::new();
    let mut abstentions: u64 = 0;
    // d[a][b]: number of votes ranking a strictly above b.
    let mut d = vec![vec![0u64; n]; n];
    // Appearances in the most-preferred level, for the classical count.
    let mut top_counts = vec![0u64; n];

    for raw in votes.iter() {
        let vote = match Vote::decode(raw) {
            Ok(v) => v,
            Err(e) => panic!("stored vote {:?} is not canonical: {}", raw, e),
        };
        assert!(
            vote.ranked_count() == n
                && vote
                    .levels
                    .iter()
                    .flatten()
                    .all(|c| roster.index.contains_key(c)),
            "stored vote {:?} does not rank the options of this ballot",
            raw
        );

        *vote_multiset.entry(vote.encode()).or_insert(0) += 1;

        if vote.is_abstention() {
            // A full tie prefers nothing over nothing and selects nothing.
            abstentions += 1;
            continue;
        }

        let mut level_of = vec![0usize; n];
        for (depth, level) in vote.levels.iter().enumerate() {
            for c in level.iter() {
                level_of[roster.index[c]] = depth;
            }
        }
        for a in 0..n {
            for b in 0..n {
                if a != b && level_of[a] < level_of[b] {
                    d[a][b] += 1;
                }
            }
        }
        for c in vote.levels[0].iter() {
            top_counts[roster.index[c]] += 1;
        }
    }
    debug!("run_tally: pairwise matrix: {:?}", d);

    let p = widest_paths(&d);
    debug!("run_tally: strongest paths: {:?}", p);
    let ranking = extract_ranking(&p, &roster.options);
    info!("run_tally: ranking: {:?}", ranking);

    let mut pairwise_preference: BTreeMap<(CandidateRef, CandidateRef), u64> = BTreeMap::new();
    for a in 0..n {
        for b in 0..n {
            if a != b {
                pairwise_preference
                    .insert((roster.options[a].clone(), roster.options[b].clone()), d[a][b]);
            }
        }
    }

    let classical_counts = fixed_selection_count.map(|_| {
        roster
            .options
            .iter()
            .cloned()
            .zip(top_counts.iter().cloned())
            .collect::<BTreeMap<CandidateRef, u64>>()
    });

    TallyResult {
        ranking,
        pairwise_preference,
        classical_counts,
        abstentions,
        vote_multiset,
    }
}

// Widest-path closure over the pairwise matrix: p[a][b] starts from the
// winning direct margins and grows through intermediate options by
// max-of-min.
fn widest_paths(d: &[Vec<u64>]) -> Vec<Vec<u64>> {
    let n = d.len();
    let mut p = vec![vec![0u64; n]; n];
    for a in 0..n {
        for b in 0..n {
            if a != b && d[a][b] > d[b][a] {
                p[a][b] = d[a][b];
            }
        }
    }
    for k in 0..n {
        for a in 0..n {
            if a == k {
                continue;
            }
            for b in 0..n {
                if b != k && b != a {
                    p[a][b] = p[a][b].max(p[a][k].min(p[k][b]));
                }
            }
        }
    }
    p
}

// Ranking extraction: repeatedly peel off the options not beaten by any
// remaining option. Mutually unbeaten options form one tied level.
fn extract_ranking(p: &[Vec<u64>], options: &[CandidateRef]) -> Vec<Vec<CandidateRef>> {
    let mut remaining: Vec<OptionId> = (0..options.len()).collect();
    let mut ranking: Vec<Vec<CandidateRef>> = Vec::new();
    while !remaining.is_empty() {
        let level: Vec<OptionId> = remaining
            .iter()
            .copied()
            .filter(|&a| remaining.iter().all(|&b| b == a || p[a][b] >= p[b][a]))
            .collect();
        // The strongest-path relation is transitive, so an unbeaten option
        // always exists among the remainder.
        assert!(
            !level.is_empty(),
            "no unbeaten option among {:?}",
            remaining
        );
        let mut names: Vec<CandidateRef> = level.iter().map(|&id| options[id].clone()).collect();
        names.sort();
        ranking.push(names);
        remaining.retain(|id| !level.contains(id));
    }
    ranking
}
