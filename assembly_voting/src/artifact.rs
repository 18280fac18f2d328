use log::debug;
use sha2::{Digest, Sha256};

use crate::config::{BallotId, BallotSpec, Candidate, TallyResult, VoteString};

/// Everything a third party needs to recompute a ballot's result:
/// the ballot description and every canonical vote string cast.
///
/// The canonical text rendering is stable under reordering of the votes,
/// so the digest identifies the vote multiset, and [`recompute`] produces
/// a result equal to the one the lifecycle driver published.
///
/// [`recompute`]: ResultArtifact::recompute
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResultArtifact {
    pub ballot_id: BallotId,
    pub candidates: Vec<Candidate>,
    pub use_bar: bool,
    pub fixed_selection_count: Option<u32>,
    pub votes: Vec<VoteString>,
}

impl ResultArtifact {
    pub fn from_ballot(spec: &BallotSpec, votes: Vec<VoteString>) -> ResultArtifact {
        ResultArtifact {
            ballot_id: spec.id.clone(),
            candidates: spec.candidates.clone(),
            use_bar: spec.use_bar,
            fixed_selection_count: spec.fixed_selection_count,
            votes,
        }
    }

    /// A line-oriented rendering that is identical for equal vote
    /// multisets: the votes are sorted, everything else keeps ballot
    /// order.
    pub fn canonical_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("ballot {}\n", self.ballot_id));
        match self.fixed_selection_count {
            Some(k) => out.push_str(&format!("mode classical {}\n", k)),
            None => out.push_str("mode preferential\n"),
        }
        out.push_str(&format!(
            "rejection {}\n",
            if self.use_bar { "enabled" } else { "disabled" }
        ));
        for c in self.candidates.iter() {
            out.push_str(&format!("candidate {} {}\n", c.shortname, c.title));
        }
        let mut votes = self.votes.clone();
        votes.sort();
        for v in votes.iter() {
            out.push_str(&format!("vote {}\n", v));
        }
        out
    }

    /// Hex sha256 digest of the canonical text.
    pub fn digest(&self) -> String {
        let text = self.canonical_text();
        debug!(
            "digest: ballot {:?}: {:?} bytes of canonical text",
            self.ballot_id,
            text.len()
        );
        let hash = Sha256::digest(text.as_bytes());
        hash.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Re-runs the tally from the artifact alone.
    pub fn recompute(&self) -> TallyResult {
        crate::run_tally(
            &self.candidates,
            self.use_bar,
            self.fixed_selection_count,
            &self.votes,
        )
    }
}
