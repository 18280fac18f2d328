use log::{debug, info, warn};

use assembly_voting::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use diff::Result as DiffResult;

use crate::audit::artifact_reader::*;

#[derive(Debug, Snafu)]
pub enum AuditError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AuditResult<T> = Result<T, AuditError>;

pub mod artifact_reader {
    use crate::audit::*;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ArtifactCandidate {
        pub shortname: String,
        pub title: String,
    }

    /// The exported artifact as published by the assembly system.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ArtifactFile {
        #[serde(rename = "ballotId")]
        pub ballot_id: String,
        pub candidates: Vec<ArtifactCandidate>,
        #[serde(rename = "useBar")]
        pub use_bar: bool,
        #[serde(rename = "fixedSelectionCount", default)]
        pub fixed_selection_count: Option<u32>,
        pub votes: Vec<String>,
    }

    pub fn parse_artifact(contents: &str) -> AuditResult<ResultArtifact> {
        let file: ArtifactFile = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
        Ok(ResultArtifact {
            ballot_id: file.ballot_id,
            candidates: file
                .candidates
                .into_iter()
                .map(|c| Candidate {
                    shortname: c.shortname,
                    title: c.title,
                })
                .collect(),
            use_bar: file.use_bar,
            fixed_selection_count: file.fixed_selection_count,
            votes: file.votes,
        })
    }

    pub fn read_artifact(path: String) -> AuditResult<ResultArtifact> {
        let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
        parse_artifact(&contents)
    }

    pub fn read_reference(path: String) -> AuditResult<JSValue> {
        let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }
}

fn result_to_json(res: &TallyResult) -> JSValue {
    let ranking: Vec<JSValue> = res
        .ranking
        .iter()
        .map(|level| {
            json!(level
                .iter()
                .map(|c| c.as_str().to_string())
                .collect::<Vec<String>>())
        })
        .collect();

    // Group the pairwise counts by the preferred side; map keys come out
    // sorted in the JSON either way.
    let mut grouped: BTreeMap<&CandidateRef, JSMap<String, JSValue>> = BTreeMap::new();
    for ((over, under), count) in res.pairwise_preference.iter() {
        grouped
            .entry(over)
            .or_default()
            .insert(under.as_str().to_string(), json!(count));
    }
    let mut pairwise: JSMap<String, JSValue> = JSMap::new();
    for (over, counts) in grouped {
        pairwise.insert(over.as_str().to_string(), JSValue::Object(counts));
    }

    let mut votes: JSMap<String, JSValue> = JSMap::new();
    for (vote, count) in res.vote_multiset.iter() {
        votes.insert(vote.clone(), json!(count));
    }

    let mut root: JSMap<String, JSValue> = JSMap::new();
    root.insert("ranking".to_string(), json!(ranking));
    root.insert("abstentions".to_string(), json!(res.abstentions));
    if let Some(counts) = res.classical_counts.as_ref() {
        let mut m: JSMap<String, JSValue> = JSMap::new();
        for (c, count) in counts.iter() {
            m.insert(c.as_str().to_string(), json!(count));
        }
        root.insert("classicalCounts".to_string(), JSValue::Object(m));
    }
    root.insert("pairwisePreference".to_string(), JSValue::Object(pairwise));
    root.insert("votes".to_string(), JSValue::Object(votes));
    JSValue::Object(root)
}

fn build_audit_js(artifact: &ResultArtifact, result: &TallyResult) -> JSValue {
    json!({
        "ballotId": artifact.ballot_id,
        "digest": artifact.digest(),
        "result": result_to_json(result),
    })
}

pub fn run_audit(
    artifact_path: String,
    reference_path: Option<String>,
    out: Option<String>,
    show_digest: bool,
) -> AuditResult<()> {
    let artifact = read_artifact(artifact_path)?;
    info!(
        "audit: ballot {:?}: {:?} candidates, {:?} votes",
        artifact.ballot_id,
        artifact.candidates.len(),
        artifact.votes.len()
    );

    if show_digest {
        println!("digest:{}", artifact.digest());
    }

    let result = artifact.recompute();
    debug!("audit: recomputed result: {:?}", result);

    let audit_js = build_audit_js(&artifact, &result);
    let pretty_js = serde_json::to_string_pretty(&audit_js).context(ParsingJsonSnafu {})?;

    match out.as_deref() {
        None => {}
        Some("stdout") => println!("{}", pretty_js),
        Some(path) => fs::write(path, &pretty_js).context(WritingJsonSnafu {
            path: path.to_string(),
        })?,
    }

    // The reference result, if provided for comparison
    if let Some(reference_p) = reference_path {
        let reference = read_reference(reference_p)?;
        let pretty_js_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_js_reference != pretty_js {
            warn!("Found differences with the reference result");
            for line in diff::lines(pretty_js_reference.as_str(), pretty_js.as_ref()) {
                match line {
                    DiffResult::Left(l) => println!("-{}", l),
                    DiffResult::Right(r) => println!("+{}", r),
                    DiffResult::Both(b, _) => println!(" {}", b),
                }
            }
            whatever!("Difference detected between recomputed result and reference result")
        }
        info!("audit: reference result matches");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_ARTIFACT: &str = r#"{
        "ballotId": "gv-2024-07",
        "candidates": [
            {"shortname": "A", "title": "Candidate A"},
            {"shortname": "B", "title": "Candidate B"},
            {"shortname": "C", "title": "Candidate C"}
        ],
        "useBar": false,
        "fixedSelectionCount": null,
        "votes": [
            "A>B>C", "A>B>C", "A>B>C",
            "B>C>A", "B>C>A",
            "C>A>B", "C>A>B", "C>A>B", "C>A>B"
        ]
    }"#;

    #[test]
    fn parses_and_recomputes_an_artifact() {
        let artifact = parse_artifact(EXAMPLE_ARTIFACT).unwrap();
        assert_eq!(artifact.ballot_id, "gv-2024-07");
        let result = artifact.recompute();
        let ranking: Vec<Vec<&str>> = result
            .ranking
            .iter()
            .map(|level| level.iter().map(|c| c.as_str()).collect())
            .collect();
        assert_eq!(ranking, vec![vec!["C"], vec!["A"], vec!["B"]]);
    }

    #[test]
    fn digest_ignores_submission_order() {
        let artifact = parse_artifact(EXAMPLE_ARTIFACT).unwrap();
        let mut shuffled = artifact.clone();
        shuffled.votes.reverse();
        assert_eq!(artifact.digest(), shuffled.digest());
    }

    #[test]
    fn audit_json_is_reproducible() {
        let artifact = parse_artifact(EXAMPLE_ARTIFACT).unwrap();
        let a = serde_json::to_string_pretty(&build_audit_js(&artifact, &artifact.recompute()))
            .unwrap();
        let mut shuffled = artifact.clone();
        shuffled.votes.reverse();
        let b = serde_json::to_string_pretty(&build_audit_js(&shuffled, &shuffled.recompute()))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn result_json_carries_the_pairwise_counts() {
        let artifact = parse_artifact(EXAMPLE_ARTIFACT).unwrap();
        let js = result_to_json(&artifact.recompute());
        assert_eq!(js["pairwisePreference"]["A"]["B"], json!(7));
        assert_eq!(js["pairwisePreference"]["C"]["A"], json!(6));
        assert_eq!(js["abstentions"], json!(0));
        assert_eq!(js["votes"]["A>B>C"], json!(3));
        assert!(js.get("classicalCounts").is_none());
    }

    #[test]
    fn classical_artifacts_report_selection_counts() {
        let raw = r#"{
            "ballotId": "board-seats",
            "candidates": [
                {"shortname": "A", "title": "Candidate A"},
                {"shortname": "B", "title": "Candidate B"},
                {"shortname": "C", "title": "Candidate C"}
            ],
            "useBar": true,
            "fixedSelectionCount": 2,
            "votes": ["A=B>C=BAR", "A>B=C=BAR", "BAR>A=B=C", "A=B=C=BAR"]
        }"#;
        let artifact = parse_artifact(raw).unwrap();
        let js = result_to_json(&artifact.recompute());
        assert_eq!(js["classicalCounts"]["A"], json!(2));
        assert_eq!(js["classicalCounts"]["BAR"], json!(1));
        assert_eq!(js["abstentions"], json!(1));
    }

    #[test]
    fn malformed_artifacts_are_parse_errors() {
        let res = parse_artifact("{\"ballotId\": 42}");
        assert!(matches!(res, Err(AuditError::ParsingJson { .. })));
    }
}
