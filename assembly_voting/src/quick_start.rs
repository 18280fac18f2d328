/*!

# Quick start

This example walks through one ballot end to end: describing it, taking
votes in both input forms, and computing the binding result.

A ballot is described once with [`crate::BallotBuilder`]. The voting window
is mandatory; a quorum is optional and always comes with an extension
window, the extra voting time the ballot gets when participation is too
low.

```
use assembly_voting::{tally, validate_vote, BallotBuilder, RawVote};
use chrono::{Duration, TimeZone, Utc};

let begin = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
let ballot = BallotBuilder::new("logo-contest")
    .candidate("ada", "Design by Ada")
    .candidate("grace", "Design by Grace")
    .window(begin, begin + Duration::days(7))
    .build()?;

// A ranked vote arrives as a string: best first, '=' ties, '>' separates.
let v1 = validate_vote(&ballot, &RawVote::Ranking(Some("grace>ada>BAR".to_string())))?;
assert_eq!(v1, "grace>ada>BAR");

// An empty submission is the abstention: everything tied.
let v2 = validate_vote(&ballot, &RawVote::Ranking(None))?;
assert_eq!(v2, "ada=grace=BAR");

// The validator canonicalizes before storage, so equal votes compare
// equal as strings.
let v3 = validate_vote(&ballot, &RawVote::Ranking(Some("BAR=grace>ada".to_string())))?;
assert_eq!(v3, "grace=BAR>ada");

let result = tally(&ballot, &[v1, v2, v3]);
assert_eq!(result.ranking[0][0].as_str(), "grace");
assert_eq!(result.abstentions, 1);
# Ok::<(), Box<dyn std::error::Error>>(())
```

The `BAR` token is the rejection option: a synthetic candidate every voter
can rank like any other. Candidates that end up below it lose even without
an opponent. Ballots created with `.use_bar(false)` exclude it entirely.

**Classical ballots** restrict voters to picking up to `k` candidates with
equal weight. Pass `.fixed_selection_count(k)` to the builder and submit
selections instead of rankings:

```
use assembly_voting::{validate_vote, BallotBuilder, RawVote};
use chrono::{Duration, TimeZone, Utc};
use std::collections::BTreeSet;

let begin = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
let ballot = BallotBuilder::new("board-seats")
    .candidate("ada", "Ada")
    .candidate("grace", "Grace")
    .candidate("edsger", "Edsger")
    .fixed_selection_count(2)
    .window(begin, begin + Duration::days(7))
    .build()?;

let picks: BTreeSet<String> = ["ada", "grace"].iter().map(|s| s.to_string()).collect();
let vote = validate_vote(&ballot, &RawVote::Selection(Some(picks)))?;
assert_eq!(vote, "ada=grace>edsger=BAR");
# Ok::<(), Box<dyn std::error::Error>>(())
```

**Driving ballots over time.** The engine never acts on its own. A
scheduler calls [`crate::advance_and_persist`] periodically with the
current time and a snapshot per ballot; the returned
[`crate::Decision`]s say what changed, so the caller can notify voters.
See the [manual](crate::manual) for the lifecycle details and the exported
result artifact that makes every tally independently verifiable with the
`asmtally` command line tool.

*/
