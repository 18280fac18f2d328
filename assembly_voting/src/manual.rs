/*!

This is the long-form manual for `assembly_voting` and the `asmtally`
verification tool.

## The canonical vote string

Every stored or exported vote uses one grammar:

```text
vote  := level ('>' level)*
level := shortname ('=' shortname)*
```

Levels are ordered best first; candidates within a level are tied. The
reserved shortname `BAR` is the rejection option. Encoding is canonical:
within a level, real candidates appear in lexicographic order and `BAR`
last, so two semantically equal votes are equal as strings.

```text
a>b=c>BAR      a first, b and c tied, everything below the bar rejected
a=b=c=BAR      the abstention: no preference at all
```

A valid vote ranks the ballot's complete option set, with no omissions and
no repeats. An empty submission is normalized to the abstention.

## Preferential and classical ballots

A ballot without `fixed_selection_count` is preferential: voters submit
arbitrary rankings with ties. The tally uses the Schulze method: for each
ordered pair the number of votes preferring one option over the other is
counted, the strongest beat paths are computed with a widest-path closure,
and options are ranked by comparing path strengths. Ties in the final
ranking are kept as tied levels, never broken arbitrarily. The rejection
option takes part like any candidate; only candidates ranked strictly
above it are accepted.

A ballot with `fixed_selection_count = k` is classical: voters select up
to `k` candidates with equal weight. Selections are mapped onto the same
vote representation:

```text
selection {a, b}    ->  a=b>rest=BAR
selection {}        ->  the abstention
selection {BAR}     ->  BAR>all candidates      (requires the bar)
```

Mixing `BAR` with candidates in a selection is rejected; the rejection is
exclusive. Classical results additionally report per-candidate selection
counts (top-level appearances, abstentions not included).

## Quorum and extension

A ballot may carry an absolute quorum (a vote count) or a relative quorum
(a percentage of eligible voters), never both, and a quorum always comes
with `vote_extension_end`. When the voting window first closes, the quorum
is evaluated exactly once against the cast-vote count:

```text
absolute n:  extend iff votes_cast < n
relative r:  extend iff votes_cast * 100 < r * eligible_voters
```

An extended ballot keeps accepting votes until `vote_extension_end`; a
ballot that met its quorum, or has none, concludes immediately. The
decision is recorded in `extended` and is final.

## The lifecycle

```text
Upcoming -> Voting -> (extension decided) -> ExtendedVoting ->
    ConcludedPendingTally -> Tallied
```

The engine computes transitions, it never schedules or persists them. A
driver calls `advance_and_persist` periodically (a single worker, once per
second is plenty) with the current time and one snapshot per ballot; each
snapshot carries the externally read vote count and electorate size so a
decision never mixes two reads. Per call and ballot at most one decision
is returned: `ExtensionDecided(bool)` when the window closes, later
`Tallied(result)`, otherwise `NoChange`.

Persistence goes through the `BallotStore` trait. The persist calls are
compare-and-set against the ballot's previous state: when two drivers
race, one of them receives `Conflict`, its decision is downgraded to
`NoChange`, and the transition still happens exactly once. Re-invoking the
driver with the same input is always harmless.

## The result artifact

Once tallied, a ballot's result is published together with an artifact
carrying the ballot id, the candidate list, the mode, the rejection
setting and every canonical vote string cast. The artifact has a stable
line-oriented canonical text whose sha256 digest identifies the vote
multiset regardless of submission order.

Anyone can recompute the tally from the artifact alone and must obtain a
byte-identical ranking. That is what `asmtally` does:

```text
asmtally --artifact gv-2024-07.json --reference gv-2024-07-result.json
```

It recomputes the result, prints it as JSON (`--out`), shows the digest
(`--digest`) and diffs against the reference result, failing on any
difference.

## What stays outside

Accounts, eligibility, mailing lists, vote storage and the per-voter
secrets that let a member find their own vote in the published artifact
are the surrounding system's concern. The engine consumes resolved
canonical vote strings and returns decisions; it performs no I/O of its
own.

*/
