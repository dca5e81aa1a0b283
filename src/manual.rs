/*!

This is the long-form manual for `tally_trends`.

## Input model

A run is an ordered sequence of cuts. Each cut is one snapshot of the
count: a timestamp (integer seconds since the epoch, UTC) plus one
cumulative total per entity. Counts are totals since the start of the
count, so they never decrease between cuts, and timestamps never go
backwards. The loader rejects any input that breaks these rules; there is
no best-effort mode.

## Schemas

Each election edition enumerates the column sets it accepts, one per feed
revision. The column set of the first record selects the schema for the
whole run. The bundled Costa Rica 2026 first-round edition accepts:

| schema | columns | denominator |
|--------|---------|-------------|
| `v1` | timestamp, ppso, pln, cac, pusc, fa, blank, null | fixed registry |
| `v2` | `v1` + nr | fixed registry |
| `v3` | `v2` + plp | fixed registry |
| `v4` | timestamp, parties, valid, null | valid votes |

In the `v4` revision the feed reports the `valid` aggregate (the sum of
party votes) directly; when present it is authoritative and is never
recomputed from the party columns.

## Denominator modes

* *fixed registry*: every percentage is a share of the edition's
  eligible-voter registry, for parties and invalid categories alike.
* *valid votes*: party percentages are shares of the cut's own `valid`
  total. Invalid categories and turnout stay on the fixed registry.

## Derived sequences

For every entity, three sequences parallel to the cuts:

* `percentage[i] = count[i] / denominator * 100`
* `growth[i] = percentage[i] - percentage[i-1]`, with `growth[0] = 0`
* `trend[i] = growth[i] - growth[i-1]`, with `trend[0] = trend[1] = 0`

The first values are pinned to zero by policy: with no history there is
nothing to difference against, and this is not treated as missing data.

A cut whose denominator is zero (for example a `valid` total of zero
before any votes were processed) produces NaN for the affected points.
NaN is the normal "undefined metric" state, not an error; it flows
through the differences and serializes to `null` in the JSON summary.

## Ranking and classification

At the latest cut, entities are ordered by raw count, descending. Equal
counts keep the edition's canonical entity order. Each row's trend value
is classified against the edition's deadband (0.01 percentage points by
default): above the band is rising, below is falling, inside is flat.

*/
