// ********* Input data structures ***********

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Name of the timestamp column, common to every schema.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Name of the authoritative valid-votes aggregate column, for the schemas
/// that carry it.
pub const VALID_COLUMN: &str = "valid";

/// One raw snapshot record, as handed over by whatever read the feed.
///
/// Values are kept as raw text on purpose: parsing happens in
/// [`load_run`](crate::load_run), so a malformed feed surfaces as a typed
/// error naming the offending cut and field instead of a half-loaded run.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RawCut {
    pub fields: BTreeMap<String, String>,
}

impl RawCut {
    /// Convenience constructor from (field, raw value) pairs.
    pub fn new(fields: &[(&str, &str)]) -> RawCut {
        RawCut {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

// ******** Validated snapshot structures *********

/// One validated snapshot of cumulative counts.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Cut {
    /// Seconds since the epoch, UTC.
    pub timestamp: i64,
    /// Aligned with the owning run's entity order.
    pub counts: Vec<u64>,
    /// Authoritative sum of party votes, for schemas that carry it.
    pub valid: Option<u64>,
}

/// The full time-ordered sequence of cuts for one election instance.
///
/// Immutable once built. Invariants are enforced at load time: every cut
/// carries the same column set, timestamps never decrease, and cumulative
/// counts never shrink.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Run {
    pub schema: SchemaDef,
    /// Entities present in the schema, in the edition's canonical order.
    pub entities: Vec<Entity>,
    pub cuts: Vec<Cut>,
}

// ******** Output data structures *********

/// Classification of a trend value against the deadband.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TrendTag {
    Rising,
    Falling,
    Flat,
}

/// The three derived sequences for one entity, parallel to the run's cuts.
///
/// An undefined point (zero denominator) is carried as NaN, not an error.
#[derive(PartialEq, Debug, Clone)]
pub struct DerivedSeries {
    pub code: String,
    pub percentage: Vec<f64>,
    pub growth: Vec<f64>,
    pub trend: Vec<f64>,
}

/// One row of the ranked view of the latest cut.
#[derive(PartialEq, Debug, Clone)]
pub struct RankedRow {
    pub code: String,
    pub name: String,
    pub count: u64,
    pub percentage: f64,
    pub trend: f64,
    pub tag: TrendTag,
}

/// Chart-ready series for one entity: the derived sequences plus the last
/// point, kept separate for end-of-line label placement.
#[derive(PartialEq, Debug, Clone)]
pub struct EntitySeries {
    pub code: String,
    pub name: String,
    pub color: String,
    pub percentage: Vec<f64>,
    pub growth: Vec<f64>,
    pub trend: Vec<f64>,
    pub last_count: u64,
    pub last_percentage: f64,
}

/// Total votes cast at the latest cut and the share of the registry they
/// represent.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct TurnoutSummary {
    pub total_votes: u64,
    pub turnout_pct: f64,
}

/// Everything the external renderer consumes: per-entity time series, the
/// ranked table, and the turnout scalar. Plain data, no formatting.
#[derive(PartialEq, Debug, Clone)]
pub struct Report {
    pub timestamps: Vec<i64>,
    pub series: Vec<EntitySeries>,
    pub table: Vec<RankedRow>,
    pub turnout: TurnoutSummary,
    /// Win threshold of the edition, passed through for the renderer's
    /// threshold line.
    pub threshold_pct: Option<f64>,
}

// ********* Errors **********

/// The input's column set cannot be mapped onto the edition at all.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    #[snafu(display("column set {columns:?} does not match any supported schema"))]
    UnknownColumns { columns: Vec<String> },
    #[snafu(display(
        "schema {schema} lists column {column:?} but the edition registers no such entity"
    ))]
    UnregisteredEntity { schema: String, column: String },
}

/// A record failed validation. Row indices are zero-based over the input
/// sequence.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DataError {
    #[snafu(display("cut {row}: field {field}: {value:?} is not a count"))]
    BadCount {
        row: usize,
        field: String,
        value: String,
    },
    #[snafu(display("cut {row}: field {field}: count {value} is negative"))]
    NegativeCount {
        row: usize,
        field: String,
        value: i64,
    },
    #[snafu(display("cut {row}: {value:?} is not an epoch timestamp"))]
    BadTimestamp { row: usize, value: String },
    #[snafu(display("cut {row}: timestamp decreases"))]
    DecreasingTimestamp { row: usize },
    #[snafu(display("cut {row}: field {field}: cumulative count decreases"))]
    ShrinkingCount { row: usize, field: String },
    #[snafu(display("cut {row}: column set differs from the first cut"))]
    SchemaDrift { row: usize },
    #[snafu(display("no cuts in the input"))]
    EmptyRun {},
}

/// Errors that prevent a run from being loaded.
#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(context(false), display("{source}"))]
    Schema { source: SchemaError },
    #[snafu(context(false), display("{source}"))]
    Data { source: DataError },
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "party")]
    Party,
    /// An invalid-ballot category: blank or null.
    #[serde(rename = "invalid")]
    Invalid,
}

/// A vote-receiving category of the edition.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub code: String,
    pub name: String,
    /// Display color for the renderer, as a CSS hex string.
    pub color: String,
    pub kind: EntityKind,
}

/// Which reference total divides the counts of a given schema.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum DenominatorMode {
    /// The edition's fixed registry size, for every entity.
    #[serde(rename = "fixedRegistry")]
    FixedRegistry,
    /// The cut's own `valid` total for party entities. Invalid categories
    /// and turnout stay on the fixed registry.
    #[serde(rename = "validVotes")]
    ValidVotes,
}

/// One supported column set, one per feed revision of the edition.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    pub columns: Vec<String>,
    pub denominator: DenominatorMode,
}

/// Everything that is fixed per election edition.
///
/// Passed into the engine explicitly so several editions can be processed
/// in the same process without sharing state.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EditionConfig {
    /// Total eligible-voter registry of the edition.
    pub registry: u64,
    /// Every entity the edition can report, in canonical display order.
    /// This order doubles as the tie-break for equal counts in the ranking.
    pub entities: Vec<Entity>,
    /// The enumerated column sets the loader accepts.
    pub schemas: Vec<SchemaDef>,
    /// Half-width of the flat band when classifying trend values.
    #[serde(rename = "trendDeadband")]
    pub deadband: f64,
    /// Win threshold in percentage points, if the edition has one.
    #[serde(rename = "thresholdPct")]
    pub threshold_pct: Option<f64>,
}

impl EditionConfig {
    /// Deadband applied when an edition does not tune its own. Wide enough
    /// to absorb the floating-point noise of cumulative differencing.
    pub const DEFAULT_DEADBAND: f64 = 0.01;
}

// ********* Editions **********

/// Ready-made edition configurations.
pub mod editions {
    use super::*;

    fn party(code: &str, color: &str) -> Entity {
        Entity {
            code: code.to_string(),
            name: code.to_uppercase(),
            color: color.to_string(),
            kind: EntityKind::Party,
        }
    }

    fn invalid(code: &str, color: &str) -> Entity {
        Entity {
            code: code.to_string(),
            name: code.to_uppercase(),
            color: color.to_string(),
            kind: EntityKind::Invalid,
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    /// Costa Rica 2026, first round: the registry, the registered parties
    /// and the four feed revisions observed during the count.
    pub fn first_round_2026() -> EditionConfig {
        EditionConfig {
            registry: 3_500_000,
            entities: vec![
                party("ppso", "#0f9eaf"),
                party("pln", "#014d27"),
                party("cac", "#e3051a"),
                party("pusc", "#13017c"),
                party("fa", "#efd800"),
                party("nr", "#2a6fd4"),
                party("plp", "#7a2d8f"),
                invalid("blank", "#c2c2c2"),
                invalid("null", "#000"),
            ],
            schemas: vec![
                SchemaDef {
                    name: "v1".to_string(),
                    columns: columns(&[
                        TIMESTAMP_COLUMN,
                        "ppso",
                        "pln",
                        "cac",
                        "pusc",
                        "fa",
                        "blank",
                        "null",
                    ]),
                    denominator: DenominatorMode::FixedRegistry,
                },
                SchemaDef {
                    name: "v2".to_string(),
                    columns: columns(&[
                        TIMESTAMP_COLUMN,
                        "ppso",
                        "pln",
                        "cac",
                        "pusc",
                        "fa",
                        "nr",
                        "blank",
                        "null",
                    ]),
                    denominator: DenominatorMode::FixedRegistry,
                },
                SchemaDef {
                    name: "v3".to_string(),
                    columns: columns(&[
                        TIMESTAMP_COLUMN,
                        "ppso",
                        "pln",
                        "cac",
                        "pusc",
                        "fa",
                        "nr",
                        "plp",
                        "blank",
                        "null",
                    ]),
                    denominator: DenominatorMode::FixedRegistry,
                },
                SchemaDef {
                    name: "v4".to_string(),
                    columns: columns(&[
                        TIMESTAMP_COLUMN,
                        "ppso",
                        "pln",
                        "cac",
                        "pusc",
                        "fa",
                        "nr",
                        "plp",
                        VALID_COLUMN,
                        "null",
                    ]),
                    denominator: DenominatorMode::ValidVotes,
                },
            ],
            deadband: EditionConfig::DEFAULT_DEADBAND,
            threshold_pct: Some(40.0),
        }
    }
}
