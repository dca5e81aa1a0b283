//! Statistics and ranking engine for timestamped cumulative vote-count
//! snapshots. See the [`manual`] module for the accepted schemas and the
//! derivation rules.

mod config;

pub mod builder;
pub mod manual;
pub mod summary;

use log::{debug, info};

use std::collections::BTreeSet;

use snafu::{ensure, OptionExt};

pub use crate::config::*;

/// Validates an ordered sequence of raw snapshot records into a [`Run`].
///
/// The column set of the first record selects the schema among the
/// edition's supported ones; every further record must keep that exact
/// column set. Counts must be non-negative integers that never decrease
/// from one cut to the next, and timestamps must be non-decreasing.
/// The first offending row aborts the load; there is no partial
/// acceptance.
pub fn load_run(records: &[RawCut], config: &EditionConfig) -> Result<Run, LoadError> {
    info!("load_run: processing {:?} records", records.len());
    let first = records.first().context(EmptyRunSnafu)?;
    let schema = match_schema(first, config)?;
    info!("load_run: matched schema {:?}", schema.name);
    let entities = run_entities(&schema, config)?;
    let cuts = check_records(records, &schema, &entities)?;
    Ok(Run {
        schema,
        entities,
        cuts,
    })
}

// The schema is selected by set equality on the column names.
fn match_schema(record: &RawCut, config: &EditionConfig) -> Result<SchemaDef, SchemaError> {
    let columns: BTreeSet<&str> = record.fields.keys().map(|s| s.as_str()).collect();
    for schema in config.schemas.iter() {
        let schema_columns: BTreeSet<&str> = schema.columns.iter().map(|s| s.as_str()).collect();
        if schema_columns == columns {
            return Ok(schema.clone());
        }
    }
    UnknownColumnsSnafu {
        columns: record.fields.keys().cloned().collect::<Vec<String>>(),
    }
    .fail()
}

// Entities carried by the schema, in the canonical order of the edition.
fn run_entities(schema: &SchemaDef, config: &EditionConfig) -> Result<Vec<Entity>, SchemaError> {
    for column in schema.columns.iter() {
        if column == TIMESTAMP_COLUMN || column == VALID_COLUMN {
            continue;
        }
        ensure!(
            config.entities.iter().any(|e| e.code == *column),
            UnregisteredEntitySnafu {
                schema: schema.name.clone(),
                column: column.clone(),
            }
        );
    }
    Ok(config
        .entities
        .iter()
        .filter(|e| schema.columns.contains(&e.code))
        .cloned()
        .collect())
}

fn check_records(
    records: &[RawCut],
    schema: &SchemaDef,
    entities: &[Entity],
) -> Result<Vec<Cut>, DataError> {
    let schema_columns: BTreeSet<&str> = schema.columns.iter().map(|s| s.as_str()).collect();
    let has_valid = schema_columns.contains(VALID_COLUMN);

    let mut cuts: Vec<Cut> = Vec::new();
    for (row, record) in records.iter().enumerate() {
        let columns: BTreeSet<&str> = record.fields.keys().map(|s| s.as_str()).collect();
        ensure!(columns == schema_columns, SchemaDriftSnafu { row });

        let raw_ts = &record.fields[TIMESTAMP_COLUMN];
        let timestamp = raw_ts.parse::<i64>().ok().context(BadTimestampSnafu {
            row,
            value: raw_ts.clone(),
        })?;

        let mut counts: Vec<u64> = Vec::with_capacity(entities.len());
        for entity in entities.iter() {
            counts.push(read_count(record, row, &entity.code)?);
        }
        let valid = if has_valid {
            Some(read_count(record, row, VALID_COLUMN)?)
        } else {
            None
        };

        if let Some(prev) = cuts.last() {
            ensure!(timestamp >= prev.timestamp, DecreasingTimestampSnafu { row });
            for (idx, entity) in entities.iter().enumerate() {
                ensure!(
                    counts[idx] >= prev.counts[idx],
                    ShrinkingCountSnafu {
                        row,
                        field: entity.code.clone(),
                    }
                );
            }
            if let (Some(v), Some(prev_v)) = (valid, prev.valid) {
                ensure!(
                    v >= prev_v,
                    ShrinkingCountSnafu {
                        row,
                        field: VALID_COLUMN,
                    }
                );
            }
        }
        debug!(
            "check_records: row {:?} timestamp {:?} counts {:?} valid {:?}",
            row, timestamp, counts, valid
        );
        cuts.push(Cut {
            timestamp,
            counts,
            valid,
        });
    }
    Ok(cuts)
}

fn read_count(record: &RawCut, row: usize, field: &str) -> Result<u64, DataError> {
    let raw = &record.fields[field];
    let value = raw.parse::<i64>().ok().context(BadCountSnafu {
        row,
        field,
        value: raw.clone(),
    })?;
    ensure!(value >= 0, NegativeCountSnafu { row, field, value });
    Ok(value as u64)
}

/// Derives the percentage, growth and trend sequences for every entity of
/// the run, in the run's entity order.
///
/// A zero denominator yields NaN for that point rather than an error, and
/// the NaN flows through the differences. Growth is pinned to 0 at the
/// first cut and trend at the first two cuts: there is no history to
/// difference against, and the missing point is policy, not missing data.
pub fn derive_series(run: &Run, config: &EditionConfig) -> Vec<DerivedSeries> {
    run.entities
        .iter()
        .enumerate()
        .map(|(idx, entity)| {
            let percentage: Vec<f64> = run
                .cuts
                .iter()
                .map(|cut| pct(cut.counts[idx], denominator(entity, cut, run, config)))
                .collect();
            let growth = first_difference(&percentage);
            let trend = second_difference(&growth);
            debug!(
                "derive_series: {}: percentage {:?}",
                entity.code, percentage
            );
            DerivedSeries {
                code: entity.code.clone(),
                percentage,
                growth,
                trend,
            }
        })
        .collect()
}

fn denominator(entity: &Entity, cut: &Cut, run: &Run, config: &EditionConfig) -> u64 {
    match (run.schema.denominator, entity.kind) {
        // A missing aggregate degrades to the NaN path.
        (DenominatorMode::ValidVotes, EntityKind::Party) => cut.valid.unwrap_or(0),
        _ => config.registry,
    }
}

fn pct(count: u64, denom: u64) -> f64 {
    if denom == 0 {
        f64::NAN
    } else {
        count as f64 / denom as f64 * 100.0
    }
}

// First discrete difference, pinned to 0 at the first cut.
fn first_difference(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| if i == 0 { 0.0 } else { v - values[i - 1] })
        .collect()
}

// Second discrete difference, pinned to 0 while there is no history.
fn second_difference(growth: &[f64]) -> Vec<f64> {
    growth
        .iter()
        .enumerate()
        .map(|(i, g)| if i < 2 { 0.0 } else { g - growth[i - 1] })
        .collect()
}

/// Total votes cast at the latest cut and turnout against the fixed
/// registry.
///
/// When the schema carries the authoritative `valid` aggregate, the total
/// is `valid` plus the invalid-category counts; otherwise it is the sum of
/// every entity count. Turnout is registry-based in both denominator
/// modes.
pub fn turnout(run: &Run, config: &EditionConfig) -> TurnoutSummary {
    let total_votes = match run.cuts.last() {
        None => 0,
        Some(cut) => match cut.valid {
            Some(valid) => {
                let invalid: u64 = run
                    .entities
                    .iter()
                    .zip(cut.counts.iter())
                    .filter(|(e, _)| e.kind == EntityKind::Invalid)
                    .map(|(_, c)| *c)
                    .sum();
                valid + invalid
            }
            None => cut.counts.iter().sum(),
        },
    };
    TurnoutSummary {
        total_votes,
        turnout_pct: pct(total_votes, config.registry),
    }
}

/// Classifies a trend value against the deadband.
///
/// NaN lands in the flat band: both comparisons are false.
pub fn classify_trend(trend: f64, deadband: f64) -> TrendTag {
    if trend > deadband {
        TrendTag::Rising
    } else if trend < -deadband {
        TrendTag::Falling
    } else {
        TrendTag::Flat
    }
}

/// Ranked and classified view of the latest cut.
///
/// Rows are sorted by raw count, descending. The sort is stable over rows
/// built in the edition's canonical entity order, so equal counts keep
/// that order. A run with zero cuts yields an empty list.
pub fn rank_latest(run: &Run, series: &[DerivedSeries], config: &EditionConfig) -> Vec<RankedRow> {
    let last = match run.cuts.len().checked_sub(1) {
        None => return Vec::new(),
        Some(idx) => idx,
    };
    let mut rows: Vec<RankedRow> = run
        .entities
        .iter()
        .enumerate()
        .map(|(idx, entity)| {
            let s = &series[idx];
            RankedRow {
                code: entity.code.clone(),
                name: entity.name.clone(),
                count: run.cuts[last].counts[idx],
                percentage: s.percentage[last],
                trend: s.trend[last],
                tag: classify_trend(s.trend[last], config.deadband),
            }
        })
        .collect();
    rows.sort_by_key(|r| std::cmp::Reverse(r.count));
    rows
}

/// Runs the full derivation pipeline over a validated run.
///
/// Pure assembly on top of [`derive_series`], [`rank_latest`] and
/// [`turnout`]: no I/O, no new failure modes, and the same input always
/// produces the same report.
pub fn build_report(run: &Run, config: &EditionConfig) -> Report {
    info!(
        "build_report: {:?} cuts, {:?} entities, schema {:?}",
        run.cuts.len(),
        run.entities.len(),
        run.schema.name
    );
    let series = derive_series(run, config);
    let table = rank_latest(run, &series, config);
    let turnout_summary = turnout(run, config);
    let last = run.cuts.len().checked_sub(1);

    let entity_series: Vec<EntitySeries> = run
        .entities
        .iter()
        .enumerate()
        .zip(series.into_iter())
        .map(|((idx, entity), s)| EntitySeries {
            code: entity.code.clone(),
            name: entity.name.clone(),
            color: entity.color.clone(),
            last_count: last.map(|l| run.cuts[l].counts[idx]).unwrap_or(0),
            last_percentage: last.map(|l| s.percentage[l]).unwrap_or(f64::NAN),
            percentage: s.percentage,
            growth: s.growth,
            trend: s.trend,
        })
        .collect();

    Report {
        timestamps: run.cuts.iter().map(|c| c.timestamp).collect(),
        series: entity_series,
        table,
        turnout: turnout_summary,
        threshold_pct: config.threshold_pct,
    }
}
