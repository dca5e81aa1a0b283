pub use crate::config::*;

use std::collections::BTreeMap;

use crate::load_run;

/// A builder for assembling a run cut by cut.
///
/// Counts are taken as integers and funneled through the same validation
/// as [`load_run`], so both construction paths reject the same feeds.
///
/// ```
/// pub use tally_trends::builder::RunBuilder;
/// pub use tally_trends::editions;
/// # use tally_trends::LoadError;
///
/// let mut builder = RunBuilder::new(&editions::first_round_2026());
/// builder.add_cut(
///     1_770_000_000,
///     &[
///         ("ppso", 10),
///         ("pln", 8),
///         ("cac", 5),
///         ("pusc", 4),
///         ("fa", 2),
///         ("blank", 1),
///         ("null", 1),
///     ],
/// );
/// let run = builder.build()?;
/// assert_eq!(run.cuts.len(), 1);
/// # Ok::<(), LoadError>(())
/// ```
pub struct RunBuilder {
    pub(crate) _config: EditionConfig,
    pub(crate) _cuts: Vec<RawCut>,
}

impl RunBuilder {
    pub fn new(config: &EditionConfig) -> RunBuilder {
        RunBuilder {
            _config: config.clone(),
            _cuts: Vec::new(),
        }
    }

    /// Adds one snapshot. Counts are (entity code, cumulative count)
    /// pairs; the column set is still checked against the edition's
    /// schemas at [`build`](RunBuilder::build) time.
    pub fn add_cut(&mut self, timestamp: i64, counts: &[(&str, u64)]) {
        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        fields.insert(TIMESTAMP_COLUMN.to_string(), timestamp.to_string());
        for (code, count) in counts {
            fields.insert((*code).to_string(), count.to_string());
        }
        self._cuts.push(RawCut { fields });
    }

    pub fn build(&self) -> Result<Run, LoadError> {
        load_run(&self._cuts, &self._config)
    }
}
