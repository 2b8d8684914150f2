//! Reference contact statistics consumed by the statistical potential
//!
//! A [`DistributionTable`] maps an unordered pair of atom types and a shell of
//! a [`RadiusLadder`] to two statistics: a raw radial density and a frequency
//! normalized by the expected random-contact frequency of the pair. Tables
//! are loaded once and then shared read-only between all scorers.

use crate::typing::{TypeId, Vocabulary};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Two radii closer than this are the same shell
pub const LADDER_TOLERANCE: f64 = 1e-6;

/// Errors that can occur when building or loading a distribution table
#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid radius ladder: {0}")]
    InvalidLadder(String),

    #[error("Radius {radius} is not a shell of the ladder {ladder}")]
    OffLadder { radius: f64, ladder: RadiusLadder },

    #[error("Duplicate entry for {first}/{second} at radius {radius}")]
    Duplicate {
        first: String,
        second: String,
        radius: f64,
    },

    #[error("Type id {0} is not part of the table's vocabulary")]
    UnknownType(TypeId),

    #[error("Non-finite statistic for {first}/{second} at radius {radius}")]
    NonFinite {
        first: String,
        second: String,
        radius: f64,
    },
}

/// Ascending set of cutoff shells `start + k * step` for `k < count`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusLadder {
    pub start: f64,
    pub step: f64,
    pub count: usize,
}

impl Default for RadiusLadder {
    /// Shells at 4, 5, ..., 15 Angstroms
    fn default() -> Self {
        Self {
            start: 4.0,
            step: 1.0,
            count: 12,
        }
    }
}

impl std::fmt::Display for RadiusLadder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={} step {}", self.start, self.max_radius(), self.step)
    }
}

impl RadiusLadder {
    pub fn new(start: f64, step: f64, count: usize) -> Result<Self, DistributionError> {
        if !start.is_finite() || start <= 0.0 {
            return Err(DistributionError::InvalidLadder(format!(
                "start must be positive, got {}",
                start
            )));
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(DistributionError::InvalidLadder(format!(
                "step must be positive, got {}",
                step
            )));
        }
        if count == 0 {
            return Err(DistributionError::InvalidLadder(
                "at least one shell is required".to_string(),
            ));
        }

        Ok(Self { start, step, count })
    }

    /// Ladder covering `[min, max]` in unit steps
    pub fn spanning(min: f64, max: f64) -> Result<Self, DistributionError> {
        let count = ((max - min) + LADDER_TOLERANCE).floor();
        if !count.is_finite() || count < 0.0 {
            return Err(DistributionError::InvalidLadder(format!(
                "empty range {}..={}",
                min, max
            )));
        }
        Self::new(min, 1.0, count as usize + 1)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Radius of shell `shell`
    pub fn radius(&self, shell: usize) -> f64 {
        self.start + self.step * shell as f64
    }

    pub fn max_radius(&self) -> f64 {
        self.radius(self.count.saturating_sub(1))
    }

    pub fn radii(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).map(move |shell| self.radius(shell))
    }

    /// Shell whose radius equals `radius`, if any
    pub fn shell_index(&self, radius: f64) -> Option<usize> {
        if !radius.is_finite() {
            return None;
        }
        let k = ((radius - self.start) / self.step).round();
        if k < 0.0 || k >= self.count as f64 {
            return None;
        }
        let shell = k as usize;
        ((self.radius(shell) - radius).abs() <= LADDER_TOLERANCE).then_some(shell)
    }
}

/// Which statistic of a table entry a scorer reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Raw pairwise radial density
    Radial,
    /// Frequency normalized by the expected random-contact frequency
    NormalizedFrequency,
}

/// Both statistics of one (type pair, shell) entry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShellStats {
    pub radial: f64,
    pub frequency: f64,
}

impl ShellStats {
    pub fn new(radial: f64, frequency: f64) -> Self {
        Self { radial, frequency }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Radial => self.radial,
            Metric::NormalizedFrequency => self.frequency,
        }
    }
}

type PairKey = (TypeId, TypeId);

fn pair_key(a: TypeId, b: TypeId) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Symmetric (type pair, shell) -> statistics table
#[derive(Debug, Clone)]
pub struct DistributionTable {
    vocabulary: Arc<Vocabulary>,
    ladder: RadiusLadder,
    entries: HashMap<PairKey, Vec<Option<ShellStats>>>,
}

impl DistributionTable {
    /// An empty table over `vocabulary` and `ladder`
    pub fn new(vocabulary: Arc<Vocabulary>, ladder: RadiusLadder) -> Self {
        Self {
            vocabulary,
            ladder,
            entries: HashMap::new(),
        }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn ladder(&self) -> &RadiusLadder {
        &self.ladder
    }

    /// Number of type pairs with at least one populated shell
    pub fn pair_count(&self) -> usize {
        self.entries.len()
    }

    fn type_name(&self, id: TypeId) -> String {
        self.vocabulary
            .info(id)
            .map_or_else(|| id.to_string(), |info| info.name.clone())
    }

    /// Add the statistics of a pair at one ladder radius
    pub fn insert(
        &mut self,
        a: TypeId,
        b: TypeId,
        radius: f64,
        stats: ShellStats,
    ) -> Result<(), DistributionError> {
        for id in [a, b] {
            if id >= self.vocabulary.len() {
                return Err(DistributionError::UnknownType(id));
            }
        }

        let shell = self
            .ladder
            .shell_index(radius)
            .ok_or(DistributionError::OffLadder {
                radius,
                ladder: self.ladder,
            })?;

        if !stats.radial.is_finite() || !stats.frequency.is_finite() {
            return Err(DistributionError::NonFinite {
                first: self.type_name(a),
                second: self.type_name(b),
                radius,
            });
        }

        let count = self.ladder.len();
        let shells = self
            .entries
            .entry(pair_key(a, b))
            .or_insert_with(|| vec![None; count]);

        if shells[shell].is_some() {
            return Err(DistributionError::Duplicate {
                first: self.type_name(a),
                second: self.type_name(b),
                radius,
            });
        }
        shells[shell] = Some(stats);

        Ok(())
    }

    /// Statistics of a pair at a shell; `None` is the absent signal
    pub fn get(&self, a: TypeId, b: TypeId, shell: usize) -> Option<ShellStats> {
        self.entries
            .get(&pair_key(a, b))
            .and_then(|shells| shells.get(shell).copied().flatten())
    }

    /// One statistic of a pair at a shell
    pub fn value(&self, a: TypeId, b: TypeId, shell: usize, metric: Metric) -> Option<f64> {
        self.get(a, b, shell).map(|stats| stats.get(metric))
    }

    /// Load a table from a distribution file
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        vocabulary: Arc<Vocabulary>,
        ladder: RadiusLadder,
    ) -> Result<Self, DistributionError> {
        let file = File::open(path.as_ref())?;
        info!("Loading distributions from {}", path.as_ref().display());
        Self::read(BufReader::new(file), vocabulary, ladder)
    }

    /// Parse whitespace separated rows of `type_a type_b radius radial frequency`
    ///
    /// Blank lines and lines starting with `#` are ignored. Rows naming a type
    /// the vocabulary does not know are skipped.
    pub fn read<R: BufRead>(
        reader: R,
        vocabulary: Arc<Vocabulary>,
        ladder: RadiusLadder,
    ) -> Result<Self, DistributionError> {
        let mut table = Self::new(vocabulary, ladder);
        let mut unknown: BTreeSet<String> = BTreeSet::new();
        let mut skipped = 0usize;

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = line_number + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 5 {
                return Err(DistributionError::Parse {
                    line: line_number,
                    message: format!("expected 5 columns, found {}", fields.len()),
                });
            }

            let number = |i: usize, what: &str| {
                fields[i]
                    .parse::<f64>()
                    .map_err(|_| DistributionError::Parse {
                        line: line_number,
                        message: format!("invalid {}: '{}'", what, fields[i]),
                    })
            };
            let radius = number(2, "radius")?;
            let stats = ShellStats::new(number(3, "radial value")?, number(4, "frequency")?);

            let (Some(a), Some(b)) = (
                table.vocabulary.id_of(fields[0]),
                table.vocabulary.id_of(fields[1]),
            ) else {
                for name in &fields[..2] {
                    if table.vocabulary.id_of(name).is_none() {
                        unknown.insert(name.to_string());
                    }
                }
                skipped += 1;
                continue;
            };

            table.insert(a, b, radius, stats)?;
        }

        if skipped > 0 {
            warn!(
                "Skipped {} rows with types unknown to the {} vocabulary: {}",
                skipped,
                table.vocabulary.name(),
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
        info!(
            "Loaded distributions for {} type pairs over shells {}",
            table.pair_count(),
            table.ladder
        );

        Ok(table)
    }
}
