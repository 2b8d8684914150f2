//! Knowledge-based statistical potential
//!
//! Each receptor/ligand contact is scored by how often that pair of atom
//! types is observed at that range in a reference corpus. Eight variants
//! exist, one per combination of:
//!
//! * metric: raw radial density (`r`) or normalized frequency (`f`);
//! * aggregation: `m`ean over the contacts inside the cutoff, or
//!   `c`umulative sum over every shell up to the cutoff;
//! * granularity: `c`omplete types, or `r`educed type classes.
//!
//! The three letters form the variant code (`rmc`, `fcr`, ...).

use super::{Locus, ScoringError, ScoringFunction, TypedAtoms};
use crate::distribution::{DistributionTable, Metric};
use crate::grid::SpatialIndex;
use crate::typing::{AtomTypeTable, TypeId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Value used for an observed pair the table has no entry for
pub const MISSING_VALUE: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    /// Sum at the configured shell divided by the number of contributing pairs
    Mean,
    /// Sum over every shell from the smallest up to the configured one
    Cumulative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Raw type ids
    Complete,
    /// Type ids mapped through their reduced class
    Reduced,
}

/// Variant of the statistical potential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatisticalOptions {
    pub metric: Metric,
    pub aggregation: Aggregation,
    pub granularity: Granularity,
}

impl StatisticalOptions {
    pub const fn new(metric: Metric, aggregation: Aggregation, granularity: Granularity) -> Self {
        Self {
            metric,
            aggregation,
            granularity,
        }
    }

    /// Every variant, reduced ones first
    pub fn all() -> Vec<StatisticalOptions> {
        let mut all = Vec::with_capacity(8);
        for granularity in [Granularity::Reduced, Granularity::Complete] {
            for metric in [Metric::Radial, Metric::NormalizedFrequency] {
                for aggregation in [Aggregation::Mean, Aggregation::Cumulative] {
                    all.push(Self::new(metric, aggregation, granularity));
                }
            }
        }
        all
    }

    /// Three letter code, e.g. `rmc`
    pub fn code(&self) -> String {
        let metric = match self.metric {
            Metric::Radial => 'r',
            Metric::NormalizedFrequency => 'f',
        };
        let aggregation = match self.aggregation {
            Aggregation::Mean => 'm',
            Aggregation::Cumulative => 'c',
        };
        let granularity = match self.granularity {
            Granularity::Complete => 'c',
            Granularity::Reduced => 'r',
        };
        [metric, aggregation, granularity].iter().collect()
    }
}

impl fmt::Display for StatisticalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for StatisticalOptions {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ScoringError::UnknownOptions(s.to_string());
        let code: Vec<char> = s.trim().to_ascii_lowercase().chars().collect();
        let [metric, aggregation, granularity] = code[..] else {
            return Err(unknown());
        };

        let metric = match metric {
            'r' => Metric::Radial,
            'f' => Metric::NormalizedFrequency,
            _ => return Err(unknown()),
        };
        let aggregation = match aggregation {
            'm' => Aggregation::Mean,
            'c' => Aggregation::Cumulative,
            _ => return Err(unknown()),
        };
        let granularity = match granularity {
            'c' => Granularity::Complete,
            'r' => Granularity::Reduced,
            _ => return Err(unknown()),
        };

        Ok(Self::new(metric, aggregation, granularity))
    }
}

/// Statistical potential at one cutoff radius
#[derive(Debug, Clone)]
pub struct StatisticalPotential {
    options: StatisticalOptions,
    /// Ladder shell of the cutoff
    shell: usize,
    /// Cutoff radius, exactly the ladder's radius for `shell`
    radius: f64,
    /// Reference statistics, keyed by complete type ids
    table: Arc<DistributionTable>,
    /// Receptor types allowed to contribute; `None` allows all
    restriction: Option<HashSet<TypeId>>,
}

impl StatisticalPotential {
    /// Build a scorer; `radius` must be one of the table's ladder shells
    pub fn new(
        options: StatisticalOptions,
        radius: f64,
        table: Arc<DistributionTable>,
    ) -> Result<Self, ScoringError> {
        let ladder = *table.ladder();
        let shell = ladder
            .shell_index(radius)
            .ok_or(ScoringError::RadiusOffLadder { radius, ladder })?;

        debug!("Built statistical potential {}{}", options, radius);

        Ok(Self {
            options,
            shell,
            radius: ladder.radius(shell),
            table,
            restriction: None,
        })
    }

    /// Build one scorer per ladder shell over the same table
    pub fn for_every_shell(
        options: StatisticalOptions,
        table: Arc<DistributionTable>,
    ) -> Result<Vec<Self>, ScoringError> {
        let ladder = *table.ladder();
        let first = Self::new(options, ladder.radius(0), table)?;

        let mut scorers = Vec::with_capacity(ladder.len());
        for shell in 0..ladder.len() {
            scorers.push(Self {
                shell,
                radius: ladder.radius(shell),
                ..first.clone()
            });
        }
        Ok(scorers)
    }

    /// Only receptor atoms whose complete type is in `types` contribute
    pub fn with_restriction(mut self, types: HashSet<TypeId>) -> Result<Self, ScoringError> {
        if types.is_empty() {
            return Err(ScoringError::EmptyRestriction);
        }
        self.restriction = Some(types);
        Ok(self)
    }

    pub fn options(&self) -> StatisticalOptions {
        self.options
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn lookup(&self, a: TypeId, b: TypeId, shell: usize) -> f64 {
        self.table
            .value(a, b, shell, self.options.metric)
            .unwrap_or(MISSING_VALUE)
    }

    /// Calls `visit(squared_distance, receptor_key, ligand_key)` for every
    /// contributing pair of the locus within the cutoff
    fn for_each_pair<F: FnMut(f64, TypeId, TypeId)>(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
        mut visit: F,
    ) {
        let excluded = locus.excluded();
        let reduced = self.options.granularity == Granularity::Reduced;

        for lig_atom in locus.atoms(ligand.len()) {
            let lig_type = ligand.types.type_of(lig_atom);
            let lig_key = if reduced {
                ligand.types.reduced_class(lig_type)
            } else {
                lig_type
            };

            index.for_each_neighbor(&ligand.positions[lig_atom], self.radius, |rec_atom, dist_sq| {
                if excluded.as_ref().map_or(false, |own| own.contains(&rec_atom)) {
                    return;
                }
                if rec_atom >= receptor.atom_count() {
                    return;
                }

                let rec_type = receptor.type_of(rec_atom);
                if let Some(allowed) = &self.restriction {
                    if !allowed.contains(&rec_type) {
                        return;
                    }
                }

                let rec_key = if reduced {
                    receptor.reduced_class(rec_type)
                } else {
                    rec_type
                };
                visit(dist_sq, rec_key, lig_key);
            });
        }
    }

    /// Unscaled contribution of each shell from the smallest up to the cutoff
    ///
    /// Shells are nested spheres: a pair at distance `d` contributes to every
    /// shell whose radius is at least `d`.
    pub fn shell_contributions(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
    ) -> Vec<f64> {
        let ladder = *self.table.ladder();
        let limits: Vec<f64> = (0..=self.shell)
            .map(|shell| {
                let r = ladder.radius(shell);
                r * r
            })
            .collect();
        let mut sums = vec![0.0; limits.len()];

        self.for_each_pair(index, receptor, ligand, locus, |dist_sq, a, b| {
            let first = limits.partition_point(|&limit| limit < dist_sq);
            for shell in first..limits.len() {
                sums[shell] += self.lookup(a, b, shell);
            }
        });

        sums
    }

    fn mean(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
    ) -> f64 {
        let mut sum = 0.0;
        let mut pairs = 0usize;

        self.for_each_pair(index, receptor, ligand, locus, |_, a, b| {
            sum += self.lookup(a, b, self.shell);
            pairs += 1;
        });

        if pairs == 0 {
            0.0
        } else {
            sum / pairs as f64
        }
    }
}

impl ScoringFunction for StatisticalPotential {
    fn name(&self) -> String {
        format!("{}{}", self.options, self.radius)
    }

    fn score(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
    ) -> f64 {
        match self.options.aggregation {
            Aggregation::Mean => self.mean(index, receptor, ligand, locus),
            Aggregation::Cumulative => self
                .shell_contributions(index, receptor, ligand, locus)
                .iter()
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{RadiusLadder, ShellStats};
    use crate::typing::{ContactFlags, TypeAssignment, TypeInfo, Vocabulary};
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::Vector3;

    const RMC: StatisticalOptions =
        StatisticalOptions::new(Metric::Radial, Aggregation::Mean, Granularity::Complete);
    const RCC: StatisticalOptions =
        StatisticalOptions::new(Metric::Radial, Aggregation::Cumulative, Granularity::Complete);

    /// t0, t1 form class t0; t2 is its own class
    fn vocabulary() -> Arc<Vocabulary> {
        let info = |name: &str, reduced| TypeInfo {
            name: name.to_string(),
            vdw_radius: 1.7,
            reduced,
            flags: ContactFlags::NONE,
        };
        Arc::new(Vocabulary::new("toy", vec![info("t0", 0), info("t1", 0), info("t2", 2)]).unwrap())
    }

    fn table(rows: &[(TypeId, TypeId, f64, f64, f64)]) -> Arc<DistributionTable> {
        let mut table = DistributionTable::new(vocabulary(), RadiusLadder::default());
        for &(a, b, r, radial, freq) in rows {
            table.insert(a, b, r, ShellStats::new(radial, freq)).unwrap();
        }
        Arc::new(table)
    }

    fn types(ids: Vec<TypeId>) -> TypeAssignment {
        TypeAssignment::new(vocabulary(), ids).unwrap()
    }

    #[test]
    fn test_option_codes() {
        for options in StatisticalOptions::all() {
            assert_eq!(options.code().parse::<StatisticalOptions>().unwrap(), options);
        }
        assert_eq!(RMC.code(), "rmc");
        assert_eq!("FCR".parse::<StatisticalOptions>().unwrap().code(), "fcr");
        assert!(matches!(
            "rxc".parse::<StatisticalOptions>(),
            Err(ScoringError::UnknownOptions(_))
        ));
        assert!("rm".parse::<StatisticalOptions>().is_err());
        assert_eq!(StatisticalOptions::all().len(), 8);
    }

    #[test]
    fn test_radius_must_be_on_the_ladder() {
        let table = table(&[]);
        assert!(matches!(
            StatisticalPotential::new(RMC, 4.5, table.clone()),
            Err(ScoringError::RadiusOffLadder { .. })
        ));
        assert!(StatisticalPotential::new(RMC, 16.0, table.clone()).is_err());
        assert_eq!(StatisticalPotential::new(RMC, 15.0, table).unwrap().name(), "rmc15");
    }

    #[test]
    fn test_empty_restriction_is_rejected() {
        let scorer = StatisticalPotential::new(RMC, 4.0, table(&[])).unwrap();
        assert_eq!(
            scorer.with_restriction(HashSet::new()).unwrap_err(),
            ScoringError::EmptyRestriction
        );
    }

    #[test]
    fn test_mean_without_contacts_is_zero() {
        let receptor_points = vec![Vector3::new(20.0, 0.0, 0.0)];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = types(vec![0]);
        let lig_types = types(vec![1]);
        let lig_points = vec![Vector3::zeros()];
        let ligand = TypedAtoms::new(&lig_points, &lig_types);

        let scorer = StatisticalPotential::new(RMC, 4.0, table(&[(0, 1, 4.0, 3.0, 3.0)])).unwrap();
        assert_eq!(scorer.score_molecule(&index, &receptor, &ligand), 0.0);
    }

    #[test]
    fn test_single_contact_mean_and_cumulative() {
        let receptor_points = vec![Vector3::new(3.5, 0.0, 0.0)];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = types(vec![0]);
        let lig_types = types(vec![2]);
        let lig_points = vec![Vector3::zeros()];
        let ligand = TypedAtoms::new(&lig_points, &lig_types);
        let table = table(&[(2, 0, 4.0, 0.8, 1.3)]);

        let mean = StatisticalPotential::new(RMC, 4.0, table.clone()).unwrap();
        assert_eq!(mean.score_molecule(&index, &receptor, &ligand), 0.8);

        let freq = StatisticalOptions::new(
            Metric::NormalizedFrequency,
            Aggregation::Mean,
            Granularity::Complete,
        );
        let freq = StatisticalPotential::new(freq, 4.0, table.clone()).unwrap();
        assert_eq!(freq.score_molecule(&index, &receptor, &ligand), 1.3);

        let cumulative = StatisticalPotential::new(RCC, 15.0, table).unwrap();
        assert_eq!(cumulative.score_molecule(&index, &receptor, &ligand), 0.8);
    }

    #[test]
    fn test_cumulative_sums_nested_shells() {
        // Contacts at 3.5 and 5.5; values at shells 4, 5, 6
        let receptor_points = vec![Vector3::new(3.5, 0.0, 0.0), Vector3::new(0.0, 5.5, 0.0)];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = types(vec![0, 0]);
        let lig_types = types(vec![2]);
        let lig_points = vec![Vector3::zeros()];
        let ligand = TypedAtoms::new(&lig_points, &lig_types);
        let table = table(&[
            (0, 2, 4.0, 1.0, 0.0),
            (0, 2, 5.0, 2.0, 0.0),
            (0, 2, 6.0, 4.0, 0.0),
        ]);

        let scorer = StatisticalPotential::new(RCC, 6.0, table.clone()).unwrap();
        let shells = scorer.shell_contributions(&index, &receptor, &ligand, &Locus::Molecule);
        // shell 4: first contact; shell 5: first contact; shell 6: both
        assert_eq!(shells, vec![1.0, 2.0, 8.0]);
        assert_eq!(scorer.score_molecule(&index, &receptor, &ligand), 11.0);

        // Growing the cutoff never lowers a non-negative cumulative score
        let mut previous = 0.0;
        for radius in RadiusLadder::default().radii() {
            let scorer = StatisticalPotential::new(RCC, radius, table.clone()).unwrap();
            let score = scorer.score_molecule(&index, &receptor, &ligand);
            assert!(score >= previous);
            previous = score;
        }
        assert_eq!(previous, 11.0);
    }

    #[test]
    fn test_missing_entries_count_as_zero_in_the_mean() {
        let receptor_points = vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(-1.0, 0.0, 0.0)];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = types(vec![0, 1]);
        let lig_types = types(vec![2]);
        let lig_points = vec![Vector3::zeros()];
        let ligand = TypedAtoms::new(&lig_points, &lig_types);

        let scorer = StatisticalPotential::new(RMC, 4.0, table(&[(0, 2, 4.0, 3.0, 0.0)])).unwrap();
        assert_approx_eq!(scorer.score_molecule(&index, &receptor, &ligand), 1.5);
    }

    #[test]
    fn test_restriction_skips_pairs_entirely() {
        let receptor_points = vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(-1.0, 0.0, 0.0)];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = types(vec![0, 1]);
        let lig_types = types(vec![2]);
        let lig_points = vec![Vector3::zeros()];
        let ligand = TypedAtoms::new(&lig_points, &lig_types);

        let scorer = StatisticalPotential::new(RMC, 4.0, table(&[(0, 2, 4.0, 3.0, 0.0)]))
            .unwrap()
            .with_restriction(HashSet::from([0]))
            .unwrap();
        // The t1 neighbor is not averaged in as a zero
        assert_eq!(scorer.score_molecule(&index, &receptor, &ligand), 3.0);
    }

    #[test]
    fn test_reduced_granularity_reads_the_class_pair_entry() {
        let receptor_points = vec![Vector3::new(1.0, 0.0, 0.0)];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = types(vec![1]);
        let lig_types = types(vec![2]);
        let lig_points = vec![Vector3::zeros()];
        let ligand = TypedAtoms::new(&lig_points, &lig_types);
        let table = table(&[(0, 2, 4.0, 2.0, 0.0), (1, 2, 4.0, 6.0, 0.0)]);

        // t1 reduces to t0, so the pair is read at (t0, t2)
        let rmr = "rmr".parse().unwrap();
        let reduced = StatisticalPotential::new(rmr, 4.0, table.clone()).unwrap();
        assert_eq!(reduced.score_molecule(&index, &receptor, &ligand), 2.0);

        let complete = StatisticalPotential::new(RMC, 4.0, table).unwrap();
        assert_eq!(complete.score_molecule(&index, &receptor, &ligand), 6.0);

        // No entry at the class pair: the contact still counts, as zero
        let sparse = self::table(&[(1, 2, 4.0, 6.0, 0.0)]);
        let reduced = StatisticalPotential::new(rmr, 4.0, sparse).unwrap();
        assert_eq!(reduced.score_molecule(&index, &receptor, &ligand), 0.0);
    }

    #[test]
    fn test_residue_locus_ignores_its_own_atoms() {
        // One structure: residue atoms 0 and 1, environment atom 2
        let points = vec![
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        ];
        let index = SpatialIndex::build(&points);
        let structure_types = types(vec![2, 2, 0]);
        let structure = TypedAtoms::new(&points, &structure_types);
        let table = table(&[(0, 2, 4.0, 5.0, 0.0), (2, 2, 4.0, 100.0, 0.0)]);

        let scorer = StatisticalPotential::new(RMC, 4.0, table).unwrap();
        assert_eq!(scorer.score_residue(&index, &structure, &[0, 1]), 5.0);
    }

    #[test]
    fn test_every_shell_constructor() {
        let scorers = StatisticalPotential::for_every_shell(RCC, table(&[])).unwrap();
        let names: Vec<String> = scorers.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "rcc4");
        assert_eq!(names[11], "rcc15");
    }
}
