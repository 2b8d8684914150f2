//! Scoring functions over receptor/ligand contacts
//!
//! Every scorer answers the same question: given a spatial index over the
//! receptor, the receptor's atom types and a typed ligand, what is the score
//! of a ligand locus? Scorers are configured once, hold no per-call state and
//! are `Send + Sync`, so one instance can serve every worker of a batch.

pub mod empirical;
pub mod statistical;

use crate::distribution::RadiusLadder;
use crate::grid::SpatialIndex;
use crate::typing::AtomTypeTable;
use nalgebra::Vector3;
use std::collections::HashSet;
use thiserror::Error;

pub use empirical::{VinaComponents, VinaParams, VinaScore};
pub use statistical::{Aggregation, Granularity, StatisticalOptions, StatisticalPotential};

/// Configuration errors, reported when a scorer is built
#[derive(Error, Debug, PartialEq)]
pub enum ScoringError {
    #[error("Radius {radius} is not a shell of the distribution ladder {ladder}")]
    RadiusOffLadder { radius: f64, ladder: RadiusLadder },

    #[error("Unknown scoring options '{0}' (expected three letters: r|f, m|c, c|r)")]
    UnknownOptions(String),

    #[error("Restriction set is empty; no receptor atom could ever contribute")]
    EmptyRestriction,

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Coordinates and types of the atoms on the ligand side of a score
#[derive(Clone, Copy)]
pub struct TypedAtoms<'a> {
    pub positions: &'a [Vector3<f64>],
    pub types: &'a dyn AtomTypeTable,
}

impl<'a> TypedAtoms<'a> {
    pub fn new(positions: &'a [Vector3<f64>], types: &'a dyn AtomTypeTable) -> Self {
        Self { positions, types }
    }

    /// Atoms that have both a position and a type
    pub fn len(&self) -> usize {
        self.positions.len().min(self.types.atom_count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The part of a ligand a score is requested for
#[derive(Debug, Clone, Copy)]
pub enum Locus<'a> {
    /// Every atom of a ligand that is not part of the indexed receptor
    Molecule,
    /// A single ligand atom
    Atom(usize),
    /// A residue of the indexed structure itself; neighbors that belong to
    /// the residue are not counted as receptor atoms
    Residue(&'a [usize]),
}

impl<'a> Locus<'a> {
    /// Ligand atoms covered by the locus; out of range indices are dropped
    pub fn atoms(&self, ligand_len: usize) -> Vec<usize> {
        match self {
            Locus::Molecule => (0..ligand_len).collect(),
            Locus::Atom(i) => (*i < ligand_len).then_some(*i).into_iter().collect(),
            Locus::Residue(atoms) => atoms.iter().copied().filter(|&i| i < ligand_len).collect(),
        }
    }

    /// Receptor atoms that must not be paired with the locus
    pub(crate) fn excluded(&self) -> Option<HashSet<usize>> {
        match self {
            Locus::Residue(atoms) => Some(atoms.iter().copied().collect()),
            _ => None,
        }
    }
}

/// A configured, reusable scoring function
pub trait ScoringFunction: Send + Sync {
    /// Short label, used as a column header by the drivers
    fn name(&self) -> String;

    /// Score `locus` of `ligand` against the receptor indexed by `index`
    fn score(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
    ) -> f64;

    /// Score a whole ligand molecule
    fn score_molecule(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
    ) -> f64 {
        self.score(index, receptor, ligand, &Locus::Molecule)
    }

    /// Score one residue of a structure against the rest of that structure
    fn score_residue(
        &self,
        index: &SpatialIndex,
        structure: &TypedAtoms<'_>,
        residue_atoms: &[usize],
    ) -> f64 {
        self.score(
            index,
            structure.types,
            structure,
            &Locus::Residue(residue_atoms),
        )
    }
}
