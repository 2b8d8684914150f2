//! contact-score: knowledge-based and empirical scoring of receptor/ligand contacts
//!
//! This library indexes the atoms of a structure, types them, and scores
//! the contacts of a ligand (or of a residue of the structure itself) with
//! either a statistical potential read from a distribution file or a
//! Vina-like empirical energy. It also builds labelled contact-distance
//! histograms and drives both over many structures in parallel.

pub mod atom;
pub mod batch;
pub mod binning;
pub mod distribution;
pub mod grid;
pub mod io;
pub mod molecule;
pub mod scoring;
pub mod selection;
pub mod typing;

// Re-export commonly used types and functions
pub use atom::{Atom, AtomType};
pub use binning::DistanceHistogram;
pub use distribution::{DistributionTable, Metric, RadiusLadder};
pub use grid::SpatialIndex;
pub use molecule::Molecule;
pub use scoring::{
    Locus, ScoringFunction, StatisticalOptions, StatisticalPotential, TypedAtoms, VinaComponents,
    VinaParams, VinaScore,
};
pub use typing::{AtomTypeTable, TypeAssignment, Vocabulary};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
