//! Molecule representation and related functionality

use crate::atom::Atom;
use nalgebra::Vector3;
use thiserror::Error;

/// Errors that can occur when working with molecules
#[derive(Error, Debug)]
pub enum MoleculeError {
    #[error("Invalid atom index: {0}")]
    InvalidAtomIndex(usize),

    #[error("Invalid residue index: {0}")]
    InvalidResidueIndex(usize),
}

/// A contiguous run of atoms sharing chain, residue number and residue name
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    /// Residue name (e.g. "ALA", "HEM", "HOH")
    pub name: String,

    /// Residue number from the structure file
    pub number: i32,

    /// Chain identifier
    pub chain_id: char,

    /// Indices of the atoms of this residue, in file order
    pub atoms: Vec<usize>,

    /// Every atom came from a HETATM record
    pub is_hetero: bool,
}

impl Residue {
    /// Number of atoms in the residue
    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    /// Is this a water molecule?
    pub fn is_water(&self) -> bool {
        matches!(self.name.as_str(), "HOH" | "WAT" | "DOD" | "H2O")
    }
}

/// Represents a molecule (ligand, receptor or whole structure)
#[derive(Debug, Clone)]
pub struct Molecule {
    /// Name of the molecule
    pub name: String,

    /// List of atoms in the molecule
    pub atoms: Vec<Atom>,

    /// Rotatable bonds, from the TORSDOF record of a ligand PDBQT
    pub torsdof: usize,

    /// Residues in file order
    residues: Vec<Residue>,
}

impl Molecule {
    /// Create a new empty molecule
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            atoms: Vec::new(),
            torsdof: 0,
            residues: Vec::new(),
        }
    }

    /// Add an atom to the molecule; a new residue starts whenever the
    /// chain, residue number or residue name changes
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let idx = self.atoms.len();

        let continues_residue = self.residues.last().map_or(false, |res| {
            res.chain_id == atom.chain_id
                && res.number == atom.residue_num
                && res.name == atom.residue_name
        });

        if continues_residue {
            if let Some(res) = self.residues.last_mut() {
                res.atoms.push(idx);
                res.is_hetero &= atom.is_hetero;
            }
        } else {
            self.residues.push(Residue {
                name: atom.residue_name.clone(),
                number: atom.residue_num,
                chain_id: atom.chain_id,
                atoms: vec![idx],
                is_hetero: atom.is_hetero,
            });
        }

        self.atoms.push(atom);
        idx
    }

    /// Number of atoms
    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    /// Residues in file order
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// Look up one residue
    pub fn residue(&self, idx: usize) -> Result<&Residue, MoleculeError> {
        self.residues
            .get(idx)
            .ok_or(MoleculeError::InvalidResidueIndex(idx))
    }

    /// Look up one atom
    pub fn atom(&self, idx: usize) -> Result<&Atom, MoleculeError> {
        self.atoms.get(idx).ok_or(MoleculeError::InvalidAtomIndex(idx))
    }

    /// Atom coordinates, index-aligned with `atoms`
    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.atoms.iter().map(|atom| atom.coordinates).collect()
    }
}
