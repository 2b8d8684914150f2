//! Selection of the residues worth scoring in a structure
//!
//! Selection picks candidate small molecules; pruning then drops duplicates
//! and the usual cofactors and lipids. Every function works on residue
//! indices into [`Molecule::residues`] and keeps their order.
//!
//! The partner classification at the bottom decides which neighbors of a
//! small molecule are worth reporting as contacts.

use crate::grid::SpatialIndex;
use crate::molecule::{Molecule, Residue};
use log::debug;
use std::collections::HashSet;

/// Smallest residue, in heavy atoms, still considered a small molecule
pub const DEFAULT_MIN_ATOMS: usize = 10;

/// Residue names of cofactors that are bound in most of their structures
pub const COMMON_COFACTORS: &[&str] = &[
    "ADP", "AMP", "ATP", "CoA", "COA", "FAD", "FMN", "GDP", "GTP", "HEC", "HEM", "NAD", "NAI",
    "NAP", "NDP", "PLP", "SAH", "SAM", "TPP", "UDP", "H4B", "BH4", "CLA", "BCL", "SF4", "FES",
];

/// Residue names of fatty acids and detergents that coat membrane proteins
pub const COMMON_FATTY_ACIDS: &[&str] = &[
    "MYR", "PLM", "STE", "OLA", "OLC", "PAM", "LNL", "ARA", "DAO", "DCR", "LDA", "BOG", "LMT",
    "PEE", "PC1", "CDL", "SPH", "HTG",
];

/// Hetero residues that are not water and have at least `min_atoms` heavy atoms
pub fn small_molecules(molecule: &Molecule, min_atoms: usize) -> Vec<usize> {
    let selected: Vec<usize> = molecule
        .residues()
        .iter()
        .enumerate()
        .filter(|(_, residue)| residue.is_hetero && !residue.is_water())
        .filter(|(_, residue)| {
            let heavy = residue
                .atoms
                .iter()
                .filter(|&&i| !molecule.atoms[i].atom_type.is_hydrogen())
                .count();
            heavy >= min_atoms
        })
        .map(|(i, _)| i)
        .collect();

    debug!("{}: {} small molecules", molecule.name, selected.len());
    selected
}

/// Keep only the first residue of every residue name
pub fn prune_identical_residues(molecule: &Molecule, residues: &mut Vec<usize>) {
    let residue_list = molecule.residues();
    let mut seen = HashSet::new();
    residues.retain(|&i| {
        residue_list
            .get(i)
            .map_or(false, |residue| seen.insert(residue.name.clone()))
    });
}

/// Drop residues whose name is in `names`
pub fn prune_cofactors(molecule: &Molecule, residues: &mut Vec<usize>, names: &[&str]) {
    let residue_list = molecule.residues();
    residues.retain(|&i| {
        residue_list
            .get(i)
            .map_or(false, |residue| !names.contains(&residue.name.as_str()))
    });
}

/// Small molecules after every pruning step, as scored by the residue driver
pub fn candidate_ligands(molecule: &Molecule, min_atoms: usize) -> Vec<usize> {
    let mut residues = small_molecules(molecule, min_atoms);
    prune_identical_residues(molecule, &mut residues);
    prune_cofactors(molecule, &mut residues, COMMON_COFACTORS);
    prune_cofactors(molecule, &mut residues, COMMON_FATTY_ACIDS);
    residues
}

/// Standard amino acids, plus the protonation variants PDBQT preparation writes
pub const AMINO_ACIDS: &[&str] = &[
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE", "LEU", "LYS", "MET",
    "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL", "HID", "HIE", "HIP", "CYX",
];

/// DNA and RNA nucleotides
pub const NUCLEOTIDES: &[&str] = &["A", "C", "G", "U", "I", "DA", "DC", "DG", "DT", "DU", "DI"];

/// Single-atom residues of metals that bind as 2+ ions
pub const DIVALENT_IONS: &[&str] = &[
    "MG", "CA", "ZN", "MN", "FE", "FE2", "CO", "NI", "CU", "CD", "HG", "SR", "BA",
];

/// Polymer residues, water, common cofactors and divalent ions
///
/// Modified amino acids and nucleotides written as HETATM records are not
/// partners.
pub fn is_interaction_partner(molecule: &Molecule, residue: &Residue) -> bool {
    let name = residue.name.as_str();
    if AMINO_ACIDS.contains(&name) || NUCLEOTIDES.contains(&name) {
        return !residue.is_hetero;
    }
    if residue.is_water() || COMMON_COFACTORS.contains(&name) {
        return true;
    }

    match residue.atoms.as_slice() {
        [only] => {
            DIVALENT_IONS.contains(&name)
                || molecule
                    .atoms
                    .get(*only)
                    .map_or(false, |atom| atom.atom_type.is_metal())
        }
        _ => false,
    }
}

/// One small molecule atom near an atom of an interaction partner
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerContact {
    pub ligand_atom: usize,
    pub partner_atom: usize,
    pub distance: f64,
}

/// Every contact of the atoms of `ligand` with interaction partners within
/// `max_distance`, ordered by ligand atom then partner atom
pub fn partner_contacts(
    molecule: &Molecule,
    index: &SpatialIndex,
    ligand: &Residue,
    max_distance: f64,
) -> Vec<PartnerContact> {
    let mut is_partner = vec![false; molecule.size()];
    for residue in molecule.residues() {
        if is_interaction_partner(molecule, residue) {
            for &i in &residue.atoms {
                is_partner[i] = true;
            }
        }
    }

    let mut contacts = Vec::new();
    for &ligand_atom in &ligand.atoms {
        let Some(atom) = molecule.atoms.get(ligand_atom) else {
            continue;
        };
        index.for_each_neighbor(&atom.coordinates, max_distance, |partner_atom, dist_sq| {
            if is_partner.get(partner_atom).copied().unwrap_or(false) {
                contacts.push(PartnerContact {
                    ligand_atom,
                    partner_atom,
                    distance: dist_sq.sqrt(),
                });
            }
        });
    }
    contacts.sort_by_key(|c| (c.ligand_atom, c.partner_atom));

    debug!("{} {}: {} partner contacts", ligand.name, ligand.number, contacts.len());
    contacts
}
