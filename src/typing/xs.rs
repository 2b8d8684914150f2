//! X-Score atom types, the vocabulary of the Vina empirical terms
//!
//! Heavy atoms are typed from their AutoDock type plus which neighbors lie
//! within covalent bonding distance: a carbon bonded to any atom other than
//! carbon or hydrogen is polar, and an N or O carrying a polar hydrogen is a donor. Hydrogens keep their own type
//! so the energy terms can skip them.

use super::{ContactFlags, TypeAssignment, TypeId, TypeInfo, Vocabulary};
use crate::atom::AtomType;
use crate::grid::SpatialIndex;
use crate::molecule::Molecule;
use std::sync::{Arc, OnceLock};

/// Slack applied to the sum of covalent radii when deciding two atoms are bonded
pub const BOND_TOLERANCE: f64 = 1.1;

/// Longest bond the perception pass ever has to look for (carbon to calcium)
const MAX_BOND_LENGTH: f64 = 2.8;

/// Ids of the XS vocabulary
pub mod ids {
    use super::TypeId;

    pub const C_H: TypeId = 0;
    pub const C_P: TypeId = 1;
    pub const N_P: TypeId = 2;
    pub const N_D: TypeId = 3;
    pub const N_A: TypeId = 4;
    pub const N_DA: TypeId = 5;
    pub const O_P: TypeId = 6;
    pub const O_D: TypeId = 7;
    pub const O_A: TypeId = 8;
    pub const O_DA: TypeId = 9;
    pub const S_P: TypeId = 10;
    pub const P_P: TypeId = 11;
    pub const F_H: TypeId = 12;
    pub const CL_H: TypeId = 13;
    pub const BR_H: TypeId = 14;
    pub const I_H: TypeId = 15;
    pub const MET_D: TypeId = 16;
    pub const H: TypeId = 17;
    pub const X: TypeId = 18;
}

fn build_xs() -> Vocabulary {
    use ids::*;

    let hydrophobic = ContactFlags::hydrophobic();
    let none = ContactFlags::NONE;
    let entry = |name: &str, vdw_radius: f64, reduced: TypeId, flags: ContactFlags| TypeInfo {
        name: name.to_string(),
        vdw_radius,
        reduced,
        flags,
    };

    let types = vec![
        entry("C_H", 1.9, C_H, hydrophobic),
        entry("C_P", 1.9, C_H, none),
        entry("N_P", 1.8, N_P, none),
        entry("N_D", 1.8, N_P, ContactFlags::polar(true, false)),
        entry("N_A", 1.8, N_P, ContactFlags::polar(false, true)),
        entry("N_DA", 1.8, N_P, ContactFlags::polar(true, true)),
        entry("O_P", 1.7, O_P, none),
        entry("O_D", 1.7, O_P, ContactFlags::polar(true, false)),
        entry("O_A", 1.7, O_P, ContactFlags::polar(false, true)),
        entry("O_DA", 1.7, O_P, ContactFlags::polar(true, true)),
        entry("S_P", 2.0, S_P, none),
        entry("P_P", 2.1, P_P, none),
        entry("F_H", 1.5, F_H, hydrophobic),
        entry("Cl_H", 1.8, F_H, hydrophobic),
        entry("Br_H", 2.0, F_H, hydrophobic),
        entry("I_H", 2.2, F_H, hydrophobic),
        entry("Met_D", 1.2, MET_D, ContactFlags::polar(true, false)),
        entry("H", 1.1, H, ContactFlags::hydrogen()),
        entry("X", 1.9, X, none),
    ];

    match Vocabulary::new("xs", types) {
        Ok(vocabulary) => vocabulary,
        Err(e) => unreachable!("built-in XS vocabulary is invalid: {}", e),
    }
}

/// The X-Score vocabulary with Vina's van der Waals radii
pub fn xs_vocabulary() -> Arc<Vocabulary> {
    static XS: OnceLock<Arc<Vocabulary>> = OnceLock::new();
    XS.get_or_init(|| Arc::new(build_xs())).clone()
}

fn bonded(a: AtomType, b: AtomType, dist_sq: f64) -> bool {
    let limit = (a.covalent_radius() + b.covalent_radius()) * BOND_TOLERANCE;
    dist_sq <= limit * limit
}

/// Assign XS types to every atom of a molecule
pub fn assign_xs_types(molecule: &Molecule) -> TypeAssignment {
    let positions = molecule.positions();
    let index = SpatialIndex::build(&positions);

    let ids = molecule
        .atoms
        .iter()
        .enumerate()
        .map(|(i, atom)| {
            let t = atom.atom_type;
            let mut near_heteroatom = false;
            let mut carries_polar_h = false;

            if t.is_carbon() || t.is_n_or_o() {
                index.for_each_neighbor(&positions[i], MAX_BOND_LENGTH, |j, dist_sq| {
                    if j == i {
                        return;
                    }
                    let other = molecule.atoms[j].atom_type;
                    if !bonded(t, other, dist_sq) {
                        return;
                    }
                    near_heteroatom |= !(other.is_carbon() || other.is_hydrogen());
                    carries_polar_h |= other == AtomType::HydrogenD;
                });
            }

            xs_id(t, near_heteroatom, carries_polar_h)
        })
        .collect();

    TypeAssignment {
        vocabulary: xs_vocabulary(),
        ids,
    }
}

fn xs_id(atom_type: AtomType, near_heteroatom: bool, donor: bool) -> TypeId {
    use ids::*;

    match atom_type {
        AtomType::Carbon | AtomType::AromaticCarbon => {
            if near_heteroatom {
                C_P
            } else {
                C_H
            }
        }
        AtomType::Nitrogen => {
            if donor {
                N_D
            } else {
                N_P
            }
        }
        AtomType::NitrogenH => {
            if donor {
                N_DA
            } else {
                N_A
            }
        }
        // Every oxygen accepts
        AtomType::Oxygen | AtomType::OxygenH => {
            if donor {
                O_DA
            } else {
                O_A
            }
        }
        AtomType::Sulfur | AtomType::SulfurH => S_P,
        AtomType::Phosphorus => P_P,
        AtomType::Fluorine => F_H,
        AtomType::Chlorine => CL_H,
        AtomType::Bromine => BR_H,
        AtomType::Iodine => I_H,
        AtomType::Zinc
        | AtomType::Calcium
        | AtomType::Manganese
        | AtomType::Magnesium
        | AtomType::Iron => MET_D,
        AtomType::Hydrogen | AtomType::HydrogenD => H,
        AtomType::Unknown => X,
    }
}
