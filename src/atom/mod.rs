//! Atom representation and related functionality

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// AutoDock atom types as they appear in the last column of a PDBQT record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtomType {
    // Non-hydrogen types
    Carbon,         // C
    AromaticCarbon, // A
    Nitrogen,       // N
    NitrogenH,      // NA (hydrogen bond acceptor)
    Oxygen,         // O
    OxygenH,        // OA (hydrogen bond acceptor)
    Sulfur,         // S
    SulfurH,        // SA (hydrogen bond acceptor)
    Phosphorus,     // P
    Fluorine,       // F
    Chlorine,       // Cl
    Bromine,        // Br
    Iodine,         // I

    // Hydrogen types
    Hydrogen,  // H
    HydrogenD, // HD (hydrogen bond donor)

    // Metal types
    Zinc,      // Zn
    Calcium,   // Ca
    Manganese, // Mn
    Magnesium, // Mg
    Iron,      // Fe

    // For atoms that don't match any of the above
    Unknown,
}

impl AtomType {
    /// Every known type, in the order used by the AutoDock vocabulary
    pub const ALL: [AtomType; 21] = [
        AtomType::Carbon,
        AtomType::AromaticCarbon,
        AtomType::Nitrogen,
        AtomType::NitrogenH,
        AtomType::Oxygen,
        AtomType::OxygenH,
        AtomType::Sulfur,
        AtomType::SulfurH,
        AtomType::Phosphorus,
        AtomType::Fluorine,
        AtomType::Chlorine,
        AtomType::Bromine,
        AtomType::Iodine,
        AtomType::Hydrogen,
        AtomType::HydrogenD,
        AtomType::Zinc,
        AtomType::Calcium,
        AtomType::Manganese,
        AtomType::Magnesium,
        AtomType::Iron,
        AtomType::Unknown,
    ];

    /// Returns the van der Waals radius of the atom type in Angstroms
    pub fn radius(&self) -> f64 {
        match self {
            AtomType::Carbon => 2.0,
            AtomType::AromaticCarbon => 2.0,
            AtomType::Nitrogen => 1.75,
            AtomType::NitrogenH => 1.75,
            AtomType::Oxygen => 1.6,
            AtomType::OxygenH => 1.6,
            AtomType::Sulfur => 2.0,
            AtomType::SulfurH => 2.0,
            AtomType::Phosphorus => 2.1,
            AtomType::Fluorine => 1.545,
            AtomType::Chlorine => 2.045,
            AtomType::Bromine => 2.165,
            AtomType::Iodine => 2.36,
            AtomType::Hydrogen => 1.0,
            AtomType::HydrogenD => 1.0,
            AtomType::Zinc => 0.74,
            AtomType::Calcium => 0.99,
            AtomType::Manganese => 0.65,
            AtomType::Magnesium => 0.65,
            AtomType::Iron => 0.65,
            AtomType::Unknown => 2.0,
        }
    }

    /// Covalent radius in Angstroms, used to decide whether two atoms are bonded
    pub fn covalent_radius(&self) -> f64 {
        match self {
            AtomType::Carbon | AtomType::AromaticCarbon => 0.77,
            AtomType::Nitrogen | AtomType::NitrogenH => 0.75,
            AtomType::Oxygen | AtomType::OxygenH => 0.73,
            AtomType::Sulfur | AtomType::SulfurH => 1.02,
            AtomType::Phosphorus => 1.06,
            AtomType::Fluorine => 0.71,
            AtomType::Chlorine => 0.99,
            AtomType::Bromine => 1.14,
            AtomType::Iodine => 1.33,
            AtomType::Hydrogen | AtomType::HydrogenD => 0.37,
            AtomType::Zinc => 1.31,
            AtomType::Calcium => 1.74,
            AtomType::Manganese => 1.39,
            AtomType::Magnesium => 1.30,
            AtomType::Iron => 1.25,
            AtomType::Unknown => 0.77,
        }
    }

    /// Parse atom type from string representation in PDBQT format
    pub fn from_pdbqt_string(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "C" => AtomType::Carbon,
            "A" => AtomType::AromaticCarbon,
            "N" => AtomType::Nitrogen,
            "NA" => AtomType::NitrogenH,
            "O" => AtomType::Oxygen,
            "OA" => AtomType::OxygenH,
            "S" => AtomType::Sulfur,
            "SA" => AtomType::SulfurH,
            "P" => AtomType::Phosphorus,
            "F" => AtomType::Fluorine,
            "CL" => AtomType::Chlorine,
            "BR" => AtomType::Bromine,
            "I" => AtomType::Iodine,
            "H" => AtomType::Hydrogen,
            "HD" => AtomType::HydrogenD,
            "ZN" => AtomType::Zinc,
            "CA" => AtomType::Calcium,
            "MN" => AtomType::Manganese,
            "MG" => AtomType::Magnesium,
            "FE" => AtomType::Iron,
            _ => AtomType::Unknown,
        }
    }

    /// Convert atom type to PDBQT string
    pub fn to_pdbqt_string(&self) -> &'static str {
        match self {
            AtomType::Carbon => "C",
            AtomType::AromaticCarbon => "A",
            AtomType::Nitrogen => "N",
            AtomType::NitrogenH => "NA",
            AtomType::Oxygen => "O",
            AtomType::OxygenH => "OA",
            AtomType::Sulfur => "S",
            AtomType::SulfurH => "SA",
            AtomType::Phosphorus => "P",
            AtomType::Fluorine => "F",
            AtomType::Chlorine => "Cl",
            AtomType::Bromine => "Br",
            AtomType::Iodine => "I",
            AtomType::Hydrogen => "H",
            AtomType::HydrogenD => "HD",
            AtomType::Zinc => "Zn",
            AtomType::Calcium => "Ca",
            AtomType::Manganese => "Mn",
            AtomType::Magnesium => "Mg",
            AtomType::Iron => "Fe",
            AtomType::Unknown => "X",
        }
    }

    /// Is this a hydrogen of any kind?
    pub fn is_hydrogen(&self) -> bool {
        matches!(self, AtomType::Hydrogen | AtomType::HydrogenD)
    }

    /// Is this one of the supported metal ions?
    pub fn is_metal(&self) -> bool {
        matches!(
            self,
            AtomType::Zinc
                | AtomType::Calcium
                | AtomType::Manganese
                | AtomType::Magnesium
                | AtomType::Iron
        )
    }

    /// Is this a carbon (aliphatic or aromatic)?
    pub fn is_carbon(&self) -> bool {
        matches!(self, AtomType::Carbon | AtomType::AromaticCarbon)
    }

    /// Nitrogen or oxygen, the heteroatoms that can carry a polar hydrogen
    pub fn is_n_or_o(&self) -> bool {
        matches!(
            self,
            AtomType::Nitrogen | AtomType::NitrogenH | AtomType::Oxygen | AtomType::OxygenH
        )
    }
}

/// Represents an atom in 3D space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Atom type
    pub atom_type: AtomType,

    /// 3D coordinates (in Angstroms)
    pub coordinates: Vector3<f64>,

    /// Atom name from PDB format (e.g., "CA", "N", "O")
    pub name: String,

    /// Atom serial number from PDB
    pub serial: u32,

    /// Residue name this atom belongs to
    pub residue_name: String,

    /// Residue number this atom belongs to
    pub residue_num: i32,

    /// Chain identifier
    pub chain_id: char,

    /// Partial charge
    pub charge: f64,

    /// Read from a HETATM record rather than an ATOM record
    pub is_hetero: bool,
}

impl Atom {
    /// Create a new atom
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        atom_type: AtomType,
        coordinates: Vector3<f64>,
        name: String,
        serial: u32,
        residue_name: String,
        residue_num: i32,
        chain_id: char,
        charge: f64,
    ) -> Self {
        Self {
            atom_type,
            coordinates,
            name,
            serial,
            residue_name,
            residue_num,
            chain_id,
            charge,
            is_hetero: false,
        }
    }

    /// Mark the atom as coming from a HETATM record
    pub fn hetero(mut self) -> Self {
        self.is_hetero = true;
        self
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {}) [{}]",
            self.atom_type.to_pdbqt_string(),
            self.coordinates.x,
            self.coordinates.y,
            self.coordinates.z,
            self.charge
        )
    }
}
