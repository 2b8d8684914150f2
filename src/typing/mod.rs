//! Atom typing: type vocabularies and the per-structure type tables the
//! scorers consume
//!
//! Scorers only ever see the [`AtomTypeTable`] trait. How a table was
//! produced (read from PDBQT types, perceived by an external tool, restricted
//! by a driver) is not their concern.

pub mod xs;

use crate::atom::AtomType;
use crate::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Index of a type inside its vocabulary
pub type TypeId = usize;

/// Errors that can occur when building vocabularies or type tables
#[derive(Error, Debug, PartialEq)]
pub enum TypingError {
    #[error("Duplicate type name in vocabulary: {0}")]
    DuplicateName(String),

    #[error("Type {name} maps to reduced class {reduced}, outside the vocabulary")]
    InvalidReducedClass { name: String, reduced: TypeId },

    #[error("Atom {atom} has type id {id}, but the vocabulary has {len} types")]
    UnknownTypeId { atom: usize, id: TypeId, len: usize },
}

/// Interaction roles of a type, as used by the empirical energy terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFlags {
    pub hydrophobic: bool,
    pub donor: bool,
    pub acceptor: bool,
    pub hydrogen: bool,
}

impl ContactFlags {
    pub const NONE: ContactFlags = ContactFlags {
        hydrophobic: false,
        donor: false,
        acceptor: false,
        hydrogen: false,
    };

    pub const fn hydrophobic() -> Self {
        ContactFlags {
            hydrophobic: true,
            ..Self::NONE
        }
    }

    pub const fn polar(donor: bool, acceptor: bool) -> Self {
        ContactFlags {
            donor,
            acceptor,
            ..Self::NONE
        }
    }

    pub const fn hydrogen() -> Self {
        ContactFlags {
            hydrogen: true,
            ..Self::NONE
        }
    }

    /// Can these two atoms form a hydrogen bond in either direction?
    pub fn forms_h_bond_with(&self, other: &ContactFlags) -> bool {
        (self.donor && other.acceptor) || (self.acceptor && other.donor)
    }
}

/// Metadata for one type of a vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    /// Van der Waals radius in Angstroms
    pub vdw_radius: f64,
    /// Representative type of the coarser class this type belongs to
    pub reduced: TypeId,
    pub flags: ContactFlags,
}

/// An ordered, named set of atom types
#[derive(Debug, Clone)]
pub struct Vocabulary {
    name: String,
    types: Vec<TypeInfo>,
    by_name: HashMap<String, TypeId>,
}

impl Vocabulary {
    /// Build a vocabulary; type ids are positions in `types`
    pub fn new(name: &str, types: Vec<TypeInfo>) -> Result<Self, TypingError> {
        let mut by_name = HashMap::with_capacity(types.len());

        for (id, info) in types.iter().enumerate() {
            if info.reduced >= types.len() {
                return Err(TypingError::InvalidReducedClass {
                    name: info.name.clone(),
                    reduced: info.reduced,
                });
            }
            if by_name.insert(info.name.clone(), id).is_some() {
                return Err(TypingError::DuplicateName(info.name.clone()));
            }
        }

        Ok(Self {
            name: name.to_string(),
            types,
            by_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn info(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id)
    }

    /// Resolve a type name
    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Coarse class of a type; ids outside the vocabulary map to themselves
    pub fn reduced_class(&self, id: TypeId) -> TypeId {
        self.types.get(id).map_or(id, |info| info.reduced)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types.iter().enumerate()
    }
}

/// Read-only view of the atom types of one structure
///
/// `type_of` is indexed by atom; the remaining methods are indexed by type id.
pub trait AtomTypeTable: Send + Sync {
    /// Number of typed atoms
    fn atom_count(&self) -> usize;

    /// Type of one atom
    fn type_of(&self, atom: usize) -> TypeId;

    fn name_of(&self, id: TypeId) -> &str;

    fn van_der_waals_radius(&self, id: TypeId) -> f64;

    /// Coarse class of a type, used by reduced-granularity scoring
    fn reduced_class(&self, id: TypeId) -> TypeId;

    /// Interaction roles of a type; types carry none unless the scheme says so
    fn contact_flags(&self, _id: TypeId) -> ContactFlags {
        ContactFlags::NONE
    }

    /// Distinct types present in this table
    fn all_types(&self) -> HashSet<TypeId> {
        (0..self.atom_count()).map(|atom| self.type_of(atom)).collect()
    }
}

/// Per-atom type ids drawn from a shared vocabulary
#[derive(Debug, Clone)]
pub struct TypeAssignment {
    vocabulary: Arc<Vocabulary>,
    ids: Vec<TypeId>,
}

impl TypeAssignment {
    pub fn new(vocabulary: Arc<Vocabulary>, ids: Vec<TypeId>) -> Result<Self, TypingError> {
        let len = vocabulary.len();
        if let Some((atom, &id)) = ids.iter().enumerate().find(|&(_, &id)| id >= len) {
            return Err(TypingError::UnknownTypeId { atom, id, len });
        }

        Ok(Self { vocabulary, ids })
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn ids(&self) -> &[TypeId] {
        &self.ids
    }
}

impl AtomTypeTable for TypeAssignment {
    fn atom_count(&self) -> usize {
        self.ids.len()
    }

    fn type_of(&self, atom: usize) -> TypeId {
        self.ids[atom]
    }

    fn name_of(&self, id: TypeId) -> &str {
        self.vocabulary.info(id).map_or("?", |info| info.name.as_str())
    }

    fn van_der_waals_radius(&self, id: TypeId) -> f64 {
        self.vocabulary.info(id).map_or(0.0, |info| info.vdw_radius)
    }

    fn reduced_class(&self, id: TypeId) -> TypeId {
        self.vocabulary.reduced_class(id)
    }

    fn contact_flags(&self, id: TypeId) -> ContactFlags {
        self.vocabulary
            .info(id)
            .map_or(ContactFlags::NONE, |info| info.flags)
    }
}

/// Position of an AutoDock type in [`autodock_vocabulary`]
pub fn autodock_id(atom_type: AtomType) -> TypeId {
    AtomType::ALL
        .iter()
        .position(|t| *t == atom_type)
        .unwrap_or(AtomType::ALL.len() - 1)
}

/// Representative member of the element family an AutoDock type belongs to
fn autodock_family(atom_type: AtomType) -> AtomType {
    match atom_type {
        AtomType::Carbon | AtomType::AromaticCarbon => AtomType::Carbon,
        AtomType::Nitrogen | AtomType::NitrogenH => AtomType::Nitrogen,
        AtomType::Oxygen | AtomType::OxygenH => AtomType::Oxygen,
        AtomType::Sulfur | AtomType::SulfurH => AtomType::Sulfur,
        AtomType::Phosphorus => AtomType::Phosphorus,
        AtomType::Fluorine | AtomType::Chlorine | AtomType::Bromine | AtomType::Iodine => {
            AtomType::Fluorine
        }
        AtomType::Hydrogen | AtomType::HydrogenD => AtomType::Hydrogen,
        AtomType::Zinc
        | AtomType::Calcium
        | AtomType::Manganese
        | AtomType::Magnesium
        | AtomType::Iron => AtomType::Zinc,
        AtomType::Unknown => AtomType::Unknown,
    }
}

fn build_autodock() -> Vocabulary {
    let types = AtomType::ALL
        .iter()
        .map(|&t| {
            let flags = match t {
                AtomType::Carbon
                | AtomType::AromaticCarbon
                | AtomType::Fluorine
                | AtomType::Chlorine
                | AtomType::Bromine
                | AtomType::Iodine => ContactFlags::hydrophobic(),
                AtomType::NitrogenH | AtomType::OxygenH | AtomType::SulfurH => {
                    ContactFlags::polar(false, true)
                }
                AtomType::Hydrogen => ContactFlags::hydrogen(),
                AtomType::HydrogenD => ContactFlags {
                    donor: true,
                    hydrogen: true,
                    ..ContactFlags::NONE
                },
                _ => ContactFlags::NONE,
            };
            TypeInfo {
                name: t.to_pdbqt_string().to_string(),
                vdw_radius: t.radius(),
                reduced: autodock_id(autodock_family(t)),
                flags,
            }
        })
        .collect();

    // Names and reduced classes are fixed above and always valid
    match Vocabulary::new("autodock", types) {
        Ok(vocabulary) => vocabulary,
        Err(e) => unreachable!("built-in AutoDock vocabulary is invalid: {}", e),
    }
}

/// The AutoDock 4 atom types, reduced to element families
pub fn autodock_vocabulary() -> Arc<Vocabulary> {
    static AUTODOCK: OnceLock<Arc<Vocabulary>> = OnceLock::new();
    AUTODOCK.get_or_init(|| Arc::new(build_autodock())).clone()
}

/// Type a molecule with the AutoDock types read from its PDBQT records
pub fn autodock_types(molecule: &Molecule) -> TypeAssignment {
    TypeAssignment {
        vocabulary: autodock_vocabulary(),
        ids: molecule
            .atoms
            .iter()
            .map(|atom| autodock_id(atom.atom_type))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use nalgebra::Vector3;

    fn info(name: &str, reduced: TypeId) -> TypeInfo {
        TypeInfo {
            name: name.to_string(),
            vdw_radius: 1.5,
            reduced,
            flags: ContactFlags::NONE,
        }
    }

    #[test]
    fn test_vocabulary_validation() {
        assert_eq!(
            Vocabulary::new("v", vec![info("A", 0), info("A", 0)]).unwrap_err(),
            TypingError::DuplicateName("A".to_string())
        );
        assert!(matches!(
            Vocabulary::new("v", vec![info("A", 3)]),
            Err(TypingError::InvalidReducedClass { reduced: 3, .. })
        ));

        let vocab = Vocabulary::new("v", vec![info("A", 0), info("B", 0)]).unwrap();
        assert_eq!(vocab.id_of("B"), Some(1));
        assert_eq!(vocab.reduced_class(1), 0);
        assert_eq!(vocab.reduced_class(99), 99);
    }

    #[test]
    fn test_assignment_rejects_ids_outside_vocabulary() {
        let vocab = Arc::new(Vocabulary::new("v", vec![info("A", 0)]).unwrap());
        assert_eq!(
            TypeAssignment::new(vocab.clone(), vec![0, 4]).unwrap_err(),
            TypingError::UnknownTypeId {
                atom: 1,
                id: 4,
                len: 1
            }
        );

        let table = TypeAssignment::new(vocab, vec![0, 0]).unwrap();
        assert_eq!(table.atom_count(), 2);
        assert_eq!(table.name_of(0), "A");
        assert_eq!(table.name_of(7), "?");
        assert_eq!(table.all_types(), HashSet::from([0]));
    }

    #[test]
    fn test_autodock_reduction_is_by_element_family() {
        let vocab = autodock_vocabulary();
        let carbon = vocab.id_of("C").unwrap();
        let aromatic = vocab.id_of("A").unwrap();
        let acceptor_o = vocab.id_of("OA").unwrap();
        let bromine = vocab.id_of("Br").unwrap();

        assert_eq!(vocab.reduced_class(aromatic), carbon);
        assert_eq!(vocab.reduced_class(acceptor_o), vocab.id_of("O").unwrap());
        assert_eq!(vocab.reduced_class(bromine), vocab.id_of("F").unwrap());
        assert!(vocab.info(acceptor_o).unwrap().flags.acceptor);
    }

    #[test]
    fn test_autodock_types_follow_pdbqt_types() {
        let mut mol = Molecule::new("m");
        for t in [AtomType::OxygenH, AtomType::AromaticCarbon] {
            mol.add_atom(Atom::new(
                t,
                Vector3::zeros(),
                "X".into(),
                1,
                "LIG".into(),
                1,
                'A',
                0.0,
            ));
        }

        let table = autodock_types(&mol);
        assert_eq!(table.name_of(table.type_of(0)), "OA");
        assert_eq!(table.name_of(table.type_of(1)), "A");
        assert_eq!(table.van_der_waals_radius(table.type_of(0)), 1.6);
    }
}
