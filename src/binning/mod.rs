//! Labelled distance histograms
//!
//! Contacts are counted per `(label, bin)` where the bin is the distance
//! divided by a fixed bin size. Histograms built by independent workers are
//! merged by key-wise addition, so the merge order never matters.

use crate::grid::SpatialIndex;
use crate::scoring::{Locus, TypedAtoms};
use crate::typing::AtomTypeTable;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BinningError {
    #[error("Bin size must be positive and finite, got {0}")]
    InvalidBinSize(f64),

    #[error("Cannot merge histograms with bin sizes {0} and {1}")]
    BinSizeMismatch(f64, f64),
}

/// One output row of a histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramRow<'a> {
    pub label: &'a str,
    /// Lower edge of the bin
    pub distance: f64,
    pub count: u64,
}

/// Counts of contacts per label and distance bin
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHistogram {
    bin_size: f64,
    counts: BTreeMap<(String, u64), u64>,
}

impl DistanceHistogram {
    pub fn new(bin_size: f64) -> Result<Self, BinningError> {
        if !(bin_size.is_finite() && bin_size > 0.0) {
            return Err(BinningError::InvalidBinSize(bin_size));
        }
        Ok(Self {
            bin_size,
            counts: BTreeMap::new(),
        })
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of counted contacts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, label: &str, bin: u64) -> u64 {
        self.counts
            .get(&(label.to_string(), bin))
            .copied()
            .unwrap_or(0)
    }

    /// Count one contact; negative or non-finite distances are ignored
    pub fn accumulate(&mut self, label: &str, distance: f64) {
        if !(distance.is_finite() && distance >= 0.0) {
            return;
        }
        let bin = (distance / self.bin_size).floor() as u64;
        *self.counts.entry((label.to_string(), bin)).or_insert(0) += 1;
    }

    /// Add every count of `other` into `self`
    pub fn merge(&mut self, other: &DistanceHistogram) -> Result<(), BinningError> {
        if self.bin_size != other.bin_size {
            return Err(BinningError::BinSizeMismatch(self.bin_size, other.bin_size));
        }
        for (key, count) in &other.counts {
            *self.counts.entry(key.clone()).or_insert(0) += count;
        }
        Ok(())
    }

    /// Count every receptor/ligand contact of `locus` between
    /// `vdw_coef * (R_rec + R_lig)` and `max_distance`
    ///
    /// Bins are labelled `{receptor type}_{ligand type}`. For a residue
    /// locus the residue's own atoms are neighbors like any other; the self
    /// pair and bonded partners fall under the van der Waals floor.
    pub fn accumulate_contacts(
        &mut self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
        vdw_coef: f64,
        max_distance: f64,
    ) {
        let before = self.total();

        for lig_atom in locus.atoms(ligand.len()) {
            let lig_type = ligand.types.type_of(lig_atom);
            let lig_radius = ligand.types.van_der_waals_radius(lig_type);
            let lig_name = ligand.types.name_of(lig_type);

            index.for_each_neighbor(&ligand.positions[lig_atom], max_distance, |rec_atom, dist_sq| {
                if rec_atom >= receptor.atom_count() {
                    return;
                }

                let rec_type = receptor.type_of(rec_atom);
                let distance = dist_sq.sqrt();
                let closest = vdw_coef * (receptor.van_der_waals_radius(rec_type) + lig_radius);
                if distance < closest {
                    return;
                }

                let label = format!("{}_{}", receptor.name_of(rec_type), lig_name);
                self.accumulate(&label, distance);
            });
        }

        debug!("Counted {} contacts", self.total() - before);
    }

    /// Rows in label then bin order
    pub fn rows(&self) -> impl Iterator<Item = HistogramRow<'_>> + '_ {
        self.counts.iter().map(move |((label, bin), &count)| HistogramRow {
            label,
            distance: *bin as f64 * self.bin_size,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::{autodock_vocabulary, TypeAssignment};
    use nalgebra::Vector3;

    fn histogram(entries: &[(&str, f64)]) -> DistanceHistogram {
        let mut h = DistanceHistogram::new(0.5).unwrap();
        for &(label, d) in entries {
            h.accumulate(label, d);
        }
        h
    }

    #[test]
    fn test_invalid_bin_size() {
        assert_eq!(
            DistanceHistogram::new(0.0).unwrap_err(),
            BinningError::InvalidBinSize(0.0)
        );
        assert!(DistanceHistogram::new(-1.0).is_err());
        assert!(DistanceHistogram::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_accumulate_bins_by_floor() {
        let h = histogram(&[("C_C", 0.1), ("C_C", 0.49), ("C_C", 0.5), ("C_N", 3.2)]);
        assert_eq!(h.count("C_C", 0), 2);
        assert_eq!(h.count("C_C", 1), 1);
        assert_eq!(h.count("C_N", 6), 1);
        assert_eq!(h.total(), 4);
    }

    #[test]
    fn test_bad_distances_are_ignored() {
        let h = histogram(&[("C_C", -0.1), ("C_C", f64::NAN), ("C_C", f64::INFINITY)]);
        assert!(h.is_empty());
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let a = histogram(&[("C_C", 1.0), ("C_N", 2.0)]);
        let b = histogram(&[("C_C", 1.1), ("O_N", 0.2)]);
        let c = histogram(&[("C_N", 2.3), ("O_N", 7.0), ("O_N", 7.1)]);

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, ba);

        let mut ab_c = ab.clone();
        ab_c.merge(&c).unwrap();
        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut a_bc = a.clone();
        a_bc.merge(&bc).unwrap();
        assert_eq!(ab_c, a_bc);
        assert_eq!(ab_c.count("C_C", 2), 2);
        assert_eq!(ab_c.count("O_N", 14), 2);
    }

    #[test]
    fn test_merge_rejects_other_bin_sizes() {
        let mut a = DistanceHistogram::new(0.5).unwrap();
        let b = DistanceHistogram::new(0.25).unwrap();
        assert_eq!(a.merge(&b), Err(BinningError::BinSizeMismatch(0.5, 0.25)));
    }

    #[test]
    fn test_rows_report_lower_edges() {
        let h = histogram(&[("C_N", 1.2), ("C_C", 0.7)]);
        let rows: Vec<_> = h.rows().map(|r| (r.label.to_string(), r.distance, r.count)).collect();
        assert_eq!(
            rows,
            vec![("C_C".to_string(), 0.5, 1), ("C_N".to_string(), 1.0, 1)]
        );
    }

    #[test]
    fn test_contacts_skip_clashes_and_far_pairs() {
        let vocab = autodock_vocabulary();
        let c = vocab.id_of("C").unwrap();
        let n = vocab.id_of("N").unwrap();
        let r_c = vocab.info(c).unwrap().vdw_radius;
        let r_n = vocab.info(n).unwrap().vdw_radius;

        let receptor_points = vec![
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(20.0, 0.0, 0.0),
        ];
        let receptor = TypeAssignment::new(vocab.clone(), vec![c, c, c]).unwrap();
        let ligand_points = vec![Vector3::zeros()];
        let ligand_types = TypeAssignment::new(vocab, vec![n]).unwrap();
        let ligand = TypedAtoms::new(&ligand_points, &ligand_types);
        let index = SpatialIndex::build(&receptor_points);
        assert!(0.75 * (r_c + r_n) > 0.5);

        let mut h = DistanceHistogram::new(0.5).unwrap();
        h.accumulate_contacts(&index, &receptor, &ligand, &Locus::Molecule, 0.75, 15.0);
        assert_eq!(h.total(), 1);
        assert_eq!(h.count("C_N", 8), 1);
    }

    #[test]
    fn test_contacts_within_a_residue_are_counted() {
        let vocab = autodock_vocabulary();
        let c = vocab.id_of("C").unwrap();

        // one two-atom residue, no other atoms
        let points = vec![Vector3::zeros(), Vector3::new(4.0, 0.0, 0.0)];
        let types = TypeAssignment::new(vocab, vec![c, c]).unwrap();
        let ligand = TypedAtoms::new(&points, &types);
        let index = SpatialIndex::build(&points);

        let mut h = DistanceHistogram::new(0.5).unwrap();
        h.accumulate_contacts(&index, &types, &ligand, &Locus::Residue(&[0, 1]), 0.75, 15.0);
        assert_eq!(h.total(), 2);
        assert_eq!(h.count("C_C", 8), 2);
    }
}
