//! Vina-like empirical energy
//!
//! Five terms over the surface distance `d = r - (R_i + R_j)` between a
//! receptor and a ligand heavy atom: two attractive gaussians, a quadratic
//! repulsion, a hydrophobic contact term and a hydrogen bond term. The
//! energy is the weighted sum of the five.

use super::{Locus, ScoringError, ScoringFunction, TypedAtoms};
use crate::grid::SpatialIndex;
use crate::typing::{AtomTypeTable, ContactFlags};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::ops::AddAssign;
use std::path::Path;

/// A gaussian `exp(-((d - offset) / width)^2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianTerm {
    pub offset: f64,
    pub width: f64,
}

impl GaussianTerm {
    pub fn eval(&self, d: f64) -> f64 {
        let x = (d - self.offset) / self.width;
        (-x * x).exp()
    }
}

/// Parameters of the Vina energy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VinaParams {
    // Weights for each component of the scoring function
    pub weight_gauss1: f64,
    pub weight_gauss2: f64,
    pub weight_repulsion: f64,
    pub weight_hydrophobic: f64,
    pub weight_hydrogen: f64,
    /// Torsional penalty per rotatable bond, used by `normalized_affinity`
    pub weight_rot: f64,

    pub gauss1: GaussianTerm,
    pub gauss2: GaussianTerm,

    /// Surface distance at and below which the hydrophobic term is 1
    pub hydrophobic_good: f64,
    /// Surface distance at and above which the hydrophobic term is 0
    pub hydrophobic_bad: f64,
    pub hydrogen_good: f64,
    pub hydrogen_bad: f64,

    /// Interatomic distance beyond which no pair contributes
    pub cutoff: f64,
}

impl Default for VinaParams {
    fn default() -> Self {
        // Default parameters from the Vina paper
        Self {
            weight_gauss1: -0.0356,
            weight_gauss2: -0.00516,
            weight_repulsion: 0.840,
            weight_hydrophobic: -0.0351,
            weight_hydrogen: -0.587,
            weight_rot: 0.05846,

            gauss1: GaussianTerm {
                offset: 0.0,
                width: 0.5,
            },
            gauss2: GaussianTerm {
                offset: 3.0,
                width: 2.0,
            },

            hydrophobic_good: 0.5,
            hydrophobic_bad: 1.5,
            hydrogen_good: -0.7,
            hydrogen_bad: 0.0,

            cutoff: 8.0,
        }
    }
}

impl VinaParams {
    /// Reject parameters the terms cannot be evaluated with
    pub fn validate(&self) -> Result<(), ScoringError> {
        let invalid = |name: &'static str, value: f64| ScoringError::InvalidParameter { name, value };

        let weights = [
            ("weight_gauss1", self.weight_gauss1),
            ("weight_gauss2", self.weight_gauss2),
            ("weight_repulsion", self.weight_repulsion),
            ("weight_hydrophobic", self.weight_hydrophobic),
            ("weight_hydrogen", self.weight_hydrogen),
            ("weight_rot", self.weight_rot),
            ("gauss1.offset", self.gauss1.offset),
            ("gauss2.offset", self.gauss2.offset),
        ];
        if let Some(&(name, value)) = weights.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(name, value));
        }

        for (name, width) in [("gauss1.width", self.gauss1.width), ("gauss2.width", self.gauss2.width)] {
            if !(width.is_finite() && width > 0.0) {
                return Err(invalid(name, width));
            }
        }
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(invalid("cutoff", self.cutoff));
        }
        if !(self.hydrophobic_good < self.hydrophobic_bad) {
            return Err(invalid("hydrophobic_good", self.hydrophobic_good));
        }
        if !(self.hydrogen_good < self.hydrogen_bad) {
            return Err(invalid("hydrogen_good", self.hydrogen_good));
        }
        Ok(())
    }

    /// Read parameters from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let params: VinaParams = serde_json::from_reader(reader)?;
        params.validate()?;
        info!("Loaded Vina parameters from {}", path.display());
        Ok(params)
    }

    /// Energy divided by the torsional penalty of `rotatable` bonds
    pub fn normalized_affinity(&self, energy: f64, rotatable: usize) -> f64 {
        energy / (1.0 + self.weight_rot * rotatable as f64)
    }
}

/// 1 at and below `good`, 0 at and above `bad`, linear in between
fn slope_step(good: f64, bad: f64, d: f64) -> f64 {
    if d <= good {
        1.0
    } else if d >= bad {
        0.0
    } else {
        (bad - d) / (bad - good)
    }
}

/// Unweighted sums of the five terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VinaComponents {
    pub g1: f64,
    pub g2: f64,
    pub rep: f64,
    pub hydrogen: f64,
    pub hydrophobic: f64,
}

impl VinaComponents {
    /// Weighted sum of the terms
    pub fn weighted(&self, params: &VinaParams) -> f64 {
        params.weight_gauss1 * self.g1
            + params.weight_gauss2 * self.g2
            + params.weight_repulsion * self.rep
            + params.weight_hydrogen * self.hydrogen
            + params.weight_hydrophobic * self.hydrophobic
    }
}

impl AddAssign for VinaComponents {
    fn add_assign(&mut self, other: Self) {
        self.g1 += other.g1;
        self.g2 += other.g2;
        self.rep += other.rep;
        self.hydrogen += other.hydrogen;
        self.hydrophobic += other.hydrophobic;
    }
}

/// Vina empirical scorer
#[derive(Debug, Clone, Default)]
pub struct VinaScore {
    params: VinaParams,
}

impl VinaScore {
    pub fn new(params: VinaParams) -> Result<Self, ScoringError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &VinaParams {
        &self.params
    }

    /// Terms of a single heavy atom pair at interatomic distance `r`
    pub fn pair_components(
        &self,
        r: f64,
        radius_a: f64,
        flags_a: ContactFlags,
        radius_b: f64,
        flags_b: ContactFlags,
    ) -> VinaComponents {
        if r > self.params.cutoff {
            return VinaComponents::default();
        }

        let d = r - (radius_a + radius_b);
        let p = &self.params;

        let hydrophobic = if flags_a.hydrophobic && flags_b.hydrophobic {
            slope_step(p.hydrophobic_good, p.hydrophobic_bad, d)
        } else {
            0.0
        };
        let hydrogen = if flags_a.forms_h_bond_with(&flags_b) {
            slope_step(p.hydrogen_good, p.hydrogen_bad, d)
        } else {
            0.0
        };

        VinaComponents {
            g1: p.gauss1.eval(d),
            g2: p.gauss2.eval(d),
            rep: if d < 0.0 { d * d } else { 0.0 },
            hydrogen,
            hydrophobic,
        }
    }

    /// Term sums over every receptor/ligand heavy atom pair of the locus
    pub fn components_for(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
    ) -> VinaComponents {
        let excluded = locus.excluded();
        let mut total = VinaComponents::default();

        for lig_atom in locus.atoms(ligand.len()) {
            let lig_type = ligand.types.type_of(lig_atom);
            let lig_flags = ligand.types.contact_flags(lig_type);
            if lig_flags.hydrogen {
                continue;
            }
            let lig_radius = ligand.types.van_der_waals_radius(lig_type);

            index.for_each_neighbor(&ligand.positions[lig_atom], self.params.cutoff, |rec_atom, dist_sq| {
                if rec_atom >= receptor.atom_count() {
                    return;
                }
                if excluded.as_ref().map_or(false, |own| own.contains(&rec_atom)) {
                    return;
                }

                let rec_type = receptor.type_of(rec_atom);
                let rec_flags = receptor.contact_flags(rec_type);
                if rec_flags.hydrogen {
                    return;
                }

                total += self.pair_components(
                    dist_sq.sqrt(),
                    receptor.van_der_waals_radius(rec_type),
                    rec_flags,
                    lig_radius,
                    lig_flags,
                );
            });
        }

        total
    }

    /// Term sums for a whole ligand
    pub fn calculate_components(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
    ) -> VinaComponents {
        self.components_for(index, receptor, ligand, &Locus::Molecule)
    }
}

impl ScoringFunction for VinaScore {
    fn name(&self) -> String {
        "vina".to_string()
    }

    fn score(
        &self,
        index: &SpatialIndex,
        receptor: &dyn AtomTypeTable,
        ligand: &TypedAtoms<'_>,
        locus: &Locus<'_>,
    ) -> f64 {
        self.components_for(index, receptor, ligand, locus)
            .weighted(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::xs::{ids, xs_vocabulary};
    use crate::typing::TypeAssignment;
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::Vector3;

    fn xs(ids: Vec<usize>) -> TypeAssignment {
        TypeAssignment::new(xs_vocabulary(), ids).unwrap()
    }

    #[test]
    fn test_default_params_are_valid() {
        let params = VinaParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.cutoff, 8.0);
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let mut params = VinaParams::default();
        params.gauss1.width = 0.0;
        assert_eq!(
            VinaScore::new(params).unwrap_err(),
            ScoringError::InvalidParameter {
                name: "gauss1.width",
                value: 0.0
            }
        );

        let mut params = VinaParams::default();
        params.cutoff = f64::NAN;
        assert!(VinaScore::new(params).is_err());
    }

    #[test]
    fn test_slope_step() {
        assert_eq!(slope_step(0.5, 1.5, 0.2), 1.0);
        assert_eq!(slope_step(0.5, 1.5, 1.5), 0.0);
        assert_approx_eq!(slope_step(0.5, 1.5, 1.0), 0.5);
        assert_approx_eq!(slope_step(-0.7, 0.0, -0.35), 0.5);
    }

    #[test]
    fn test_pair_terms_at_contact() {
        let vina = VinaScore::default();
        let c = ContactFlags::hydrophobic();
        // Two hydrophobic carbons exactly touching: d = 0
        let terms = vina.pair_components(3.8, 1.9, c, 1.9, c);
        assert_approx_eq!(terms.g1, 1.0);
        assert_approx_eq!(terms.g2, (-2.25f64).exp());
        assert_eq!(terms.rep, 0.0);
        assert_eq!(terms.hydrophobic, 1.0);
        assert_eq!(terms.hydrogen, 0.0);
    }

    #[test]
    fn test_overlap_and_hydrogen_bond() {
        let vina = VinaScore::default();
        let donor = ContactFlags::polar(true, false);
        let acceptor = ContactFlags::polar(false, true);

        // d = 2.5 - 3.5 = -1.0
        let terms = vina.pair_components(2.5, 1.8, donor, 1.7, acceptor);
        assert_approx_eq!(terms.rep, 1.0);
        assert_eq!(terms.hydrogen, 1.0);
        assert_eq!(terms.hydrophobic, 0.0);

        // Two donors never bond
        let terms = vina.pair_components(2.5, 1.8, donor, 1.8, donor);
        assert_eq!(terms.hydrogen, 0.0);
    }

    #[test]
    fn test_repulsion_only_inside_the_radius_sum() {
        let vina = VinaScore::default();
        let n = ContactFlags::NONE;
        for r in [3.6, 4.0, 5.0, 7.9] {
            assert_eq!(vina.pair_components(r, 1.8, n, 1.8, n).rep, 0.0);
        }
        for r in [0.5, 2.0, 3.59] {
            assert!(vina.pair_components(r, 1.8, n, 1.8, n).rep > 0.0);
        }
    }

    #[test]
    fn test_terms_vanish_past_the_cutoff() {
        let vina = VinaScore::default();
        let c = ContactFlags::hydrophobic();
        assert_eq!(vina.pair_components(8.01, 1.9, c, 1.9, c), VinaComponents::default());
        assert!(vina.pair_components(8.0, 1.9, c, 1.9, c).g2 > 0.0);
    }

    #[test]
    fn test_score_is_symmetric_in_receptor_and_ligand() {
        let a_points = vec![Vector3::zeros(), Vector3::new(1.5, 0.0, 0.0)];
        let b_points = vec![Vector3::new(3.2, 0.5, 0.0), Vector3::new(0.0, 3.9, 0.0)];
        let a_types = xs(vec![ids::C_H, ids::O_DA]);
        let b_types = xs(vec![ids::N_A, ids::C_H]);

        let vina = VinaScore::default();
        let ab = vina.score_molecule(
            &SpatialIndex::build(&a_points),
            &a_types,
            &TypedAtoms::new(&b_points, &b_types),
        );
        let ba = vina.score_molecule(
            &SpatialIndex::build(&b_points),
            &b_types,
            &TypedAtoms::new(&a_points, &a_types),
        );
        assert_approx_eq!(ab, ba);
        assert!(ab != 0.0);
    }

    #[test]
    fn test_hydrogens_are_skipped() {
        let receptor_points = vec![Vector3::new(1.0, 0.0, 0.0)];
        let ligand_points = vec![Vector3::zeros()];
        let index = SpatialIndex::build(&receptor_points);
        let vina = VinaScore::default();

        let receptor = xs(vec![ids::H]);
        let ligand_types = xs(vec![ids::O_A]);
        let ligand = TypedAtoms::new(&ligand_points, &ligand_types);
        assert_eq!(
            vina.calculate_components(&index, &receptor, &ligand),
            VinaComponents::default()
        );
    }

    #[test]
    fn test_weighted_matches_score() {
        let receptor_points = vec![Vector3::new(3.0, 0.0, 0.0), Vector3::new(0.0, 4.5, 0.0)];
        let ligand_points = vec![Vector3::zeros()];
        let index = SpatialIndex::build(&receptor_points);
        let receptor = xs(vec![ids::O_A, ids::C_H]);
        let ligand_types = xs(vec![ids::N_D]);
        let ligand = TypedAtoms::new(&ligand_points, &ligand_types);

        let vina = VinaScore::default();
        let components = vina.calculate_components(&index, &receptor, &ligand);
        assert!(components.hydrogen > 0.0);
        assert_approx_eq!(
            components.weighted(vina.params()),
            vina.score_molecule(&index, &receptor, &ligand)
        );
    }

    #[test]
    fn test_normalized_affinity() {
        let params = VinaParams::default();
        assert_eq!(params.normalized_affinity(-7.0, 0), -7.0);
        assert_approx_eq!(params.normalized_affinity(-7.0, 5), -7.0 / 1.2923);
    }

    #[test]
    fn test_params_from_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"weight_hydrogen": -1.0, "cutoff": 6.0}"#).unwrap();

        let params = VinaParams::from_json_file(&path).unwrap();
        assert_eq!(params.weight_hydrogen, -1.0);
        assert_eq!(params.cutoff, 6.0);
        assert_eq!(params.weight_gauss1, -0.0356);
    }
}
