//! Data-parallel driver over many structures
//!
//! Each input is processed independently on the rayon pool. A worker that
//! fails for one structure is logged and contributes its neutral result;
//! the other structures are unaffected.

use log::{info, warn};
use rayon::prelude::*;
use std::fmt::Display;

/// Run `worker` on every input in parallel, keeping the input order
///
/// Returns `(name, result)` pairs; a failed input yields `T::default()`.
pub fn launch<I, T, E, W>(inputs: &[I], worker: W) -> Vec<(String, T)>
where
    I: Sync + Display,
    T: Send + Default,
    E: Display,
    W: Fn(&I) -> Result<T, E> + Sync,
{
    info!("Processing {} structures", inputs.len());

    let results: Vec<(String, T)> = inputs
        .par_iter()
        .map(|input| {
            let name = input.to_string();
            let result = worker(input).unwrap_or_else(|e| {
                warn!("Skipping {}: {}", name, e);
                T::default()
            });
            (name, result)
        })
        .collect();

    info!("Finished {} structures", results.len());
    results
}

/// Run `worker` on every input in parallel and fold the results with
/// `reduce`, which must be commutative and associative
pub fn launch_reduce<I, T, E, W, Id, R>(inputs: &[I], worker: W, identity: Id, reduce: R) -> T
where
    I: Sync + Display,
    T: Send,
    E: Display,
    W: Fn(&I) -> Result<T, E> + Sync,
    Id: Fn() -> T + Sync + Send,
    R: Fn(T, T) -> T + Sync + Send,
{
    info!("Reducing over {} structures", inputs.len());

    inputs
        .par_iter()
        .map(|input| {
            worker(input).unwrap_or_else(|e| {
                warn!("Skipping {}: {}", input, e);
                identity()
            })
        })
        .reduce(&identity, &reduce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{DistributionTable, RadiusLadder, ShellStats};
    use crate::grid::SpatialIndex;
    use crate::scoring::{
        ScoringFunction, StatisticalOptions, StatisticalPotential, TypedAtoms, VinaScore,
    };
    use crate::typing::{autodock_vocabulary, TypeAssignment};
    use nalgebra::Vector3;
    use std::sync::Arc;

    #[test]
    fn test_failed_inputs_become_neutral() {
        let inputs = vec![1u32, 2, 3, 4];
        let results = launch(&inputs, |&x| {
            if x == 3 {
                Err("no candidates")
            } else {
                Ok(vec![x * 10])
            }
        });

        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["1", "2", "3", "4"]);
        assert_eq!(results[1].1, vec![20]);
        assert!(results[2].1.is_empty());
        assert_eq!(results[3].1, vec![40]);
    }

    #[test]
    fn test_reduce_ignores_failures() {
        let inputs: Vec<u64> = (1..=100).collect();
        let total = launch_reduce(
            &inputs,
            |&x| if x % 10 == 0 { Err(format!("bad {}", x)) } else { Ok(x) },
            || 0u64,
            |a, b| a + b,
        );
        let expected: u64 = (1..=100).filter(|x| x % 10 != 0).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn test_empty_batch() {
        let inputs: Vec<String> = Vec::new();
        let results = launch(&inputs, |_| Ok::<u32, String>(1));
        assert!(results.is_empty());
        assert_eq!(launch_reduce(&inputs, |_| Ok::<u32, String>(1), || 0, |a, b| a + b), 0);
    }

    #[test]
    fn test_shared_scorers_match_serial_evaluation() {
        let vocab = autodock_vocabulary();
        let c = vocab.id_of("C").unwrap();
        let n = vocab.id_of("N").unwrap();
        let oa = vocab.id_of("OA").unwrap();

        let mut table = DistributionTable::new(vocab.clone(), RadiusLadder::default());
        for r in [4.0, 5.0, 6.0] {
            table.insert(c, c, r, ShellStats::new(0.5 * r, 0.1)).unwrap();
            table.insert(c, n, r, ShellStats::new(-1.0, 0.2 * r)).unwrap();
            table.insert(n, oa, r, ShellStats::new(2.0, -0.3)).unwrap();
        }
        let table = Arc::new(table);

        // A small lattice of receptor atoms
        let mut receptor_points = Vec::new();
        let mut receptor_ids = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                receptor_points.push(Vector3::new(i as f64 * 1.7, j as f64 * 1.9, 0.0));
                receptor_ids.push([c, n, oa][(i + j) % 3]);
            }
        }
        let receptor = TypeAssignment::new(vocab.clone(), receptor_ids).unwrap();
        let index = SpatialIndex::build(&receptor_points);

        let potential: StatisticalPotential =
            StatisticalPotential::new("fcc".parse::<StatisticalOptions>().unwrap(), 6.0, table)
                .unwrap();
        let vina = VinaScore::default();

        let ligand_types = TypeAssignment::new(vocab, vec![c, n, oa]).unwrap();
        let poses: Vec<Vec<Vector3<f64>>> = (0..64)
            .map(|k| {
                let shift = Vector3::new(k as f64 * 0.13, (k % 7) as f64 * 0.4, 3.5);
                vec![
                    shift,
                    shift + Vector3::new(1.4, 0.0, 0.0),
                    shift + Vector3::new(0.0, 1.3, 0.2),
                ]
            })
            .collect();
        let ids: Vec<usize> = (0..poses.len()).collect();

        let evaluate = |&k: &usize| {
            let ligand = TypedAtoms::new(&poses[k], &ligand_types);
            (
                potential.score_molecule(&index, &receptor, &ligand),
                vina.score_molecule(&index, &receptor, &ligand),
            )
        };

        let serial: Vec<(f64, f64)> = ids.iter().map(evaluate).collect();
        let parallel: Vec<(f64, f64)> = launch(&ids, |k| Ok::<_, String>(evaluate(k)))
            .into_iter()
            .map(|(_, scores)| scores)
            .collect();

        assert_eq!(parallel, serial);
        assert!(serial.iter().any(|&(stat, energy)| stat != 0.0 && energy != 0.0));
    }
}
