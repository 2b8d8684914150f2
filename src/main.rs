//! Main executable for contact-score

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contact_score::binning::DistanceHistogram;
use contact_score::distribution::{DistributionTable, RadiusLadder};
use contact_score::grid::SpatialIndex;
use contact_score::io::{parse_pdbqt, parse_pdbqt_models};
use contact_score::molecule::Molecule;
use contact_score::scoring::{
    Granularity, Locus, ScoringFunction, StatisticalOptions, StatisticalPotential, TypedAtoms,
    VinaComponents, VinaParams, VinaScore,
};
use contact_score::selection::{self, PartnerContact, DEFAULT_MIN_ATOMS};
use contact_score::typing::{
    autodock_types, autodock_vocabulary, xs, AtomTypeTable, TypeAssignment, TypeId, Vocabulary,
};
use contact_score::batch;

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "contact-score",
    version = contact_score::VERSION,
    author = "Author <author@example.com>",
    about = "Statistical and empirical scoring of receptor/ligand contacts"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

/// Atom typing scheme used for distributions and labels
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Typing {
    /// AutoDock 4 types as written in the PDBQT records
    Autodock,
    /// X-Score types perceived from covalent neighbors
    Xs,
}

impl Typing {
    fn vocabulary(self) -> Arc<Vocabulary> {
        match self {
            Typing::Autodock => autodock_vocabulary(),
            Typing::Xs => xs::xs_vocabulary(),
        }
    }

    fn assign(self, molecule: &Molecule) -> TypeAssignment {
        match self {
            Typing::Autodock => autodock_types(molecule),
            Typing::Xs => xs::assign_xs_types(molecule),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Vina energy terms of every ligand pose against a receptor
    Poses {
        /// PDBQT file containing the receptor
        #[clap(long, value_parser)]
        receptor: PathBuf,

        /// PDBQT files containing the ligand poses (every model is scored)
        #[clap(long, value_parser, required = true)]
        ligands: Vec<PathBuf>,

        /// JSON file overriding the default Vina parameters
        #[clap(long, value_parser)]
        params: Option<PathBuf>,

        /// Distribution file; adds the statistical potential columns
        #[clap(long, value_parser)]
        distributions: Option<PathBuf>,

        /// Variants to compute, e.g. rmc,fcr (default: all eight)
        #[clap(long, value_delimiter = ',')]
        variants: Vec<StatisticalOptions>,

        /// Smallest cutoff radius
        #[clap(long, default_value = "4.0")]
        min_radius: f64,

        /// Largest cutoff radius
        #[clap(long, default_value = "15.0")]
        max_radius: f64,

        /// Type vocabulary of the distribution file
        #[clap(long, value_enum, default_value = "autodock")]
        types: Typing,

        /// Print JSON instead of tab separated rows
        #[clap(long)]
        json: bool,
    },

    /// Statistical potential of the residues of one or more structures
    Residues {
        /// PDBQT structures to score
        #[clap(long = "structure", value_parser, required = true)]
        structures: Vec<PathBuf>,

        /// Distribution file with the reference statistics
        #[clap(long, value_parser)]
        distributions: PathBuf,

        /// Variants to compute, e.g. rmc,fcr (default: all eight)
        #[clap(long, value_delimiter = ',')]
        variants: Vec<StatisticalOptions>,

        /// Smallest cutoff radius
        #[clap(long, default_value = "4.0")]
        min_radius: f64,

        /// Largest cutoff radius
        #[clap(long, default_value = "15.0")]
        max_radius: f64,

        /// Type vocabulary of the distribution file
        #[clap(long, value_enum, default_value = "autodock")]
        types: Typing,

        /// Score only the pruned small molecules instead of every residue
        #[clap(long)]
        small_molecules: bool,

        /// Smallest small molecule, in heavy atoms
        #[clap(long, default_value_t = DEFAULT_MIN_ATOMS)]
        min_atoms: usize,

        /// Print JSON instead of tab separated rows
        #[clap(long)]
        json: bool,
    },

    /// Histogram of small molecule contact distances over many structures
    Bins {
        /// PDBQT structures to scan
        #[clap(value_parser, required = true)]
        structures: Vec<PathBuf>,

        /// Width of a distance bin
        #[clap(long, default_value = "0.001")]
        bin_size: f64,

        /// Longest contact counted
        #[clap(long, default_value = "15.0")]
        max_dist: f64,

        /// Contacts shorter than this fraction of the radius sum are skipped
        #[clap(long, default_value = "0.75")]
        vdw_coef: f64,

        /// Type vocabulary used for the labels
        #[clap(long, value_enum, default_value = "autodock")]
        types: Typing,

        /// Smallest small molecule, in heavy atoms
        #[clap(long, default_value_t = DEFAULT_MIN_ATOMS)]
        min_atoms: usize,

        /// Print JSON instead of tab separated rows
        #[clap(long)]
        json: bool,
    },

    /// Small molecule atoms near polymer, water, cofactor and ion atoms
    Contacts {
        /// PDBQT structures to scan
        #[clap(value_parser, required = true)]
        structures: Vec<PathBuf>,

        /// Longest contact listed
        #[clap(long, default_value = "15.0")]
        max_dist: f64,

        /// Type vocabulary used for the small molecule atoms
        #[clap(long, value_enum, default_value = "autodock")]
        types: Typing,

        /// Smallest small molecule, in heavy atoms
        #[clap(long, default_value_t = DEFAULT_MIN_ATOMS)]
        min_atoms: usize,

        /// Print JSON instead of tab separated rows
        #[clap(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct PoseScore {
    name: String,
    #[serde(flatten)]
    components: VinaComponents,
    vina: f64,
    /// Vina energy divided by the torsional penalty
    normalized: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scores: Vec<f64>,
    size: usize,
}

#[derive(Debug, Default, Serialize)]
struct ResidueScores {
    structure: String,
    chain: char,
    number: i32,
    name: String,
    size: usize,
    scores: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ContactRow {
    structure: String,
    /// `{residue name}_{atom name}` of the partner atom
    partner: String,
    ligand_type: String,
    distance: f64,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command-line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Poses {
            receptor,
            ligands,
            params,
            distributions,
            variants,
            min_radius,
            max_radius,
            types,
            json,
        } => {
            let statistics = match distributions {
                Some(path) => {
                    let ladder = RadiusLadder::spanning(min_radius, max_radius)
                        .context("Invalid cutoff radius range")?;
                    Some(statistical_scorers(&path, types, ladder, &variants)?)
                }
                None => None,
            };
            score_poses(&receptor, &ligands, params.as_deref(), statistics, types, json)
        }

        Commands::Residues {
            structures,
            distributions,
            variants,
            min_radius,
            max_radius,
            types,
            small_molecules,
            min_atoms,
            json,
        } => {
            let ladder = RadiusLadder::spanning(min_radius, max_radius)
                .context("Invalid cutoff radius range")?;
            let scorers = statistical_scorers(&distributions, types, ladder, &variants)?;
            let settings = ResidueSettings {
                types,
                small_molecules,
                min_atoms,
            };
            score_residues(&structures, &scorers, &settings, json)
        }

        Commands::Bins {
            structures,
            bin_size,
            max_dist,
            vdw_coef,
            types,
            min_atoms,
            json,
        } => bin_contacts(&structures, bin_size, max_dist, vdw_coef, types, min_atoms, json),

        Commands::Contacts {
            structures,
            max_dist,
            types,
            min_atoms,
            json,
        } => list_contacts(&structures, max_dist, types, min_atoms, json),
    }
}

/// One scorer per variant and ladder radius, in column order
fn statistical_scorers(
    distributions: &Path,
    types: Typing,
    ladder: RadiusLadder,
    variants: &[StatisticalOptions],
) -> Result<Vec<StatisticalPotential>> {
    let table = DistributionTable::from_file(distributions, types.vocabulary(), ladder)
        .with_context(|| {
            format!("Failed to load distributions: {}", distributions.display())
        })?;
    let table = Arc::new(table);
    info!("Loaded {} type pairs on ladder {}", table.pair_count(), ladder);

    let variants = if variants.is_empty() {
        StatisticalOptions::all()
    } else {
        variants.to_vec()
    };

    let mut scorers = Vec::with_capacity(variants.len() * ladder.len());
    for options in variants {
        scorers.extend(StatisticalPotential::for_every_shell(options, table.clone())?);
    }
    Ok(scorers)
}

/// Restrict the reduced variants to receptor atoms of the `allowed` types
fn restrict_reduced(
    scorers: &[StatisticalPotential],
    allowed: &HashSet<TypeId>,
) -> Result<Vec<StatisticalPotential>> {
    let restricted = scorers
        .iter()
        .map(|scorer| match scorer.options().granularity {
            Granularity::Reduced => scorer.clone().with_restriction(allowed.clone()),
            Granularity::Complete => Ok(scorer.clone()),
        })
        .collect::<Result<_, _>>()?;
    Ok(restricted)
}

fn score_poses(
    receptor: &Path,
    ligands: &[PathBuf],
    params: Option<&Path>,
    statistics: Option<Vec<StatisticalPotential>>,
    types: Typing,
    json: bool,
) -> Result<()> {
    let params = match params {
        Some(path) => VinaParams::from_json_file(path)
            .with_context(|| format!("Failed to load Vina parameters: {}", path.display()))?,
        None => VinaParams::default(),
    };
    let vina = VinaScore::new(params)?;

    // Parse receptor
    info!("Loading receptor: {}", receptor.display());
    let receptor_molecule = parse_pdbqt(receptor)
        .with_context(|| format!("Failed to parse receptor file: {}", receptor.display()))?;
    let receptor_types = xs::assign_xs_types(&receptor_molecule);
    let index = SpatialIndex::build(&receptor_molecule.positions());

    // Reduced variants pair only with the receptor's heavy atom types
    let receptor_stat_types = types.assign(&receptor_molecule);
    let scorers = match statistics {
        Some(scorers) => {
            let heavy: HashSet<TypeId> = receptor_stat_types
                .all_types()
                .into_iter()
                .filter(|&id| !receptor_stat_types.contact_flags(id).hydrogen)
                .collect();
            restrict_reduced(&scorers, &heavy)?
        }
        None => Vec::new(),
    };
    let header: Vec<String> = scorers.iter().map(|s| s.name()).collect();

    let mut poses = Vec::new();
    for ligand_path in ligands {
        info!("Loading ligand poses: {}", ligand_path.display());
        let models = parse_pdbqt_models(ligand_path)
            .with_context(|| format!("Failed to parse ligand file: {}", ligand_path.display()))?;
        poses.extend(models);
    }

    let scores: Vec<PoseScore> = poses
        .par_iter()
        .map(|pose| {
            let positions = pose.positions();
            let xs_types = xs::assign_xs_types(pose);
            let ligand = TypedAtoms::new(&positions, &xs_types);
            let components = vina.calculate_components(&index, &receptor_types, &ligand);
            let energy = components.weighted(vina.params());

            let stat_types = types.assign(pose);
            let ligand = TypedAtoms::new(&positions, &stat_types);
            let statistical = scorers
                .iter()
                .map(|scorer| scorer.score_molecule(&index, &receptor_stat_types, &ligand))
                .collect();

            PoseScore {
                name: pose.name.clone(),
                vina: energy,
                normalized: vina.params().normalized_affinity(energy, pose.torsdof),
                components,
                scores: statistical,
                size: pose.size(),
            }
        })
        .collect();

    info!("Scored {} poses", scores.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    } else {
        const VINA_COLUMNS: [&str; 8] =
            ["name", "g1", "g2", "rep", "hydrogen", "hydrophobic", "vina", "normalized"];
        let mut columns: Vec<String> = VINA_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(header);
        columns.push("size".to_string());
        println!("{}", columns.join("\t"));

        for s in &scores {
            let c = &s.components;
            let mut fields = vec![s.name.clone()];
            fields.extend(
                [c.g1, c.g2, c.rep, c.hydrogen, c.hydrophobic, s.vina, s.normalized]
                    .iter()
                    .chain(&s.scores)
                    .map(|v| format!("{:.6}", v)),
            );
            fields.push(s.size.to_string());
            println!("{}", fields.join("\t"));
        }
    }

    Ok(())
}

struct ResidueSettings {
    types: Typing,
    small_molecules: bool,
    min_atoms: usize,
}

fn score_residues(
    structures: &[PathBuf],
    scorers: &[StatisticalPotential],
    settings: &ResidueSettings,
    json: bool,
) -> Result<()> {
    let header: Vec<String> = scorers.iter().map(|s| s.name()).collect();

    let inputs: Vec<String> = structures.iter().map(|p| p.display().to_string()).collect();
    let results = batch::launch(&inputs, |path| {
        score_structure(path, scorers, settings)
    });

    let rows: Vec<ResidueScores> = results.into_iter().flat_map(|(_, rows)| rows).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("structure\tchain\tresi\tresn\t{}\tsize", header.join("\t"));
        for row in &rows {
            let scores: Vec<String> = row.scores.iter().map(|s| format!("{:.6}", s)).collect();
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.structure,
                row.chain,
                row.number,
                row.name,
                scores.join("\t"),
                row.size
            );
        }
    }

    Ok(())
}

fn score_structure(
    path: &str,
    scorers: &[StatisticalPotential],
    settings: &ResidueSettings,
) -> Result<Vec<ResidueScores>> {
    let molecule = parse_pdbqt(path)?;

    let residues: Vec<usize> = if settings.small_molecules {
        selection::candidate_ligands(&molecule, settings.min_atoms)
    } else {
        (0..molecule.residues().len()).collect()
    };
    if residues.is_empty() {
        info!("{}: nothing to score", molecule.name);
        return Ok(Vec::new());
    }

    let positions = molecule.positions();
    let types = settings.types.assign(&molecule);
    let index = SpatialIndex::build(&positions);
    let structure = TypedAtoms::new(&positions, &types);

    // Reduced variants only pair with types this structure actually has
    let scorers = restrict_reduced(scorers, &types.all_types())?;

    let mut rows = Vec::with_capacity(residues.len());
    for residue_idx in residues {
        let residue = molecule.residue(residue_idx)?;
        let scores = scorers
            .iter()
            .map(|scorer| scorer.score_residue(&index, &structure, &residue.atoms))
            .collect();
        rows.push(ResidueScores {
            structure: molecule.name.clone(),
            chain: residue.chain_id,
            number: residue.number,
            name: residue.name.clone(),
            size: residue.size(),
            scores,
        });
    }

    Ok(rows)
}

fn bin_contacts(
    structures: &[PathBuf],
    bin_size: f64,
    max_dist: f64,
    vdw_coef: f64,
    types: Typing,
    min_atoms: usize,
    json: bool,
) -> Result<()> {
    let empty = DistanceHistogram::new(bin_size)?;
    let inputs: Vec<String> = structures.iter().map(|p| p.display().to_string()).collect();

    let histogram = batch::launch_reduce(
        &inputs,
        |path| -> Result<DistanceHistogram> {
            let molecule = parse_pdbqt(path)?;
            let positions = molecule.positions();
            let assignment = types.assign(&molecule);
            let index = SpatialIndex::build(&positions);
            let structure = TypedAtoms::new(&positions, &assignment);

            let mut histogram = empty.clone();
            for residue_idx in selection::candidate_ligands(&molecule, min_atoms) {
                let residue = molecule.residue(residue_idx)?;
                histogram.accumulate_contacts(
                    &index,
                    &assignment,
                    &structure,
                    &Locus::Residue(&residue.atoms),
                    vdw_coef,
                    max_dist,
                );
            }
            Ok(histogram)
        },
        || empty.clone(),
        |mut a, b| {
            if let Err(e) = a.merge(&b) {
                warn!("Dropping partial histogram: {}", e);
            }
            a
        },
    );

    info!("Counted {} contacts in {} bins", histogram.total(), histogram.len());

    if json {
        let rows: Vec<_> = histogram.rows().collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in histogram.rows() {
            println!("{}\t{}\t{}", row.label, row.distance, row.count);
        }
    }

    Ok(())
}

fn list_contacts(
    structures: &[PathBuf],
    max_dist: f64,
    types: Typing,
    min_atoms: usize,
    json: bool,
) -> Result<()> {
    let inputs: Vec<String> = structures.iter().map(|p| p.display().to_string()).collect();
    let results = batch::launch(&inputs, |path| structure_contacts(path, max_dist, types, min_atoms));
    let rows: Vec<ContactRow> = results.into_iter().flat_map(|(_, rows)| rows).collect();

    info!("Listed {} contacts", rows.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!(
                "{}\t{}\t{}\t{:.6}",
                row.structure, row.partner, row.ligand_type, row.distance
            );
        }
    }

    Ok(())
}

fn structure_contacts(
    path: &str,
    max_dist: f64,
    types: Typing,
    min_atoms: usize,
) -> Result<Vec<ContactRow>> {
    let molecule = parse_pdbqt(path)?;
    let ligands = selection::candidate_ligands(&molecule, min_atoms);
    if ligands.is_empty() {
        info!("{}: no small molecules", molecule.name);
        return Ok(Vec::new());
    }

    let assignment = types.assign(&molecule);
    let index = SpatialIndex::build(&molecule.positions());

    let mut rows = Vec::new();
    for residue_idx in ligands {
        let residue = molecule.residue(residue_idx)?;
        for PartnerContact {
            ligand_atom,
            partner_atom,
            distance,
        } in selection::partner_contacts(&molecule, &index, residue, max_dist)
        {
            let partner = molecule.atom(partner_atom)?;
            rows.push(ContactRow {
                structure: molecule.name.clone(),
                partner: format!("{}_{}", partner.residue_name, partner.name),
                ligand_type: assignment
                    .name_of(assignment.type_of(ligand_atom))
                    .to_string(),
                distance,
            });
        }
    }

    Ok(rows)
}
