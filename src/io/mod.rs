//! PDBQT input/output for the structures fed to the scorers

use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

use crate::atom::{Atom, AtomType};
use crate::molecule::Molecule;

/// Errors that can occur during file I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("No atoms found in {0}")]
    NoAtoms(String),
}

/// Parse a PDBQT file into a Molecule (first model only)
pub fn parse_pdbqt<P: AsRef<Path>>(path: P) -> Result<Molecule, IoError> {
    let path = path.as_ref();
    parse_pdbqt_models(path)?
        .into_iter()
        .next()
        .ok_or_else(|| IoError::NoAtoms(path.display().to_string()))
}

/// Parse every MODEL of a PDBQT file (docked poses, trajectories)
pub fn parse_pdbqt_models<P: AsRef<Path>>(path: P) -> Result<Vec<Molecule>, IoError> {
    let file = File::open(path.as_ref())?;
    let stem = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    read_pdbqt_models(BufReader::new(file), stem)
}

/// Read PDBQT models from any buffered reader
///
/// A file without MODEL records yields a single molecule. Models are named
/// from a `REMARK Name = ...` line when present, otherwise `{name}_{n}`.
pub fn read_pdbqt_models<R: BufRead>(reader: R, name: &str) -> Result<Vec<Molecule>, IoError> {
    let mut models = Vec::new();
    let mut current = Molecule::new(name);
    let mut model_name: Option<String> = None;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = line_number + 1;

        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("ATOM") || line.starts_with("HETATM") {
            let atom = parse_pdbqt_atom(&line, line_number)?;
            current.add_atom(atom);
        } else if line.starts_with("MODEL") {
            if !current.atoms.is_empty() {
                finish_model(&mut models, &mut current, &mut model_name, name);
            }
        } else if line.starts_with("ENDMDL") {
            finish_model(&mut models, &mut current, &mut model_name, name);
        } else if let Some(torsdof) = line.strip_prefix("TORSDOF") {
            current.torsdof = parse_field(torsdof, 0..torsdof.len(), "TORSDOF", line_number)?;
        } else if let Some(remark) = line.strip_prefix("REMARK") {
            if let Some((key, value)) = remark.split_once('=') {
                if key.trim().eq_ignore_ascii_case("name") {
                    model_name = Some(value.trim().to_string());
                }
            }
        }
        // ROOT, BRANCH and friends carry no information the scorers use
    }

    if !current.atoms.is_empty() {
        finish_model(&mut models, &mut current, &mut model_name, name);
    }

    Ok(models)
}

fn finish_model(
    models: &mut Vec<Molecule>,
    current: &mut Molecule,
    model_name: &mut Option<String>,
    name: &str,
) {
    if current.atoms.is_empty() {
        *model_name = None;
        return;
    }

    let mut finished = std::mem::replace(current, Molecule::new(name));
    finished.name = model_name
        .take()
        .unwrap_or_else(|| format!("{}_{}", name, models.len() + 1));
    models.push(finished);
}

fn parse_field<T: std::str::FromStr>(
    line: &str,
    range: std::ops::Range<usize>,
    what: &str,
    line_number: usize,
) -> Result<T, IoError> {
    let field = line.get(range).unwrap_or("").trim();
    field.parse::<T>().map_err(|_| IoError::Parse {
        line: line_number,
        message: format!("Invalid {}: '{}'", what, field),
    })
}

/// Parse an atom record from a PDBQT file
fn parse_pdbqt_atom(line: &str, line_number: usize) -> Result<Atom, IoError> {
    if line.len() < 54 {
        return Err(IoError::Parse {
            line: line_number,
            message: format!("Line too short for atom record: {}", line),
        });
    }

    let serial = parse_field::<u32>(line, 6..11, "atom serial number", line_number)?;
    let name = line.get(12..16).unwrap_or("").trim().to_string();
    let residue_name = line.get(17..21).unwrap_or("").trim().to_string();
    let chain_id = line
        .get(21..22)
        .and_then(|s| s.trim().chars().next())
        .unwrap_or('A');
    let residue_num = parse_field::<i32>(line, 22..26, "residue number", line_number)?;

    let x = parse_field::<f64>(line, 30..38, "x coordinate", line_number)?;
    let y = parse_field::<f64>(line, 38..46, "y coordinate", line_number)?;
    let z = parse_field::<f64>(line, 46..54, "z coordinate", line_number)?;

    // Partial charge (optional)
    let charge = line
        .get(68..76)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    // AutoDock type lives in columns 78-79; fall back to the last token
    let type_column = line.get(77..).map(str::trim).unwrap_or("");
    let atom_type = if type_column.is_empty() {
        line.split_whitespace()
            .last()
            .map(AtomType::from_pdbqt_string)
            .unwrap_or(AtomType::Unknown)
    } else {
        AtomType::from_pdbqt_string(type_column)
    };

    let atom = Atom::new(
        atom_type,
        Vector3::new(x, y, z),
        name,
        serial,
        residue_name,
        residue_num,
        chain_id,
        charge,
    );

    Ok(if line.starts_with("HETATM") {
        atom.hetero()
    } else {
        atom
    })
}

/// Write a molecule as PDBQT records to any writer
pub fn write_pdbqt_records<W: Write>(molecule: &Molecule, out: &mut W) -> Result<(), IoError> {
    for (i, atom) in molecule.atoms.iter().enumerate() {
        let record_type = if atom.is_hetero { "HETATM" } else { "ATOM  " };

        writeln!(
            out,
            "{}{:5} {:<4} {:>3} {:1}{:4}    {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}    {:6.3} {:<2}",
            record_type,
            i + 1, // 1-based index
            atom.name,
            atom.residue_name,
            atom.chain_id,
            atom.residue_num,
            atom.coordinates.x,
            atom.coordinates.y,
            atom.coordinates.z,
            1.0, // Occupancy
            0.0, // Temperature factor
            atom.charge,
            atom.atom_type.to_pdbqt_string()
        )?;
    }

    Ok(())
}

/// Write a molecule to a PDBQT file
pub fn write_pdbqt<P: AsRef<Path>>(molecule: &Molecule, path: P) -> Result<(), IoError> {
    let mut file = File::create(path)?;

    writeln!(file, "REMARK Name = {}", molecule.name)?;
    write_pdbqt_records(molecule, &mut file)?;
    writeln!(file, "END")?;

    Ok(())
}
