use crate::core::io::traits::StructureFile;
use crate::core::models::builder::{BuilderError, StructureBuilder};
use crate::core::models::residue::ResidueNumber;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent structure: {0}")]
    Structure(#[from] BuilderError),
    #[error("No amino-acid residues with an alpha-carbon were found")]
    NoResidues,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for an ATOM record (must be at least 54 chars)")]
    LineTooShort,
}

const MIN_ATOM_LINE_LEN: usize = 54;
const DEFAULT_CHAIN_ID: char = 'A';

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn column_char(line: &str, idx: usize) -> Option<char> {
    line.get(idx..idx + 1)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
}

fn parse_coord(line: &str, line_num: usize, start: usize, columns: &str) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, start + 8);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: columns.into(),
            value: value.into(),
        },
    })
}

/// Reader for the fixed-column Protein Data Bank format.
///
/// Only `ATOM` records of the first model are used. `HETATM` records are
/// skipped, as are alternate locations other than blank or `A`. A blank chain
/// identifier is read as chain `A`.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(name: &str, reader: &mut impl BufRead) -> Result<Structure, Self::Error> {
        let mut builder = StructureBuilder::new(name);
        let mut current_chain_id: Option<char> = None;
        let mut current_residue: Option<ResidueNumber> = None;
        let mut skipped_altlocs = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" => {}
                "ENDMDL" | "END" => break,
                _ => continue,
            }

            if line.len() < MIN_ATOM_LINE_LEN {
                return Err(PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::LineTooShort,
                });
            }

            if let Some(altloc) = column_char(&line, 16) {
                if altloc != 'A' {
                    skipped_altlocs += 1;
                    continue;
                }
            }

            let name_str = slice_and_trim(&line, 12, 16);
            if name_str.is_empty() {
                return Err(PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::MissingRequiredField {
                        columns: "13-16".into(),
                    },
                });
            }
            let res_name_str = slice_and_trim(&line, 17, 20);
            let chain_id = column_char(&line, 21).unwrap_or(DEFAULT_CHAIN_ID);
            let res_seq_str = slice_and_trim(&line, 22, 26);
            let number: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidInt {
                    columns: "23-26".into(),
                    value: res_seq_str.into(),
                },
            })?;
            let residue_number = ResidueNumber {
                number,
                insertion_code: column_char(&line, 26),
            };
            let x = parse_coord(&line, line_num, 30, "31-38")?;
            let y = parse_coord(&line, line_num, 38, "39-46")?;
            let z = parse_coord(&line, line_num, 46, "47-54")?;

            if current_chain_id != Some(chain_id) {
                builder.start_chain(chain_id)?;
                current_chain_id = Some(chain_id);
                current_residue = None;
            }
            if current_residue != Some(residue_number) {
                builder.start_residue(residue_number, res_name_str)?;
                current_residue = Some(residue_number);
            }
            builder.add_atom(name_str, Point3::new(x, y, z))?;
        }

        if builder.skipped_residues() > 0 || skipped_altlocs > 0 {
            debug!(
                structure = name,
                residues_without_ca = builder.skipped_residues(),
                alternate_locations = skipped_altlocs,
                "Dropped records while reading structure"
            );
        }

        let structure = builder.build()?;
        if structure.is_empty() {
            return Err(PdbError::NoResidues);
        }
        Ok(structure)
    }
}
