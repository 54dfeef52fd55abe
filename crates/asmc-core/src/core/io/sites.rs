use crate::core::models::residue::ResidueNumber;
use crate::core::models::site::{ActiveSiteDefinition, SiteDefinitionError};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed site file: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid chain identifier '{value}' on line {line}")]
    InvalidChain { line: u64, value: String },
    #[error("Invalid residue number '{value}' on line {line}")]
    InvalidResidue { line: u64, value: String },
    #[error("No active-site definition found")]
    NoDefinition,
    #[error(transparent)]
    Definition(#[from] SiteDefinitionError),
}

/// Parses a comma-separated residue list such as `52,78,104A`.
pub fn parse_site_list(text: &str) -> Result<Vec<ResidueNumber>, SiteFileError> {
    parse_numbers(text, 0)
}

fn parse_numbers(text: &str, line: u64) -> Result<Vec<ResidueNumber>, SiteFileError> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| SiteFileError::InvalidResidue {
                line,
                value: s.to_string(),
            })
        })
        .collect()
}

/// Reads the first active-site definition from tab-separated text of the form
/// `structure<TAB>chain<TAB>residue,residue,...`. Lines starting with `#` are
/// comments and records with fewer than three fields are skipped.
pub fn read_sites<R: Read>(reader: R) -> Result<ActiveSiteDefinition, SiteFileError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    for result in csv_reader.records() {
        let record = result?;
        if record.len() < 3 {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let structure_id = &record[0];
        let chain_field = &record[1];
        let mut chars = chain_field.chars();
        let chain_id = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(SiteFileError::InvalidChain {
                    line,
                    value: chain_field.to_string(),
                });
            }
        };
        let numbers = parse_numbers(&record[2], line)?;
        let definition = ActiveSiteDefinition::new(chain_id, numbers)?;
        return Ok(if structure_id.is_empty() {
            definition
        } else {
            definition.with_structure_id(structure_id)
        });
    }
    Err(SiteFileError::NoDefinition)
}

pub fn read_sites_from_path<P: AsRef<Path>>(path: P) -> Result<ActiveSiteDefinition, SiteFileError> {
    read_sites(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_valid_record_is_used() {
        let text = "# pdb\tchain\tresidues\n\nshort\tline\n1abc\tB\t104, 52,78\n2xyz\tA\t1,2\n";
        let def = read_sites(text.as_bytes()).unwrap();
        assert_eq!(def.structure_id.as_deref(), Some("1abc"));
        assert_eq!(def.chain_id, 'B');
        let numbers: Vec<isize> = def.sites().iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![52, 78, 104]);
    }

    #[test]
    fn invalid_residue_reports_offending_value() {
        let text = "ref\tA\t12,abc\n";
        match read_sites(text.as_bytes()).unwrap_err() {
            SiteFileError::InvalidResidue { line, value } => {
                assert_eq!(line, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn multi_character_chain_is_rejected() {
        let err = read_sites("ref\tAB\t1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SiteFileError::InvalidChain { .. }));
    }

    #[test]
    fn file_without_records_has_no_definition() {
        let err = read_sites("# only comments\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SiteFileError::NoDefinition));
    }

    #[test]
    fn literal_list_accepts_insertion_codes() {
        let sites = parse_site_list("52, 52A ,53").unwrap();
        assert_eq!(sites[1], ResidueNumber::with_insertion(52, 'A'));
        assert!(parse_site_list("1,x").is_err());
    }
}
