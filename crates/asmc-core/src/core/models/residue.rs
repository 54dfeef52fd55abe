use crate::core::utils::identifiers::{UNKNOWN_RESIDUE_CODE, one_letter_code};
use nalgebra::Point3;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Author-assigned residue number with its optional insertion code.
///
/// Orders by number first, then insertion code, so `52 < 52A < 52B < 53`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResidueNumber {
    pub number: isize,
    pub insertion_code: Option<char>,
}

impl ResidueNumber {
    pub fn new(number: isize) -> Self {
        Self {
            number,
            insertion_code: None,
        }
    }

    pub fn with_insertion(number: isize, insertion_code: char) -> Self {
        Self {
            number,
            insertion_code: Some(insertion_code),
        }
    }
}

impl From<isize> for ResidueNumber {
    fn from(number: isize) -> Self {
        Self::new(number)
    }
}

impl fmt::Display for ResidueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.insertion_code {
            Some(code) => write!(f, "{}{}", self.number, code),
            None => write!(f, "{}", self.number),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid residue number '{0}'")]
pub struct ParseResidueNumberError(pub String);

impl FromStr for ResidueNumber {
    type Err = ParseResidueNumberError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseResidueNumberError(s.to_string());
        match trimmed.chars().last() {
            Some(last) if last.is_ascii_alphabetic() => {
                let digits = &trimmed[..trimmed.len() - last.len_utf8()];
                let number = digits.parse().map_err(|_| err())?;
                Ok(Self::with_insertion(number, last))
            }
            Some(_) => trimmed.parse().map(Self::new).map_err(|_| err()),
            None => Err(err()),
        }
    }
}

/// A parsed amino-acid residue reduced to what correspondence search needs.
///
/// The representative coordinate is the alpha-carbon; the full atom list is
/// kept in file order for ligand-distance style queries.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub number: ResidueNumber,
    pub name: String,
    pub code: char,
    pub representative: Point3<f64>,
    pub(crate) atoms: Vec<Point3<f64>>,
}

impl Residue {
    pub fn new(
        number: ResidueNumber,
        name: &str,
        representative: Point3<f64>,
        atoms: Vec<Point3<f64>>,
    ) -> Self {
        let name = name.trim().to_string();
        let code = one_letter_code(&name).unwrap_or(UNKNOWN_RESIDUE_CODE);
        Self {
            number,
            name,
            code,
            representative,
            atoms,
        }
    }

    pub fn atoms(&self) -> &[Point3<f64>] {
        &self.atoms
    }

    /// Smallest distance from any atom of this residue to `point`.
    pub fn min_atom_distance(&self, point: &Point3<f64>) -> Option<f64> {
        self.atoms
            .iter()
            .map(|atom| (atom - point).norm())
            .min_by(|a, b| a.total_cmp(b))
    }

    pub(crate) fn map_coordinates<F>(&self, f: &F) -> Self
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        Self {
            number: self.number,
            name: self.name.clone(),
            code: self.code,
            representative: f(&self.representative),
            atoms: self.atoms.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_number_orders_insertion_codes_after_plain_number() {
        let plain = ResidueNumber::new(52);
        let a = ResidueNumber::with_insertion(52, 'A');
        let next = ResidueNumber::new(53);
        assert!(plain < a);
        assert!(a < next);
    }

    #[test]
    fn residue_number_parses_and_displays_round_trip() {
        let parsed: ResidueNumber = "104B".parse().unwrap();
        assert_eq!(parsed, ResidueNumber::with_insertion(104, 'B'));
        assert_eq!(parsed.to_string(), "104B");
        let negative: ResidueNumber = "-3".parse().unwrap();
        assert_eq!(negative, ResidueNumber::new(-3));
    }

    #[test]
    fn residue_number_rejects_garbage() {
        assert!("".parse::<ResidueNumber>().is_err());
        assert!("A".parse::<ResidueNumber>().is_err());
        assert!("1.5".parse::<ResidueNumber>().is_err());
    }

    #[test]
    fn new_residue_derives_one_letter_code() {
        let residue = Residue::new(ResidueNumber::new(7), "HIS", Point3::origin(), vec![]);
        assert_eq!(residue.code, 'H');
        let unknown = Residue::new(ResidueNumber::new(8), "UNK", Point3::origin(), vec![]);
        assert_eq!(unknown.code, 'X');
    }

    #[test]
    fn min_atom_distance_picks_closest_atom() {
        let residue = Residue::new(
            ResidueNumber::new(1),
            "SER",
            Point3::new(0.0, 0.0, 0.0),
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)],
        );
        let d = residue.min_atom_distance(&Point3::new(4.0, 0.0, 0.0)).unwrap();
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn map_coordinates_moves_every_atom() {
        let residue = Residue::new(
            ResidueNumber::new(1),
            "GLY",
            Point3::new(1.0, 0.0, 0.0),
            vec![Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
        );
        let shifted = residue.map_coordinates(&|p: &Point3<f64>| p + nalgebra::Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(shifted.representative, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(shifted.atoms()[1], Point3::new(2.0, 1.0, 0.0));
        assert_eq!(shifted.code, 'G');
    }
}
