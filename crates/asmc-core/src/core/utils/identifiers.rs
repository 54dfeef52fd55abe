use phf::{Map, Set, phf_map, phf_set};

/// One-letter code used for gaps and residues that cannot be identified.
pub const UNKNOWN_RESIDUE_CODE: char = 'X';

/// Alignment gap character as it appears in aligned sequences.
pub const GAP_CHAR: char = '-';

/// Name of the atom used as the representative coordinate of a residue.
pub const REPRESENTATIVE_ATOM_NAME: &str = "CA";

static THREE_TO_ONE: Map<&'static str, char> = phf_map! {
    "ALA" => 'A', "CYS" => 'C', "ASP" => 'D', "GLU" => 'E',
    "PHE" => 'F', "GLY" => 'G', "HIS" => 'H', "ILE" => 'I',
    "LYS" => 'K', "LEU" => 'L', "MET" => 'M', "ASN" => 'N',
    "PRO" => 'P', "GLN" => 'Q', "ARG" => 'R', "SER" => 'S',
    "THR" => 'T', "VAL" => 'V', "TRP" => 'W', "TYR" => 'Y',
    // Common aliases written by modelling and simulation packages.
    "MSE" => 'M', "HSD" => 'H', "HSE" => 'H', "HSP" => 'H',
    "HID" => 'H', "HIE" => 'H', "HIP" => 'H', "CYX" => 'C',
    "ASH" => 'D', "GLH" => 'E', "LYN" => 'K',
};

static STANDARD_CODES: Set<char> = phf_set! {
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W', 'Y',
};

/// Maps a three-letter residue name to its one-letter code.
///
/// Returns `None` for names outside the standard amino acids and their
/// recognised aliases.
pub fn one_letter_code(residue_name: &str) -> Option<char> {
    let name = residue_name.trim();
    THREE_TO_ONE
        .get(name)
        .or_else(|| THREE_TO_ONE.get(name.to_ascii_uppercase().as_str()))
        .copied()
}

pub fn is_standard_code(code: char) -> bool {
    STANDARD_CODES.contains(&code.to_ascii_uppercase())
}

/// Gap and unknown placeholders are interchangeable in motifs.
pub fn is_gap_or_unknown(code: char) -> bool {
    matches!(code, UNKNOWN_RESIDUE_CODE | GAP_CHAR | 'x' | '.')
}

pub fn is_heavy_atom(atom_name: &str) -> bool {
    let first_char = atom_name
        .trim()
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase());
    !matches!(first_char, Some('H') | Some('D'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_letter_code_maps_standard_residues() {
        assert_eq!(one_letter_code("ALA"), Some('A'));
        assert_eq!(one_letter_code("TRP"), Some('W'));
        assert_eq!(one_letter_code("GLY"), Some('G'));
    }

    #[test]
    fn one_letter_code_accepts_aliases_and_lowercase() {
        assert_eq!(one_letter_code("MSE"), Some('M'));
        assert_eq!(one_letter_code("HSE"), Some('H'));
        assert_eq!(one_letter_code("ser"), Some('S'));
        assert_eq!(one_letter_code(" LYS "), Some('K'));
    }

    #[test]
    fn one_letter_code_rejects_non_amino_acids() {
        assert_eq!(one_letter_code("HOH"), None);
        assert_eq!(one_letter_code("NAD"), None);
        assert_eq!(one_letter_code(""), None);
    }

    #[test]
    fn standard_code_set_contains_twenty_letters() {
        let count = ('A'..='Z').filter(|&c| is_standard_code(c)).count();
        assert_eq!(count, 20);
        assert!(!is_standard_code('X'));
        assert!(!is_standard_code('B'));
    }

    #[test]
    fn gap_placeholders_are_recognised() {
        assert!(is_gap_or_unknown('X'));
        assert!(is_gap_or_unknown('-'));
        assert!(!is_gap_or_unknown('A'));
    }

    #[test]
    fn is_heavy_atom_returns_false_for_hydrogen_and_deuterium() {
        assert!(!is_heavy_atom("H"));
        assert!(!is_heavy_atom("HA"));
        assert!(!is_heavy_atom("D1"));
        assert!(is_heavy_atom("CA"));
        assert!(is_heavy_atom(" OG1"));
    }
}
