use super::blosum62::{BLOSUM62_ALPHABET, BLOSUM62_SCORES};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringTableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: ScoringTableParseErrorKind,
    },
    #[error("Table is not symmetric: score({a},{b}) = {ab} but score({b},{a}) = {ba}")]
    Asymmetric { a: char, b: char, ab: f64, ba: f64 },
    #[error("No scores given for residue '{0}'")]
    MissingRow(char),
    #[error("Expected {expected} scores for a {size}-letter alphabet, found {found}")]
    DimensionMismatch {
        size: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringTableParseErrorKind {
    #[error("Header must list single-character residue codes")]
    InvalidHeader,
    #[error("Residue code '{0}' appears more than once")]
    DuplicateLetter(char),
    #[error("Row label '{0}' is not in the header")]
    UnknownRowLetter(String),
    #[error("Expected {expected} scores, found {found}")]
    RowLength { expected: usize, found: usize },
    #[error("Invalid score '{0}'")]
    InvalidScore(String),
}

/// How the numbers in a table relate to residue difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreKind {
    /// Log-odds exchangeability: higher means more alike (BLOSUM, PAM).
    #[default]
    Similarity,
    /// Already a cost: higher means more different, zero for identity.
    Distance,
}

/// A symmetric table of scores keyed by unordered residue-letter pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionMatrix {
    name: String,
    kind: ScoreKind,
    alphabet: Vec<char>,
    index: HashMap<char, usize>,
    scores: Vec<f64>,
}

impl SubstitutionMatrix {
    /// Builds a table from a row-major `alphabet.len()²` score list.
    pub fn new(
        name: &str,
        kind: ScoreKind,
        alphabet: Vec<char>,
        scores: Vec<f64>,
    ) -> Result<Self, ScoringTableError> {
        let n = alphabet.len();
        if scores.len() != n * n {
            return Err(ScoringTableError::DimensionMismatch {
                size: n,
                expected: n * n,
                found: scores.len(),
            });
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let (ab, ba) = (scores[i * n + j], scores[j * n + i]);
                if ab != ba {
                    return Err(ScoringTableError::Asymmetric {
                        a: alphabet[i],
                        b: alphabet[j],
                        ab,
                        ba,
                    });
                }
            }
        }
        let index = alphabet
            .iter()
            .enumerate()
            .map(|(i, &c)| (c.to_ascii_uppercase(), i))
            .collect();
        Ok(Self {
            name: name.to_string(),
            kind,
            alphabet,
            index,
            scores,
        })
    }

    /// The standard BLOSUM62 log-odds table.
    pub fn blosum62() -> Self {
        let alphabet = BLOSUM62_ALPHABET.to_vec();
        let scores = BLOSUM62_SCORES
            .iter()
            .flat_map(|row| row.iter().map(|&s| f64::from(s)))
            .collect();
        let index = alphabet.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self {
            name: "BLOSUM62".to_string(),
            kind: ScoreKind::Similarity,
            alphabet,
            index,
            scores,
        }
    }

    /// Parses the NCBI matrix layout: `#` comments, a header row of residue
    /// letters, then one labelled row of scores per letter.
    pub fn from_ncbi_str(name: &str, kind: ScoreKind, text: &str) -> Result<Self, ScoringTableError> {
        let mut alphabet: Option<Vec<char>> = None;
        let mut rows: HashMap<char, Vec<f64>> = HashMap::new();

        for (line_num, line) in text.lines().enumerate() {
            let line_num = line_num + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parse_err = |kind| ScoringTableError::Parse {
                line: line_num,
                kind,
            };

            let Some(header) = alphabet.as_ref() else {
                let mut letters = Vec::new();
                for token in trimmed.split_whitespace() {
                    let mut chars = token.chars();
                    let letter = match (chars.next(), chars.next()) {
                        (Some(c), None) => c.to_ascii_uppercase(),
                        _ => return Err(parse_err(ScoringTableParseErrorKind::InvalidHeader)),
                    };
                    if letters.contains(&letter) {
                        return Err(parse_err(ScoringTableParseErrorKind::DuplicateLetter(letter)));
                    }
                    letters.push(letter);
                }
                alphabet = Some(letters);
                continue;
            };

            let mut tokens = trimmed.split_whitespace();
            let label = tokens.next().unwrap_or_default();
            let letter = label
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .filter(|c| label.chars().count() == 1 && header.contains(c))
                .ok_or_else(|| {
                    parse_err(ScoringTableParseErrorKind::UnknownRowLetter(label.to_string()))
                })?;
            let values = tokens
                .map(|t| {
                    t.parse::<f64>()
                        .map_err(|_| parse_err(ScoringTableParseErrorKind::InvalidScore(t.to_string())))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() != header.len() {
                return Err(parse_err(ScoringTableParseErrorKind::RowLength {
                    expected: header.len(),
                    found: values.len(),
                }));
            }
            if rows.insert(letter, values).is_some() {
                return Err(parse_err(ScoringTableParseErrorKind::DuplicateLetter(letter)));
            }
        }

        let alphabet = alphabet.ok_or(ScoringTableError::Parse {
            line: 0,
            kind: ScoringTableParseErrorKind::InvalidHeader,
        })?;
        let mut scores = Vec::with_capacity(alphabet.len() * alphabet.len());
        for letter in &alphabet {
            let row = rows
                .remove(letter)
                .ok_or(ScoringTableError::MissingRow(*letter))?;
            scores.extend(row);
        }
        Self::new(name, kind, alphabet, scores)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P, kind: ScoreKind) -> Result<Self, ScoringTableError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = fs::read_to_string(path)?;
        Self::from_ncbi_str(&name, kind, &text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScoreKind {
        self.kind
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn contains(&self, residue: char) -> bool {
        self.index.contains_key(&residue.to_ascii_uppercase())
    }

    /// Raw table entry for the pair, or `None` if either letter is absent.
    pub fn score(&self, a: char, b: char) -> Option<f64> {
        let i = *self.index.get(&a.to_ascii_uppercase())?;
        let j = *self.index.get(&b.to_ascii_uppercase())?;
        Some(self.scores[i * self.alphabet.len() + j])
    }

    /// Cost of aligning `a` with `b`: zero for identity and larger for less
    /// exchangeable pairs.
    ///
    /// Similarity scores are converted as `(s(a,a) + s(b,b)) / 2 - s(a,b)`,
    /// so a log-odds table yields a symmetric, non-negative cost whenever its
    /// diagonal dominates its rows.
    pub fn pair_cost(&self, a: char, b: char) -> Option<f64> {
        match self.kind {
            ScoreKind::Distance => self.score(a, b),
            ScoreKind::Similarity => {
                let ab = self.score(a, b)?;
                let aa = self.score(a, a)?;
                let bb = self.score(b, b)?;
                Some((aa + bb) / 2.0 - ab)
            }
        }
    }

    /// Largest [`pair_cost`](Self::pair_cost) over letters of `alphabet`
    /// present in the table.
    pub fn max_pair_cost<I>(&self, alphabet: I) -> Option<f64>
    where
        I: IntoIterator<Item = char>,
    {
        let letters: Vec<char> = alphabet.into_iter().filter(|&c| self.contains(c)).collect();
        letters
            .iter()
            .flat_map(|&a| letters.iter().filter_map(move |&b| self.pair_cost(a, b)))
            .max_by(|x, y| x.total_cmp(y))
    }
}
