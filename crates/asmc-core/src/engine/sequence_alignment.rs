use super::config::{SequenceAlignmentConfig, SequenceScoring};
use super::error::EngineError;
use crate::core::scoring::ScoreKind;
use crate::core::utils::identifiers::GAP_CHAR;
use serde::Serialize;
use tracing::trace;

/// One column of a pairwise alignment: the residue index consumed from each
/// sequence, or `None` where that sequence has a gap.
pub type AlignmentColumn = (Option<usize>, Option<usize>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseAlignment {
    pub columns: Vec<AlignmentColumn>,
    pub score: f64,
    pub identities: usize,
}

impl PairwiseAlignment {
    /// Columns where both sequences contribute a residue.
    pub fn aligned_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.columns.iter().filter_map(|&c| match c {
            (Some(i), Some(j)) => Some((i, j)),
            _ => None,
        })
    }

    /// Identical residues as a percentage of gap-free columns.
    pub fn percent_identity(&self) -> f64 {
        let aligned = self.aligned_pairs().count();
        if aligned == 0 {
            0.0
        } else {
            100.0 * self.identities as f64 / aligned as f64
        }
    }

    /// Renders both rows with `-` for gaps.
    pub fn render(&self, reference: &str, target: &str) -> (String, String) {
        let r: Vec<char> = reference.chars().collect();
        let t: Vec<char> = target.chars().collect();
        self.columns
            .iter()
            .map(|&(i, j)| {
                (
                    i.and_then(|i| r.get(i).copied()).unwrap_or(GAP_CHAR),
                    j.and_then(|j| t.get(j).copied()).unwrap_or(GAP_CHAR),
                )
            })
            .unzip()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Up,
    Left,
}

fn column_score(a: char, b: char, scoring: &SequenceScoring) -> Result<f64, EngineError> {
    match scoring {
        SequenceScoring::Identity {
            match_score,
            mismatch_score,
        } => Ok(if a.eq_ignore_ascii_case(&b) {
            *match_score
        } else {
            *mismatch_score
        }),
        SequenceScoring::Substitution(matrix) => {
            let value = match matrix.kind() {
                ScoreKind::Similarity => matrix.score(a, b),
                ScoreKind::Distance => matrix.pair_cost(a, b).map(|c| -c),
            };
            value.ok_or_else(|| EngineError::UnknownResidue {
                a,
                b,
                table: matrix.name().to_string(),
            })
        }
    }
}

/// Global (end-to-end) alignment by Needleman-Wunsch with a linear gap
/// penalty.
///
/// Ties in the traceback prefer a diagonal step, then a gap in the target,
/// then a gap in the reference, so the result is deterministic.
pub fn global_align(
    reference: &str,
    target: &str,
    config: &SequenceAlignmentConfig,
) -> Result<PairwiseAlignment, EngineError> {
    config.validate()?;
    let r: Vec<char> = reference.chars().collect();
    let t: Vec<char> = target.chars().collect();
    if r.is_empty() || t.is_empty() {
        return Err(EngineError::EmptyInput(
            "cannot align an empty sequence".to_string(),
        ));
    }

    let (n, m) = (r.len(), t.len());
    let width = m + 1;
    let gap = config.gap_penalty;
    let mut score = vec![0.0f64; (n + 1) * width];
    let mut trace = vec![Step::Diagonal; (n + 1) * width];

    for i in 1..=n {
        score[i * width] = -(i as f64) * gap;
        trace[i * width] = Step::Up;
    }
    for j in 1..=m {
        score[j] = -(j as f64) * gap;
        trace[j] = Step::Left;
    }

    for i in 1..=n {
        for j in 1..=m {
            let diag = score[(i - 1) * width + j - 1] + column_score(r[i - 1], t[j - 1], &config.scoring)?;
            let up = score[(i - 1) * width + j] - gap;
            let left = score[i * width + j - 1] - gap;
            let (best, step) = if diag >= up && diag >= left {
                (diag, Step::Diagonal)
            } else if up >= left {
                (up, Step::Up)
            } else {
                (left, Step::Left)
            };
            score[i * width + j] = best;
            trace[i * width + j] = step;
        }
    }

    let mut columns = Vec::with_capacity(n + m);
    let mut identities = 0;
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match trace[i * width + j] {
            Step::Diagonal => {
                if r[i - 1].eq_ignore_ascii_case(&t[j - 1]) {
                    identities += 1;
                }
                columns.push((Some(i - 1), Some(j - 1)));
                i -= 1;
                j -= 1;
            }
            Step::Up => {
                columns.push((Some(i - 1), None));
                i -= 1;
            }
            Step::Left => {
                columns.push((None, Some(j - 1)));
                j -= 1;
            }
        }
    }
    columns.reverse();

    let total = score[n * width + m];
    trace!(reference_len = n, target_len = m, score = total, "Global alignment finished");
    Ok(PairwiseAlignment {
        columns,
        score: total,
        identities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::SubstitutionMatrix;

    fn identity_config() -> SequenceAlignmentConfig {
        SequenceAlignmentConfig::default()
    }

    #[test]
    fn identical_sequences_align_without_gaps() {
        let aln = global_align("MKVLY", "MKVLY", &identity_config()).unwrap();
        assert_eq!(aln.score, 5.0);
        assert_eq!(aln.identities, 5);
        assert_eq!(aln.percent_identity(), 100.0);
        assert!(aln.columns.iter().all(|c| c.0.is_some() && c.1.is_some()));
    }

    #[test]
    fn deletion_in_target_opens_gap() {
        let aln = global_align("ABCDE", "ABDE", &identity_config()).unwrap();
        assert_eq!(aln.score, 4.0);
        let (r, t) = aln.render("ABCDE", "ABDE");
        assert_eq!(r, "ABCDE");
        assert_eq!(t, "AB-DE");
    }

    #[test]
    fn insertion_in_target_is_skipped_by_reference() {
        let aln = global_align("ACE", "ACWE", &identity_config()).unwrap();
        let (r, t) = aln.render("ACE", "ACWE");
        assert_eq!(r, "AC-E");
        assert_eq!(t, "ACWE");
        assert_eq!(aln.score, 3.0);
    }

    #[test]
    fn gap_penalty_prefers_mismatch_over_gaps() {
        let config = SequenceAlignmentConfig {
            gap_penalty: 2.0,
            ..SequenceAlignmentConfig::default()
        };
        let aln = global_align("AWC", "AYC", &config).unwrap();
        let (r, t) = aln.render("AWC", "AYC");
        assert_eq!(r, "AWC");
        assert_eq!(t, "AYC");
        assert_eq!(aln.score, 2.0);
        assert!((aln.percent_identity() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn substitution_scoring_uses_table_values() {
        let config = SequenceAlignmentConfig {
            scoring: SequenceScoring::Substitution(SubstitutionMatrix::blosum62()),
            gap_penalty: 10.0,
            ..SequenceAlignmentConfig::default()
        };
        let aln = global_align("WIL", "WLL", &config).unwrap();
        // W/W 11, I/L 2, L/L 4
        assert_eq!(aln.score, 17.0);
    }

    #[test]
    fn unknown_letter_in_substitution_mode_fails() {
        let config = SequenceAlignmentConfig {
            scoring: SequenceScoring::Substitution(SubstitutionMatrix::blosum62()),
            ..SequenceAlignmentConfig::default()
        };
        let err = global_align("AJ", "AA", &config).unwrap_err();
        assert!(matches!(err, EngineError::UnknownResidue { a: 'J', .. }));
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(matches!(
            global_align("", "A", &identity_config()),
            Err(EngineError::EmptyInput(_))
        ));
    }

    #[test]
    fn alignment_is_deterministic() {
        let a = global_align("MKTAYIAKQR", "MKAYIQKR", &identity_config()).unwrap();
        let b = global_align("MKTAYIAKQR", "MKAYIQKR", &identity_config()).unwrap();
        assert_eq!(a, b);
    }
}
