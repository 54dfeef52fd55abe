use super::config::{ConfigError, DissimilarityConfig};
use super::error::EngineError;
use crate::core::models::sequence::Motif;
use crate::core::scoring::SubstitutionMatrix;
use crate::core::utils::identifiers::{is_gap_or_unknown, is_standard_code};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Square, symmetric matrix of pairwise motif dissimilarities in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DissimilarityMatrix {
    ids: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    values: Vec<f64>,
}

impl DissimilarityMatrix {
    /// Builds a matrix from row-major `values`.
    ///
    /// Fails unless `values` is `ids.len()²` long, symmetric, zero on the
    /// diagonal, and the ids are unique.
    pub fn from_values(ids: Vec<String>, values: Vec<f64>) -> Result<Self, EngineError> {
        let n = ids.len();
        if values.len() != n * n {
            return Err(EngineError::InvalidMatrix(format!(
                "matrix over {n} items needs {} values, got {}",
                n * n,
                values.len()
            )));
        }
        let mut index = HashMap::with_capacity(n);
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(ConfigError::InvalidParameter {
                    name: "ids",
                    reason: format!("duplicate item id '{id}'"),
                }
                .into());
            }
        }
        for i in 0..n {
            if values[i * n + i] != 0.0 {
                return Err(EngineError::InvalidMatrix(format!(
                    "diagonal entry for '{}' is not zero",
                    ids[i]
                )));
            }
            for j in (i + 1)..n {
                if (values[i * n + j] - values[j * n + i]).abs() > 1e-9 {
                    return Err(EngineError::InvalidMatrix(format!(
                        "matrix is not symmetric at ('{}', '{}')",
                        ids[i], ids[j]
                    )));
                }
            }
        }
        Ok(Self { ids, index, values })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.ids.len() + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.ids.len();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Dissimilarity between two items addressed by id.
    pub fn get_by_id(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.get(self.index_of(a)?, self.index_of(b)?))
    }

    /// Copy restricted to `order`, in that order.
    pub fn reordered(&self, order: &[usize]) -> Self {
        let ids: Vec<String> = order.iter().map(|&i| self.ids[i].clone()).collect();
        let values = order
            .iter()
            .flat_map(|&i| order.iter().map(move |&j| self.get(i, j)))
            .collect();
        let index = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        Self { ids, index, values }
    }
}

/// Raw, unnormalized dissimilarity of two equal-length motifs.
///
/// Each column adds the table's pair cost, or the gap penalty when either
/// motif has a gap there. Weighted columns are multiplied by the weight.
pub fn raw_dissimilarity(
    a: &Motif,
    b: &Motif,
    table: &SubstitutionMatrix,
    config: &DissimilarityConfig,
) -> Result<f64, EngineError> {
    a.codes()
        .zip(b.codes())
        .enumerate()
        .try_fold(0.0, |total, (i, (x, y))| {
            let weight = if config.weighted_positions.binary_search(&(i + 1)).is_ok() {
                config.weight_multiplier
            } else {
                1.0
            };
            let cost = if is_gap_or_unknown(x) || is_gap_or_unknown(y) {
                config.gap_penalty
            } else {
                table
                    .pair_cost(x, y)
                    .ok_or_else(|| EngineError::UnknownResidue {
                        a: x,
                        b: y,
                        table: table.name().to_string(),
                    })?
            };
            Ok(total + weight * cost)
        })
}

/// Computes the normalized all-pairs dissimilarity matrix over `items`.
///
/// Raw scores are min-max scaled over every entry, the zero diagonal
/// included, so identical motifs score 0 and the most different pair 1. When
/// all entries are equal the matrix is all zeros.
#[instrument(skip_all, name = "dissimilarity", fields(items = items.len()))]
pub fn compute_dissimilarity(
    items: &[(String, Motif)],
    table: &SubstitutionMatrix,
    config: &DissimilarityConfig,
) -> Result<DissimilarityMatrix, EngineError> {
    let Some((first_id, first)) = items.first() else {
        return Err(EngineError::EmptyInput("no motifs to compare".to_string()));
    };
    let length = first.len();
    for (id, motif) in items {
        if motif.len() != length {
            return Err(EngineError::MotifLengthMismatch {
                id: id.clone(),
                expected: length,
                found: motif.len(),
            });
        }
    }
    if let Some(&last) = config.weighted_positions.last() {
        if last > length {
            return Err(ConfigError::InvalidParameter {
                name: "weighted_positions",
                reason: format!("position {last} is beyond motif length {length} (from '{first_id}')"),
            }
            .into());
        }
    }
    if let Some(max_cost) =
        table.max_pair_cost(table.alphabet().iter().copied().filter(|&c| is_standard_code(c)))
    {
        if config.gap_penalty < max_cost {
            warn!(
                gap_penalty = config.gap_penalty,
                max_cost, "Gap penalty is below the largest substitution cost"
            );
        }
    }

    let n = items.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = pairs.iter();

    #[cfg(feature = "parallel")]
    let iterator = pairs.par_iter();

    let raw: Vec<f64> = iterator
        .map(|&(i, j)| raw_dissimilarity(&items[i].1, &items[j].1, table, config))
        .collect::<Result<_, _>>()?;

    let (min, max) = raw
        .iter()
        .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    debug!(min, max, pairs = pairs.len(), "Raw dissimilarity range");

    let mut values = vec![0.0; n * n];
    for (&(i, j), &v) in pairs.iter().zip(&raw) {
        let scaled = if range > 0.0 { (v - min) / range } else { 0.0 };
        values[i * n + j] = scaled;
        values[j * n + i] = scaled;
    }

    info!(items = n, motif_length = length, "Dissimilarity matrix computed");
    let ids = items.iter().map(|(id, _)| id.clone()).collect();
    DissimilarityMatrix::from_values(ids, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::DissimilarityConfigBuilder;

    fn items(motifs: &[&str]) -> Vec<(String, Motif)> {
        motifs
            .iter()
            .enumerate()
            .map(|(i, m)| (format!("s{i}"), Motif::new(m)))
            .collect()
    }

    fn blosum() -> SubstitutionMatrix {
        SubstitutionMatrix::blosum62()
    }

    #[test]
    fn matrix_is_symmetric_with_zero_diagonal_and_unit_range() {
        let items = items(&["HDSK", "HDSR", "WWCC", "HXSK", "ADSK"]);
        let m = compute_dissimilarity(&items, &blosum(), &DissimilarityConfig::default()).unwrap();
        let mut max: f64 = 0.0;
        for i in 0..m.len() {
            assert_eq!(m.get(i, i), 0.0);
            for j in 0..m.len() {
                let v = m.get(i, j);
                assert_eq!(v, m.get(j, i));
                assert!((0.0..=1.0).contains(&v));
                max = max.max(v);
            }
        }
        assert_eq!(max, 1.0);
    }

    #[test]
    fn identical_twelve_residue_motifs_are_zero_apart() {
        let items = items(&["HDSKRCEGYWFT", "HDSKRCEGYWFT"]);
        let m = compute_dissimilarity(&items, &blosum(), &DissimilarityConfig::default()).unwrap();
        assert_eq!(m.get_by_id("s0", "s1"), Some(0.0));
    }

    #[test]
    fn fully_different_pair_normalizes_to_one() {
        let items = items(&["PPPPPPPPPPPP", "WWWWWWWWWWWW"]);
        let m = compute_dissimilarity(&items, &blosum(), &DissimilarityConfig::default()).unwrap();
        assert_eq!(m.get_by_id("s0", "s1"), Some(1.0));
    }

    #[test]
    fn raw_score_uses_pair_costs_and_weights() {
        let table = blosum();
        let config = DissimilarityConfigBuilder::new()
            .weighted_positions(vec![2])
            .build()
            .unwrap();
        // I/L cost is (4 + 4) / 2 - 2 = 2; weighted by 5 at position 2.
        let raw = raw_dissimilarity(&Motif::new("AI"), &Motif::new("AL"), &table, &config).unwrap();
        assert!((raw - 10.0).abs() < 1e-12);
        let gap = raw_dissimilarity(&Motif::new("XI"), &Motif::new("AI"), &table, &config).unwrap();
        assert!((gap - 20.0).abs() < 1e-12);
        let weighted_gap =
            raw_dissimilarity(&Motif::new("AX"), &Motif::new("AI"), &table, &config).unwrap();
        assert!((weighted_gap - 100.0).abs() < 1e-12);
    }

    #[test]
    fn gap_never_lowers_raw_score() {
        let table = blosum();
        let config = DissimilarityConfigBuilder::new()
            .weighted_positions(vec![1, 3])
            .build()
            .unwrap();
        let a = Motif::new("HDSKW");
        let b = Motif::new("PWCGY");
        let base = raw_dissimilarity(&a, &b, &table, &config).unwrap();
        for pos in 0..a.len() {
            let gapped: Motif = b
                .codes()
                .enumerate()
                .map(|(i, c)| if i == pos { 'X' } else { c })
                .collect();
            let score = raw_dissimilarity(&a, &gapped, &table, &config).unwrap();
            assert!(score >= base, "position {pos}: {score} < {base}");
        }
    }

    #[test]
    fn motifs_of_different_length_are_rejected() {
        let items = items(&["HDS", "HD"]);
        let err = compute_dissimilarity(&items, &blosum(), &DissimilarityConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MotifLengthMismatch {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn letters_missing_from_table_are_rejected() {
        let items = items(&["HJS", "HDS"]);
        let err = compute_dissimilarity(&items, &blosum(), &DissimilarityConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownResidue { .. }));
    }

    #[test]
    fn weighted_position_beyond_motif_is_rejected() {
        let config = DissimilarityConfigBuilder::new()
            .weighted_positions(vec![4])
            .build()
            .unwrap();
        let err = compute_dissimilarity(&items(&["HDS", "HDK"]), &blosum(), &config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            compute_dissimilarity(&[], &blosum(), &DissimilarityConfig::default()),
            Err(EngineError::EmptyInput(_))
        ));
    }

    #[test]
    fn from_values_rejects_asymmetric_input() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert!(DissimilarityMatrix::from_values(ids.clone(), vec![0.0, 0.2, 0.3, 0.0]).is_err());
        let m = DissimilarityMatrix::from_values(ids, vec![0.0, 0.2, 0.2, 0.0]).unwrap();
        assert_eq!(m.get_by_id("b", "a"), Some(0.2));
        assert_eq!(m.get_by_id("a", "c"), None);
    }

    #[test]
    fn reordered_keeps_values_attached_to_ids() {
        let items = items(&["HDS", "HDK", "WWW"]);
        let m = compute_dissimilarity(&items, &blosum(), &DissimilarityConfig::default()).unwrap();
        let r = m.reordered(&[2, 0, 1]);
        assert_eq!(r.ids()[0], "s2");
        assert_eq!(r.get_by_id("s0", "s2"), m.get_by_id("s0", "s2"));
        assert_eq!(r.row(0)[0], 0.0);
    }
}
