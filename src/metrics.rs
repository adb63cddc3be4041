// src/metrics.rs - BLEU (modified n-gram precision + brevity penalty)
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::tokenizer::tokenize;

/// Highest n-gram order used when the caller does not choose one.
pub const DEFAULT_MAX_N: usize = 4;

/// Added to every precision before taking its logarithm, so an order with
/// zero matches pulls the geometric mean down to a tiny floor instead of
/// making it exactly zero.
pub const SMOOTHING_EPSILON: f64 = 1e-10;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Malformed scoring input, rejected before anything is computed.
#[derive(Debug, Clone, PartialEq)]
pub enum BleuError {
    /// `max_n` was zero.
    InvalidOrder,
    /// The reference collection was empty.
    NoReferences,
    /// Number of weights differs from `max_n`.
    WeightCountMismatch { expected: usize, found: usize },
    /// A weight was negative, NaN or infinite.
    InvalidWeight { index: usize, value: f64 },
    /// Weights do not add up to 1.
    WeightSum(f64),
}

impl fmt::Display for BleuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrder => write!(f, "max n-gram order must be at least 1"),
            Self::NoReferences => write!(f, "at least one reference is required"),
            Self::WeightCountMismatch { expected, found } => {
                write!(f, "expected {expected} weights (one per order), got {found}")
            }
            Self::InvalidWeight { index, value } => {
                write!(f, "weight for order {} is invalid: {value}", index + 1)
            }
            Self::WeightSum(sum) => write!(f, "weights must sum to 1, got {sum}"),
        }
    }
}

impl std::error::Error for BleuError {}

/// Clipped precision for a single n-gram order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Precision {
    pub precision: f64,
    pub clipped: usize,
    pub total: usize,
}

/// One line of the diagnostic n-gram table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NgramRow {
    pub n: usize,
    pub precision: f64,
    pub clipped: usize,
    pub total: usize,
}

/// Everything computed for one (candidate, reference set) pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BleuScore {
    pub bleu: f64,
    pub bp: f64,
    /// Precision per order, keyed 1..=max_n.
    pub precisions: BTreeMap<usize, f64>,
    /// Same orders in ascending n, with the raw counts.
    pub ngram_table: Vec<NgramRow>,
    pub candidate_len: usize,
    pub reference_lens: Vec<usize>,
}

impl BleuScore {
    pub fn precision(&self, n: usize) -> Option<f64> {
        self.precisions.get(&n).copied()
    }

    pub fn max_n(&self) -> usize {
        self.ngram_table.len()
    }
}

/// Count every window of `n` consecutive tokens.
///
/// A sequence of length `L` yields `L - n + 1` windows; shorter sequences
/// (and `n == 0`) give an empty table.
pub fn ngrams(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut map = HashMap::new();
    if n == 0 || tokens.len() < n {
        return map;
    }
    for window in tokens.windows(n) {
        *map.entry(window).or_insert(0) += 1;
    }
    map
}

/// Modified n-gram precision: candidate counts clipped by the largest count
/// of the same n-gram in any single reference.
pub fn modified_precision(candidate: &[String], references: &[Vec<String>], n: usize) -> Precision {
    let cand_ngrams = ngrams(candidate, n);
    if cand_ngrams.is_empty() {
        return Precision::default();
    }

    let mut max_ref_counts: HashMap<&[String], usize> = HashMap::new();
    for reference in references {
        for (ng, count) in ngrams(reference, n) {
            let entry = max_ref_counts.entry(ng).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    let clipped: usize = cand_ngrams
        .iter()
        .map(|(ng, &count)| count.min(max_ref_counts.get(ng).copied().unwrap_or(0)))
        .sum();
    let total: usize = cand_ngrams.values().sum();

    let precision = if total > 0 {
        clipped as f64 / total as f64
    } else {
        0.0
    };
    Precision { precision, clipped, total }
}

/// Reference length closest to `candidate_len`; the earliest one wins a tie.
pub fn closest_reference_length<I>(candidate_len: usize, reference_lens: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    reference_lens
        .into_iter()
        .min_by_key(|&len| len.abs_diff(candidate_len))
}

/// Brevity penalty against the closest reference length.
///
/// With no references the closest length is taken as 0.
pub fn brevity_penalty(candidate: &[String], references: &[Vec<String>]) -> f64 {
    let c = candidate.len();
    let r = closest_reference_length(c, references.iter().map(Vec::len)).unwrap_or(0);
    if c > r {
        1.0
    } else if c == 0 {
        0.0
    } else {
        (1.0 - r as f64 / c as f64).exp()
    }
}

/// Check `max_n` and the optional per-order weights.
pub fn validate_params(max_n: usize, weights: Option<&[f64]>) -> Result<(), BleuError> {
    if max_n == 0 {
        return Err(BleuError::InvalidOrder);
    }
    let Some(weights) = weights else {
        return Ok(());
    };
    if weights.len() != max_n {
        return Err(BleuError::WeightCountMismatch {
            expected: max_n,
            found: weights.len(),
        });
    }
    if let Some((index, &value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(BleuError::InvalidWeight { index, value });
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(BleuError::WeightSum(sum));
    }
    Ok(())
}

/// BLEU for one tokenized candidate against a set of tokenized references.
///
/// Precisions for orders `1..=max_n` are combined as a geometric mean in log
/// space (each shifted by [`SMOOTHING_EPSILON`]), uniformly unless `weights`
/// is given, then multiplied by the brevity penalty. Empty candidates or
/// references are valid input and simply score (close to) zero.
pub fn compute_bleu(
    candidate: &[String],
    references: &[Vec<String>],
    max_n: usize,
    weights: Option<&[f64]>,
) -> Result<(f64, BleuScore), BleuError> {
    validate_params(max_n, weights)?;
    if references.is_empty() {
        return Err(BleuError::NoReferences);
    }

    let mut precisions = BTreeMap::new();
    let mut ngram_table = Vec::with_capacity(max_n);

    for n in 1..=max_n {
        let Precision { precision, clipped, total } = modified_precision(candidate, references, n);
        precisions.insert(n, precision);
        ngram_table.push(NgramRow { n, precision, clipped, total });
    }

    // Geometric mean in log space to avoid underflow
    let log_mean: f64 = match weights {
        None => {
            let log_sum: f64 = precisions
                .values()
                .map(|p| (p + SMOOTHING_EPSILON).ln())
                .sum();
            log_sum / max_n as f64
        }
        Some(weights) => weights
            .iter()
            .zip(precisions.values())
            .map(|(w, p)| w * (p + SMOOTHING_EPSILON).ln())
            .sum(),
    };
    let geo_mean = log_mean.exp();

    let bp = brevity_penalty(candidate, references);
    let bleu = bp * geo_mean;

    let score = BleuScore {
        bleu,
        bp,
        precisions,
        ngram_table,
        candidate_len: candidate.len(),
        reference_lens: references.iter().map(Vec::len).collect(),
    };
    Ok((bleu, score))
}

/// Convenience: tokenize raw strings and score with the default order.
pub fn bleu_score(references: &[&str], candidate: &str) -> Result<BleuScore, BleuError> {
    let cand_tok = tokenize(candidate);
    let ref_tok: Vec<Vec<String>> = references.iter().map(|r| tokenize(r)).collect();
    compute_bleu(&cand_tok, &ref_tok, DEFAULT_MAX_N, None).map(|(_, score)| score)
}
