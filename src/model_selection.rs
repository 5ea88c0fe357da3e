//! Train/test splitting and k-fold cross-validation.
//!
//! Splits are expressed as row indices into the full dataset. Evaluation is
//! closure-based: the caller receives `(train, test)` index slices and
//! returns a score, so any classifier can be plugged in.

use crate::error::{Result, TabsightError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// How a classifier's accuracy is estimated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Validation {
    /// One seeded shuffle, first `train_ratio * n` rows train, the rest test.
    Holdout { train_ratio: f64 },
    /// Seeded shuffle into `k` contiguous folds.
    KFold { k: usize },
}

impl Default for Validation {
    fn default() -> Self {
        Validation::Holdout { train_ratio: 0.7 }
    }
}

/// Row indices for one train/test round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Result for a single fold.
#[derive(Clone, Debug)]
pub struct FoldResult {
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub score: f64,
}

/// Aggregated validation result.
#[derive(Clone, Debug)]
pub struct CvResult {
    pub folds: Vec<FoldResult>,
    pub mean_score: f64,
}

/// `0..n` shuffled with a generator seeded by `seed`.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

pub fn train_test_split(n: usize, train_ratio: f64, seed: u64) -> Result<Split> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(TabsightError::InvalidParameter(format!(
            "train_ratio must be between 0 and 1, got {train_ratio}"
        )));
    }
    // Floor, with a small allowance so 0.29 * 100 still gives 29 rows
    let split_at = (train_ratio * n as f64 + 1e-9).floor() as usize;
    if split_at == 0 || split_at >= n {
        return Err(TabsightError::InvalidParameter(format!(
            "train_ratio {train_ratio} leaves an empty side for {n} rows"
        )));
    }

    let indices = shuffled_indices(n, seed);
    let (train, test) = indices.split_at(split_at);
    Ok(Split {
        train: train.to_vec(),
        test: test.to_vec(),
    })
}

/// Fold sizes for `n` rows: `n / k` each, the last fold takes the remainder.
pub fn fold_sizes(n: usize, k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    let size = n / k;
    let mut sizes = vec![size; k];
    sizes[k - 1] += n - size * k;
    sizes
}

pub fn k_fold(n: usize, k: usize, seed: u64) -> Result<Vec<Split>> {
    if k < 2 {
        return Err(TabsightError::InvalidParameter(
            "k must be at least 2".to_string(),
        ));
    }
    if k > n {
        return Err(TabsightError::InvalidParameter(format!(
            "k ({k}) > n_samples ({n})"
        )));
    }

    let indices = shuffled_indices(n, seed);
    let mut splits = Vec::with_capacity(k);
    let mut start = 0;
    for size in fold_sizes(n, k) {
        let end = start + size;
        let test = indices[start..end].to_vec();
        let train = indices[..start]
            .iter()
            .chain(&indices[end..])
            .copied()
            .collect();
        splits.push(Split { train, test });
        start = end;
    }
    Ok(splits)
}

fn run_splits<F>(splits: &[Split], eval_fn: &mut F) -> Result<CvResult>
where
    F: FnMut(&[usize], &[usize]) -> Result<f64>,
{
    let mut folds = Vec::with_capacity(splits.len());
    for (fold, split) in splits.iter().enumerate() {
        let score = eval_fn(&split.train, &split.test)?;
        log::debug!(
            "fold {fold}: train={} test={} score={score:.4}",
            split.train.len(),
            split.test.len()
        );
        folds.push(FoldResult {
            fold,
            n_train: split.train.len(),
            n_test: split.test.len(),
            score,
        });
    }
    let mean_score = folds.iter().map(|f| f.score).sum::<f64>() / folds.len().max(1) as f64;
    Ok(CvResult { folds, mean_score })
}

/// K-fold cross-validation over `n` rows.
pub fn cross_validate<F>(n: usize, k: usize, seed: u64, mut eval_fn: F) -> Result<CvResult>
where
    F: FnMut(&[usize], &[usize]) -> Result<f64>,
{
    let splits = k_fold(n, k, seed)?;
    run_splits(&splits, &mut eval_fn)
}

/// Run `eval_fn` under the chosen strategy. A holdout produces one fold.
pub fn evaluate<F>(validation: Validation, n: usize, seed: u64, mut eval_fn: F) -> Result<CvResult>
where
    F: FnMut(&[usize], &[usize]) -> Result<f64>,
{
    let splits = match validation {
        Validation::Holdout { train_ratio } => vec![train_test_split(n, train_ratio, seed)?],
        Validation::KFold { k } => k_fold(n, k, seed)?,
    };
    run_splits(&splits, &mut eval_fn)
}
