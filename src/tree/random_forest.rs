use super::decision_tree::{check_finite, Criterion, DecisionTree};
use crate::dataset::{LabelEncoding, Table};
use crate::error::{Result, TabsightError};
use crate::metrics::accuracy;
use crate::vote::VoteTally;
use crate::Matrix;
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bagged ensemble of [`DecisionTree`]s.
///
/// Each tree sees a bootstrap sample of `round(n * sample_ratio)` rows drawn
/// with replacement and every feature at every split. Predictions are the
/// plurality vote across trees.
#[derive(Clone, Debug)]
pub struct RandomForest {
    pub encoding: Option<LabelEncoding>,
    trees: Vec<DecisionTree>,
    n_trees: usize,
    sample_ratio: f64,
    seed: u64,
    criterion: Criterion,
    max_depth: Option<usize>,
    feature_names: Vec<String>,
}

impl RandomForest {
    /// `seed` fixes the bootstrap draws: the same seed and data give the
    /// same forest.
    pub fn new(n_trees: usize, seed: u64) -> Self {
        Self {
            encoding: None,
            trees: Vec::new(),
            n_trees,
            sample_ratio: 1.0,
            seed,
            criterion: Criterion::Gini,
            max_depth: None,
            feature_names: Vec::new(),
        }
    }

    pub fn sample_ratio(mut self, sample_ratio: f64) -> Self {
        self.sample_ratio = sample_ratio;
        self
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    pub fn fit<S: AsRef<str>>(&mut self, x: &Matrix, y: &[S]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(TabsightError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(TabsightError::EmptyDataset);
        }
        if self.n_trees == 0 {
            return Err(TabsightError::InvalidParameter(
                "n_trees must be > 0".to_string(),
            ));
        }
        let n_samples = x.nrows();
        let sample_size = (n_samples as f64 * self.sample_ratio).round();
        if !(sample_size >= 1.0) {
            return Err(TabsightError::InvalidParameter(format!(
                "sample_ratio {} draws no rows from {n_samples}",
                self.sample_ratio
            )));
        }
        let sample_size = sample_size as usize;
        check_finite(x, 0..n_samples)?;

        let encoding = LabelEncoding::fit(y);
        let targets = encoding.transform(y)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);

        for _ in 0..self.n_trees {
            let sample: Vec<usize> = (0..sample_size)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();

            let mut tree = DecisionTree::new()
                .criterion(self.criterion)
                .feature_names(self.feature_names.clone());
            if let Some(depth) = self.max_depth {
                tree = tree.max_depth(depth);
            }
            tree.fit_indices(x, &targets, encoding.clone(), &sample)?;
            trees.push(tree);
        }

        log::debug!(
            "random forest: {} trees on {sample_size}-row bootstrap samples (seed {})",
            trees.len(),
            self.seed
        );

        self.trees = trees;
        self.encoding = Some(encoding);
        Ok(())
    }

    fn fitted(&self) -> Result<&LabelEncoding> {
        self.encoding
            .as_ref()
            .ok_or(TabsightError::NotFitted("RandomForest"))
    }

    fn elect<F>(&self, mut vote: F) -> Result<&str>
    where
        F: FnMut(&DecisionTree) -> Result<usize>,
    {
        let encoding = self.fitted()?;
        let mut tally = VoteTally::new();
        for tree in &self.trees {
            tally.add(vote(tree)?);
        }
        let class = tally
            .into_winner()
            .ok_or(TabsightError::NotFitted("RandomForest"))?;
        Ok(encoding.class_name(class).unwrap_or_default())
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<&str> {
        self.elect(|tree| tree.predict_class(row))
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vec<String>> {
        x.outer_iter()
            .map(|row| self.predict_row(row).map(str::to_string))
            .collect()
    }

    /// Predict every row of `table` from its string cells; see
    /// [`DecisionTree::predict_table`].
    pub fn predict_table<T: Table + ?Sized>(
        &self,
        table: &T,
        columns: &[usize],
    ) -> Result<Vec<String>> {
        (0..table.n_rows())
            .map(|row| {
                self.elect(|tree| tree.predict_table_row_class(table, row, columns))
                    .map(str::to_string)
            })
            .collect()
    }

    pub fn score<S: AsRef<str>>(&self, x: &Matrix, y: &[S]) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Matrix, Vec<&'static str>) {
        let x = array![
            [1.0, 1.1],
            [1.2, 0.9],
            [0.8, 1.0],
            [1.1, 1.3],
            [5.0, 5.2],
            [5.3, 4.9],
            [4.8, 5.1],
            [5.1, 5.0],
            [9.0, 1.0],
            [9.2, 1.2],
            [8.8, 0.9],
            [9.1, 1.1]
        ];
        let y = vec![
            "a", "a", "a", "a", "b", "b", "b", "b", "c", "c", "c", "c",
        ];
        (x, y)
    }

    #[test]
    fn test_forest_separates_blobs() {
        let (x, y) = blobs();
        let mut forest = RandomForest::new(15, 42);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.trees().len(), 15);
        let acc = forest.score(&x, &y).unwrap();
        assert!(acc >= 0.9 && acc <= 1.0, "accuracy {acc}");
        assert_eq!(forest.predict_row(array![5.0, 5.0].view()).unwrap(), "b");
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = blobs();
        let points = array![[3.0, 3.0], [7.0, 3.0], [1.0, 5.0], [5.0, 1.0]];

        let mut first = RandomForest::new(9, 7).sample_ratio(0.6);
        first.fit(&x, &y).unwrap();
        let mut second = RandomForest::new(9, 7).sample_ratio(0.6);
        second.fit(&x, &y).unwrap();

        assert_eq!(first.predict(&points).unwrap(), second.predict(&points).unwrap());
        for (a, b) in first.trees().iter().zip(second.trees()) {
            assert_eq!(a.nodes(), b.nodes());
        }
    }

    #[test]
    fn test_invalid_configuration() {
        let (x, y) = blobs();
        assert!(RandomForest::new(0, 1).fit(&x, &y).is_err());
        assert!(RandomForest::new(3, 1).sample_ratio(0.0).fit(&x, &y).is_err());
        assert!(RandomForest::new(3, 1).predict(&x).is_err());
    }

    #[test]
    fn test_non_finite_row_refused_even_if_not_sampled() {
        let (mut x, y) = blobs();
        x[[5, 1]] = f64::NAN;
        let mut forest = RandomForest::new(1, 3).sample_ratio(0.1);
        assert!(matches!(
            forest.fit(&x, &y),
            Err(TabsightError::MalformedInstance { row: 5, column: 1, .. })
        ));
        assert!(forest.trees().is_empty());
    }
}
