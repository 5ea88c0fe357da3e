use super::distance::{Distance, Metric};
use crate::dataset::LabelEncoding;
use crate::error::{Result, TabsightError};
use crate::metrics::accuracy;
use crate::vote::majority_vote;
use crate::{Matrix, Vector};
use ndarray::ArrayView1;

/// How k-NN predictions are written out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KnnOutput {
    /// The predicted class name.
    #[default]
    ClassName,
    /// The predicted class through the label encoding, in `[0, 1]`.
    Encoded,
}

/// Brute-force k-nearest-neighbors classifier.
#[derive(Clone, Debug)]
pub struct KNeighborsClassifier<M = Distance> {
    pub encoding: Option<LabelEncoding>,
    training: Option<Matrix>,
    targets: Vec<usize>,
    k: usize,
    metric: M,
}

impl KNeighborsClassifier<Distance> {
    pub fn new(k: usize) -> Self {
        Self {
            encoding: None,
            training: None,
            targets: Vec::new(),
            k,
            metric: Distance::Euclidean,
        }
    }
}

impl<M: Metric> KNeighborsClassifier<M> {
    /// Swap the distance metric, keeping `k`.
    pub fn metric<N: Metric>(self, metric: N) -> KNeighborsClassifier<N> {
        KNeighborsClassifier {
            encoding: self.encoding,
            training: self.training,
            targets: self.targets,
            k: self.k,
            metric,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Store the training rows. `k` is not checked against the row count; a
    /// `k` at or above it votes over the whole training set.
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
        if self.k == 0 {
            return Err(TabsightError::InvalidParameter("k must be > 0".to_string()));
        }

        let encoding = LabelEncoding::fit(y);
        self.targets = encoding.transform(y)?;
        self.encoding = Some(encoding);
        self.training = Some(x.clone());
        Ok(())
    }

    /// The `k` closest training rows as `(row, distance)`, nearest first.
    /// Equal distances keep training-row order.
    pub fn kneighbors(&self, query: ArrayView1<f64>) -> Result<Vec<(usize, f64)>> {
        let training = self
            .training
            .as_ref()
            .ok_or(TabsightError::NotFitted("KNeighborsClassifier"))?;
        if query.len() != training.ncols() {
            return Err(TabsightError::DimensionMismatch {
                expected: training.ncols(),
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<(usize, f64)> = training
            .outer_iter()
            .enumerate()
            .map(|(i, row)| (i, self.metric.distance(query, row)))
            .collect();
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1));
        neighbors.truncate(self.k);
        Ok(neighbors)
    }

    fn vote(&self, query: ArrayView1<f64>) -> Result<usize> {
        let neighbors = self.kneighbors(query)?;
        majority_vote(neighbors.iter().map(|&(i, _)| self.targets[i]))
            .ok_or(TabsightError::NotFitted("KNeighborsClassifier"))
    }

    fn encoding(&self) -> Result<&LabelEncoding> {
        self.encoding
            .as_ref()
            .ok_or(TabsightError::NotFitted("KNeighborsClassifier"))
    }

    pub fn predict_row(&self, query: ArrayView1<f64>) -> Result<&str> {
        let class = self.vote(query)?;
        let encoding = self.encoding()?;
        Ok(encoding.class_name(class).unwrap_or_default())
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vec<String>> {
        x.outer_iter()
            .map(|row| self.predict_row(row).map(str::to_string))
            .collect()
    }

    /// Predictions through the label encoding.
    pub fn predict_encoded(&self, x: &Matrix) -> Result<Vector> {
        let encoding = self.encoding()?;
        let values = x
            .outer_iter()
            .map(|row| self.vote(row).map(|class| encoding.value(class)))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Vector::from(values))
    }

    pub fn score<S: AsRef<str>>(&self, x: &Matrix, y: &[S]) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }
}
