use crate::dataset::LabelEncoding;
use crate::error::{Result, TabsightError};
use crate::linalg::{eigen_decompose, invert, outer, sort_by_eigenvalue, PowerIteration};
use crate::metrics::accuracy;
use crate::{Matrix, Vector};
use ndarray::Axis;

/// Linear discriminant analysis: reducer plus nearest-class-mean classifier.
#[derive(Clone, Debug)]
pub struct LDA {
    /// Discriminant directions, one per row.
    pub components: Option<Matrix>,
    pub eigenvalues: Option<Vector>,
    pub explained_variance_ratio: Option<Vector>,
    /// Feature means used to center rows before projecting.
    pub mean: Option<Vector>,
    /// Class means of the centered rows, in encoding order.
    pub means: Option<Matrix>,
    pub encoding: Option<LabelEncoding>,
    n_components: usize,
    regularization: f64,
    power: PowerIteration,
}

/// Within-class (`sw`) and between-class (`sb`) scatter of centered rows.
#[derive(Clone, Debug)]
pub struct ScatterMatrices {
    pub sw: Matrix,
    pub sb: Matrix,
}

impl LDA {
    pub fn new() -> Self {
        Self {
            components: None,
            eigenvalues: None,
            explained_variance_ratio: None,
            mean: None,
            means: None,
            encoding: None,
            n_components: 1,
            regularization: 1e-10,
            power: PowerIteration::default(),
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.power.max_iterations = max_iterations;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.power.tolerance = tolerance;
        self
    }

    /// Ridge added to the diagonal of `Sw` before inversion. It is scaled by
    /// the largest diagonal entry of `Sw` when that exceeds 1, so it still
    /// registers for features measured in the thousands.
    pub fn regularization(mut self, epsilon: f64) -> Self {
        self.regularization = epsilon;
        self
    }

    /// Scatter matrices of `x_centered` grouped by `targets`.
    ///
    /// `Sw` sums `(x - global_mean)(x - global_mean)ᵀ` over every sample,
    /// not the per-class deviation. `Sb` sums `n_c (m_c - global_mean)(...)ᵀ`.
    pub fn scatter_matrices(
        x_centered: &Matrix,
        targets: &[usize],
        class_means: &Matrix,
        class_counts: &[usize],
    ) -> ScatterMatrices {
        let n_features = x_centered.ncols();
        let global_mean = x_centered
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Vector::zeros(n_features));

        let mut sw = Matrix::zeros((n_features, n_features));
        for row in x_centered.outer_iter() {
            let diff = &row - &global_mean;
            sw = sw + outer(&diff, &diff);
        }

        let mut sb = Matrix::zeros((n_features, n_features));
        for (class_idx, &count) in class_counts.iter().enumerate() {
            if count > 0 {
                let diff = &class_means.row(class_idx) - &global_mean;
                sb = sb + outer(&diff, &diff) * count as f64;
            }
        }

        debug_assert_eq!(targets.len(), x_centered.nrows());
        ScatterMatrices { sw, sb }
    }

    pub fn fit<S: AsRef<str>>(&mut self, x: &Matrix, y: &[S]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(TabsightError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(TabsightError::EmptyDataset);
        }

        let encoding = LabelEncoding::fit(y);
        if encoding.len() < 2 {
            return Err(TabsightError::InvalidParameter(
                "LDA requires at least 2 classes".to_string(),
            ));
        }

        let n_classes = encoding.len();
        let n_features = x.ncols();
        if self.n_components == 0 || self.n_components > n_features {
            return Err(TabsightError::InvalidParameter(format!(
                "n_components={} must be between 1 and n_features={n_features}",
                self.n_components
            )));
        }
        let targets = encoding.transform(y)?;

        // Center, then group by class
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(TabsightError::EmptyDataset)?;
        let x_centered = x - &mean.view().insert_axis(Axis(0));

        let mut class_means = Matrix::zeros((n_classes, n_features));
        let mut class_counts = vec![0usize; n_classes];
        for (row, &class_idx) in x_centered.outer_iter().zip(&targets) {
            class_counts[class_idx] += 1;
            let mut acc = class_means.row_mut(class_idx);
            acc += &row;
        }
        for (mut row, &count) in class_means.outer_iter_mut().zip(&class_counts) {
            if count > 0 {
                row /= count as f64;
            }
        }

        let ScatterMatrices { sw, sb } =
            Self::scatter_matrices(&x_centered, &targets, &class_means, &class_counts);

        // Generalized problem Sb v = λ Sw v, solved as an ordinary one on Sw⁻¹ Sb
        let scale = sw.diag().iter().fold(1.0_f64, |m, &v| m.max(v.abs()));
        let sw_reg = sw + Matrix::eye(n_features) * (self.regularization * scale);
        let sw_inv = invert(&sw_reg)?;
        let m = sw_inv.dot(&sb);

        let mut pairs = eigen_decompose(&m, n_features, self.power)?;
        sort_by_eigenvalue(&mut pairs);

        let mut components = Matrix::zeros((self.n_components, n_features));
        let mut eigenvalues = Vector::zeros(self.n_components);
        for (i, pair) in pairs.iter().take(self.n_components).enumerate() {
            components.row_mut(i).assign(&pair.vector);
            eigenvalues[i] = pair.value;
        }

        let total: f64 = pairs.iter().map(|p| p.value.max(0.0)).sum();
        let explained_variance_ratio = if total > 0.0 {
            eigenvalues.mapv(|v| v.max(0.0) / total)
        } else {
            Vector::zeros(self.n_components)
        };

        log::debug!(
            "LDA fitted: {n_classes} classes, {n_features} features, leading eigenvalue {:.6}",
            eigenvalues[0]
        );

        self.components = Some(components);
        self.eigenvalues = Some(eigenvalues);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        self.mean = Some(mean);
        self.means = Some(class_means);
        self.encoding = Some(encoding);

        Ok(())
    }

    fn fitted(&self) -> Result<(&Matrix, &Vector)> {
        let components = self
            .components
            .as_ref()
            .ok_or(TabsightError::NotFitted("LDA"))?;
        let mean = self.mean.as_ref().ok_or(TabsightError::NotFitted("LDA"))?;
        Ok((components, mean))
    }

    /// Discriminant scores of every row, one column per component.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let (components, mean) = self.fitted()?;

        if x.ncols() != components.ncols() {
            return Err(TabsightError::DimensionMismatch {
                expected: components.ncols(),
                actual: x.ncols(),
            });
        }

        let x_centered = x - &mean.view().insert_axis(Axis(0));
        Ok(x_centered.dot(&components.t()))
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, x: &Matrix, y: &[S]) -> Result<Matrix> {
        self.fit(x, y)?;
        self.transform(x)
    }

    /// Class whose projected mean is nearest to each projected row.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<String>> {
        let (components, _) = self.fitted()?;
        let class_means = self.means.as_ref().ok_or(TabsightError::NotFitted("LDA"))?;
        let encoding = self.encoding.as_ref().ok_or(TabsightError::NotFitted("LDA"))?;

        let x_transformed = self.transform(x)?;
        let class_means_transformed = class_means.dot(&components.t());

        let predictions = x_transformed
            .outer_iter()
            .map(|row| {
                let mut min_distance = f64::INFINITY;
                let mut predicted_class = 0;
                for (j, mean_row) in class_means_transformed.outer_iter().enumerate() {
                    let distance = (&row - &mean_row).mapv(|d| d * d).sum();
                    if distance < min_distance {
                        min_distance = distance;
                        predicted_class = j;
                    }
                }
                encoding
                    .class_name(predicted_class)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();

        Ok(predictions)
    }

    pub fn score<S: AsRef<str>>(&self, x: &Matrix, y: &[S]) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }

    /// Signed coefficients of component `index` over `feature_names`, e.g.
    /// `+0.7071*width -0.7071*height`.
    pub fn describe_component(&self, index: usize, feature_names: &[String]) -> Result<String> {
        let (components, _) = self.fitted()?;
        if index >= components.nrows() {
            return Err(TabsightError::InvalidParameter(format!(
                "component {index} out of range for {} components",
                components.nrows()
            )));
        }
        if feature_names.len() != components.ncols() {
            return Err(TabsightError::DimensionMismatch {
                expected: components.ncols(),
                actual: feature_names.len(),
            });
        }
        let terms: Vec<String> = components
            .row(index)
            .iter()
            .zip(feature_names)
            .map(|(c, name)| format!("{c:+.4}*{name}"))
            .collect();
        Ok(terms.join(" "))
    }
}

impl Default for LDA {
    fn default() -> Self {
        Self::new()
    }
}
