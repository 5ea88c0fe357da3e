use crate::error::{Result, TabsightError};
use crate::linalg::{eigen_decompose, sort_by_eigenvalue, PowerIteration};
use crate::{Matrix, Vector};
use ndarray::Axis;

#[derive(Clone, Debug)]
pub struct PCA {
    /// Principal directions, one per row.
    pub components: Option<Matrix>,
    pub explained_variance: Option<Vector>,
    pub explained_variance_ratio: Option<Vector>,
    pub mean: Option<Vector>,
    n_components: Option<usize>,
    power: PowerIteration,
}

impl PCA {
    pub fn new() -> Self {
        Self {
            components: None,
            explained_variance: None,
            explained_variance_ratio: None,
            mean: None,
            n_components: None,
            power: PowerIteration::default(),
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
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

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(TabsightError::EmptyDataset);
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let n_components = self.n_components.unwrap_or(n_features);

        if n_components == 0 || n_components > n_features {
            return Err(TabsightError::InvalidParameter(format!(
                "n_components={n_components} must be between 1 and n_features={n_features}"
            )));
        }

        // Center the data
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(TabsightError::EmptyDataset)?;
        let x_centered = x - &mean.view().insert_axis(Axis(0));

        // Directions of the centered matrix are the eigenvectors of its Gram matrix
        let gram = x_centered.t().dot(&x_centered);
        let mut pairs = eigen_decompose(&gram, n_features, self.power)?;
        sort_by_eigenvalue(&mut pairs);

        let dof = (n_samples.max(2) - 1) as f64;
        let total_variance: f64 = pairs.iter().map(|p| p.value.max(0.0)).sum::<f64>() / dof;

        let mut components = Matrix::zeros((n_components, n_features));
        let mut explained_variance = Vector::zeros(n_components);
        for (i, pair) in pairs.iter().take(n_components).enumerate() {
            components.row_mut(i).assign(&pair.vector);
            explained_variance[i] = pair.value.max(0.0) / dof;
        }

        let explained_variance_ratio = if total_variance > 0.0 {
            &explained_variance / total_variance
        } else {
            Vector::zeros(n_components)
        };

        log::debug!(
            "PCA fitted: {n_components} of {n_features} components, explained ratio {:?}",
            explained_variance_ratio.to_vec()
        );

        self.components = Some(components);
        self.explained_variance = Some(explained_variance);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        self.mean = Some(mean);

        Ok(())
    }

    fn fitted(&self) -> Result<(&Matrix, &Vector)> {
        let components = self
            .components
            .as_ref()
            .ok_or(TabsightError::NotFitted("PCA"))?;
        let mean = self.mean.as_ref().ok_or(TabsightError::NotFitted("PCA"))?;
        Ok((components, mean))
    }

    /// Project centered rows onto the fitted directions.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let (components, mean) = self.fitted()?;

        if x.ncols() != mean.len() {
            return Err(TabsightError::DimensionMismatch {
                expected: mean.len(),
                actual: x.ncols(),
            });
        }

        let x_centered = x - &mean.view().insert_axis(Axis(0));
        Ok(x_centered.dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Map projected rows back into the original feature space.
    pub fn inverse_transform(&self, x: &Matrix) -> Result<Matrix> {
        let (components, mean) = self.fitted()?;

        if x.ncols() != components.nrows() {
            return Err(TabsightError::DimensionMismatch {
                expected: components.nrows(),
                actual: x.ncols(),
            });
        }

        Ok(x.dot(components) + &mean.view().insert_axis(Axis(0)))
    }
}

impl Default for PCA {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn classic() -> Matrix {
        array![
            [2.5, 2.4],
            [0.5, 0.7],
            [2.2, 2.9],
            [1.9, 2.2],
            [3.1, 3.0],
            [2.3, 2.7],
            [2.0, 1.6],
            [1.0, 1.1],
            [1.5, 1.6],
            [1.1, 0.9]
        ]
    }

    #[test]
    fn test_pca_basic() {
        let x = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 7.0],
            [7.0, 8.0, 8.0],
            [10.0, 11.0, 13.0]
        ];

        let mut pca = PCA::new().n_components(2);
        let transformed = pca.fit_transform(&x).unwrap();

        assert_eq!(transformed.shape(), &[4, 2]);
        assert!(pca.components.is_some());
        assert!(pca.explained_variance.is_some());
        assert!(pca.explained_variance_ratio.is_some());
        assert!(pca.mean.is_some());
    }

    #[test]
    fn test_pca_reconstruction() {
        let x = classic();
        let mut pca = PCA::new();
        let transformed = pca.fit_transform(&x).unwrap();
        let reconstructed = pca.inverse_transform(&transformed).unwrap();

        let max_error = (&x - &reconstructed)
            .mapv(f64::abs)
            .into_iter()
            .fold(0.0, f64::max);
        assert!(max_error < 1e-6, "max reconstruction error {max_error}");
    }

    #[test]
    fn test_components_orthonormal() {
        let mut pca = PCA::new();
        pca.fit(&classic()).unwrap();
        let c = pca.components.as_ref().unwrap();
        let gram = c.dot(&c.t());
        assert_abs_diff_eq!(gram[[0, 0]], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(gram[[1, 1]], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(gram[[0, 1]], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pca_explained_variance() {
        let mut pca = PCA::new();
        pca.fit(&classic()).unwrap();

        let ratio = pca.explained_variance_ratio.as_ref().unwrap();
        assert_abs_diff_eq!(ratio.sum(), 1.0, epsilon = 1e-8);
        assert!(ratio[0] > ratio[1]);
        assert!(ratio[0] > 0.9);
    }

    #[test]
    fn test_pca_single_component() {
        let x = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [3.0, 6.0, 9.0]];

        let mut pca = PCA::new().n_components(1);
        let transformed = pca.fit_transform(&x).unwrap();

        assert_eq!(transformed.shape(), &[3, 1]);
        let ratio = pca.explained_variance_ratio.as_ref().unwrap();
        assert!(ratio[0] > 0.9);
    }

    #[test]
    fn test_pca_invalid_components() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(PCA::new().n_components(5).fit(&x).is_err());
        assert!(PCA::new().n_components(0).fit(&x).is_err());
    }

    #[test]
    fn test_pca_transform_without_fit() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(PCA::new().transform(&x).is_err());
    }

    #[test]
    fn test_pca_dimension_mismatch() {
        let x_train = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let x_test = array![[1.0, 2.0], [3.0, 4.0]];

        let mut pca = PCA::new();
        pca.fit(&x_train).unwrap();

        assert!(pca.transform(&x_test).is_err());
    }
}
