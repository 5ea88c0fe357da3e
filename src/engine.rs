//! Column producers.
//!
//! Each entry point reads a [`Table`], runs one algorithm and appends the
//! result to the same value through [`ColumnSink`]. Shape problems (no rows,
//! no class column, bad parameters) abort before anything is written, and
//! each call appends its column(s) only after every value is computed.
//!
//! ```rust
//! use tabsight::engine::{classify_with_knn, KnnConfig};
//! use tabsight::{DataTable, Table};
//!
//! let mut table = DataTable::from_records(
//!     ["x", "y", "class"],
//!     [["0.1", "0.2", "a"], ["0.2", "0.1", "a"], ["0.9", "0.8", "b"], ["0.8", "0.9", "b"]],
//! )
//! .unwrap();
//!
//! let summary = classify_with_knn(&mut table, &KnnConfig { k: 1, ..Default::default() }).unwrap();
//! assert_eq!(summary.accuracy, 1.0);
//! assert_eq!(table.n_columns(), 4);
//! ```

use crate::dataset::{check_not_empty, format_value, ColumnSink, FeatureSet, Table};
use crate::decomposition::{LDA, PCA};
use crate::error::{Result, TabsightError};
use crate::metrics::accuracy;
use crate::model_selection::{evaluate, CvResult, Validation};
use crate::neighbors::{Distance, KNeighborsClassifier, KnnOutput};
use crate::optimize::{Init, Trig, WeightedSumFit, WeightedSumOptimizer};
use crate::preprocessing::min_max_scale_columns;
use crate::tree::{Criterion, DecisionTree, RandomForest};
use crate::{Matrix, Vector};

const DEFAULT_SEED: u64 = 42;

#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub validation: Validation,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Seeds the validation shuffle.
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            validation: Validation::default(),
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub sample_ratio: f64,
    pub validation: Validation,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    /// Seeds both the validation shuffle and the bootstrap draws.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 10,
            sample_ratio: 1.0,
            validation: Validation::default(),
            criterion: Criterion::Gini,
            max_depth: None,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Clone, Debug)]
pub struct KnnConfig {
    pub k: usize,
    pub metric: Distance,
    pub output: KnnOutput,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 3,
            metric: Distance::Euclidean,
            output: KnnOutput::ClassName,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PcaConfig {
    pub n_components: usize,
    /// Rescale each written column to `[0, 1]`.
    pub normalize: bool,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            n_components: 1,
            normalize: true,
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LdaConfig {
    pub n_components: usize,
    pub normalize: bool,
    pub max_iterations: usize,
    /// Power-iteration stopping threshold, in percent.
    pub convergence_threshold_percent: f64,
    pub regularization: f64,
    /// Used by [`classify_with_lda`] only.
    pub validation: Validation,
    pub seed: u64,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_components: 1,
            normalize: true,
            max_iterations: 1000,
            convergence_threshold_percent: 1e-8,
            regularization: 1e-10,
            validation: Validation::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl LdaConfig {
    fn estimator(&self) -> LDA {
        LDA::new()
            .n_components(self.n_components)
            .max_iterations(self.max_iterations)
            .tolerance(self.convergence_threshold_percent / 100.0)
            .regularization(self.regularization)
    }
}

#[derive(Clone, Debug)]
pub struct WeightedSumConfig {
    /// Source columns to combine. `None` takes every numeric column.
    pub columns: Option<Vec<usize>>,
    pub learning_rate: f64,
    pub step: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub init: Init,
    pub clamp: Option<(f64, f64)>,
    pub trig: Trig,
    pub adaptive: bool,
    pub seed: u64,
}

impl Default for WeightedSumConfig {
    fn default() -> Self {
        Self {
            columns: None,
            learning_rate: 0.01,
            step: 1e-4,
            tolerance: 1e-6,
            max_iterations: 1000,
            init: Init::default(),
            clamp: None,
            trig: Trig::Identity,
            adaptive: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl WeightedSumConfig {
    fn optimizer(&self) -> WeightedSumOptimizer {
        let optimizer = WeightedSumOptimizer::new(self.seed)
            .learning_rate(self.learning_rate)
            .step(self.step)
            .tolerance(self.tolerance)
            .max_iterations(self.max_iterations)
            .init(self.init)
            .trig(self.trig)
            .adaptive(self.adaptive);
        match self.clamp {
            Some((min, max)) => optimizer.clamp(min, max),
            None => optimizer,
        }
    }
}

/// What a classifier run reports back.
#[derive(Clone, Debug)]
pub struct ClassifierSummary {
    pub column_name: String,
    /// Fraction correct: the validation mean, or training accuracy when the
    /// classifier is not validated.
    pub accuracy: f64,
    pub validation: Option<CvResult>,
}

impl ClassifierSummary {
    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy * 100.0
    }
}

#[derive(Clone, Debug)]
pub struct ProjectionSummary {
    pub column_names: Vec<String>,
    /// Share of the spread carried by each written column.
    pub explained_variance_ratio: Vector,
}

#[derive(Clone, Debug)]
pub struct WeightedSumSummary {
    pub column_name: String,
    pub fit: WeightedSumFit,
}

/// Fit on each training subset and score on the held-out rows.
fn validate<F>(data: &FeatureSet, validation: Validation, seed: u64, mut fit_score: F) -> Result<CvResult>
where
    F: FnMut(&Matrix, &[String], &Matrix, &[String]) -> Result<f64>,
{
    evaluate(validation, data.n_samples(), seed, |train, test| {
        let (x_train, y_train) = data.subset(train);
        let (x_test, y_test) = data.subset(test);
        fit_score(&x_train, &y_train, &x_test, &y_test)
    })
}

fn append_classification<T>(
    table: &mut T,
    base: &str,
    values: Vec<String>,
    accuracy: f64,
    validation: Option<CvResult>,
) -> Result<ClassifierSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let column_name = table.unique_column_name(base);
    table.append_column(column_name.clone(), values)?;
    log::info!(
        "appended {column_name:?}, accuracy {:.2}%",
        accuracy * 100.0
    );
    Ok(ClassifierSummary {
        column_name,
        accuracy,
        validation,
    })
}

fn append_projection<T>(
    table: &mut T,
    names: Vec<String>,
    projected: Matrix,
    normalize: bool,
    explained_variance_ratio: Vector,
) -> Result<ProjectionSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let projected = if normalize {
        min_max_scale_columns(&projected)
    } else {
        projected
    };

    let mut column_names = Vec::with_capacity(names.len());
    for (base, column) in names.iter().zip(projected.columns()) {
        let name = table.unique_column_name(base);
        table.append_column(name.clone(), column.iter().map(|&v| format_value(v)).collect())?;
        column_names.push(name);
    }
    log::info!("appended projection columns {column_names:?}");

    Ok(ProjectionSummary {
        column_names,
        explained_variance_ratio,
    })
}

fn tree_for(config: &TreeConfig, names: &[String]) -> DecisionTree {
    let tree = DecisionTree::new()
        .criterion(config.criterion)
        .min_samples_split(config.min_samples_split)
        .feature_names(names.to_vec());
    match config.max_depth {
        Some(depth) => tree.max_depth(depth),
        None => tree,
    }
}

fn forest_for(config: &ForestConfig, names: &[String]) -> RandomForest {
    let forest = RandomForest::new(config.n_trees, config.seed)
        .sample_ratio(config.sample_ratio)
        .criterion(config.criterion)
        .feature_names(names.to_vec());
    match config.max_depth {
        Some(depth) => forest.max_depth(depth),
        None => forest,
    }
}

/// Validate a decision tree, then retrain it on every row and append its
/// predictions.
pub fn classify_with_tree<T>(table: &mut T, config: &TreeConfig) -> Result<ClassifierSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let data = FeatureSet::from_table(&*table)?;

    let cv = validate(&data, config.validation, config.seed, |x, y, x_test, y_test| {
        let mut tree = tree_for(config, &data.names);
        tree.fit(x, y)?;
        tree.score(x_test, y_test)
    })?;

    let mut tree = tree_for(config, &data.names);
    tree.fit(&data.features, &data.labels)?;
    log::debug!(
        "final tree: {} nodes, {} leaves, depth {}",
        tree.nodes().len(),
        tree.n_leaves(),
        tree.depth()
    );
    let predictions = tree.predict_table(&*table, &data.columns)?;

    let accuracy = cv.mean_score;
    append_classification(table, "DecisionTree", predictions, accuracy, Some(cv))
}

/// Validate a random forest, then retrain it on every row and append its
/// predictions.
pub fn classify_with_forest<T>(table: &mut T, config: &ForestConfig) -> Result<ClassifierSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let data = FeatureSet::from_table(&*table)?;

    let cv = validate(&data, config.validation, config.seed, |x, y, x_test, y_test| {
        let mut forest = forest_for(config, &data.names);
        forest.fit(x, y)?;
        forest.score(x_test, y_test)
    })?;

    let mut forest = forest_for(config, &data.names);
    forest.fit(&data.features, &data.labels)?;
    let predictions = forest.predict_table(&*table, &data.columns)?;

    let accuracy = cv.mean_score;
    append_classification(table, "RandomForest", predictions, accuracy, Some(cv))
}

/// Classify every row by its `k` nearest rows (itself included) and append
/// the predicted class or its encoded value.
pub fn classify_with_knn<T>(table: &mut T, config: &KnnConfig) -> Result<ClassifierSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let data = FeatureSet::from_table(&*table)?;

    let mut knn = KNeighborsClassifier::new(config.k).metric(config.metric);
    knn.fit(&data.features, &data.labels)?;
    let predictions = knn.predict(&data.features)?;
    let accuracy = accuracy(&data.labels, &predictions)?;

    let values = match config.output {
        KnnOutput::ClassName => predictions,
        KnnOutput::Encoded => {
            let encoding = knn
                .encoding
                .as_ref()
                .ok_or(TabsightError::NotFitted("KNeighborsClassifier"))?;
            predictions
                .iter()
                .map(|p| format_value(encoding.encode(p).unwrap_or(f64::NAN)))
                .collect()
        }
    };

    let base = format!("kNN k={} {}", config.k, config.metric.name());
    append_classification(table, &base, values, accuracy, None)
}

/// Append the leading principal components of the numeric columns. The class
/// column, if any, is left out; it is not required.
pub fn extract_pca<T>(table: &mut T, config: &PcaConfig) -> Result<ProjectionSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    check_not_empty(&*table)?;
    let data = FeatureSet::extract(&*table, table.class_column())?;

    let mut pca = PCA::new()
        .n_components(config.n_components)
        .max_iterations(config.max_iterations)
        .tolerance(config.tolerance);
    let projected = pca.fit_transform(&data.features)?;
    let ratio = pca
        .explained_variance_ratio
        .clone()
        .ok_or(TabsightError::NotFitted("PCA"))?;

    let names = (1..=config.n_components).map(|i| format!("PCA{i}")).collect();
    append_projection(table, names, projected, config.normalize, ratio)
}

/// Append the leading discriminant scores. Each column is named after the
/// signed coefficients of its direction.
pub fn extract_lda<T>(table: &mut T, config: &LdaConfig) -> Result<ProjectionSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let data = FeatureSet::from_table(&*table)?;

    let mut lda = config.estimator();
    let projected = lda.fit_transform(&data.features, &data.labels)?;
    let ratio = lda
        .explained_variance_ratio
        .clone()
        .ok_or(TabsightError::NotFitted("LDA"))?;

    let names = (0..config.n_components)
        .map(|i| {
            lda.describe_component(i, &data.names)
                .map(|terms| format!("LDA{} {terms}", i + 1))
        })
        .collect::<Result<Vec<_>>>()?;
    append_projection(table, names, projected, config.normalize, ratio)
}

/// Validate LDA as a nearest-class-mean classifier, then retrain on every
/// row and append its predictions.
pub fn classify_with_lda<T>(table: &mut T, config: &LdaConfig) -> Result<ClassifierSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    let data = FeatureSet::from_table(&*table)?;

    let cv = validate(&data, config.validation, config.seed, |x, y, x_test, y_test| {
        let mut lda = config.estimator();
        lda.fit(x, y)?;
        lda.score(x_test, y_test)
    })?;

    let mut lda = config.estimator();
    lda.fit(&data.features, &data.labels)?;
    let predictions = lda.predict(&data.features)?;

    let accuracy = cv.mean_score;
    append_classification(table, "LDA", predictions, accuracy, Some(cv))
}

/// Optimize a weighted sum of columns for class separability and append its
/// value per row. Rows with a non-numeric cell in a chosen column get `NaN`.
pub fn weighted_sum<T>(table: &mut T, config: &WeightedSumConfig) -> Result<WeightedSumSummary>
where
    T: Table + ColumnSink + ?Sized,
{
    check_not_empty(&*table)?;
    let class_column = table.class_column().ok_or(TabsightError::NoClassColumn)?;
    let data = match &config.columns {
        Some(columns) if columns.is_empty() => {
            return Err(TabsightError::InvalidParameter(
                "no columns selected for the weighted sum".to_string(),
            ));
        }
        Some(columns) => FeatureSet::with_columns(&*table, columns, Some(class_column))?,
        None => FeatureSet::extract(&*table, Some(class_column))?,
    };

    let fit = config.optimizer().fit(&data.features, &data.labels)?;
    let values = fit
        .project(&data.features)
        .iter()
        .map(|&v| format_value(v))
        .collect();

    let column_name = table.unique_column_name(&fit.expression(&data.names));
    table.append_column(column_name.clone(), values)?;
    log::info!(
        "appended {column_name:?} after {} iterations, separability {:.4}",
        fit.iterations,
        fit.objective
    );

    Ok(WeightedSumSummary { column_name, fit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataTable;
    use approx::assert_abs_diff_eq;

    fn blobs() -> DataTable {
        let mut rows = Vec::new();
        for i in 0..10 {
            let t = i as f64 * 0.05;
            rows.push(vec![format!("{:.2}", 1.0 + t), format!("{:.2}", 1.0 - t), "a".to_string()]);
            rows.push(vec![format!("{:.2}", 5.0 + t), format!("{:.2}", 5.0 - t), "b".to_string()]);
        }
        DataTable::new(vec!["x".into(), "y".into(), "Class".into()], rows).unwrap()
    }

    fn column(table: &DataTable, name: &str) -> Vec<String> {
        let c = table.column_index(name).unwrap();
        table.column(c).map(str::to_string).collect()
    }

    #[test]
    fn test_tree_column_and_accuracy() {
        let mut table = blobs();
        let summary = classify_with_tree(&mut table, &TreeConfig::default()).unwrap();
        assert_eq!(summary.column_name, "DecisionTree");
        assert_abs_diff_eq!(summary.accuracy, 1.0);
        assert_eq!(summary.validation.as_ref().unwrap().folds.len(), 1);
        assert_eq!(column(&table, "DecisionTree"), column(&table, "Class"));
    }

    #[test]
    fn test_forest_kfold() {
        let mut table = blobs();
        let config = ForestConfig {
            n_trees: 5,
            validation: Validation::KFold { k: 4 },
            ..Default::default()
        };
        let summary = classify_with_forest(&mut table, &config).unwrap();
        let cv = summary.validation.as_ref().unwrap();
        assert_eq!(cv.folds.len(), 4);
        assert!((0.0..=1.0).contains(&summary.accuracy));
        assert_abs_diff_eq!(summary.accuracy_percent(), summary.accuracy * 100.0);
    }

    #[test]
    fn test_knn_encoded_output() {
        let mut table = blobs();
        let config = KnnConfig {
            k: 1,
            output: KnnOutput::Encoded,
            ..Default::default()
        };
        let summary = classify_with_knn(&mut table, &config).unwrap();
        assert_eq!(summary.column_name, "kNN k=1 euclidean");
        assert!(summary.validation.is_none());
        let values = column(&table, &summary.column_name);
        assert_eq!(values[0], "0.0000");
        assert_eq!(values[1], "1.0000");
    }

    #[test]
    fn test_pca_columns_normalized() {
        let mut table = blobs();
        let config = PcaConfig {
            n_components: 2,
            ..Default::default()
        };
        let summary = extract_pca(&mut table, &config).unwrap();
        assert_eq!(summary.column_names, vec!["PCA1", "PCA2"]);
        let values: Vec<f64> = column(&table, "PCA1")
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_abs_diff_eq!(min, 0.0);
        assert_abs_diff_eq!(max, 1.0);
    }

    #[test]
    fn test_weighted_sum_writes_nan_for_bad_cells() {
        let mut table = DataTable::from_records(
            ["a", "b", "class"],
            [
                ["0.0", "0.3", "p"],
                ["0.1", "oops", "p"],
                ["1.0", "0.1", "q"],
                ["1.1", "-0.1", "q"],
            ],
        )
        .unwrap();
        let config = WeightedSumConfig {
            columns: Some(vec![0, 1]),
            max_iterations: 10,
            ..Default::default()
        };
        let summary = weighted_sum(&mut table, &config).unwrap();
        let values = column(&table, &summary.column_name);
        assert_eq!(values[1], "NaN");
        assert_ne!(values[0], "NaN");
    }

    #[test]
    fn test_no_class_column_aborts_before_writing() {
        let mut table = DataTable::from_records(["a", "b"], [["1", "2"], ["3", "4"]]).unwrap();
        let err = classify_with_tree(&mut table, &TreeConfig::default()).unwrap_err();
        assert!(matches!(err, TabsightError::NoClassColumn));
        assert!(matches!(
            weighted_sum(&mut table, &WeightedSumConfig::default()),
            Err(TabsightError::NoClassColumn)
        ));
        assert_eq!(table.n_columns(), 2);

        // PCA does not need labels
        extract_pca(&mut table, &PcaConfig::default()).unwrap();
        assert_eq!(table.n_columns(), 3);
    }

    #[test]
    fn test_repeated_runs_get_unique_names() {
        let mut table = blobs();
        let config = KnnConfig::default();
        let first = classify_with_knn(&mut table, &config).unwrap();
        let second = classify_with_knn(&mut table, &config).unwrap();
        assert_eq!(first.column_name, "kNN k=3 euclidean");
        assert_eq!(second.column_name, "kNN k=3 euclidean_2");
    }
}
