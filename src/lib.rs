//! In-memory tabular learning and projection engine.
//!
//! Turns a table of feature columns plus a class column into derived columns:
//! tree and forest predictions, k-NN votes, PCA and LDA projections, and
//! optimized weighted sums. Algorithms run synchronously on the caller's
//! thread against a fully materialized table.

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod dataset;
pub mod decomposition;
pub mod engine;
pub mod error;
pub mod linalg;
pub mod metrics;
pub mod model_selection;
pub mod neighbors;
pub mod optimize;
pub mod preprocessing;
pub mod tree;
pub mod vote;

pub use dataset::{ColumnSink, DataTable, FeatureSet, LabelEncoding, Table};
pub use decomposition::{LDA, PCA};
pub use error::{Result, TabsightError};
pub use model_selection::Validation;
pub use neighbors::{Distance, KNeighborsClassifier, KnnOutput, Metric};
pub use optimize::{Init, Trig, WeightedSumFit, WeightedSumOptimizer};
pub use tree::{Criterion, DecisionTree, RandomForest};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
