//! Tree-based classifiers.
//!
//! - `DecisionTree`: recursive threshold splits chosen by impurity reduction
//! - `RandomForest`: bootstrap-aggregated trees with plurality voting
//!
//! Trees are stored as a flat arena of [`TreeNode`]s with index 0 as the root;
//! split nodes hold an explicit `{feature, threshold}` rule.
//!
//! # Examples
//!
//! ```rust
//! use tabsight::{DecisionTree, RandomForest};
//! use ndarray::array;
//!
//! let x = array![[0.2, 5.0], [0.4, 1.0], [0.6, 4.0], [0.8, 2.0]];
//! let y = ["A", "A", "B", "B"];
//!
//! let mut tree = DecisionTree::new();
//! tree.fit(&x, &y).unwrap();
//! assert_eq!(tree.predict(&x).unwrap(), y);
//! println!("{tree}");
//!
//! let mut forest = RandomForest::new(10, 42).sample_ratio(0.8);
//! forest.fit(&x, &y).unwrap();
//! let predictions = forest.predict(&x).unwrap();
//! assert_eq!(predictions.len(), 4);
//! ```

mod decision_tree;
mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, SplitRule, TreeNode};
pub use random_forest::RandomForest;
