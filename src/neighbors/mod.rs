//! Nearest-neighbor search and the distance metrics it is built on.
//!
//! # Examples
//!
//! ```rust
//! use tabsight::{Distance, KNeighborsClassifier};
//! use ndarray::array;
//!
//! let x = array![[0.0, 0.0], [0.2, 0.1], [5.0, 5.0], [5.1, 4.9]];
//! let y = ["small", "small", "large", "large"];
//!
//! let mut knn = KNeighborsClassifier::new(3).metric(Distance::Manhattan);
//! knn.fit(&x, &y).unwrap();
//! assert_eq!(knn.predict_row(array![4.0, 4.5].view()).unwrap(), "large");
//! ```

mod distance;
mod knn;

pub use distance::{Distance, Metric};
pub use knn::{KNeighborsClassifier, KnnOutput};
