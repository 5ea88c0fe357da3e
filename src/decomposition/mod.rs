//! Dimensionality reduction by power-iteration eigen decomposition.
//!
//! This module provides:
//! - `PCA`: Principal Component Analysis on the Gram matrix of centered data
//! - `LDA`: Linear Discriminant Analysis on `Sw⁻¹·Sb`, usable as a reducer or
//!   as a nearest-class-mean classifier
//!
//! # Examples
//!
//! ## Principal Component Analysis (PCA)
//! ```rust
//! use tabsight::PCA;
//! use ndarray::array;
//!
//! let x = array![
//!     [2.5, 2.4],
//!     [0.5, 0.7],
//!     [2.2, 2.9],
//!     [1.9, 2.2]
//! ];
//!
//! let mut pca = PCA::new().n_components(1);
//! let transformed = pca.fit_transform(&x).unwrap();
//! assert_eq!(transformed.ncols(), 1);
//!
//! let explained_var = pca.explained_variance_ratio.as_ref().unwrap();
//! println!("Explained variance ratio: {:?}", explained_var);
//! ```
//!
//! ## Linear Discriminant Analysis (LDA)
//! ```rust
//! use tabsight::LDA;
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 2.0],
//!     [2.0, 3.5],
//!     [8.0, 9.0],
//!     [9.0, 10.5]
//! ];
//! let y = ["small", "small", "large", "large"];
//!
//! let mut lda = LDA::new();
//! let transformed = lda.fit_transform(&x, &y).unwrap();
//! assert_eq!(transformed.ncols(), 1);
//!
//! let predictions = lda.predict(&x).unwrap();
//! assert_eq!(predictions, y);
//! ```

mod lda;
mod pca;

pub use lda::{ScatterMatrices, LDA};
pub use pca::PCA;
