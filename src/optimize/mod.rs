//! Coefficient search for weighted column sums.
//!
//! [`WeightedSumOptimizer`] climbs the class separability of
//! `trig(c₁x₁ + … + cₙxₙ)` with a forward-difference gradient. Each run
//! returns an immutable [`WeightedSumFit`].
//!
//! ```rust
//! use tabsight::{Init, Trig, WeightedSumOptimizer};
//! use ndarray::array;
//!
//! let x = array![[0.0, 0.3], [0.1, -0.2], [1.0, 0.1], [1.1, -0.1]];
//! let y = ["a", "a", "b", "b"];
//!
//! let fit = WeightedSumOptimizer::new(42)
//!     .init(Init::RandomRange { min: -1.0, max: 1.0 })
//!     .trig(Trig::Atan)
//!     .adaptive(true)
//!     .fit(&x, &y)
//!     .unwrap();
//! assert_eq!(fit.coefficients.len(), 2);
//! ```

mod weighted_sum;

pub use weighted_sum::{separability, Init, Trig, WeightedSumFit, WeightedSumOptimizer};
