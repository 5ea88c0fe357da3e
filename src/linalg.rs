//! Dense linear algebra used by PCA and LDA: Gauss-Jordan inversion and a
//! power-iteration eigensolver with deflation.

use crate::error::{Result, TabsightError};
use crate::{Matrix, Vector};
use ndarray::{ArrayView1, Axis};
use std::cmp::Ordering;

/// One extracted eigenvector with its Rayleigh-quotient eigenvalue.
#[derive(Clone, Debug)]
pub struct EigenPair {
    pub vector: Vector,
    pub value: f64,
}

/// Stopping rules for power iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerIteration {
    pub max_iterations: usize,
    /// Stop once the L1 change between successive vectors drops below this.
    pub tolerance: f64,
}

impl Default for PowerIteration {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}

/// Outcome of a single power-iteration run.
#[derive(Clone, Debug)]
pub struct PowerResult {
    pub vector: Vector,
    pub iterations: usize,
    pub converged: bool,
    /// The matrix mapped the current vector to zero.
    pub collapsed: bool,
}

fn check_square(matrix: &Matrix) -> Result<usize> {
    if matrix.nrows() != matrix.ncols() {
        return Err(TabsightError::DimensionMismatch {
            expected: matrix.nrows(),
            actual: matrix.ncols(),
        });
    }
    Ok(matrix.nrows())
}

pub fn dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.dot(&b)
}

pub fn mat_vec(matrix: &Matrix, vector: &Vector) -> Vector {
    matrix.dot(vector)
}

pub fn l2_norm(v: ArrayView1<f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// Unit-length copy of `v`, or `None` when `v` is (numerically) zero.
pub fn normalize(v: &Vector) -> Option<Vector> {
    let norm = l2_norm(v.view());
    if norm < 1e-12 || !norm.is_finite() {
        return None;
    }
    Some(v / norm)
}

pub fn outer(a: &Vector, b: &Vector) -> Matrix {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}

/// Invert a square matrix by Gauss-Jordan elimination.
///
/// Pivots are taken in row order without searching for a larger one, so a
/// zero on the diagonal fails even when the matrix is invertible. Only an
/// exactly zero or non-finite pivot is rejected; conditioning is left to the
/// caller's regularization (e.g. `Sw + eps * I`).
pub fn invert(matrix: &Matrix) -> Result<Matrix> {
    let n = check_square(matrix)?;

    let mut a = matrix.clone();
    let mut inv = Matrix::eye(n);

    for i in 0..n {
        let pivot = a[[i, i]];
        if pivot == 0.0 || !pivot.is_finite() {
            return Err(TabsightError::SingularMatrix { pivot: i });
        }
        for j in 0..n {
            a[[i, j]] /= pivot;
            inv[[i, j]] /= pivot;
        }
        for r in 0..n {
            if r == i {
                continue;
            }
            let factor = a[[r, i]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                let da = factor * a[[i, j]];
                let di = factor * inv[[i, j]];
                a[[r, j]] -= da;
                inv[[r, j]] -= di;
            }
        }
    }

    Ok(inv)
}

/// Repeatedly apply `matrix` to `start` and renormalize until the vector
/// stops moving. Hitting the iteration cap is not an error.
pub fn power_iterate(matrix: &Matrix, start: Vector, params: PowerIteration) -> PowerResult {
    let mut v = normalize(&start).unwrap_or(start);

    for iteration in 0..params.max_iterations {
        let av = matrix.dot(&v);
        let Some(next) = normalize(&av) else {
            return PowerResult {
                vector: v,
                iterations: iteration,
                converged: false,
                collapsed: true,
            };
        };
        let change = (&next - &v).mapv(f64::abs).sum();
        v = next;
        if change < params.tolerance {
            return PowerResult {
                vector: v,
                iterations: iteration + 1,
                converged: true,
                collapsed: false,
            };
        }
    }

    PowerResult {
        vector: v,
        iterations: params.max_iterations,
        converged: false,
        collapsed: false,
    }
}

fn basis(n: usize, k: usize) -> Vector {
    let mut e = Vector::zeros(n);
    e[k] = 1.0;
    e
}

/// Unit vector orthogonal to every vector in `found`, built from the basis
/// vectors starting at slot `k`.
fn complete_basis(found: &[EigenPair], n: usize, k: usize) -> Vector {
    for j in (k..n).chain(0..k) {
        let mut candidate = basis(n, j);
        for pair in found {
            let projection = candidate.dot(&pair.vector);
            candidate.scaled_add(-projection, &pair.vector);
        }
        if let Some(unit) = normalize(&candidate) {
            return unit;
        }
    }
    basis(n, k)
}

/// Extract `count` eigenpairs of `matrix` by power iteration with deflation.
///
/// Slot `k` starts from the k-th basis vector. After each extraction the
/// matrix is deflated by `value * v vᵀ`. Pairs come back in extraction order.
pub fn eigen_decompose(
    matrix: &Matrix,
    count: usize,
    params: PowerIteration,
) -> Result<Vec<EigenPair>> {
    let n = check_square(matrix)?;
    if count > n {
        return Err(TabsightError::InvalidParameter(format!(
            "cannot extract {count} eigenvectors from a {n}x{n} matrix"
        )));
    }

    let mut a = matrix.clone();
    let mut pairs: Vec<EigenPair> = Vec::with_capacity(count);

    for k in 0..count {
        let result = power_iterate(&a, basis(n, k), params);
        let vector = if result.collapsed && result.iterations == 0 {
            complete_basis(&pairs, n, k)
        } else {
            result.vector
        };
        let value = vector.dot(&a.dot(&vector));

        log::debug!(
            "eigenpair {k}: value={value:.6e} iterations={} converged={}",
            result.iterations,
            result.converged
        );

        a = &a - &(outer(&vector, &vector) * value);
        pairs.push(EigenPair { vector, value });
    }

    Ok(pairs)
}

/// Stable sort, largest eigenvalue first.
pub fn sort_by_eigenvalue(pairs: &mut [EigenPair]) {
    pairs.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_invert_known_matrix() {
        let m = array![[4.0, 7.0], [2.0, 6.0]];
        let inv = invert(&m).unwrap();
        let product = m.dot(&inv);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(inv[[0, 0]], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            invert(&m),
            Err(TabsightError::SingularMatrix { pivot: 1 })
        ));
    }

    #[test]
    fn test_invert_has_no_pivot_search() {
        let m = array![[0.0, 1.0], [1.0, 0.0]];
        assert!(matches!(
            invert(&m),
            Err(TabsightError::SingularMatrix { pivot: 0 })
        ));
    }

    #[test]
    fn test_invert_accepts_tiny_regularized_pivot() {
        // A zero row lifted by a small ridge next to large entries
        let m = array![[5.0e7, 0.0], [0.0, 1e-10]];
        let inv = invert(&m).unwrap();
        assert_abs_diff_eq!(inv[[1, 1]], 1e10, epsilon = 1e-2);
        assert_abs_diff_eq!(inv[[0, 0]], 2e-8, epsilon = 1e-20);
    }

    #[test]
    fn test_invert_rejects_non_square() {
        let m = Matrix::zeros((2, 3));
        assert!(invert(&m).is_err());
    }

    #[test]
    fn test_outer_and_normalize() {
        let a = array![1.0, 2.0];
        let b = array![3.0, 4.0];
        let o = outer(&a, &b);
        assert_eq!(o, array![[3.0, 4.0], [6.0, 8.0]]);
        assert_abs_diff_eq!(dot(a.view(), b.view()), 11.0);
        assert_eq!(mat_vec(&o, &array![1.0, 0.0]), array![3.0, 6.0]);
        let unit = normalize(&b).unwrap();
        assert_abs_diff_eq!(l2_norm(unit.view()), 1.0, epsilon = 1e-12);
        assert!(normalize(&Vector::zeros(3)).is_none());
    }

    #[test]
    fn test_eigen_symmetric() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let pairs = eigen_decompose(&m, 2, PowerIteration::default()).unwrap();
        assert_abs_diff_eq!(pairs[0].value, 3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(pairs[1].value, 1.0, epsilon = 1e-8);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(pairs[0].vector[0].abs(), s, epsilon = 1e-6);
        assert_abs_diff_eq!(pairs[0].vector[1].abs(), s, epsilon = 1e-6);
        assert_abs_diff_eq!(pairs[0].vector.dot(&pairs[1].vector), 0.0, epsilon = 1e-6);
        for pair in &pairs {
            assert_abs_diff_eq!(l2_norm(pair.vector.view()), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_eigen_rank_deficient_stays_orthonormal() {
        let m = array![[1.0, 1.0], [1.0, 1.0]];
        let pairs = eigen_decompose(&m, 2, PowerIteration::default()).unwrap();
        assert_abs_diff_eq!(pairs[0].value, 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(pairs[1].value, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(pairs[0].vector.dot(&pairs[1].vector), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(l2_norm(pairs[1].vector.view()), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_power_iterate_respects_cap() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let params = PowerIteration {
            max_iterations: 1,
            tolerance: 0.0,
        };
        let result = power_iterate(&m, array![1.0, 0.0], params);
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
    }

    #[test]
    fn test_sort_by_eigenvalue() {
        let mut pairs = vec![
            EigenPair { vector: array![1.0], value: 1.0 },
            EigenPair { vector: array![2.0], value: 5.0 },
        ];
        sort_by_eigenvalue(&mut pairs);
        assert_abs_diff_eq!(pairs[0].value, 5.0);
    }

    #[test]
    fn test_eigen_too_many() {
        let m = Matrix::eye(2);
        assert!(eigen_decompose(&m, 3, PowerIteration::default()).is_err());
    }
}
