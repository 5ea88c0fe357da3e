use crate::error::{Result, TabsightError};

/// Fraction of positions where the predicted class equals the true class.
pub fn accuracy<A, B>(y_true: &[A], y_pred: &[B]) -> Result<f64>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    if y_true.len() != y_pred.len() {
        return Err(TabsightError::DimensionMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(TabsightError::InvalidParameter(
            "accuracy of an empty prediction set".to_string(),
        ));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t.as_ref() == p.as_ref())
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Between-class variance over within-class variance of `values`, grouped
/// by `classes` (class indices). Non-finite values are left out.
///
/// Returns `f64::MAX` when the within-class variance is exactly zero, and
/// `0.0` when no finite values remain.
pub fn fisher_ratio(values: &[f64], classes: &[usize]) -> f64 {
    let n_classes = classes.iter().copied().max().map_or(0, |m| m + 1);
    let mut sums = vec![0.0; n_classes];
    let mut counts = vec![0usize; n_classes];
    let mut total = 0.0;
    let mut n = 0usize;

    for (&v, &c) in values.iter().zip(classes) {
        if !v.is_finite() {
            continue;
        }
        sums[c] += v;
        counts[c] += 1;
        total += v;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }

    let mean = total / n as f64;
    let class_means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &k)| if k > 0 { s / k as f64 } else { 0.0 })
        .collect();

    let between = class_means
        .iter()
        .zip(&counts)
        .map(|(&m, &k)| k as f64 * (m - mean) * (m - mean))
        .sum::<f64>()
        / n as f64;

    let within = values
        .iter()
        .zip(classes)
        .filter(|(v, _)| v.is_finite())
        .map(|(&v, &c)| (v - class_means[c]) * (v - class_means[c]))
        .sum::<f64>()
        / n as f64;

    if within == 0.0 {
        return f64::MAX;
    }
    between / within
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_accuracy() {
        let y_true = ["a", "b", "a", "b"];
        let y_pred = ["a", "b", "b", "b"];
        assert_abs_diff_eq!(accuracy(&y_true, &y_pred).unwrap(), 0.75);
    }

    #[test]
    fn test_accuracy_mismatch() {
        assert!(accuracy(&["a"], &["a", "b"]).is_err());
        assert!(accuracy::<&str, &str>(&[], &[]).is_err());
    }

    #[test]
    fn test_fisher_ratio() {
        // class means 1 and 5, overall mean 3, within variance 1
        let values = [0.0, 2.0, 4.0, 6.0];
        let classes = [0, 0, 1, 1];
        assert_abs_diff_eq!(fisher_ratio(&values, &classes), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fisher_ratio_zero_within() {
        let values = [1.0, 1.0, 3.0, 3.0];
        let classes = [0, 0, 1, 1];
        assert_eq!(fisher_ratio(&values, &classes), f64::MAX);
    }

    #[test]
    fn test_fisher_ratio_skips_nan() {
        let values = [0.0, 2.0, f64::NAN, 4.0, 6.0];
        let classes = [0, 0, 1, 1, 1];
        assert_abs_diff_eq!(fisher_ratio(&values, &classes), 4.0, epsilon = 1e-12);
    }
}
