use crate::dataset::LabelEncoding;
use crate::error::{Result, TabsightError};
use crate::metrics::fisher_ratio;
use crate::{Matrix, Vector};
use ndarray::ArrayView1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::str::FromStr;

/// Function wrapped around the weighted sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trig {
    #[default]
    Identity,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
}

impl Trig {
    pub fn apply(&self, v: f64) -> f64 {
        match self {
            Trig::Identity => v,
            Trig::Sin => v.sin(),
            Trig::Cos => v.cos(),
            Trig::Tan => v.tan(),
            Trig::Asin => v.asin(),
            Trig::Acos => v.acos(),
            Trig::Atan => v.atan(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Trig::Identity => "none",
            Trig::Sin => "sin",
            Trig::Cos => "cos",
            Trig::Tan => "tan",
            Trig::Asin => "asin",
            Trig::Acos => "acos",
            Trig::Atan => "atan",
        }
    }
}

impl FromStr for Trig {
    type Err = TabsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "identity" => Ok(Trig::Identity),
            "sin" => Ok(Trig::Sin),
            "cos" => Ok(Trig::Cos),
            "tan" => Ok(Trig::Tan),
            "asin" | "arcsin" => Ok(Trig::Asin),
            "acos" | "arccos" => Ok(Trig::Acos),
            "atan" | "arctan" => Ok(Trig::Atan),
            other => Err(TabsightError::InvalidParameter(format!(
                "unknown trig function {other:?}"
            ))),
        }
    }
}

/// Starting coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Init {
    /// Every coefficient starts at the same value.
    Flat(f64),
    /// Uniform draws from `[min, max]`.
    RandomRange { min: f64, max: f64 },
}

impl Default for Init {
    fn default() -> Self {
        Init::Flat(1.0)
    }
}

/// Final coefficients of one optimizer run.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedSumFit {
    pub coefficients: Vector,
    pub trig: Trig,
    /// Separability of the final coefficients.
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl WeightedSumFit {
    pub fn evaluate(&self, row: ArrayView1<f64>) -> f64 {
        self.trig.apply(row.dot(&self.coefficients))
    }

    /// Value of every row. Rows with a NaN feature give NaN.
    pub fn project(&self, x: &Matrix) -> Vector {
        x.outer_iter().map(|row| self.evaluate(row)).collect()
    }

    /// Readable formula, e.g. `sin(0.5000*a + -1.2500*b)`.
    pub fn expression(&self, feature_names: &[String]) -> String {
        let sum = self
            .coefficients
            .iter()
            .zip(feature_names)
            .map(|(c, name)| format!("{c:.4}*{name}"))
            .collect::<Vec<_>>()
            .join(" + ");
        match self.trig {
            Trig::Identity => sum,
            trig => format!("{}({sum})", trig.name()),
        }
    }
}

/// Fisher-style separability of `trig(x · coefficients)` by class.
pub fn separability(x: &Matrix, classes: &[usize], coefficients: &Vector, trig: Trig) -> f64 {
    let values: Vec<f64> = x
        .outer_iter()
        .map(|row| trig.apply(row.dot(coefficients)))
        .collect();
    fisher_ratio(&values, classes)
}

/// Finite-difference gradient ascent on the class separability of a weighted
/// column sum.
#[derive(Clone, Debug)]
pub struct WeightedSumOptimizer {
    learning_rate: f64,
    step: f64,
    tolerance: f64,
    max_iterations: usize,
    init: Init,
    clamp: Option<(f64, f64)>,
    trig: Trig,
    adaptive: bool,
    seed: u64,
}

impl WeightedSumOptimizer {
    /// `seed` drives [`Init::RandomRange`]; it is unused for flat starts.
    pub fn new(seed: u64) -> Self {
        Self {
            learning_rate: 0.01,
            step: 1e-4,
            tolerance: 1e-6,
            max_iterations: 1000,
            init: Init::default(),
            clamp: None,
            trig: Trig::Identity,
            adaptive: false,
            seed,
        }
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Perturbation used for each finite-difference partial.
    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    /// Keep coefficients inside `[min, max]` after every update.
    pub fn clamp(mut self, min: f64, max: f64) -> Self {
        self.clamp = Some((min, max));
        self
    }

    pub fn trig(mut self, trig: Trig) -> Self {
        self.trig = trig;
        self
    }

    /// Halve the learning rate whenever a step lowers the objective.
    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.step > 0.0) {
            return Err(TabsightError::InvalidParameter(
                "finite-difference step must be > 0".to_string(),
            ));
        }
        if !(self.learning_rate >= 0.0) {
            return Err(TabsightError::InvalidParameter(
                "learning_rate must be >= 0".to_string(),
            ));
        }
        if let Init::RandomRange { min, max } = self.init {
            if !(min <= max) {
                return Err(TabsightError::InvalidParameter(format!(
                    "initialization range [{min}, {max}] is empty"
                )));
            }
            if !(max - min).is_finite() {
                return Err(TabsightError::InvalidParameter(format!(
                    "initialization range [{min}, {max}] must be finite"
                )));
            }
        }
        if let Some((min, max)) = self.clamp {
            if !(min <= max) {
                return Err(TabsightError::InvalidParameter(format!(
                    "clamp range [{min}, {max}] is empty"
                )));
            }
        }
        Ok(())
    }

    fn initial_coefficients(&self, n: usize) -> Vector {
        match self.init {
            Init::Flat(value) => Vector::from_elem(n, value),
            Init::RandomRange { min, max } => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                Vector::random_using(n, Uniform::new_inclusive(min, max), &mut rng)
            }
        }
    }

    pub fn fit<S: AsRef<str>>(&self, x: &Matrix, y: &[S]) -> Result<WeightedSumFit> {
        if x.nrows() != y.len() {
            return Err(TabsightError::DimensionMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(TabsightError::EmptyDataset);
        }
        self.validate()?;

        let classes = LabelEncoding::fit(y).transform(y)?;
        let mut coefficients = self.initial_coefficients(x.ncols());
        let mut learning_rate = self.learning_rate;
        let mut objective = separability(x, &classes, &coefficients, self.trig);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            // Every partial is measured against the same baseline
            let baseline = objective;
            let mut gradient = Vector::zeros(coefficients.len());
            for i in 0..coefficients.len() {
                let original = coefficients[i];
                coefficients[i] = original + self.step;
                let perturbed = separability(x, &classes, &coefficients, self.trig);
                coefficients[i] = original;

                let partial = (perturbed - baseline) / self.step;
                gradient[i] = if partial.is_finite() { partial } else { 0.0 };
            }

            let mut largest_update: f64 = 0.0;
            for (c, g) in coefficients.iter_mut().zip(gradient.iter()) {
                let mut next = *c + learning_rate * g;
                if let Some((min, max)) = self.clamp {
                    next = next.clamp(min, max);
                }
                largest_update = largest_update.max((next - *c).abs());
                *c = next;
            }

            objective = separability(x, &classes, &coefficients, self.trig);
            if self.adaptive && objective < baseline {
                learning_rate *= 0.5;
            }

            log::trace!(
                "iteration {iterations}: objective={objective:.6} largest update={largest_update:.3e}"
            );

            if largest_update < self.tolerance {
                converged = true;
                break;
            }
        }

        log::debug!(
            "weighted sum optimizer stopped after {iterations} iterations (converged={converged}), objective {objective:.6}"
        );

        Ok(WeightedSumFit {
            coefficients,
            trig: self.trig,
            objective,
            iterations,
            converged,
        })
    }
}
