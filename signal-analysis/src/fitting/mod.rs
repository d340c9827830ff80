//! Bounded least squares fitting of integrated signals to decay models.
mod bounds;
mod error;
mod models;
mod problem;
mod statistics;

pub use error::FitError;
pub use models::BuiltinModel;

use crate::{
    datatype::{Sample, get_xy},
    expression::{CUSTOM_MODEL_NAME, ModelFunction},
    initializer,
    signal::Signal,
};
use bounds::ParameterSpace;
use levenberg_marquardt::LevenbergMarquardt;
use lumparser_common::Real;
use nalgebra::DMatrix;
use problem::{CurveProblem, model_jacobian};
use std::{collections::BTreeMap, str::FromStr};
use tracing::{debug, info, instrument};

/// Name under which the goodness of fit appears alongside the parameters.
pub const P_VALUE_NAME: &str = "p";

/// What to fit a signal to.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRequest {
    /// A catalog model name, or `Other` for a custom formula.
    pub model: String,
    /// Comma separated initial estimates, see [initializer::resolve].
    pub initial: String,
    /// Formula in `x`, only used with `Other`.
    pub formula: String,
    /// Comma separated parameter names, only used with `Other`.
    pub parameters: String,
}

impl FitRequest {
    /// A catalog model started from its default estimates.
    pub fn builtin(model: BuiltinModel) -> Self {
        Self {
            model: model.to_string(),
            initial: model.default_initializer().to_owned(),
            formula: String::new(),
            parameters: String::new(),
        }
    }

    pub fn custom(formula: &str, parameters: &str, initial: &str) -> Self {
        Self {
            model: CUSTOM_MODEL_NAME.to_owned(),
            initial: initial.to_owned(),
            formula: formula.to_owned(),
            parameters: parameters.to_owned(),
        }
    }

    pub fn with_initial(self, initial: &str) -> Self {
        Self {
            initial: initial.to_owned(),
            ..self
        }
    }

    /// The catalog entry named by the request, `None` for a custom formula.
    pub fn builtin_model(&self) -> Result<Option<BuiltinModel>, FitError> {
        if self.model == CUSTOM_MODEL_NAME {
            Ok(None)
        } else {
            BuiltinModel::from_str(&self.model)
                .map(Some)
                .map_err(|_| FitError::UnknownModel(self.model.clone()))
        }
    }

    pub fn resolve_model(&self) -> Result<ModelFunction, FitError> {
        Ok(match self.builtin_model()? {
            Some(builtin) => builtin.model()?,
            None => ModelFunction::build(&self.formula, &self.parameters)?,
        })
    }
}

/// The outcome of a successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub model: String,
    pub formula: String,
    pub parameters: Vec<String>,
    pub estimates: Vec<Real>,
    pub std_errors: Vec<Real>,
    /// Absent for results read back from a saved group.
    pub covariance: Option<DMatrix<Real>>,
    pub p_value: Real,
    /// The fitted model over the integrated signal.
    pub curve: Vec<Sample>,
}

impl FitResult {
    /// Estimate of the named parameter, [P_VALUE_NAME] gives the p-value.
    pub fn get(&self, name: &str) -> Option<Real> {
        if name == P_VALUE_NAME {
            return Some(self.p_value);
        }
        self.parameters
            .iter()
            .position(|p| p == name)
            .and_then(|index| self.estimates.get(index).copied())
    }

    /// Parameter estimates in model order, followed by the p-value.
    pub fn named_values(&self) -> impl Iterator<Item = (&str, Real)> {
        self.parameters
            .iter()
            .map(String::as_str)
            .zip(self.estimates.iter().copied())
            .chain(std::iter::once((P_VALUE_NAME, self.p_value)))
    }

    pub fn parameter_map(&self) -> BTreeMap<String, Real> {
        self.named_values()
            .map(|(name, value)| (name.to_owned(), value))
            .collect()
    }
}

/// Fits integrated signals with Levenberg-Marquardt.
#[derive(Debug, Clone)]
pub struct CurveFitEngine {
    patience: usize,
    tolerance: Real,
}

impl Default for CurveFitEngine {
    fn default() -> Self {
        Self {
            patience: 200,
            tolerance: 1.49012e-8,
        }
    }
}

impl CurveFitEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patience(self, patience: usize) -> Self {
        Self { patience, ..self }
    }

    pub fn with_tolerance(self, tolerance: Real) -> Self {
        Self { tolerance, ..self }
    }

    /// Fits the integrated data of `signal` from its peak onwards.
    #[instrument(skip_all, fields(signal = signal.name(), model = %request.model))]
    pub fn fit(&self, signal: &Signal, request: &FitRequest) -> Result<FitResult, FitError> {
        let builtin = request.builtin_model()?;
        let model = request.resolve_model()?;
        let initial = initializer::resolve(
            &request.initial,
            signal.peak_height(),
            signal.total_integral(),
        )?;
        if initial.len() != model.parameters().len() {
            return Err(FitError::ParameterCount {
                expected: model.parameters().len(),
                found: initial.len(),
            });
        }

        let space = ParameterSpace::new(model.lower_bounds(), model.upper_bounds());
        if let Some(index) = space.first_violation(&initial) {
            return Err(FitError::OutOfBounds {
                parameter: model.parameters().get(index).cloned().unwrap_or_default(),
                value: initial.get(index).copied().unwrap_or(Real::NAN),
            });
        }

        let domain: Vec<Sample> = signal
            .integrated_samples()
            .iter()
            .filter(|s| s.time >= signal.peak_time())
            .copied()
            .collect();
        if domain.is_empty() {
            return Err(FitError::NoData);
        }
        let (xs, ys) = get_xy(&domain);

        if problem::model_residuals(&model, &xs, &ys, &initial).is_none() {
            return Err(FitError::NonFiniteModel);
        }
        let problem = CurveProblem::new(&model, &space, &xs, &ys, &initial);
        let (problem, report) = LevenbergMarquardt::new()
            .with_patience(self.patience)
            .with_ftol(self.tolerance)
            .with_xtol(self.tolerance)
            .minimize(problem);
        debug!(
            evaluations = report.number_of_evaluations,
            objective = report.objective_function,
            "Minimization finished"
        );
        let mut estimates = problem.estimates();
        if !report.termination.was_successful() || estimates.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NotConverged(report.termination));
        }

        let predicted = model.evaluate_all(xs.iter().copied(), &estimates);
        let sum_squared_residuals: Real = predicted
            .iter()
            .zip(&ys)
            .map(|(f, y)| (f - y).powi(2))
            .sum();
        let mut covariance = model_jacobian(&model, &xs, &ys, &estimates)
            .map(|jacobian| statistics::covariance(&jacobian, sum_squared_residuals))
            .unwrap_or_else(|| {
                let n = estimates.len();
                DMatrix::from_element(n, n, Real::INFINITY)
            });
        let mut std_errors = statistics::standard_errors(&covariance);
        let p_value = statistics::chi_square_p_value(&ys, &predicted);

        let curve = model.curve(signal.integrated_samples(), &estimates);
        if let Some(builtin) = builtin {
            if builtin.canonicalize(&mut estimates, &mut std_errors, &mut covariance) {
                debug!("Rate constants reordered");
            }
        }

        info!(?estimates, p_value, "Fit converged");
        Ok(FitResult {
            model: model.name().to_owned(),
            formula: model.formula().to_owned(),
            parameters: model.parameters().to_vec(),
            estimates,
            std_errors,
            covariance: Some(covariance),
            p_value,
            curve,
        })
    }

    /// Fits `signal` and attaches the result to it. On failure the signal is unchanged.
    pub fn fit_signal<'a>(
        &self,
        signal: &'a mut Signal,
        request: &FitRequest,
    ) -> Result<&'a FitResult, FitError> {
        let result = self.fit(signal, request)?;
        Ok(signal.set_fit(result))
    }
}
