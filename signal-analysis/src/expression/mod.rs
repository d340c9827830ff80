//! Formulas for fit models, parsed into an [Expr] tree over `x` and named parameters.
mod ast;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Function, UnaryOp};
pub use parser::MAX_DEPTH;
pub(crate) use parser::{Scope, parse};

use crate::datatype::{Sample, TracePoint};
use lumparser_common::Real;
use thiserror::Error;

/// Name of the independent variable in every formula.
pub const INDEPENDENT_VARIABLE: &str = "x";
/// Model name given to formulas built from user input.
pub const CUSTOM_MODEL_NAME: &str = "Other";

#[derive(Debug, Error, PartialEq)]
pub enum ExpressionError {
    #[error("'__' is not allowed")]
    ForbiddenSequence,
    #[error("Formula must be defined in terms of x")]
    MissingX,
    #[error("Parameter '{0}' not recognised, parameters must be alphabetic")]
    InvalidParameterName(String),
    #[error("'x' cannot be used as a parameter")]
    ReservedParameter,
    #[error("Parameter '{0}' is given more than once")]
    DuplicateParameter(String),
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("Unexpected end of formula")]
    UnexpectedEnd,
    #[error("Unknown name '{0}'")]
    UnknownName(String),
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Function '{function}' cannot take {found} arguments")]
    WrongArity { function: String, found: usize },
    #[error("Formula is nested more than {0} levels deep")]
    TooDeep(usize),
    #[error("Expected {expected} bounds, got {found}")]
    BoundsMismatch { expected: usize, found: usize },
}

/// A fit model: a formula in `x` with ordered, optionally bounded, parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFunction {
    name: String,
    formula: String,
    parameters: Vec<String>,
    lower_bounds: Vec<Real>,
    upper_bounds: Vec<Real>,
    expr: Expr,
}

impl ModelFunction {
    /// Builds a model from a user supplied formula and comma separated parameter names.
    ///
    /// Parameter names must be purely alphabetic and the formula may only use
    /// `x`, the parameters, `e`, `pi`, numbers, the whitelisted [Function]s and
    /// the operators `+ - * / % **`. The resulting model is unbounded.
    pub fn build(formula: &str, parameters: &str) -> Result<Self, ExpressionError> {
        if formula.contains("__") || parameters.contains("__") {
            return Err(ExpressionError::ForbiddenSequence);
        }
        let parameters = parameters
            .split(',')
            .map(str::trim)
            .map(|name| {
                if name == INDEPENDENT_VARIABLE {
                    Err(ExpressionError::ReservedParameter)
                } else if !name.is_empty() && name.chars().all(char::is_alphabetic) {
                    Ok(name)
                } else {
                    Err(ExpressionError::InvalidParameterName(name.to_owned()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let count = parameters.len();
        Self::compile(
            CUSTOM_MODEL_NAME,
            formula,
            &parameters,
            vec![Real::NEG_INFINITY; count],
            vec![Real::INFINITY; count],
        )
    }

    /// Builds a model from trusted parameter names, as for the built in catalog.
    pub(crate) fn compile(
        name: &str,
        formula: &str,
        parameters: &[&str],
        lower_bounds: Vec<Real>,
        upper_bounds: Vec<Real>,
    ) -> Result<Self, ExpressionError> {
        for (index, parameter) in parameters.iter().enumerate() {
            if parameters.get(..index).is_some_and(|prior| prior.contains(parameter)) {
                return Err(ExpressionError::DuplicateParameter((*parameter).to_owned()));
            }
        }
        for bounds in [&lower_bounds, &upper_bounds] {
            if bounds.len() != parameters.len() {
                return Err(ExpressionError::BoundsMismatch {
                    expected: parameters.len(),
                    found: bounds.len(),
                });
            }
        }

        let variables: Vec<&str> = std::iter::once(INDEPENDENT_VARIABLE)
            .chain(parameters.iter().copied())
            .collect();
        let scope = Scope {
            variables: &variables,
            constants: true,
            calls: true,
        };
        let expr = parse(formula, &scope)?;
        if !expr.references(0) {
            return Err(ExpressionError::MissingX);
        }
        Ok(Self {
            name: name.to_owned(),
            formula: formula.to_owned(),
            parameters: parameters.iter().map(|p| (*p).to_owned()).collect(),
            lower_bounds,
            upper_bounds,
            expr,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn lower_bounds(&self) -> &[Real] {
        &self.lower_bounds
    }

    pub fn upper_bounds(&self) -> &[Real] {
        &self.upper_bounds
    }

    pub fn is_bounded(&self) -> bool {
        self.lower_bounds
            .iter()
            .chain(&self.upper_bounds)
            .any(|bound| bound.is_finite())
    }

    /// Evaluates the model at each `x`, with `values` giving the parameters in order.
    pub fn evaluate_all(&self, xs: impl IntoIterator<Item = Real>, values: &[Real]) -> Vec<Real> {
        let mut variables = Vec::with_capacity(values.len() + 1);
        variables.push(0.0);
        variables.extend_from_slice(values);
        xs.into_iter()
            .map(|x| {
                if let Some(slot) = variables.first_mut() {
                    *slot = x;
                }
                self.expr.evaluate(&variables)
            })
            .collect()
    }

    pub fn evaluate(&self, x: Real, values: &[Real]) -> Real {
        self.evaluate_all([x], values)
            .first()
            .copied()
            .unwrap_or(Real::NAN)
    }

    /// The model evaluated at the times of `points`.
    pub fn curve<P: TracePoint>(&self, points: &[P], values: &[Real]) -> Vec<Sample> {
        let times: Vec<Real> = points.iter().map(TracePoint::get_time).collect();
        let predicted = self.evaluate_all(times.iter().copied(), values);
        times
            .into_iter()
            .zip(predicted)
            .map(Sample::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn build_custom() {
        let model = ModelFunction::build("a * x ** 2 + b", " a, b ").unwrap();
        assert_eq!(model.name(), "Other");
        assert_eq!(model.parameters(), ["a", "b"]);
        assert!(!model.is_bounded());
        assert_approx_eq!(model.evaluate(3.0, &[2.0, 1.0]), 19.0);
    }

    #[test]
    fn reject_double_underscore_first() {
        assert_eq!(
            ModelFunction::build("x__evil", "a"),
            Err(ExpressionError::ForbiddenSequence)
        );
        assert_eq!(
            ModelFunction::build("a * x", "a__"),
            Err(ExpressionError::ForbiddenSequence)
        );
    }

    #[test]
    fn reject_missing_x() {
        assert_eq!(
            ModelFunction::build("a * exp(b)", "a, b"),
            Err(ExpressionError::MissingX)
        );
    }

    #[test]
    fn reject_bad_parameters() {
        assert_eq!(
            ModelFunction::build("k1 * x", "k1"),
            Err(ExpressionError::InvalidParameterName("k1".to_owned()))
        );
        assert_eq!(
            ModelFunction::build("a * x", "a, x"),
            Err(ExpressionError::ReservedParameter)
        );
        assert_eq!(
            ModelFunction::build("a * x", "a,"),
            Err(ExpressionError::InvalidParameterName(String::new()))
        );
        assert_eq!(
            ModelFunction::build("a * x", "a, a"),
            Err(ExpressionError::DuplicateParameter("a".to_owned()))
        );
    }

    #[test]
    fn reject_deep_formula() {
        let formula = format!("{}x", "-".repeat(500_000));
        assert_eq!(
            ModelFunction::build(&formula, "a"),
            Err(ExpressionError::TooDeep(MAX_DEPTH))
        );
        let formula = format!("a * x{}", " ** x".repeat(50_000));
        assert_eq!(
            ModelFunction::build(&formula, "a"),
            Err(ExpressionError::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn reject_undeclared_name() {
        assert_eq!(
            ModelFunction::build("a * x + c", "a"),
            Err(ExpressionError::UnknownName("c".to_owned()))
        );
        assert!(ModelFunction::build("open(x)", "a").is_err());
    }

    #[test]
    fn curve_follows_times() {
        let model = ModelFunction::build("a * x", "a").unwrap();
        let curve = model.curve(&[(0.0, 9.0), (0.5, 9.0), (1.0, 9.0)], &[4.0]);
        let values: Vec<_> = curve.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0.0, 2.0, 4.0]);
    }
}
