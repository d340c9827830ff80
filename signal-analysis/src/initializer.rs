use crate::expression::{ExpressionError, Scope, parse};
use lumparser_common::{Intensity, Real};
use thiserror::Error;

/// Shorthand for the peak height of the signal being fitted.
pub const PEAK_HEIGHT_SYMBOL: &str = "P";
/// Shorthand for the total integral of the signal being fitted.
pub const TOTAL_INTEGRAL_SYMBOL: &str = "I";

#[derive(Debug, Error, PartialEq)]
pub enum InitializerError {
    #[error("Please add initial estimates for the parameter values")]
    Empty,
    #[error("Value not allowed: '{0}'")]
    ForbiddenSequence(String),
    #[error("Initial parameter '{value}' is not valid: {source}")]
    Invalid {
        value: String,
        source: ExpressionError,
    },
    #[error("Initial parameter '{0}' does not evaluate to a finite number")]
    NonFinite(String),
}

/// Turns a comma separated list of initial estimates into numbers.
///
/// Each entry is an arithmetic expression in which `P` and `I` stand for the
/// peak height and total integral of the signal.
pub fn resolve(
    initial: &str,
    peak_height: Intensity,
    total_integral: Intensity,
) -> Result<Vec<Real>, InitializerError> {
    if initial.trim().is_empty() {
        return Err(InitializerError::Empty);
    }
    initial
        .split(',')
        .map(str::trim)
        .map(|entry| {
            let substituted = entry
                .replace(PEAK_HEIGHT_SYMBOL, &peak_height.to_string())
                .replace(TOTAL_INTEGRAL_SYMBOL, &total_integral.to_string());
            if substituted.contains("__") {
                return Err(InitializerError::ForbiddenSequence(entry.to_owned()));
            }
            let value = parse(&substituted, &Scope::ARITHMETIC)
                .map_err(|source| InitializerError::Invalid {
                    value: entry.to_owned(),
                    source,
                })?
                .evaluate(&[]);
            if value.is_finite() {
                Ok(value)
            } else {
                Err(InitializerError::NonFinite(entry.to_owned()))
            }
        })
        .collect()
}
