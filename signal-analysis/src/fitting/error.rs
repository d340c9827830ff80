use crate::{expression::ExpressionError, initializer::InitializerError};
use levenberg_marquardt::TerminationReason;
use lumparser_common::Real;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("Function type '{0}' not recognised")]
    UnknownModel(String),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Initializer(#[from] InitializerError),
    #[error("Number of parameters ({expected}) does not match number of initial values ({found})")]
    ParameterCount { expected: usize, found: usize },
    #[error("Initial value {value} of '{parameter}' lies outside its bounds")]
    OutOfBounds { parameter: String, value: Real },
    #[error("No data after the peak to fit")]
    NoData,
    #[error("Model is not finite at the initial values")]
    NonFiniteModel,
    #[error("Fit did not converge: {0:?}")]
    NotConverged(TerminationReason),
}
