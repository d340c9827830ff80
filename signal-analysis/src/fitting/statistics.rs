use lumparser_common::Real;
use nalgebra::DMatrix;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Singular values below this fraction of the largest are treated as zero.
const PINV_TOLERANCE: Real = 1e-15;

/// Parameter covariance `pinv(JᵀJ) · SSR / (m - n)`.
///
/// With no more points than parameters the variance cannot be estimated and
/// every entry is infinite.
pub(crate) fn covariance(jacobian: &DMatrix<Real>, sum_squared_residuals: Real) -> DMatrix<Real> {
    let (points, parameters) = jacobian.shape();
    let unknown = || DMatrix::from_element(parameters, parameters, Real::INFINITY);
    if points <= parameters {
        return unknown();
    }
    let information = jacobian.transpose() * jacobian;
    let tolerance = PINV_TOLERANCE * information.amax().max(Real::MIN_POSITIVE);
    match information.pseudo_inverse(tolerance) {
        Ok(inverse) => inverse * (sum_squared_residuals / (points - parameters) as Real),
        Err(_) => unknown(),
    }
}

/// One standard deviation errors, the square roots of the diagonal magnitudes.
pub(crate) fn standard_errors(covariance: &DMatrix<Real>) -> Vec<Real> {
    covariance.diagonal().iter().map(|v| v.abs().sqrt()).collect()
}

/// Pearson's chi-square statistic, terms where both values are zero contribute nothing.
pub(crate) fn chi_square(observed: &[Real], expected: &[Real]) -> Real {
    observed
        .iter()
        .zip(expected)
        .map(|(&o, &e)| {
            if o == 0.0 && e == 0.0 {
                0.0
            } else {
                (o - e).powi(2) / e
            }
        })
        .sum()
}

/// Probability of a chi-square statistic at least as large as that of `observed`
/// against `expected`, with one fewer degrees of freedom than there are points.
pub(crate) fn chi_square_p_value(observed: &[Real], expected: &[Real]) -> Real {
    let statistic = chi_square(observed, expected);
    let degrees_of_freedom = observed.len().saturating_sub(1) as Real;
    match ChiSquared::new(degrees_of_freedom) {
        Ok(distribution) if statistic.is_finite() => distribution.sf(statistic),
        Ok(_) if statistic == Real::INFINITY => 0.0,
        _ => Real::NAN,
    }
}
