use lumparser_common::Real;
use std::f64::consts::FRAC_PI_2;

/// Smallest distance kept between an internal value and a point where the
/// transform has zero slope.
pub(crate) const FLAT_MARGIN: Real = 1.4e-3;

/// Maps one parameter between the unconstrained space the optimizer works in
/// and the bounded space the model is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BoundTransform {
    Free,
    Lower(Real),
    Upper(Real),
    Both(Real, Real),
}

impl BoundTransform {
    pub(crate) fn new(lower: Real, upper: Real) -> Self {
        match (lower.is_finite(), upper.is_finite()) {
            (false, false) => BoundTransform::Free,
            (true, false) => BoundTransform::Lower(lower),
            (false, true) => BoundTransform::Upper(upper),
            (true, true) => BoundTransform::Both(lower, upper),
        }
    }

    pub(crate) fn contains(&self, value: Real) -> bool {
        match *self {
            BoundTransform::Free => true,
            BoundTransform::Lower(lower) => value >= lower,
            BoundTransform::Upper(upper) => value <= upper,
            BoundTransform::Both(lower, upper) => (lower..=upper).contains(&value),
        }
    }

    pub(crate) fn to_external(&self, internal: Real) -> Real {
        match *self {
            BoundTransform::Free => internal,
            BoundTransform::Lower(lower) => lower - 1.0 + (internal * internal + 1.0).sqrt(),
            BoundTransform::Upper(upper) => upper + 1.0 - (internal * internal + 1.0).sqrt(),
            BoundTransform::Both(lower, upper) => {
                lower + (upper - lower) / 2.0 * (internal.sin() + 1.0)
            }
        }
    }

    /// Values on a bound are moved just inside it, as the optimizer cannot
    /// leave a point where the transform is flat.
    pub(crate) fn to_internal(&self, external: Real) -> Real {
        match *self {
            BoundTransform::Free => external,
            BoundTransform::Lower(lower) => ((external - lower + 1.0).powi(2) - 1.0)
                .max(0.0)
                .sqrt()
                .max(FLAT_MARGIN),
            BoundTransform::Upper(upper) => ((upper - external + 1.0).powi(2) - 1.0)
                .max(0.0)
                .sqrt()
                .max(FLAT_MARGIN),
            BoundTransform::Both(lower, upper) => {
                (2.0 * (external - lower) / (upper - lower) - 1.0)
                    .clamp(-1.0, 1.0)
                    .asin()
                    .clamp(FLAT_MARGIN - FRAC_PI_2, FRAC_PI_2 - FLAT_MARGIN)
            }
        }
    }
}

/// The transforms of every parameter of a model.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParameterSpace(Vec<BoundTransform>);

impl ParameterSpace {
    pub(crate) fn new(lower: &[Real], upper: &[Real]) -> Self {
        Self(
            lower
                .iter()
                .zip(upper)
                .map(|(&lower, &upper)| BoundTransform::new(lower, upper))
                .collect(),
        )
    }

    /// Index of the first value lying outside its bounds.
    pub(crate) fn first_violation(&self, external: &[Real]) -> Option<usize> {
        self.0
            .iter()
            .zip(external)
            .position(|(transform, &value)| !transform.contains(value))
    }

    pub(crate) fn to_external(&self, internal: &[Real]) -> Vec<Real> {
        self.0
            .iter()
            .zip(internal)
            .map(|(transform, &value)| transform.to_external(value))
            .collect()
    }

    pub(crate) fn to_internal(&self, external: &[Real]) -> Vec<Real> {
        self.0
            .iter()
            .zip(external)
            .map(|(transform, &value)| transform.to_internal(value))
            .collect()
    }
}
