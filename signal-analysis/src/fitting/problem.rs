use super::bounds::ParameterSpace;
use crate::expression::ModelFunction;
use levenberg_marquardt::LeastSquaresProblem;
use lumparser_common::Real;
use nalgebra::{DMatrix, DVector, Dyn, Owned};

/// Relative step for forward difference derivatives.
const STEP: Real = 1.490_116_119_384_765_6e-8; // sqrt(f64::EPSILON)

fn step_size(value: Real) -> Real {
    STEP * value.abs().max(1.0)
}

/// Forward difference Jacobian of `f` at `params`, with `f0 = f(params)`.
fn forward_difference(
    params: &[Real],
    f0: &DVector<Real>,
    f: impl Fn(&[Real]) -> Option<DVector<Real>>,
) -> Option<DMatrix<Real>> {
    let mut jacobian = DMatrix::zeros(f0.len(), params.len());
    let mut shifted = params.to_vec();
    for (j, &value) in params.iter().enumerate() {
        let h = step_size(value);
        if let Some(p) = shifted.get_mut(j) {
            *p = value + h;
        }
        let f1 = f(&shifted)?;
        jacobian.set_column(j, &((f1 - f0) / h));
        if let Some(p) = shifted.get_mut(j) {
            *p = value;
        }
    }
    Some(jacobian)
}

/// Least squares problem of a model against data, in the unconstrained
/// parameter space of its bounds.
pub(crate) struct CurveProblem<'a> {
    model: &'a ModelFunction,
    space: &'a ParameterSpace,
    xs: &'a [Real],
    ys: &'a [Real],
    internal: DVector<Real>,
}

impl<'a> CurveProblem<'a> {
    pub(crate) fn new(
        model: &'a ModelFunction,
        space: &'a ParameterSpace,
        xs: &'a [Real],
        ys: &'a [Real],
        initial: &[Real],
    ) -> Self {
        Self {
            model,
            space,
            xs,
            ys,
            internal: DVector::from_vec(space.to_internal(initial)),
        }
    }

    /// The fitted parameters in model space.
    pub(crate) fn estimates(&self) -> Vec<Real> {
        self.space.to_external(self.internal.as_slice())
    }

    fn residuals_at(&self, internal: &[Real]) -> Option<DVector<Real>> {
        let external = self.space.to_external(internal);
        model_residuals(self.model, self.xs, self.ys, &external)
    }
}

/// Residuals `model(x) - y`, or `None` if the model is not finite somewhere.
pub(crate) fn model_residuals(
    model: &ModelFunction,
    xs: &[Real],
    ys: &[Real],
    params: &[Real],
) -> Option<DVector<Real>> {
    let predicted = model.evaluate_all(xs.iter().copied(), params);
    let residuals = DVector::from_iterator(
        ys.len(),
        predicted.iter().zip(ys).map(|(f, y)| f - y),
    );
    residuals.iter().all(|r| r.is_finite()).then_some(residuals)
}

/// Jacobian of the model with respect to its own (bounded) parameters.
pub(crate) fn model_jacobian(
    model: &ModelFunction,
    xs: &[Real],
    ys: &[Real],
    params: &[Real],
) -> Option<DMatrix<Real>> {
    let f0 = model_residuals(model, xs, ys, params)?;
    forward_difference(params, &f0, |p| model_residuals(model, xs, ys, p))
}

impl LeastSquaresProblem<Real, Dyn, Dyn> for CurveProblem<'_> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.internal.copy_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.internal.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        self.residuals_at(self.internal.as_slice())
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        let internal = self.internal.as_slice();
        let f0 = self.residuals_at(internal)?;
        forward_difference(internal, &f0, |p| self.residuals_at(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn residuals_and_jacobian() {
        let model = ModelFunction::build("a * x + b", "a, b").unwrap();
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 2.0, 4.0];
        let residuals = model_residuals(&model, &xs, &ys, &[1.0, 1.0]).unwrap();
        assert_eq!(residuals.as_slice(), &[0.0, 0.0, -1.0]);

        let jacobian = model_jacobian(&model, &xs, &ys, &[1.0, 1.0]).unwrap();
        for (i, &x) in xs.iter().enumerate() {
            assert_approx_eq!(jacobian[(i, 0)], x, 1e-6);
            assert_approx_eq!(jacobian[(i, 1)], 1.0, 1e-6);
        }
    }

    #[test]
    fn non_finite_model_gives_none() {
        let model = ModelFunction::build("a / x", "a").unwrap();
        assert!(model_residuals(&model, &[0.0, 1.0], &[1.0, 1.0], &[1.0]).is_none());
    }

    #[test]
    fn problem_reports_bounded_estimates() {
        let model = ModelFunction::build("a * x", "a").unwrap();
        let space = ParameterSpace::new(&[0.0], &[Real::INFINITY]);
        let xs = [1.0, 2.0];
        let ys = [2.0, 4.0];
        let problem = CurveProblem::new(&model, &space, &xs, &ys, &[2.0]);
        assert_approx_eq!(problem.estimates()[0], 2.0);
        assert_approx_eq!(problem.residuals().unwrap().norm(), 0.0);
    }
}
