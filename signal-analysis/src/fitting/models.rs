use crate::expression::{ExpressionError, ModelFunction};
use lumparser_common::Real;
use nalgebra::DMatrix;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

const INF: Real = Real::INFINITY;

/// The fixed catalog of decay models for integrated signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum BuiltinModel {
    #[strum(serialize = "Exponential")]
    Exponential,
    #[strum(serialize = "Double exponential")]
    DoubleExponential,
    /// Double exponential with the slow rate fixed at 0.032.
    #[strum(serialize = "Double exponential 2")]
    DoubleExponentialFixed,
    #[strum(serialize = "Double with baseline")]
    DoubleWithBaseline,
}

impl BuiltinModel {
    pub fn formula(&self) -> &'static str {
        match self {
            BuiltinModel::Exponential => "a * (b - exp(-k * x))",
            BuiltinModel::DoubleExponential => {
                "a * (b - (c * exp(-k1 * x) + (1 - c) * exp(-k2 * x)))"
            }
            BuiltinModel::DoubleExponentialFixed => {
                "a * (b - (c * exp(-k1 * x) + (1 - c) * exp(-0.032 * x)))"
            }
            BuiltinModel::DoubleWithBaseline => {
                "a * (1 - (c * exp(-k1 * x) + (1 - c) * exp(-k2 * x))) + d * x + b"
            }
        }
    }

    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            BuiltinModel::Exponential => &["a", "b", "k"],
            BuiltinModel::DoubleExponential => &["a", "b", "c", "k1", "k2"],
            BuiltinModel::DoubleExponentialFixed => &["a", "b", "c", "k1"],
            BuiltinModel::DoubleWithBaseline => &["a", "c", "k1", "k2", "d", "b"],
        }
    }

    /// Lower and upper bounds, in parameter order.
    pub fn bounds(&self) -> (Vec<Real>, Vec<Real>) {
        match self {
            BuiltinModel::Exponential => (vec![0.0, 0.5, 0.0], vec![INF, 1.5, 1.0]),
            BuiltinModel::DoubleWithBaseline => (
                vec![0.0, 0.0, 0.0, 0.0, -INF, -INF],
                vec![INF, INF, 0.1, 0.02, INF, INF],
            ),
            _ => {
                let count = self.parameters().len();
                (vec![-INF; count], vec![INF; count])
            }
        }
    }

    /// Initial estimates used when none are given, `I` is the total integral.
    pub fn default_initializer(&self) -> &'static str {
        match self {
            BuiltinModel::Exponential => "I, 1, .005",
            BuiltinModel::DoubleExponential => "I, 1, .3, .04, .0025",
            BuiltinModel::DoubleExponentialFixed => "I, 1, .3, .04",
            BuiltinModel::DoubleWithBaseline => "I, .3, .04, .0025, 1, 1",
        }
    }

    pub fn model(&self) -> Result<ModelFunction, ExpressionError> {
        let (lower, upper) = self.bounds();
        ModelFunction::compile(
            &self.to_string(),
            self.formula(),
            self.parameters(),
            lower,
            upper,
        )
    }

    pub fn catalog() -> impl Iterator<Item = BuiltinModel> {
        BuiltinModel::iter()
    }

    /// Puts the fitted parameters of a model in a canonical order.
    ///
    /// For [BuiltinModel::DoubleExponential] the two `(fraction, rate)` terms are
    /// interchangeable, they are ordered so that the larger rate comes second.
    /// Other models are left as fitted.
    pub(crate) fn canonicalize(
        &self,
        estimates: &mut [Real],
        std_errors: &mut [Real],
        covariance: &mut DMatrix<Real>,
    ) -> bool {
        const C: usize = 2;
        const K1: usize = 3;
        const K2: usize = 4;

        if *self != BuiltinModel::DoubleExponential {
            return false;
        }
        let (Some(&k1), Some(&k2)) = (estimates.get(K1), estimates.get(K2)) else {
            return false;
        };
        if k1 <= k2 {
            return false;
        }
        estimates.swap(K1, K2);
        if let Some(c) = estimates.get_mut(C) {
            *c = 1.0 - *c;
        }
        if std_errors.len() > K2 {
            std_errors.swap(K1, K2);
        }
        if covariance.nrows() > K2 && covariance.ncols() > K2 {
            covariance.row_mut(C).neg_mut();
            covariance.column_mut(C).neg_mut();
            covariance.swap_rows(K1, K2);
            covariance.swap_columns(K1, K2);
        }
        true
    }
}
