use lumparser_common::Real;
use std::ops::RangeInclusive;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Floored modulo, the result takes the sign of the divisor.
    Modulo,
    Power,
}

impl BinaryOp {
    fn apply(self, lhs: Real, rhs: Real) -> Real {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Subtract => lhs - rhs,
            BinaryOp::Multiply => lhs * rhs,
            BinaryOp::Divide => lhs / rhs,
            BinaryOp::Modulo => lhs - rhs * (lhs / rhs).floor(),
            BinaryOp::Power => lhs.powf(rhs),
        }
    }
}

/// The functions a formula may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Acos,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Cos,
    Cosh,
    Degrees,
    Exp,
    Fabs,
    Floor,
    Fmod,
    Hypot,
    Ldexp,
    Log,
    Log10,
    Pow,
    Radians,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
}

impl Function {
    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Function::Atan2 | Function::Fmod | Function::Hypot | Function::Ldexp | Function::Pow => {
                2..=2
            }
            Function::Log => 1..=2,
            _ => 1..=1,
        }
    }

    fn apply(self, args: &[Real]) -> Real {
        match (self, args) {
            (Function::Acos, [a]) => a.acos(),
            (Function::Asin, [a]) => a.asin(),
            (Function::Atan, [a]) => a.atan(),
            (Function::Atan2, [y, x]) => y.atan2(*x),
            (Function::Ceil, [a]) => a.ceil(),
            (Function::Cos, [a]) => a.cos(),
            (Function::Cosh, [a]) => a.cosh(),
            (Function::Degrees, [a]) => a.to_degrees(),
            (Function::Exp, [a]) => a.exp(),
            (Function::Fabs, [a]) => a.abs(),
            (Function::Floor, [a]) => a.floor(),
            (Function::Fmod, [a, b]) => a % b,
            (Function::Hypot, [a, b]) => a.hypot(*b),
            (Function::Ldexp, [a, i]) => a * Real::powf(2.0, i.trunc()),
            (Function::Log, [a]) => a.ln(),
            (Function::Log, [a, base]) => a.ln() / base.ln(),
            (Function::Log10, [a]) => a.log10(),
            (Function::Pow, [a, b]) => a.powf(*b),
            (Function::Radians, [a]) => a.to_radians(),
            (Function::Sin, [a]) => a.sin(),
            (Function::Sinh, [a]) => a.sinh(),
            (Function::Sqrt, [a]) => a.sqrt(),
            (Function::Tan, [a]) => a.tan(),
            (Function::Tanh, [a]) => a.tanh(),
            _ => Real::NAN,
        }
    }
}

/// A parsed formula. Variables refer to slots of the value slice passed to [Expr::evaluate].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Real),
    Variable(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Evaluates the expression. Domain errors such as `sqrt(-1)` give NaN.
    pub fn evaluate(&self, variables: &[Real]) -> Real {
        match self {
            Expr::Number(value) => *value,
            Expr::Variable(slot) => variables.get(*slot).copied().unwrap_or(Real::NAN),
            Expr::Unary(UnaryOp::Plus, operand) => operand.evaluate(variables),
            Expr::Unary(UnaryOp::Minus, operand) => -operand.evaluate(variables),
            Expr::Binary(op, lhs, rhs) => op.apply(lhs.evaluate(variables), rhs.evaluate(variables)),
            Expr::Call(function, args) => {
                let args: Vec<Real> = args.iter().map(|arg| arg.evaluate(variables)).collect();
                function.apply(&args)
            }
        }
    }

    /// Whether the variable in `slot` appears anywhere in the expression.
    pub fn references(&self, slot: usize) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Variable(s) => *s == slot,
            Expr::Unary(_, operand) => operand.references(slot),
            Expr::Binary(_, lhs, rhs) => lhs.references(slot) || rhs.references(slot),
            Expr::Call(_, args) => args.iter().any(|arg| arg.references(slot)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::str::FromStr;

    #[test]
    fn floored_modulo() {
        assert_approx_eq!(BinaryOp::Modulo.apply(7.0, 3.0), 1.0);
        assert_approx_eq!(BinaryOp::Modulo.apply(-7.0, 3.0), 2.0);
        assert_approx_eq!(Function::Fmod.apply(&[-7.0, 3.0]), -1.0);
    }

    #[test]
    fn function_names() {
        assert_eq!(Function::from_str("log10"), Ok(Function::Log10));
        assert_eq!(Function::from_str("atan2"), Ok(Function::Atan2));
        assert!(Function::from_str("eval").is_err());
        assert!(Function::from_str("frexp").is_err());
    }

    #[test]
    fn two_argument_log() {
        assert_approx_eq!(Function::Log.apply(&[8.0, 2.0]), 3.0);
        assert_approx_eq!(Function::Ldexp.apply(&[3.0, 2.0]), 12.0);
    }

    #[test]
    fn domain_error_is_nan() {
        assert!(Function::Sqrt.apply(&[-1.0]).is_nan());
    }

    #[test]
    fn evaluate_with_slots() {
        // a * x + 1 with x in slot 0 and a in slot 1
        let expr = Expr::Binary(
            BinaryOp::Add,
            Box::new(Expr::Binary(
                BinaryOp::Multiply,
                Box::new(Expr::Variable(1)),
                Box::new(Expr::Variable(0)),
            )),
            Box::new(Expr::Number(1.0)),
        );
        assert_approx_eq!(expr.evaluate(&[2.0, 3.0]), 7.0);
        assert!(expr.references(0));
        assert!(!expr.references(2));
    }
}
