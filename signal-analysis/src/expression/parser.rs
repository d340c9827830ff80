use super::{
    ExpressionError,
    ast::{BinaryOp, Expr, Function, UnaryOp},
    lexer::{Spanned, Token, tokenize},
};
use std::{
    f64::consts::{E, PI},
    str::FromStr,
};

/// The names a formula may use.
pub(crate) struct Scope<'a> {
    /// Variable names, a variable's slot is its position in this list.
    pub(crate) variables: &'a [&'a str],
    /// Whether `e` and `pi` are recognised.
    pub(crate) constants: bool,
    /// Whether function calls are permitted.
    pub(crate) calls: bool,
}

impl Scope<'_> {
    /// A scope with no names at all, only numbers and operators are accepted.
    pub(crate) const ARITHMETIC: Scope<'static> = Scope {
        variables: &[],
        constants: false,
        calls: false,
    };
}

/// Deepest nesting of parentheses, operators and calls a formula may have.
pub const MAX_DEPTH: usize = 256;

/// A parsed subexpression and the height of its tree.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }

    fn branch(expr: Expr, children: usize) -> Result<Self, ExpressionError> {
        let height = children + 1;
        if height > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(Self { expr, height })
    }

    fn unary(op: UnaryOp, operand: Node) -> Result<Self, ExpressionError> {
        Self::branch(Expr::Unary(op, Box::new(operand.expr)), operand.height)
    }

    fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Result<Self, ExpressionError> {
        let children = lhs.height.max(rhs.height);
        Self::branch(
            Expr::Binary(op, Box::new(lhs.expr), Box::new(rhs.expr)),
            children,
        )
    }
}

/// Recursive descent parser.
///
/// ```text
/// expression := term (('+' | '-') term)*
/// term       := unary (('*' | '/' | '%') unary)*
/// unary      := ('+' | '-') unary | power
/// power      := primary ('**' unary)?
/// primary    := number | name | name '(' arguments ')' | '(' expression ')'
/// ```
/// Both the recursion and the height of the resulting tree are capped at [MAX_DEPTH].
struct Parser<'a> {
    tokens: Vec<Spanned>,
    position: usize,
    scope: &'a Scope<'a>,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(_, token)| token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn unexpected(&self) -> ExpressionError {
        match self.tokens.get(self.position) {
            Some((position, token)) => ExpressionError::UnexpectedToken {
                token: token.to_string(),
                position: *position,
            },
            None => ExpressionError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        if self.peek() == Some(expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Runs `rule` one nesting level deeper.
    fn nested<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<T, ExpressionError>,
    ) -> Result<T, ExpressionError> {
        if self.nesting >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        self.nesting += 1;
        let result = rule(self);
        self.nesting -= 1;
        result
    }

    fn expression(&mut self) -> Result<Node, ExpressionError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.position += 1;
            lhs = Node::binary(op, lhs, self.term()?)?;
        }
    }

    fn term(&mut self) -> Result<Node, ExpressionError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => return Ok(lhs),
            };
            self.position += 1;
            lhs = Node::binary(op, lhs, self.unary()?)?;
        }
    }

    fn unary(&mut self) -> Result<Node, ExpressionError> {
        let op = match self.peek() {
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Minus) => UnaryOp::Minus,
            _ => return self.power(),
        };
        self.position += 1;
        let operand = self.nested(Self::unary)?;
        Node::unary(op, operand)
    }

    fn power(&mut self) -> Result<Node, ExpressionError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.position += 1;
            let exponent = self.nested(Self::unary)?;
            Node::binary(BinaryOp::Power, base, exponent)
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<Node, ExpressionError> {
        let Some((position, token)) = self.advance() else {
            return Err(ExpressionError::UnexpectedEnd);
        };
        match token {
            Token::Number(value) => Ok(Node::leaf(Expr::Number(value))),
            Token::LParen => {
                let inner = self.nested(Self::expression)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if self.peek() == Some(&Token::LParen) => {
                self.nested(|parser| parser.call(name))
            }
            Token::Ident(name) => self.name(name).map(Node::leaf),
            token => Err(ExpressionError::UnexpectedToken {
                token: token.to_string(),
                position,
            }),
        }
    }

    fn name(&self, name: String) -> Result<Expr, ExpressionError> {
        if let Some(slot) = self.scope.variables.iter().position(|v| *v == name) {
            return Ok(Expr::Variable(slot));
        }
        match name.as_str() {
            "e" if self.scope.constants => Ok(Expr::Number(E)),
            "pi" if self.scope.constants => Ok(Expr::Number(PI)),
            _ => Err(ExpressionError::UnknownName(name)),
        }
    }

    fn call(&mut self, name: String) -> Result<Node, ExpressionError> {
        if !self.scope.calls {
            return Err(ExpressionError::UnknownFunction(name));
        }
        let function =
            Function::from_str(&name).map_err(|_| ExpressionError::UnknownFunction(name.clone()))?;
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.expression()?);
            while self.peek() == Some(&Token::Comma) {
                self.position += 1;
                args.push(self.expression()?);
            }
        }
        self.expect(&Token::RParen)?;
        if !function.arity().contains(&args.len()) {
            return Err(ExpressionError::WrongArity {
                function: name,
                found: args.len(),
            });
        }
        let children = args.iter().map(|arg| arg.height).max().unwrap_or_default();
        Node::branch(
            Expr::Call(function, args.into_iter().map(|arg| arg.expr).collect()),
            children,
        )
    }
}

/// Parses `source` into an expression over the names in `scope`.
pub(crate) fn parse(source: &str, scope: &Scope) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        position: 0,
        scope,
        nesting: 0,
    };
    let node = parser.expression()?;
    if parser.peek().is_some() {
        return Err(parser.unexpected());
    }
    Ok(node.expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const VARIABLES: [&str; 3] = ["x", "a", "k"];
    const SCOPE: Scope = Scope {
        variables: &VARIABLES,
        constants: true,
        calls: true,
    };

    fn eval(source: &str, values: &[f64]) -> f64 {
        parse(source, &SCOPE).unwrap().evaluate(values)
    }

    #[test]
    fn precedence() {
        assert_approx_eq!(eval("1 + 2 * 3", &[]), 7.0);
        assert_approx_eq!(eval("(1 + 2) * 3", &[]), 9.0);
        assert_approx_eq!(eval("10 - 4 - 3", &[]), 3.0);
        assert_approx_eq!(eval("12 / 3 / 2", &[]), 2.0);
        assert_approx_eq!(eval("7 % 4 * 2", &[]), 6.0);
    }

    #[test]
    fn power_binds_tighter_than_negation() {
        assert_approx_eq!(eval("-2 ** 2", &[]), -4.0);
        assert_approx_eq!(eval("2 ** -1", &[]), 0.5);
        assert_approx_eq!(eval("2 ** 3 ** 2", &[]), 512.0);
    }

    #[test]
    fn variables_and_constants() {
        assert_approx_eq!(eval("a * exp(-k * x)", &[2.0, 3.0, 0.5]), 3.0 * (-1.0f64).exp());
        assert_approx_eq!(eval("cos(pi)", &[]), -1.0);
        assert_approx_eq!(eval("log(e)", &[]), 1.0);
        assert_approx_eq!(eval("log(100, 10)", &[]), 2.0);
    }

    #[test]
    fn parameters_shadow_constants() {
        let variables = ["x", "e"];
        let scope = Scope {
            variables: &variables,
            constants: true,
            calls: true,
        };
        let expr = parse("e * x", &scope).unwrap();
        assert_approx_eq!(expr.evaluate(&[2.0, 5.0]), 10.0);
    }

    #[test]
    fn unknown_names() {
        assert_eq!(
            parse("b * x", &SCOPE),
            Err(ExpressionError::UnknownName("b".to_owned()))
        );
        assert_eq!(
            parse("eval(x)", &SCOPE),
            Err(ExpressionError::UnknownFunction("eval".to_owned()))
        );
        assert_eq!(
            parse("exp", &SCOPE),
            Err(ExpressionError::UnknownName("exp".to_owned()))
        );
    }

    #[test]
    fn arity_checked() {
        assert_eq!(
            parse("pow(x)", &SCOPE),
            Err(ExpressionError::WrongArity {
                function: "pow".to_owned(),
                found: 1
            })
        );
        assert!(parse("exp(x, a)", &SCOPE).is_err());
        assert!(parse("sin()", &SCOPE).is_err());
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse("", &SCOPE), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(parse("a *", &SCOPE), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(parse("(a", &SCOPE), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(
            parse("a x", &SCOPE),
            Err(ExpressionError::UnexpectedToken {
                token: "x".to_owned(),
                position: 2
            })
        );
        assert!(parse("1.2.3", &SCOPE).is_err());
        assert!(parse("a ** ** 2", &SCOPE).is_err());
    }

    #[test]
    fn nesting_limited() {
        let negations = format!("{}x", "-".repeat(MAX_DEPTH + 1));
        assert_eq!(
            parse(&negations, &SCOPE),
            Err(ExpressionError::TooDeep(MAX_DEPTH))
        );
        let parentheses = format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            parse(&parentheses, &SCOPE),
            Err(ExpressionError::TooDeep(MAX_DEPTH))
        );
        let calls = format!("{}x{}", "sin(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&calls, &SCOPE), Err(ExpressionError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn long_chains_limited() {
        let sum = vec!["x"; 100_000].join(" + ");
        assert_eq!(parse(&sum, &SCOPE), Err(ExpressionError::TooDeep(MAX_DEPTH)));
        let powers = vec!["2"; 100_000].join(" ** ");
        assert_eq!(
            parse(&powers, &SCOPE),
            Err(ExpressionError::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn nesting_within_limit() {
        let negations = format!("{}x", "-".repeat(100));
        assert_approx_eq!(parse(&negations, &SCOPE).unwrap().evaluate(&[3.0]), 3.0);
        let sum = vec!["x"; 200].join(" + ");
        assert_approx_eq!(parse(&sum, &SCOPE).unwrap().evaluate(&[0.5]), 100.0);
    }

    #[test]
    fn arithmetic_scope() {
        assert_approx_eq!(parse("2 * (3 + 1)", &Scope::ARITHMETIC).unwrap().evaluate(&[]), 8.0);
        assert!(parse("pi", &Scope::ARITHMETIC).is_err());
        assert!(parse("sqrt(4)", &Scope::ARITHMETIC).is_err());
    }
}
