//! Derivative functions compiled from textual equations.
//!
//! An order-`n` scalar ODE `y^(n) = g(x, y, y', ..., y^(n-1))` is reduced to
//! the first-order system
//!
//! ```text
//! dy_0/dx     = y_1
//! ...
//! dy_{n-2}/dx = y_{n-1}
//! dy_{n-1}/dx = g(x, y_0, ..., y_{n-1})
//! ```
//!
//! The right-hand side `g` is written as text, e.g. `-y[0] + sin(x)`.
//! Parsing is delegated to [`evalexpr`]; its operator tree is lowered into a
//! small numeric AST that is evaluated on every call. Lowering resolves all
//! identifiers up front, so a typo in a variable name fails at build time
//! instead of half way through a solve.

use std::fmt;
use std::sync::Arc;

use evalexpr::{Node, Operator};
use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::stepper::OdeSystem;

/// Variable naming and evaluation-error policy of an equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquationConvention {
    /// Variables `x, y0 .. y{n-1}` (also written `y[i]`). Evaluation faults
    /// and NaN results are reported as errors.
    #[default]
    Indexed,
    /// Variables `x, y` for order 1 and `x, y, z` for order 2. Evaluation
    /// faults yield a NaN-filled derivative and NaN results pass through.
    Legacy,
}

type RhsFn = dyn Fn(f64, &[f64]) -> Result<Vec<f64>, SolverError> + Send + Sync;

/// Immutable, shareable right-hand side `f(x, y) -> dy/dx`.
///
/// Cloning is cheap (reference counted) and the function is `Send + Sync`,
/// so independent solves on separate threads can share one built function.
#[derive(Clone)]
pub struct DerivativeFunction {
    dim: usize,
    rhs: Arc<RhsFn>,
}

impl DerivativeFunction {
    /// Wrap a closure as a derivative function of dimension `dim`.
    pub fn from_fn<F>(dim: usize, f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> Result<Vec<f64>, SolverError> + Send + Sync + 'static,
    {
        Self {
            dim,
            rhs: Arc::new(f),
        }
    }

    /// Evaluate `dy/dx` at `(x, y)`.
    pub fn call(&self, x: f64, y: &[f64]) -> Result<Vec<f64>, SolverError> {
        (self.rhs)(x, y)
    }
}

impl OdeSystem for DerivativeFunction {
    fn dim(&self) -> usize {
        self.dim
    }

    fn rhs(&self, x: f64, y: &[f64]) -> Result<Vec<f64>, SolverError> {
        self.call(x, y)
    }
}

impl fmt::Debug for DerivativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivativeFunction")
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

/// Build the companion-form derivative of an order-`order` equation using
/// the default [`EquationConvention::Indexed`] convention.
pub fn build(equation: &str, order: usize) -> Result<DerivativeFunction, SolverError> {
    build_with(equation, order, EquationConvention::Indexed)
}

/// Build the companion-form derivative of an equation under `convention`.
pub fn build_with(
    equation: &str,
    order: usize,
    convention: EquationConvention,
) -> Result<DerivativeFunction, SolverError> {
    let compiled = CompiledEquation::compile(equation, order, convention)?;
    log::debug!(
        "compiled equation `{}` (order {}, {:?} convention)",
        equation,
        order,
        convention
    );
    Ok(DerivativeFunction::from_fn(order, move |x, y| {
        compiled.companion(x, y)
    }))
}

/// Rewrite indexed state references `y[i]` into plain identifiers `yi`.
///
/// Only a `y` that starts an identifier is rewritten, and the index must be
/// a non-negative integer literal. Anything else is left for the parser to
/// reject.
pub fn normalize_indices(equation: &str) -> String {
    let mut out = String::with_capacity(equation.len());
    let mut rest = equation;

    while let Some(pos) = rest.find("y[") {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let after = &tail[2..];

        let starts_identifier = !head.chars().next_back().is_some_and(is_identifier_char);
        if starts_identifier {
            if let Some(close) = after.find(']') {
                let index = after[..close].trim();
                if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                    out.push('y');
                    out.push_str(index);
                    rest = &after[close + 1..];
                    continue;
                }
            }
        }

        out.push_str("y[");
        rest = after;
    }

    out.push_str(rest);
    out
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A parsed and resolved right-hand side.
#[derive(Debug, Clone)]
pub struct CompiledEquation {
    source: String,
    order: usize,
    convention: EquationConvention,
    expr: Expr,
}

impl CompiledEquation {
    /// Parse `equation` and resolve every identifier against the variables
    /// an order-`order` problem declares.
    pub fn compile(
        equation: &str,
        order: usize,
        convention: EquationConvention,
    ) -> Result<Self, SolverError> {
        if order < 1 {
            return Err(SolverError::InvalidConfiguration(
                "order must be at least 1".to_string(),
            ));
        }
        let variables = Variables::new(order, convention)?;

        let text = match convention {
            EquationConvention::Indexed => normalize_indices(equation),
            EquationConvention::Legacy => equation.to_string(),
        };
        let tree = evalexpr::build_operator_tree(&text).map_err(|e| {
            SolverError::InvalidConfiguration(format!("cannot parse equation `{}`: {}", equation, e))
        })?;
        let expr = lower(&tree, &variables)?;

        Ok(Self {
            source: equation.to_string(),
            order,
            convention,
            expr,
        })
    }

    /// The equation as supplied by the caller.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Dimension of the state the equation is evaluated on.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Evaluate the right-hand side at `(x, y)` with the strict error policy.
    pub fn evaluate(&self, x: f64, y: &[f64]) -> Result<f64, SolverError> {
        if y.len() != self.order {
            return Err(SolverError::EquationEvaluation {
                equation: self.source.clone(),
                message: format!(
                    "expected a state of length {}, got {}",
                    self.order,
                    y.len()
                ),
            });
        }
        match self.expr.eval(x, y) {
            Ok(value) if value.is_nan() => Err(SolverError::NumericallyInvalidResult { x }),
            Ok(value) => Ok(value),
            Err(ZeroDivisor) => Err(SolverError::DivisionByZero { x }),
        }
    }

    fn companion(&self, x: f64, y: &[f64]) -> Result<Vec<f64>, SolverError> {
        let last = match (self.convention, self.evaluate(x, y)) {
            (_, Ok(value)) => value,
            (EquationConvention::Legacy, Err(SolverError::NumericallyInvalidResult { .. })) => {
                f64::NAN
            }
            (EquationConvention::Legacy, Err(_)) => return Ok(vec![f64::NAN; self.order]),
            (EquationConvention::Indexed, Err(e)) => return Err(e),
        };

        let mut dydx = Vec::with_capacity(self.order);
        dydx.extend_from_slice(&y[1..]);
        dydx.push(last);
        Ok(dydx)
    }
}

/// Where a variable's value comes from at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    X,
    State(usize),
}

struct Variables {
    names: Vec<(String, Slot)>,
}

impl Variables {
    fn new(order: usize, convention: EquationConvention) -> Result<Self, SolverError> {
        let mut names = vec![("x".to_string(), Slot::X)];
        match convention {
            EquationConvention::Indexed => {
                names.extend((0..order).map(|i| (format!("y{}", i), Slot::State(i))));
            }
            EquationConvention::Legacy => {
                if order > 2 {
                    return Err(SolverError::InvalidConfiguration(format!(
                        "legacy variable names only cover orders 1 and 2, got {}",
                        order
                    )));
                }
                names.push(("y".to_string(), Slot::State(0)));
                if order == 2 {
                    names.push(("z".to_string(), Slot::State(1)));
                }
            }
        }
        Ok(Self { names })
    }

    fn lookup(&self, identifier: &str) -> Option<Slot> {
        self.names
            .iter()
            .find(|(name, _)| name == identifier)
            .map(|&(_, slot)| slot)
    }
}

fn named_constant(identifier: &str) -> Option<f64> {
    match identifier {
        "pi" | "π" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

/// Marker for a zero divisor hit during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZeroDivisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Const(f64),
    Var(Slot),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(MathFn, Vec<Expr>),
}

impl Expr {
    fn eval(&self, x: f64, y: &[f64]) -> Result<f64, ZeroDivisor> {
        match self {
            Expr::Const(value) => Ok(*value),
            Expr::Var(Slot::X) => Ok(x),
            Expr::Var(Slot::State(i)) => Ok(y[*i]),
            Expr::Neg(inner) => Ok(-inner.eval(x, y)?),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(x, y)?;
                let b = rhs.eval(x, y)?;
                match op {
                    BinaryOp::Add => Ok(a + b),
                    BinaryOp::Sub => Ok(a - b),
                    BinaryOp::Mul => Ok(a * b),
                    BinaryOp::Div if b == 0.0 => Err(ZeroDivisor),
                    BinaryOp::Div => Ok(a / b),
                    BinaryOp::Rem if b == 0.0 => Err(ZeroDivisor),
                    BinaryOp::Rem => Ok(a % b),
                    BinaryOp::Pow => Ok(a.powf(b)),
                }
            }
            Expr::Call(func, args) => {
                let mut values = [0.0; 2];
                for (value, arg) in values.iter_mut().zip(args) {
                    *value = arg.eval(x, y)?;
                }
                func.apply(&values[..args.len()])
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathFn {
    Abs,
    Sqrt,
    Cbrt,
    Exp,
    Expm1,
    Ln,
    Log10,
    Log2,
    Log1p,
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Asin,
    Acos,
    Atan,
    Acot,
    Sinh,
    Cosh,
    Tanh,
    Coth,
    Floor,
    Ceil,
    Signum,
    Pow,
    Atan2,
    Min,
    Max,
}

impl MathFn {
    fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "abs" => MathFn::Abs,
            "sqrt" => MathFn::Sqrt,
            "cbrt" => MathFn::Cbrt,
            "exp" => MathFn::Exp,
            "expm1" => MathFn::Expm1,
            "ln" | "log" => MathFn::Ln,
            "log10" | "lg" => MathFn::Log10,
            "log2" => MathFn::Log2,
            "log1p" => MathFn::Log1p,
            "sin" => MathFn::Sin,
            "cos" => MathFn::Cos,
            "tan" | "tg" => MathFn::Tan,
            "cot" | "ctg" => MathFn::Cot,
            "sec" => MathFn::Sec,
            "csc" | "cosec" => MathFn::Csc,
            "asin" | "arcsin" => MathFn::Asin,
            "acos" | "arccos" => MathFn::Acos,
            "atan" | "arctan" | "arctg" => MathFn::Atan,
            "acot" | "actg" | "arccot" | "arcctg" => MathFn::Acot,
            "sinh" | "sh" => MathFn::Sinh,
            "cosh" | "ch" => MathFn::Cosh,
            "tanh" | "th" => MathFn::Tanh,
            "coth" | "cth" => MathFn::Coth,
            "floor" => MathFn::Floor,
            "ceil" => MathFn::Ceil,
            "signum" | "sgn" => MathFn::Signum,
            "pow" => MathFn::Pow,
            "atan2" => MathFn::Atan2,
            "min" => MathFn::Min,
            "max" => MathFn::Max,
            _ => return None,
        };
        Some(func)
    }

    fn arity(self) -> usize {
        match self {
            MathFn::Pow | MathFn::Atan2 | MathFn::Min | MathFn::Max => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> Result<f64, ZeroDivisor> {
        let a = args[0];
        let value = match self {
            MathFn::Abs => a.abs(),
            MathFn::Sqrt => a.sqrt(),
            MathFn::Cbrt => a.cbrt(),
            MathFn::Exp => a.exp(),
            MathFn::Expm1 => a.exp_m1(),
            MathFn::Ln => a.ln(),
            MathFn::Log10 => a.log10(),
            MathFn::Log2 => a.log2(),
            MathFn::Log1p => a.ln_1p(),
            MathFn::Sin => a.sin(),
            MathFn::Cos => a.cos(),
            MathFn::Tan => a.tan(),
            MathFn::Cot => reciprocal(a.tan())?,
            MathFn::Sec => reciprocal(a.cos())?,
            MathFn::Csc => reciprocal(a.sin())?,
            MathFn::Asin => a.asin(),
            MathFn::Acos => a.acos(),
            MathFn::Atan => a.atan(),
            MathFn::Acot => reciprocal(a)?.atan(),
            MathFn::Sinh => a.sinh(),
            MathFn::Cosh => a.cosh(),
            MathFn::Tanh => a.tanh(),
            MathFn::Coth => a.cosh() * reciprocal(a.sinh())?,
            MathFn::Floor => a.floor(),
            MathFn::Ceil => a.ceil(),
            MathFn::Signum if a == 0.0 => 0.0,
            MathFn::Signum => a.signum(),
            MathFn::Pow => a.powf(args[1]),
            MathFn::Atan2 => a.atan2(args[1]),
            MathFn::Min => a.min(args[1]),
            MathFn::Max => a.max(args[1]),
        };
        Ok(value)
    }
}

fn reciprocal(value: f64) -> Result<f64, ZeroDivisor> {
    if value == 0.0 {
        Err(ZeroDivisor)
    } else {
        Ok(1.0 / value)
    }
}

/// Lower an `evalexpr` operator tree into the numeric AST.
fn lower(node: &Node, vars: &Variables) -> Result<Expr, SolverError> {
    let children = node.children();
    match node.operator() {
        Operator::RootNode => match children {
            [inner] => lower(inner, vars),
            [] => Err(SolverError::InvalidConfiguration(
                "empty expression".to_string(),
            )),
            _ => Err(SolverError::InvalidConfiguration(
                "expected a single expression".to_string(),
            )),
        },
        Operator::Add => binary(BinaryOp::Add, children, vars),
        Operator::Sub => binary(BinaryOp::Sub, children, vars),
        Operator::Mul => binary(BinaryOp::Mul, children, vars),
        Operator::Div => binary(BinaryOp::Div, children, vars),
        Operator::Mod => binary(BinaryOp::Rem, children, vars),
        Operator::Exp => power(children, vars),
        Operator::Neg => match children {
            [inner] => Ok(Expr::Neg(Box::new(lower(inner, vars)?))),
            _ => Err(missing_operand("-")),
        },
        Operator::Const { value } => value.as_number().map(Expr::Const).map_err(|_| {
            SolverError::InvalidConfiguration(format!("unsupported literal `{}`", value))
        }),
        Operator::VariableIdentifierRead { identifier } => vars
            .lookup(identifier)
            .map(Expr::Var)
            .or_else(|| named_constant(identifier).map(Expr::Const))
            .ok_or_else(|| SolverError::UnknownVariable {
                name: identifier.clone(),
            }),
        Operator::FunctionIdentifier { identifier } => {
            let func = MathFn::from_name(identifier).ok_or_else(|| SolverError::UnknownFunction {
                name: identifier.clone(),
            })?;
            let args = call_arguments(children, vars)?;
            if args.len() != func.arity() {
                return Err(SolverError::InvalidConfiguration(format!(
                    "function `{}` takes {} argument(s), got {}",
                    identifier,
                    func.arity(),
                    args.len()
                )));
            }
            Ok(Expr::Call(func, args))
        }
        other => Err(SolverError::InvalidConfiguration(format!(
            "unsupported operator {:?} in equation",
            other
        ))),
    }
}

fn binary(op: BinaryOp, children: &[Node], vars: &Variables) -> Result<Expr, SolverError> {
    match children {
        [lhs, rhs] => Ok(Expr::Binary(
            op,
            Box::new(lower(lhs, vars)?),
            Box::new(lower(rhs, vars)?),
        )),
        _ => Err(missing_operand(&format!("{:?}", op))),
    }
}

/// `^` groups to the right: `a^b^c` is `a^(b^c)`. The parser nests power
/// chains to the left, so the left spine is flattened and rebuilt.
fn power(children: &[Node], vars: &Variables) -> Result<Expr, SolverError> {
    let [first, exponent] = children else {
        return Err(missing_operand("^"));
    };
    let mut base = first;
    let mut operands = vec![exponent];
    while matches!(base.operator(), Operator::Exp) {
        let [lhs, rhs] = base.children() else {
            return Err(missing_operand("^"));
        };
        operands.push(rhs);
        base = lhs;
    }
    operands.push(base);

    let mut operands = operands.into_iter().map(|node| lower(node, vars));
    let mut expr = match operands.next() {
        Some(exponent) => exponent?,
        None => return Err(missing_operand("^")),
    };
    for operand in operands {
        expr = Expr::Binary(BinaryOp::Pow, Box::new(operand?), Box::new(expr));
    }
    Ok(expr)
}

fn call_arguments(children: &[Node], vars: &Variables) -> Result<Vec<Expr>, SolverError> {
    let [first] = children else {
        return Err(SolverError::InvalidConfiguration(
            "malformed function call".to_string(),
        ));
    };
    let mut arg = first;
    while matches!(arg.operator(), Operator::RootNode) {
        match arg.children() {
            [inner] => arg = inner,
            [] => return Ok(Vec::new()),
            _ => break,
        }
    }
    match arg.operator() {
        Operator::Tuple => arg.children().iter().map(|c| lower(c, vars)).collect(),
        _ => Ok(vec![lower(arg, vars)?]),
    }
}

fn missing_operand(op: &str) -> SolverError {
    SolverError::InvalidConfiguration(format!("operator `{}` is missing an operand", op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(equation: &str, order: usize, x: f64, y: &[f64]) -> Result<Vec<f64>, SolverError> {
        build(equation, order)?.call(x, y)
    }

    #[test]
    fn test_normalize_indices() {
        assert_eq!(normalize_indices("y[0] + y[12]*x"), "y0 + y12*x");
        assert_eq!(normalize_indices("y[ 1 ]"), "y1");
        assert_eq!(normalize_indices("my[0]"), "my[0]");
        assert_eq!(normalize_indices("y[a]"), "y[a]");
        assert_eq!(normalize_indices("sin(y[1])-y[0]"), "sin(y1)-y0");
        assert_eq!(normalize_indices("x"), "x");
    }

    #[test]
    fn test_first_order() {
        let dydx = eval("x + y[0]", 1, 2.0, &[3.0]).unwrap();
        assert_eq!(dydx, vec![5.0]);
    }

    #[test]
    fn test_companion_form() {
        // y''' = x + y: derivative shifts the state and appends the rhs
        let dydx = eval("x + y[0]", 3, 1.0, &[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(dydx, vec![3.0, 4.0, 3.0]);

        let dydx = eval("-y0", 2, 0.0, &[0.25, -1.0]).unwrap();
        assert_eq!(dydx, vec![-1.0, -0.25]);
    }

    #[test]
    fn test_order_zero_rejected() {
        let err = build("x", 0).unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unknown_variable() {
        let err = build("y[1] + x", 1).unwrap_err();
        assert_eq!(err, SolverError::UnknownVariable { name: "y1".into() });

        let err = build("t * y[0]", 1).unwrap_err();
        assert_eq!(err, SolverError::UnknownVariable { name: "t".into() });

        // Bare `y` only exists in the legacy convention
        let err = build("y", 1).unwrap_err();
        assert_eq!(err, SolverError::UnknownVariable { name: "y".into() });
    }

    #[test]
    fn test_unknown_function() {
        let err = build("foo(x)", 1).unwrap_err();
        assert_eq!(err, SolverError::UnknownFunction { name: "foo".into() });
    }

    #[test]
    fn test_function_arity() {
        assert!(matches!(
            build("sin(x, y[0])", 1).unwrap_err(),
            SolverError::InvalidConfiguration(_)
        ));
        assert!(matches!(
            build("pow(x)", 1).unwrap_err(),
            SolverError::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn test_unsupported_syntax() {
        for equation in ["x > 1", "a = 1", "", "\"text\""] {
            assert!(
                matches!(
                    build(equation, 1).unwrap_err(),
                    SolverError::InvalidConfiguration(_)
                ),
                "`{}` should be rejected",
                equation
            );
        }
    }

    #[test]
    fn test_power_groups_to_the_right() {
        assert_eq!(eval("2^3^2", 1, 0.0, &[0.0]).unwrap(), vec![512.0]);
        assert_eq!(eval("(2^3)^2", 1, 0.0, &[0.0]).unwrap(), vec![64.0]);
        assert_eq!(eval("x^y[0]^2", 1, 2.0, &[3.0]).unwrap(), vec![512.0]);
        assert_eq!(eval("2^2^2^2", 1, 0.0, &[0.0]).unwrap(), vec![65536.0]);
        assert_eq!(eval("-x^2", 1, 3.0, &[0.0]).unwrap(), vec![-9.0]);
    }

    #[test]
    fn test_integer_literals_are_real() {
        let dydx = eval("1/2*y[0]", 1, 0.0, &[3.0]).unwrap();
        assert_eq!(dydx, vec![1.5]);
    }

    #[test]
    fn test_functions_and_constants() {
        let x: f64 = 0.7;
        let cases: [(&str, f64); 9] = [
            ("sin(x)", x.sin()),
            ("tg(x)", x.tan()),
            ("ln(x)", x.ln()),
            ("pow(x, 3)", x.powf(3.0)),
            ("x^2", x * x),
            ("atan2(1, x)", 1.0_f64.atan2(x)),
            ("2*pi", 2.0 * std::f64::consts::PI),
            ("e^x", x.exp()),
            ("coth(x)", x.cosh() / x.sinh()),
        ];
        for (equation, expected) in cases {
            let dydx = eval(equation, 1, x, &[0.0]).unwrap();
            assert_relative_eq!(dydx[0], expected, max_relative = 1e-14);
        }
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval("1/x", 1, 0.0, &[1.0]).unwrap_err();
        assert_eq!(err, SolverError::DivisionByZero { x: 0.0 });

        let err = eval("y[0] % x", 1, 0.0, &[1.0]).unwrap_err();
        assert_eq!(err, SolverError::DivisionByZero { x: 0.0 });

        let err = eval("cot(x)", 1, 0.0, &[1.0]).unwrap_err();
        assert_eq!(err, SolverError::DivisionByZero { x: 0.0 });

        // 0/0 is reported as a division fault, not as NaN
        let err = eval("y[0]/x", 1, 0.0, &[0.0]).unwrap_err();
        assert_eq!(err, SolverError::DivisionByZero { x: 0.0 });
    }

    #[test]
    fn test_nan_result() {
        let err = eval("sqrt(y[0])", 1, 2.5, &[-1.0]).unwrap_err();
        assert_eq!(err, SolverError::NumericallyInvalidResult { x: 2.5 });
    }

    #[test]
    fn test_wrong_state_length() {
        let err = eval("y[0]", 1, 0.0, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, SolverError::EquationEvaluation { .. }));
    }

    #[test]
    fn test_legacy_names() {
        let f = build_with("x + y", 1, EquationConvention::Legacy).unwrap();
        assert_eq!(f.call(1.0, &[2.0]).unwrap(), vec![3.0]);

        let f = build_with("-y - z", 2, EquationConvention::Legacy).unwrap();
        assert_eq!(f.call(0.0, &[1.0, 2.0]).unwrap(), vec![2.0, -3.0]);

        let err = build_with("y", 3, EquationConvention::Legacy).unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfiguration(_)));

        let err = build_with("y[0]", 1, EquationConvention::Legacy).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_legacy_faults_become_nan() {
        let f = build_with("1/x", 2, EquationConvention::Legacy).unwrap();
        let dydx = f.call(0.0, &[1.0, 1.0]).unwrap();
        assert!(dydx.iter().all(|v| v.is_nan()));

        let f = build_with("sqrt(y)", 2, EquationConvention::Legacy).unwrap();
        let dydx = f.call(0.0, &[-1.0, 4.0]).unwrap();
        assert_eq!(dydx[0], 4.0);
        assert!(dydx[1].is_nan());
    }

    #[test]
    fn test_builds_are_independent() {
        let f = build("y[0]", 1).unwrap();
        let g = build("-y[0]", 1).unwrap();
        assert_eq!(f.call(0.0, &[2.0]).unwrap(), vec![2.0]);
        assert_eq!(g.call(0.0, &[2.0]).unwrap(), vec![-2.0]);
        assert_eq!(f.dim(), 1);
    }

    #[test]
    fn test_from_fn() {
        let f = DerivativeFunction::from_fn(2, |x, y| Ok(vec![y[1], -x]));
        assert_eq!(f.dim(), 2);
        assert_eq!(f.rhs(3.0, &[0.0, 1.0]).unwrap(), vec![1.0, -3.0]);
    }
}
