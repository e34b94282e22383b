//! # Expression Evaluator
//!
//! Parses an equation in the single variable `x` with `meval` and samples it.
//!
//! Evaluation is all-or-nothing: a syntax error, an unbound symbol or a
//! non-finite value at any sample fails the whole call. There is no partial
//! series.
//!
//! ```rust
//! use graphgen_core::evaluator::evaluate;
//!
//! let ys = evaluate("x**2 + 1", &[0.0, 1.0, 2.0]).unwrap();
//! assert_eq!(ys, vec![1.0, 2.0, 5.0]);
//! assert!(evaluate("1/x", &[0.0]).is_err());
//! ```

use crate::error::{self, Result};
use meval::tokenizer::Token;
use meval::{Context, Expr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The free variable every equation is written in
pub const VARIABLE: &str = "x";

/// Deepest parenthesis nesting, or longest run of signs, accepted
pub const MAX_NESTING: usize = 256;

/// Functions an equation may call
pub const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "exp", "log", "ln",
    "sqrt", "abs",
];

/// A parsed equation
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    expr: Expr,
}

impl Expression {
    /// Parse equation text. `**` is accepted as a power operator.
    ///
    /// Unknown functions and malformed syntax fail here; unknown symbols are
    /// only detected when evaluating, since bindings may supply them.
    pub fn parse(source: &str) -> Result<Self> {
        check_nesting(source)?;

        let expr: Expr = source
            .replace("**", "^")
            .parse()
            .map_err(|e: meval::Error| error::syntax_error(source, e.to_string()))?;

        let unknown: Vec<&str> = expr
            .iter()
            .filter_map(|token| match token {
                Token::Func(name, _) if !FUNCTIONS.contains(&name.as_str()) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        if let Some(name) = unknown.first() {
            return Err(error::syntax_error(source, format!("unknown function '{}'", name))
                .with_context("function", *name));
        }

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The text this expression was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every symbol appearing in the expression, including `x`
    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.expr
            .iter()
            .filter_map(|token| match token {
                Token::Var(name) if !is_constant(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Symbols that are neither `x` nor bound
    pub fn unbound_symbols(&self, bindings: &Bindings) -> Vec<String> {
        self.free_symbols()
            .into_iter()
            .filter(|name| name != VARIABLE && !bindings.contains(name))
            .collect()
    }

    /// Evaluate at a single value of `x`
    pub fn eval_at(&self, x: f64, bindings: &Bindings) -> Result<f64> {
        let mut ctx = context(bindings);
        self.eval_in(&mut ctx, x)
    }

    /// Evaluate at every sample, in order. Fails as a whole on the first
    /// failing sample.
    pub fn sample(&self, samples: &[f64], bindings: &Bindings) -> Result<Vec<f64>> {
        let unbound = self.unbound_symbols(bindings);
        if !unbound.is_empty() {
            return Err(graphgen_error::Error::evaluation_failed(format!(
                "unbound symbol(s): {}",
                unbound.join(", ")
            ))
            .with_operation("evaluator::sample")
            .with_context("equation", self.source.clone())
            .with_context("symbols", unbound.join(",")));
        }

        let mut ctx = context(bindings);
        samples.iter().map(|&x| self.eval_in(&mut ctx, x)).collect()
    }

    fn eval_in(&self, ctx: &mut Context<'static>, x: f64) -> Result<f64> {
        ctx.var(VARIABLE, x);
        let value = self.expr.eval_with_context(&*ctx).map_err(|e| match e {
            meval::Error::UnknownVariable(name) => {
                error::evaluation_failed(&self.source, x, format!("unbound symbol '{}'", name))
                    .with_context("symbol", name)
            }
            other => error::evaluation_failed(&self.source, x, other.to_string()),
        })?;

        if !value.is_finite() {
            return Err(error::evaluation_failed(
                &self.source,
                x,
                format!("result is not a finite real number ({})", value),
            ));
        }

        Ok(value)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn is_constant(name: &str) -> bool {
    matches!(name, "pi" | "E")
}

/// Constants, the function table and the bindings. `x` is set per sample.
fn context(bindings: &Bindings) -> Context<'static> {
    let mut ctx = Context::empty();
    ctx.var("pi", std::f64::consts::PI)
        .var("E", std::f64::consts::E)
        .func("sin", f64::sin)
        .func("cos", f64::cos)
        .func("tan", f64::tan)
        .func("asin", f64::asin)
        .func("acos", f64::acos)
        .func("atan", f64::atan)
        .func("sinh", f64::sinh)
        .func("cosh", f64::cosh)
        .func("tanh", f64::tanh)
        .func("exp", f64::exp)
        .func("ln", f64::ln)
        .func("sqrt", f64::sqrt)
        .func("abs", f64::abs)
        .funcn(
            "log",
            |args: &[f64]| match args {
                [x] => x.ln(),
                [x, base] => x.log(*base),
                _ => f64::NAN,
            },
            1..,
        );
    for (name, value) in bindings.iter() {
        ctx.var(name, value);
    }
    ctx
}

/// Reject input nested deep enough to be pathological
fn check_nesting(source: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut signs = 0usize;
    for (position, c) in source.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        match c {
            '+' | '-' => signs += 1,
            c if c.is_whitespace() => {}
            _ => signs = 0,
        }
        if depth > MAX_NESTING || signs > MAX_NESTING {
            return Err(error::syntax_error(
                source,
                format!("nested deeper than {} levels", MAX_NESTING),
            )
            .with_context("position", position.to_string()));
        }
    }
    Ok(())
}

/// Named constants substituted alongside `x` (e.g. `u = 0`, `a = 9.81`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    values: BTreeMap<String, f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Merge `other` into self; entries in `other` win
    pub fn extend(&mut self, other: &Bindings) {
        for (name, value) in other.iter() {
            self.values.insert(name.to_string(), value);
        }
    }

    /// Parse a `name=value` assignment such as `a=9.81`
    pub fn parse_assignment(text: &str) -> Result<(String, f64)> {
        let (name, value) = text.split_once('=').ok_or_else(|| {
            graphgen_error::Error::invalid_argument(format!(
                "expected name=value, got '{}'",
                text
            ))
        })?;

        let name = name.trim();
        let valid_name = name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(graphgen_error::Error::invalid_argument(format!(
                "invalid parameter name '{}'",
                name
            )));
        }
        if name == VARIABLE {
            return Err(graphgen_error::Error::invalid_argument(
                "'x' is the plotted variable and cannot be bound",
            ));
        }

        let value: f64 = value.trim().parse().map_err(|e| {
            graphgen_error::Error::invalid_argument(format!(
                "invalid value for '{}': '{}'",
                name,
                value.trim()
            ))
            .set_source(e)
        })?;

        Ok((name.to_string(), value))
    }
}

impl FromIterator<(String, f64)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Evaluate `equation` at each sample with `x` as the only free symbol
pub fn evaluate(equation: &str, samples: &[f64]) -> Result<Vec<f64>> {
    evaluate_with(equation, samples, &Bindings::default())
}

/// Evaluate `equation` at each sample, resolving other symbols from `bindings`
pub fn evaluate_with(equation: &str, samples: &[f64], bindings: &Bindings) -> Result<Vec<f64>> {
    let expression = Expression::parse(equation).map_err(|e| e.with_operation("evaluator::evaluate"))?;
    let series = expression
        .sample(samples, bindings)
        .map_err(|e| e.with_operation("evaluator::evaluate"))?;

    log::debug!(
        "evaluated '{}' at {} samples",
        expression,
        series.len()
    );
    Ok(series)
}

/// `count` evenly spaced values from `start` to `end`, both included
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use graphgen_error::ErrorKind;

    #[test]
    fn test_identity() {
        assert_eq!(evaluate("x", &[1.0, 2.0, 3.0]).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_division_by_zero_is_total_failure() {
        let err = evaluate("1/x", &[0.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvaluationFailed);

        // one bad sample poisons the whole call
        assert!(evaluate("1/x", &[1.0, 2.0, 0.0, 4.0]).is_err());
    }

    #[test]
    fn test_garbage_fails() {
        let err = evaluate("not_a_real_expr(((", &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpressionInvalid);
    }

    #[test]
    fn test_square_matches() {
        let xs = linspace(-10.0, 10.0, 400);
        let ys = evaluate("x**2", &xs).unwrap();
        assert_eq!(ys.len(), 400);
        for (x, y) in xs.iter().zip(&ys) {
            assert_relative_eq!(*y, x * x, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_elementary_functions() {
        let ys = evaluate("sin(x)**2 + cos(x)**2", &[0.3, 1.7]).unwrap();
        for y in ys {
            assert_relative_eq!(y, 1.0, epsilon = 1e-12);
        }

        let ys = evaluate("exp(ln(x)) + sqrt(abs(-x)) - x", &[4.0]).unwrap();
        assert_relative_eq!(ys[0], 2.0, epsilon = 1e-12);

        let ys = evaluate("2*pi*x + E**0", &[1.0]).unwrap();
        assert_relative_eq!(ys[0], 2.0 * std::f64::consts::PI + 1.0);
    }

    #[test]
    fn test_complex_results_fail() {
        assert!(evaluate("sqrt(x)", &[-1.0]).is_err());
        assert!(evaluate("log(x)", &[0.0]).is_err());
    }

    #[test]
    fn test_other_symbols_need_bindings() {
        let err = evaluate("u + a*x", &[1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvaluationFailed);
        assert_eq!(err.context_value("symbols"), Some("a,u"));

        let bindings = Bindings::new().with("u", 2.0).with("a", 3.0);
        let ys = evaluate_with("u + a*x", &[0.0, 1.0, 2.0], &bindings).unwrap();
        assert_eq!(ys, vec![2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_second_equation_of_motion() {
        let bindings = Bindings::new().with("u", 1.0).with("a", 2.0);
        let ys = evaluate_with("u*x + 0.5*a*x**2", &[3.0], &bindings).unwrap();
        assert_relative_eq!(ys[0], 3.0 + 9.0);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(evaluate("x", &[]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_free_symbols() {
        let expr = Expression::parse("u**2 + 2*a*x").unwrap();
        let symbols: Vec<String> = expr.free_symbols().into_iter().collect();
        assert_eq!(symbols, vec!["a", "u", "x"]);
        assert_eq!(
            expr.unbound_symbols(&Bindings::new().with("a", 1.0)),
            vec!["u".to_string()]
        );
    }

    #[test]
    fn test_linspace() {
        let xs = linspace(-10.0, 10.0, 400);
        assert_eq!(xs.len(), 400);
        assert_eq!(xs[0], -10.0);
        assert_eq!(xs[399], 10.0);
        assert_relative_eq!(xs[1] - xs[0], 20.0 / 399.0, epsilon = 1e-12);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            Bindings::parse_assignment("a=9.81").unwrap(),
            ("a".to_string(), 9.81)
        );
        assert_eq!(
            Bindings::parse_assignment(" u = -2 ").unwrap(),
            ("u".to_string(), -2.0)
        );
        assert!(Bindings::parse_assignment("a").is_err());
        assert!(Bindings::parse_assignment("x=1").is_err());
        assert!(Bindings::parse_assignment("1a=1").is_err());
        assert!(Bindings::parse_assignment("a=fast").is_err());
    }

    #[test]
    fn test_bindings_extend() {
        let mut base = Bindings::new().with("u", 0.0).with("a", 1.0);
        base.extend(&Bindings::new().with("a", 9.81));
        assert_eq!(base.get("a"), Some(9.81));
        assert_eq!(base.get("u"), Some(0.0));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let deep = format!("{}x{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = evaluate(&deep, &[1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpressionInvalid);

        let fine = format!("{}x{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(evaluate(&fine, &[2.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_long_sign_runs_are_rejected() {
        let deep = format!("{}x", "-".repeat(20_000));
        let err = evaluate(&deep, &[1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpressionInvalid);
    }

    #[test]
    fn test_unknown_function() {
        let err = Expression::parse("gamma(x)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpressionInvalid);
        assert_eq!(err.context_value("function"), Some("gamma"));
    }

    #[test]
    fn test_power_spellings_agree() {
        let a = evaluate("x**3 - 2*x", &[1.5, -2.0]).unwrap();
        let b = evaluate("x^3 - 2*x", &[1.5, -2.0]).unwrap();
        assert_eq!(a, b);
        assert_eq!(Expression::parse("x**2").unwrap().to_string(), "x**2");
    }

    #[test]
    fn test_log_with_base() {
        let ys = evaluate("log(x, 2) + log(E)", &[8.0]).unwrap();
        assert_relative_eq!(ys[0], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lowercase_e_is_a_symbol() {
        assert!(evaluate("e*x", &[1.0]).is_err());
        let ys = evaluate_with("e*x", &[2.0], &Bindings::new().with("e", 3.0)).unwrap();
        assert_eq!(ys, vec![6.0]);
    }
}
