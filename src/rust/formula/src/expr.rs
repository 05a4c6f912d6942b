// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use num_complex::Complex64;

use crate::EvalError;

/// Whitelisted functions. Calling any other name is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Phase,
    Real,
    Imag,
    Conj,
    Sinc,
}

impl Function {
    pub(crate) fn from_name(name: &str) -> Option<Function> {
        let function = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            "phase" => Function::Phase,
            "real" => Function::Real,
            "imag" => Function::Imag,
            "conj" => Function::Conj,
            "sinc" => Function::Sinc,
            _ => return None,
        };
        Some(function)
    }

    fn apply(self, x: Complex64) -> Result<Complex64, EvalError> {
        let value = match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Exp => x.exp(),
            Function::Log => {
                if is_zero(x) {
                    return Err(EvalError::Math("log of zero".to_string()));
                }
                x.ln()
            }
            Function::Sqrt => x.sqrt(),
            Function::Abs => Complex64::new(x.norm(), 0.0),
            Function::Phase => Complex64::new(x.arg(), 0.0),
            Function::Real => Complex64::new(x.re, 0.0),
            Function::Imag => Complex64::new(x.im, 0.0),
            Function::Conj => x.conj(),
            // Normalized so that sinc(0) == 1.
            Function::Sinc => {
                if is_zero(x) {
                    Complex64::new(1.0, 0.0)
                } else {
                    x.sin() / x
                }
            }
        };
        Ok(value)
    }
}

/// Named constants folded to literals at parse time.
pub(crate) fn constant(name: &str) -> Option<Complex64> {
    let value = match name {
        "pi" => Complex64::new(std::f64::consts::PI, 0.0),
        "e" => Complex64::new(std::f64::consts::E, 0.0),
        "j" | "i" => Complex64::new(0.0, 1.0),
        _ => return None,
    };
    Some(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Complex64),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

pub(crate) struct Env<'a> {
    pub bindings: &'a IndexMap<String, Complex64>,
    pub t: Complex64,
}

impl Env<'_> {
    fn lookup(&self, name: &str) -> Complex64 {
        if name == "t" || name == "time" {
            return self.t;
        }
        // Presence of every free variable is verified before evaluation.
        self.bindings
            .get(name)
            .copied()
            .unwrap_or(Complex64::new(0.0, 0.0))
    }
}

impl Expr {
    pub(crate) fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                if !out.iter().any(|existing| existing == name) {
                    out.push(name.clone());
                }
            }
            Expr::Unary(_, operand) => operand.collect_variables(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Expr::Call(_, argument) => argument.collect_variables(out),
        }
    }

    pub(crate) fn eval(&self, env: &Env<'_>) -> Result<Complex64, EvalError> {
        let value = match self {
            Expr::Literal(value) => *value,
            Expr::Variable(name) => env.lookup(name),
            Expr::Unary(UnaryOp::Neg, operand) => -operand.eval(env)?,
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(env)?;
                let b = rhs.eval(env)?;
                apply_binary(*op, a, b)?
            }
            Expr::Call(function, argument) => function.apply(argument.eval(env)?)?,
        };
        Ok(value)
    }
}

fn is_zero(x: Complex64) -> bool {
    x.re == 0.0 && x.im == 0.0
}

fn indicator(condition: bool) -> Complex64 {
    Complex64::new(if condition { 1.0 } else { 0.0 }, 0.0)
}

fn apply_binary(op: BinaryOp, a: Complex64, b: Complex64) -> Result<Complex64, EvalError> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if is_zero(b) {
                return Err(EvalError::Math("division by zero".to_string()));
            }
            a / b
        }
        BinaryOp::Pow => {
            if is_zero(a) {
                if b.re < 0.0 {
                    return Err(EvalError::Math(
                        "zero raised to a negative power".to_string(),
                    ));
                }
                if is_zero(b) {
                    Complex64::new(1.0, 0.0)
                } else {
                    Complex64::new(0.0, 0.0)
                }
            } else {
                a.powc(b)
            }
        }
        // Ordering comparisons act on the real part; equality is exact.
        BinaryOp::Lt => indicator(a.re < b.re),
        BinaryOp::Le => indicator(a.re <= b.re),
        BinaryOp::Gt => indicator(a.re > b.re),
        BinaryOp::Ge => indicator(a.re >= b.re),
        BinaryOp::Eq => indicator(a == b),
        BinaryOp::Ne => indicator(a != b),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names_cover_whitelist() {
        for name in [
            "sin", "cos", "tan", "exp", "log", "sqrt", "abs", "phase", "real", "imag", "conj",
            "sinc",
        ] {
            assert!(Function::from_name(name).is_some(), "missing {name}");
        }
        assert!(Function::from_name("eval").is_none());
    }

    #[test]
    fn test_zero_power_rules() {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        assert_eq!(apply_binary(BinaryOp::Pow, zero, zero).unwrap(), one);
        assert_eq!(apply_binary(BinaryOp::Pow, zero, one).unwrap(), zero);
        assert!(apply_binary(BinaryOp::Pow, zero, -one).is_err());
    }

    #[test]
    fn test_phase_and_abs_are_real_valued() {
        let x = Complex64::new(0.0, 2.0);
        assert_eq!(
            Function::Abs.apply(x).unwrap(),
            Complex64::new(2.0, 0.0)
        );
        assert_eq!(
            Function::Phase.apply(x).unwrap(),
            Complex64::new(std::f64::consts::FRAC_PI_2, 0.0)
        );
    }
}
