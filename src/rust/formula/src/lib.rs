// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Restricted arithmetic expression evaluator for user-defined pulse formulas.
//!
//! Formula text originates from interactive user input, so the grammar is
//! defined exhaustively: the binary operators `+ - * / **`, comparisons,
//! unary minus, a fixed whitelist of functions and constants, and bare
//! identifiers which become free variables. Anything else is rejected at
//! parse time. There is no general-purpose evaluator underneath.

pub(crate) mod expr;
pub(crate) mod parse;

use indexmap::IndexMap;
use num_complex::Complex64;

use crate::expr::{Env, Expr};

pub use crate::expr::Function;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("malformed number '{0}'")]
    MalformedNumber(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("missing parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),
    #[error("arithmetic error: {0}")]
    Math(String),
}

/// A parsed formula together with its free variables.
///
/// The reserved time names `t` and `time` never appear in [`Formula::variables`];
/// they are bound automatically during evaluation.
#[derive(Debug, Clone)]
pub struct Formula {
    tree: Expr,
    variables: Vec<String>,
}

impl Formula {
    pub fn parse(formula: &str) -> Result<Formula, ParseError> {
        let tree = parse::parse(formula)?;
        let mut variables = Vec::new();
        tree.collect_variables(&mut variables);
        variables.retain(|name| name != "t" && name != "time");
        Ok(Formula { tree, variables })
    }

    /// Free variable names in order of first appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate the formula at every point of `t_array`.
    ///
    /// A formula that does not depend on time broadcasts its constant value
    /// to the shape of `t_array`.
    pub fn evaluate(
        &self,
        bindings: &IndexMap<String, Complex64>,
        t_array: &[f64],
    ) -> Result<Vec<Complex64>, EvalError> {
        let mut missing: Vec<String> = self
            .variables
            .iter()
            .filter(|name| !bindings.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(EvalError::MissingParameters(missing));
        }
        let mut values = Vec::with_capacity(t_array.len());
        for &t in t_array {
            let env = Env {
                bindings,
                t: Complex64::new(t, 0.0),
            };
            values.push(self.tree.eval(&env)?);
        }
        Ok(values)
    }
}
