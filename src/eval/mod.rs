//! Formula evaluation
//!
//! Interprets a parsed formula against an operation's variable environment.
//! Evaluation is total: unknown names read as zero and any non-finite
//! result (division by zero, sqrt of a negative...) comes back as zero.

use crate::ast::{BinaryOp, Expr, Function, UnaryOp};
use crate::parser::{self, ParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use thiserror::Error;

/// Variable name -> value, ordered so evaluation and reporting are stable
pub type Environment = BTreeMap<String, f64>;

/// A process formula, parsed once and evaluated per operation
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = parser::parse_formula(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names the formula reads
    pub fn variables(&self) -> Vec<&str> {
        self.expr.variables()
    }

    /// Evaluate to a finite number of minutes
    pub fn evaluate(&self, vars: &Environment) -> f64 {
        finite_or_zero(eval_expr(&self.expr, vars))
    }
}

/// Parse and evaluate in one step
pub fn evaluate(formula: &str, vars: &Environment) -> Result<f64, ParseError> {
    Ok(Formula::parse(formula)?.evaluate(vars))
}

/// A formula that failed to parse, attributed to its process
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("formula for process '{process_id}' is invalid: {message}")]
pub struct FormulaError {
    pub process_id: String,
    pub formula: String,
    pub message: String,
    pub span: Range<usize>,
}

impl FormulaError {
    pub fn new(process_id: impl Into<String>, formula: impl Into<String>, error: &ParseError) -> Self {
        Self {
            process_id: process_id.into(),
            formula: formula.into(),
            message: error.to_string(),
            span: error.span(),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn eval_expr(expr: &Expr, vars: &Environment) -> f64 {
    match expr {
        Expr::Number(value) => *value,
        Expr::Variable(name) => vars.get(name).copied().unwrap_or(0.0),
        Expr::Unary(op, operand) => {
            let value = eval_expr(operand, vars);
            match op {
                UnaryOp::Neg => -value,
                UnaryOp::Plus => value,
                UnaryOp::Not => flag(!truthy(value)),
            }
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            flag(truthy(eval_expr(lhs, vars)) && truthy(eval_expr(rhs, vars)))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            flag(truthy(eval_expr(lhs, vars)) || truthy(eval_expr(rhs, vars)))
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, vars);
            let r = eval_expr(rhs, vars);
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Rem => l % r,
                BinaryOp::Pow => l.powf(r),
                BinaryOp::Lt => flag(l < r),
                BinaryOp::Le => flag(l <= r),
                BinaryOp::Gt => flag(l > r),
                BinaryOp::Ge => flag(l >= r),
                BinaryOp::Eq => flag(l == r),
                BinaryOp::Ne => flag(l != r),
                BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
            }
        }
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if truthy(eval_expr(condition, vars)) {
                eval_expr(then, vars)
            } else {
                eval_expr(otherwise, vars)
            }
        }
        Expr::Call(function, args) => {
            let values: Vec<f64> = args.iter().map(|arg| eval_expr(arg, vars)).collect();
            call(*function, &values)
        }
    }
}

// Arity was checked by the parser
fn call(function: Function, args: &[f64]) -> f64 {
    let first = args.first().copied().unwrap_or(0.0);
    match function {
        Function::Ceil => first.ceil(),
        Function::Floor => first.floor(),
        // Half rounds toward +infinity
        Function::Round => (first + 0.5).floor(),
        Function::Sqrt => first.sqrt(),
        Function::Pow => first.powf(args.get(1).copied().unwrap_or(0.0)),
        Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
    }
}
