//! Scan-predicate expressions (`spec.md` §4.3.3).

use crate::error::{Result, StorageError};
use crate::record::record::Record;
use crate::record::schema::Schema;
use crate::record::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Lt,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Const(Value),
    Attr(usize),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluates the expression against `record`. Returns `None` wherever
    /// the sub-expression touches a NULL attribute — callers compose this
    /// the same way the source's nullMap bits were meant to be read, but
    /// made explicit instead of comparing undefined bytes (see DESIGN.md).
    pub fn eval(&self, schema: &Schema, record: &Record) -> Result<Option<Value>> {
        match self {
            Expr::Const(v) => Ok(Some(v.clone())),
            Expr::Attr(idx) => record.get_attr(schema, *idx),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(schema, record)?;
                let r = rhs.eval(schema, record)?;
                match (l, r) {
                    (Some(l), Some(r)) => Ok(Some(Value::Bool(apply_binop(*op, &l, &r)?))),
                    // A comparison touching a NULL attribute is neither true nor false;
                    // scans treat it as excluding the row, so evaluate to false.
                    _ => Ok(Some(Value::Bool(false))),
                }
            }
            Expr::Not(inner) => match inner.eval(schema, record)? {
                Some(Value::Bool(b)) => Ok(Some(Value::Bool(!b))),
                Some(_) => Err(StorageError::invalid_attribute("NOT applied to a non-boolean value")),
                None => Ok(Some(Value::Bool(false))),
            },
            Expr::And(lhs, rhs) => {
                let l = as_bool(lhs.eval(schema, record)?)?;
                let r = as_bool(rhs.eval(schema, record)?)?;
                Ok(Some(Value::Bool(l && r)))
            }
            Expr::Or(lhs, rhs) => {
                let l = as_bool(lhs.eval(schema, record)?)?;
                let r = as_bool(rhs.eval(schema, record)?)?;
                Ok(Some(Value::Bool(l || r)))
            }
        }
    }

    /// Convenience for scan predicates: evaluates to a plain bool, treating
    /// a NULL result as `false`.
    pub fn eval_bool(&self, schema: &Schema, record: &Record) -> Result<bool> {
        Ok(matches!(self.eval(schema, record)?, Some(Value::Bool(true))))
    }
}

fn as_bool(v: Option<Value>) -> Result<bool> {
    match v {
        Some(Value::Bool(b)) => Ok(b),
        None => Ok(false),
        Some(_) => Err(StorageError::invalid_attribute("boolean operator applied to a non-boolean value")),
    }
}

fn apply_binop(op: BinOp, l: &Value, r: &Value) -> Result<bool> {
    use Value::*;
    let ordering = match (l, r) {
        (Int(a), Int(b)) => a.partial_cmp(b),
        (Float(a), Float(b)) => a.partial_cmp(b),
        (Bool(a), Bool(b)) => a.partial_cmp(b),
        (String(a), String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        _ => {
            return Err(StorageError::invalid_attribute(format!(
                "cannot compare {} with {}",
                l.type_name(),
                r.type_name()
            )))
        }
    };
    let ordering = ordering.ok_or_else(|| StorageError::invalid_attribute("incomparable values"))?;
    Ok(match op {
        BinOp::Eq => ordering == std::cmp::Ordering::Equal,
        BinOp::Lt => ordering == std::cmp::Ordering::Less,
    })
}
