//! The pure expression evaluator (§4.3). No side effects: `eval` only reads
//! environments through the resolver, never writes.

use crate::env::{EnvId, EnvStore};
use crate::error::{EvalError, LookupError};
use crate::expr::{BinaryOp, CompareOp, Constant, Expr, UnaryOp};
use crate::ir::{Ir, StmtId};
use crate::parent_chain::ParentChain;
use crate::resolver::Resolver;
use crate::value::Value;

/// Bundles everything `eval` needs to resolve a `Name` node: which
/// instruction is asking (for scope climbing and error line numbers), and
/// the frame it's asking from.
pub struct EvalCtx<'a> {
    pub ir: &'a Ir,
    pub envs: &'a EnvStore,
    pub parents: &'a ParentChain,
    pub stmt: StmtId,
    pub top_env: EnvId,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalFailure {
    Lookup(LookupError),
    Eval(EvalError),
}

impl From<LookupError> for EvalFailure {
    fn from(e: LookupError) -> Self {
        EvalFailure::Lookup(e)
    }
}
impl From<EvalError> for EvalFailure {
    fn from(e: EvalError) -> Self {
        EvalFailure::Eval(e)
    }
}

pub fn eval(expr: &Expr, ctx: &EvalCtx<'_>) -> Result<Value, EvalFailure> {
    match expr {
        Expr::Constant(c) => Ok(constant_value(c)),
        Expr::Name(name) => {
            let resolver = Resolver::new(ctx.ir, ctx.envs, ctx.parents);
            Ok(resolver.lookup_val(ctx.stmt, ctx.top_env, *name, ctx.line)?.clone())
        }
        Expr::Unary { op, operand } => {
            let v = eval(operand, ctx)?;
            apply_unary(*op, &v, ctx.line)
        }
        Expr::Binary { op, left, right } => {
            let l = eval(left, ctx)?;
            let r = eval(right, ctx)?;
            apply_binary(*op, &l, &r, ctx.line)
        }
        Expr::Compare { first, rest } => eval_compare(first, rest, ctx),
    }
}

fn constant_value(c: &Constant) -> Value {
    match c {
        Constant::Int(n) => Value::Int(*n),
        Constant::Float(f) => Value::Float(*f),
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Str(s) => Value::Str(s.clone()),
        Constant::None => Value::None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Int(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1 } else { 0 }),
        _ => None,
    }
}

fn is_float(v: &Value) -> bool {
    matches!(v, Value::Float(_))
}

fn apply_unary(op: UnaryOp, v: &Value, line: u32) -> Result<Value, EvalFailure> {
    match op {
        UnaryOp::Plus => as_f64(v)
            .map(|_| v.clone())
            .ok_or_else(|| EvalError::TypeMismatch { op: "+".into(), line }.into()),
        UnaryOp::Minus => match v {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Bool(b) => Ok(Value::Int(if *b { -1 } else { 0 })),
            _ => Err(EvalError::TypeMismatch { op: "-".into(), line }.into()),
        },
        UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
        UnaryOp::Invert => as_i64(v)
            .map(|n| Value::Int(!n))
            .ok_or_else(|| EvalError::TypeMismatch { op: "~".into(), line }.into()),
    }
}

fn apply_binary(op: BinaryOp, l: &Value, r: &Value, line: u32) -> Result<Value, EvalFailure> {
    match op {
        BinaryOp::And => Ok(Value::Bool(l.truthy() && r.truthy())),
        BinaryOp::Or => Ok(Value::Bool(l.truthy() || r.truthy())),
        BinaryOp::MatMult => Err(EvalError::UnsupportedOperator { op: "@".into(), line }.into()),
        BinaryOp::LShift | BinaryOp::RShift | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd => {
            let (a, b) = match (as_i64(l), as_i64(r)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
            };
            Ok(Value::Int(match op {
                BinaryOp::LShift => a << b,
                BinaryOp::RShift => a >> b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                BinaryOp::BitAnd => a & b,
                _ => unreachable!(),
            }))
        }
        BinaryOp::Div => {
            let (a, b) = match (as_f64(l), as_f64(r)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(EvalError::TypeMismatch { op: "/".into(), line }.into()),
            };
            if b == 0.0 {
                return Err(EvalError::DivisionByZero { line }.into());
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::FloorDiv | BinaryOp::Mod => {
            if !is_float(l) && !is_float(r) {
                let (a, b) = match (as_i64(l), as_i64(r)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
                };
                if b == 0 {
                    return Err(EvalError::DivisionByZero { line }.into());
                }
                Ok(Value::Int(if op == BinaryOp::FloorDiv { floor_div(a, b) } else { floor_mod(a, b) }))
            } else {
                let (a, b) = match (as_f64(l), as_f64(r)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
                };
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero { line }.into());
                }
                Ok(Value::Float(if op == BinaryOp::FloorDiv { (a / b).floor() } else { a - (a / b).floor() * b }))
            }
        }
        BinaryOp::Pow => {
            if !is_float(l) && !is_float(r) {
                let (a, b) = match (as_i64(l), as_i64(r)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::TypeMismatch { op: "**".into(), line }.into()),
                };
                if b >= 0 {
                    Ok(Value::Int(a.pow(b as u32)))
                } else {
                    Ok(Value::Float((a as f64).powi(b as i32)))
                }
            } else {
                let (a, b) = match (as_f64(l), as_f64(r)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::TypeMismatch { op: "**".into(), line }.into()),
                };
                Ok(Value::Float(a.powf(b)))
            }
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mult => {
            if let (Value::Str(a), Value::Str(b)) = (l, r) {
                return match op {
                    BinaryOp::Add => Ok(Value::Str(format!("{a}{b}"))),
                    _ => Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
                };
            }
            if !is_float(l) && !is_float(r) {
                let (a, b) = match (as_i64(l), as_i64(r)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
                };
                Ok(Value::Int(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mult => a * b,
                    _ => unreachable!(),
                }))
            } else {
                let (a, b) = match (as_f64(l), as_f64(r)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
                };
                Ok(Value::Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mult => a * b,
                    _ => unreachable!(),
                }))
            }
        }
    }
}

/// Floor division toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Modulo whose sign matches the divisor, consistent with `floor_div`.
fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn eval_compare(first: &Expr, rest: &[(CompareOp, Expr)], ctx: &EvalCtx<'_>) -> Result<Value, EvalFailure> {
    let mut left = eval(first, ctx)?;
    for (op, rhs_expr) in rest {
        let right = eval(rhs_expr, ctx)?;
        if !compare_pair(*op, &left, &right, ctx.line)? {
            return Ok(Value::Bool(false));
        }
        left = right;
    }
    Ok(Value::Bool(true))
}

fn compare_pair(op: CompareOp, l: &Value, r: &Value, line: u32) -> Result<bool, EvalFailure> {
    match op {
        CompareOp::Is | CompareOp::IsNot | CompareOp::In | CompareOp::NotIn => {
            Err(EvalError::UnsupportedOperator { op: op.to_string(), line }.into())
        }
        CompareOp::Eq => Ok(values_equal(l, r)),
        CompareOp::NotEq => Ok(!values_equal(l, r)),
        CompareOp::Lt | CompareOp::LtE | CompareOp::Gt | CompareOp::GtE => {
            let ordering = match (l, r) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => {
                    let (a, b) = match (as_f64(l), as_f64(r)) {
                        (Some(a), Some(b)) => (a, b),
                        _ => return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into()),
                    };
                    a.partial_cmp(&b)
                }
            };
            let Some(ordering) = ordering else {
                return Err(EvalError::TypeMismatch { op: op.to_string(), line }.into());
            };
            Ok(match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::LtE => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::GtE => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::None, Value::None) => true,
        _ => match (as_f64(l), as_f64(r)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}
