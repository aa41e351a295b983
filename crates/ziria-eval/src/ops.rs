//! Dynamic operator table.
//!
//! Every operator is a family of monomorphic functions keyed by the operand
//! type tags; dispatch succeeds only when the runtime types match a family
//! member. Operands are always ground scalars here; the interpreter decides
//! what to do when they are not (residualize, fail, or guess).
//!
//! Integer arithmetic wraps at 64 bits; truncation to the operand width
//! happens only at casts.

use crate::error::{EvalError, EvalResult};
use ziria_ir::{BinOp, Ty, UnOp, Value};

fn no_instance(op: impl std::fmt::Display, operands: String) -> EvalError {
    EvalError::OpDomain {
        op: op.to_string(),
        operands,
    }
}

fn no_instance2(op: BinOp, t1: &Ty, t2: &Ty) -> EvalError {
    no_instance(format!("{:?}", op), format!("{}, {}", t1, t2))
}

/// Apply a binary operator to ground operands.
pub fn bin_op(op: BinOp, lhs: (&Value, &Ty), rhs: (&Value, &Ty)) -> EvalResult<Value> {
    let ((v1, t1), (v2, t2)) = (lhs, rhs);
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mult | BinOp::Div | BinOp::Rem | BinOp::Expon => {
            arith(op, v1, t1, v2, t2)
        }
        BinOp::ShL | BinOp::ShR => shift(op, v1, t1, v2, t2),
        BinOp::BwAnd | BinOp::BwOr | BinOp::BwXor => bitwise(op, v1, t1, v2, t2),
        BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq => {
            compare(op, v1, t1, v2, t2)
        }
        BinOp::And | BinOp::Or => match (v1, v2) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(no_instance2(op, t1, t2)),
        },
    }
}

fn same_int_width(t1: &Ty, t2: &Ty) -> bool {
    matches!((t1, t2), (Ty::Int(w1), Ty::Int(w2)) if w1 == w2)
}

fn arith(op: BinOp, v1: &Value, t1: &Ty, v2: &Value, t2: &Ty) -> EvalResult<Value> {
    match (v1, v2) {
        (Value::Int(a), Value::Int(b)) if same_int_width(t1, t2) => {
            let r = match op {
                BinOp::Add => a.wrapping_add(*b),
                BinOp::Sub => a.wrapping_sub(*b),
                BinOp::Mult => a.wrapping_mul(*b),
                BinOp::Div => {
                    if *b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.wrapping_div(*b)
                }
                BinOp::Rem => {
                    if *b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.wrapping_rem(*b)
                }
                BinOp::Expon => {
                    if *b < 0 {
                        return Err(EvalError::NegativeExponent(*b));
                    }
                    a.wrapping_pow((*b).try_into().unwrap_or(u32::MAX))
                }
                _ => unreachable!("arith called with {:?}", op),
            };
            Ok(Value::Int(r))
        }
        (Value::Double(a), Value::Double(b)) => {
            let r = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mult => a * b,
                BinOp::Div => a / b,
                BinOp::Expon => a.powf(*b),
                // No remainder family for doubles.
                BinOp::Rem => return Err(no_instance2(op, t1, t2)),
                _ => unreachable!("arith called with {:?}", op),
            };
            Ok(Value::Double(r))
        }
        _ => Err(no_instance2(op, t1, t2)),
    }
}

fn shift(op: BinOp, v1: &Value, t1: &Ty, v2: &Value, t2: &Ty) -> EvalResult<Value> {
    // The amount may have any integer width; the left operand's type is the
    // result type.
    match (v1, v2, t1, t2) {
        (Value::Int(a), Value::Int(s), Ty::Int(_), Ty::Int(_)) => {
            if *s < 0 {
                return Err(EvalError::NegativeShift(*s));
            }
            let r = if op == BinOp::ShL {
                if *s >= 64 {
                    0
                } else {
                    a << s
                }
            } else {
                // Arithmetic right shift, sign-extending.
                if *s >= 64 {
                    a >> 63
                } else {
                    a >> s
                }
            };
            Ok(Value::Int(r))
        }
        _ => Err(no_instance2(op, t1, t2)),
    }
}

fn bitwise(op: BinOp, v1: &Value, t1: &Ty, v2: &Value, t2: &Ty) -> EvalResult<Value> {
    match (v1, v2) {
        (Value::Bit(a), Value::Bit(b)) => Ok(Value::Bit(bool_bitwise(op, *a, *b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(bool_bitwise(op, *a, *b))),
        (Value::Int(a), Value::Int(b)) if same_int_width(t1, t2) => {
            let r = match op {
                BinOp::BwAnd => a & b,
                BinOp::BwOr => a | b,
                BinOp::BwXor => a ^ b,
                _ => unreachable!("bitwise called with {:?}", op),
            };
            Ok(Value::Int(r))
        }
        _ => Err(no_instance2(op, t1, t2)),
    }
}

fn bool_bitwise(op: BinOp, a: bool, b: bool) -> bool {
    match op {
        BinOp::BwAnd => a & b,
        BinOp::BwOr => a | b,
        BinOp::BwXor => a ^ b,
        _ => unreachable!("bitwise called with {:?}", op),
    }
}

fn compare(op: BinOp, v1: &Value, t1: &Ty, v2: &Value, t2: &Ty) -> EvalResult<Value> {
    use std::cmp::Ordering;
    // Doubles use IEEE comparison and go through the raw operators; every
    // other scalar type is totally ordered.
    if let (Value::Double(a), Value::Double(b)) = (v1, v2) {
        let r = match op {
            BinOp::Eq => a == b,
            BinOp::Neq => a != b,
            BinOp::Lt => a < b,
            BinOp::Gt => a > b,
            BinOp::Leq => a <= b,
            BinOp::Geq => a >= b,
            _ => unreachable!("compare called with {:?}", op),
        };
        return Ok(Value::Bool(r));
    }
    let ord = match (v1, v2) {
        (Value::Unit, Value::Unit) => Ordering::Equal,
        (Value::Bit(a), Value::Bit(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) if same_int_width(t1, t2) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => return Err(no_instance2(op, t1, t2)),
    };
    let r = match op {
        BinOp::Eq => ord == Ordering::Equal,
        BinOp::Neq => ord != Ordering::Equal,
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Gt => ord == Ordering::Greater,
        BinOp::Leq => ord != Ordering::Greater,
        BinOp::Geq => ord != Ordering::Less,
        _ => unreachable!("compare called with {:?}", op),
    };
    Ok(Value::Bool(r))
}

/// Apply a unary operator to a ground operand. `ALength` never reaches this
/// table; it has a dedicated reduction on array literals.
pub fn un_op(op: &UnOp, arg: (&Value, &Ty)) -> EvalResult<Value> {
    let (v, t) = arg;
    match op {
        UnOp::Neg => match v {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Double(d) => Ok(Value::Double(-d)),
            _ => Err(no_instance("Neg", t.to_string())),
        },
        UnOp::Not => match v {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => Err(no_instance("Not", t.to_string())),
        },
        UnOp::BwNeg => match v {
            Value::Bit(b) => Ok(Value::Bit(!b)),
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Int(n) => Ok(Value::Int(!n)),
            _ => Err(no_instance("BwNeg", t.to_string())),
        },
        UnOp::ALength => Err(EvalError::Internal(format!(
            "ALength dispatched on scalar {}",
            t
        ))),
        UnOp::Cast(target) => cast(v, t, target),
    }
}

/// The cast matrix. Pairs outside the matrix are operator-domain errors;
/// there are no implicit conversions anywhere else in the interpreter.
fn cast(v: &Value, src: &Ty, target: &Ty) -> EvalResult<Value> {
    let out = match (v, target) {
        // Strings only cast to themselves and to unit.
        (Value::Str(s), Ty::String) => Some(Value::Str(s.clone())),
        (Value::Str(_), Ty::Unit) => Some(Value::Unit),
        (Value::Str(_), _) => None,

        // Everything else casts to unit and to its display string.
        (_, Ty::Unit) => Some(Value::Unit),
        (_, Ty::String) => Some(Value::Str(v.to_string())),

        (Value::Bit(b), Ty::Bit) => Some(Value::Bit(*b)),
        (Value::Bit(b), Ty::Bool) => Some(Value::Bool(*b)),
        (Value::Bit(b), Ty::Int(_)) => Some(Value::Int(*b as i64)),

        (Value::Bool(b), Ty::Bool) => Some(Value::Bool(*b)),
        (Value::Bool(b), Ty::Bit) => Some(Value::Bit(*b)),
        (Value::Bool(b), Ty::Int(_)) => Some(Value::Int(*b as i64)),

        // Width changes truncate with sign extension; same width is the
        // identity.
        (Value::Int(n), Ty::Int(w)) => Some(Value::Int(w.trunc(*n))),
        (Value::Int(n), Ty::Double) => Some(Value::Double(*n as f64)),

        // Round half to even, then saturate at the 64-bit boundary.
        (Value::Double(d), Ty::Int(_)) => Some(Value::Int(round_ties_even(*d) as i64)),
        (Value::Double(d), Ty::Double) => Some(Value::Double(*d)),

        _ => None,
    };
    // Unit and string sources only cast to unit/string, caught above.
    match out {
        Some(value) => Ok(value),
        None => Err(no_instance(
            format!("Cast to {}", target),
            src.to_string(),
        )),
    }
}

fn round_ties_even(d: f64) -> f64 {
    let r = d.round();
    if (d - d.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - d.signum()
    } else {
        r
    }
}
