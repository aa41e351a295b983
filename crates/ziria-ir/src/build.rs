//! Construction helpers.
//!
//! These fill in result types and synthetic spans so callers (the optimizer
//! and tests) can assemble well-typed IR without spelling every node out.
//! They panic on structurally impossible requests (projecting a field from
//! a non-struct, reading an element of a non-array), which the type checker
//! rules out for elaborated input.

use crate::exp::{BinOp, Exp, ExpKind, Name, RangeKind, UnOp};
use crate::span::Span;
use crate::ty::{ArrayLen, IntWidth, Ty};
use crate::value::Value;

pub fn val(v: Value, ty: Ty) -> Exp {
    Exp::new(ExpKind::Val(v), ty, Span::synthetic())
}

pub fn unit() -> Exp {
    val(Value::Unit, Ty::Unit)
}

pub fn bit(b: bool) -> Exp {
    val(Value::Bit(b), Ty::Bit)
}

pub fn bool_(b: bool) -> Exp {
    val(Value::Bool(b), Ty::Bool)
}

pub fn int_of_width(w: IntWidth, n: i64) -> Exp {
    val(Value::Int(n), Ty::Int(w))
}

pub fn int8(n: i64) -> Exp {
    int_of_width(IntWidth::W8, n)
}

pub fn int16(n: i64) -> Exp {
    int_of_width(IntWidth::W16, n)
}

pub fn int32(n: i64) -> Exp {
    int_of_width(IntWidth::W32, n)
}

pub fn int64(n: i64) -> Exp {
    int_of_width(IntWidth::W64, n)
}

pub fn double(d: f64) -> Exp {
    val(Value::Double(d), Ty::Double)
}

pub fn string(s: impl Into<String>) -> Exp {
    val(Value::Str(s.into()), Ty::String)
}

/// A literal array; the element type is taken from the first element.
pub fn arr(elems: Vec<Exp>) -> Exp {
    let elem_ty = elems
        .first()
        .map(|e| e.ty.clone())
        .expect("array literal needs at least one element; use arr_of");
    arr_of(elem_ty, elems)
}

pub fn arr_of(elem_ty: Ty, elems: Vec<Exp>) -> Exp {
    let ty = Ty::Array(ArrayLen::Literal(elems.len()), Box::new(elem_ty));
    Exp::new(ExpKind::ValArr(elems), ty, Span::synthetic())
}

pub fn struct_(name: impl Into<String>, fields: Vec<(String, Exp)>) -> Exp {
    let field_tys = fields
        .iter()
        .map(|(f, e)| (f.clone(), e.ty.clone()))
        .collect();
    let ty = Ty::Struct(name.into(), field_tys);
    Exp::new(ExpKind::StructLit(fields), ty, Span::synthetic())
}

pub fn var(x: &Name) -> Exp {
    Exp::new(ExpKind::Var(x.clone()), x.ty.clone(), Span::synthetic())
}

pub fn bin(op: BinOp, l: Exp, r: Exp) -> Exp {
    let ty = if op.is_comparison() || matches!(op, BinOp::And | BinOp::Or) {
        Ty::Bool
    } else {
        l.ty.clone()
    };
    Exp::new(ExpKind::Bin(op, Box::new(l), Box::new(r)), ty, Span::synthetic())
}

pub fn add(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Add, l, r)
}

pub fn sub(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Sub, l, r)
}

pub fn mult(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Mult, l, r)
}

pub fn div(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Div, l, r)
}

pub fn eq(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Eq, l, r)
}

pub fn lt(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Lt, l, r)
}

pub fn geq(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Geq, l, r)
}

pub fn and(l: Exp, r: Exp) -> Exp {
    bin(BinOp::And, l, r)
}

pub fn or(l: Exp, r: Exp) -> Exp {
    bin(BinOp::Or, l, r)
}

pub fn un(op: UnOp, e: Exp) -> Exp {
    let ty = match &op {
        UnOp::Not => Ty::Bool,
        UnOp::ALength => Ty::int32(),
        UnOp::Cast(target) => target.clone(),
        UnOp::Neg | UnOp::BwNeg => e.ty.clone(),
    };
    Exp::new(ExpKind::Un(op, Box::new(e)), ty, Span::synthetic())
}

pub fn neg(e: Exp) -> Exp {
    un(UnOp::Neg, e)
}

pub fn not(e: Exp) -> Exp {
    un(UnOp::Not, e)
}

pub fn alength(e: Exp) -> Exp {
    un(UnOp::ALength, e)
}

pub fn cast(target: Ty, e: Exp) -> Exp {
    un(UnOp::Cast(target), e)
}

pub fn arr_read(arr: Exp, idx: Exp, kind: RangeKind) -> Exp {
    let elem = arr
        .ty
        .elem_ty()
        .unwrap_or_else(|| panic!("array read from non-array type {}", arr.ty))
        .clone();
    let ty = match kind {
        RangeKind::Singleton => elem,
        RangeKind::Length(n) => Ty::Array(ArrayLen::Literal(n), Box::new(elem)),
    };
    Exp::new(
        ExpKind::ArrRead {
            arr: Box::new(arr),
            idx: Box::new(idx),
            kind,
        },
        ty,
        Span::synthetic(),
    )
}

pub fn arr_write(arr: Exp, idx: Exp, kind: RangeKind, rhs: Exp) -> Exp {
    Exp::new(
        ExpKind::ArrWrite {
            arr: Box::new(arr),
            idx: Box::new(idx),
            kind,
            rhs: Box::new(rhs),
        },
        Ty::Unit,
        Span::synthetic(),
    )
}

pub fn proj(base: Exp, field: impl Into<String>) -> Exp {
    let field = field.into();
    let ty = base
        .ty
        .struct_fields()
        .and_then(|fs| fs.iter().find(|(f, _)| *f == field))
        .map(|(_, t)| t.clone())
        .unwrap_or_else(|| panic!("projection of unknown field {} from {}", field, base.ty));
    Exp::new(
        ExpKind::Proj {
            base: Box::new(base),
            field,
        },
        ty,
        Span::synthetic(),
    )
}

pub fn let_(var: Name, bound: Exp, body: Exp) -> Exp {
    let ty = body.ty.clone();
    Exp::new(
        ExpKind::Let {
            var,
            force_inline: false,
            bound: Box::new(bound),
            body: Box::new(body),
        },
        ty,
        Span::synthetic(),
    )
}

pub fn let_force_inline(var: Name, bound: Exp, body: Exp) -> Exp {
    let ty = body.ty.clone();
    Exp::new(
        ExpKind::Let {
            var,
            force_inline: true,
            bound: Box::new(bound),
            body: Box::new(body),
        },
        ty,
        Span::synthetic(),
    )
}

pub fn let_ref(var: Name, init: Exp, body: Exp) -> Exp {
    let ty = body.ty.clone();
    Exp::new(
        ExpKind::LetRef {
            var,
            init: Some(Box::new(init)),
            body: Box::new(body),
        },
        ty,
        Span::synthetic(),
    )
}

pub fn let_ref_default(var: Name, body: Exp) -> Exp {
    let ty = body.ty.clone();
    Exp::new(
        ExpKind::LetRef {
            var,
            init: None,
            body: Box::new(body),
        },
        ty,
        Span::synthetic(),
    )
}

pub fn assign(lhs: Exp, rhs: Exp) -> Exp {
    Exp::new(
        ExpKind::Assign {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        Ty::Unit,
        Span::synthetic(),
    )
}

pub fn seq(first: Exp, second: Exp) -> Exp {
    let ty = second.ty.clone();
    Exp::new(
        ExpKind::Seq(Box::new(first), Box::new(second)),
        ty,
        Span::synthetic(),
    )
}

/// Right-nested sequence of three or more steps.
pub fn seqs(mut steps: Vec<Exp>) -> Exp {
    let last = steps.pop().expect("seqs needs at least one step");
    steps.into_iter().rev().fold(last, |acc, e| seq(e, acc))
}

pub fn if_(cond: Exp, then_branch: Exp, else_branch: Exp) -> Exp {
    let ty = then_branch.ty.clone();
    Exp::new(
        ExpKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
        ty,
        Span::synthetic(),
    )
}

pub fn while_(cond: Exp, body: Exp) -> Exp {
    Exp::new(
        ExpKind::While {
            cond: Box::new(cond),
            body: Box::new(body),
        },
        Ty::Unit,
        Span::synthetic(),
    )
}

pub fn for_(var: Name, start: Exp, len: Exp, body: Exp) -> Exp {
    Exp::new(
        ExpKind::For {
            var,
            start: Box::new(start),
            len: Box::new(len),
            body: Box::new(body),
        },
        Ty::Unit,
        Span::synthetic(),
    )
}

pub fn call(func: &Name, args: Vec<Exp>) -> Exp {
    let ty = match &func.ty {
        Ty::Arrow(_, res) => (**res).clone(),
        other => panic!("call of non-function type {}", other),
    };
    Exp::new(
        ExpKind::Call {
            func: func.clone(),
            args,
        },
        ty,
        Span::synthetic(),
    )
}

pub fn print(arg: Exp) -> Exp {
    Exp::new(
        ExpKind::Print {
            newline: false,
            arg: Box::new(arg),
        },
        Ty::Unit,
        Span::synthetic(),
    )
}

pub fn println(arg: Exp) -> Exp {
    Exp::new(
        ExpKind::Print {
            newline: true,
            arg: Box::new(arg),
        },
        Ty::Unit,
        Span::synthetic(),
    )
}

pub fn error(msg: impl Into<String>, ty: Ty) -> Exp {
    Exp::new(ExpKind::Error(msg.into()), ty, Span::synthetic())
}

pub fn lut(e: Exp) -> Exp {
    let ty = e.ty.clone();
    Exp::new(ExpKind::Lut(Box::new(e)), ty, Span::synthetic())
}
