//! Typed expressions.

use crate::span::Span;
use crate::ty::Ty;
use crate::value::Value;

/// Unique identifier assigned to every binder by the type checker.
///
/// The heap and substitution key on this, never on the source name, so
/// shadowing never merges scopes.
pub type UniqId = u64;

/// A typed variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Unique identifier.
    pub uniq: UniqId,
    /// Source name, for diagnostics.
    pub name: String,
    /// The variable's type.
    pub ty: Ty,
}

impl Name {
    pub fn new(uniq: UniqId, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            uniq,
            name: name.into(),
            ty,
        }
    }
}

/// Fresh unique-name generator, shared with the type checker.
#[derive(Debug, Clone, Default)]
pub struct UniqGen {
    next: UniqId,
}

impl UniqGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh unique id.
    pub fn next_id(&mut self) -> UniqId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Allocate a fresh name.
    pub fn fresh(&mut self, name: impl Into<String>, ty: Ty) -> Name {
        Name::new(self.next_id(), name, ty)
    }
}

/// Unary operators. `Cast` carries its target type; the source type is the
/// operand's type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Logical negation on `bool`.
    Not,
    /// Bitwise complement.
    BwNeg,
    /// Array length.
    ALength,
    /// Explicit conversion to the carried type.
    Cast(Ty),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    Rem,
    Expon,
    ShL,
    ShR,
    BwAnd,
    BwOr,
    BwXor,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    And,
    Or,
}

impl BinOp {
    /// Is this one of the six comparison operators?
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq
        )
    }

    /// The comparison whose truth is the negation of this one.
    pub fn negated(self) -> Option<BinOp> {
        match self {
            BinOp::Eq => Some(BinOp::Neq),
            BinOp::Neq => Some(BinOp::Eq),
            BinOp::Lt => Some(BinOp::Geq),
            BinOp::Geq => Some(BinOp::Lt),
            BinOp::Gt => Some(BinOp::Leq),
            BinOp::Leq => Some(BinOp::Gt),
            _ => None,
        }
    }

    /// The comparison with its operands swapped (`k < e` is `e > k`).
    pub fn flipped(self) -> Option<BinOp> {
        match self {
            BinOp::Eq => Some(BinOp::Eq),
            BinOp::Neq => Some(BinOp::Neq),
            BinOp::Lt => Some(BinOp::Gt),
            BinOp::Gt => Some(BinOp::Lt),
            BinOp::Leq => Some(BinOp::Geq),
            BinOp::Geq => Some(BinOp::Leq),
            _ => None,
        }
    }
}

/// Distinguishes an element access from a slice access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    /// A single element.
    Singleton,
    /// A slice of the given static length.
    Length(usize),
}

/// A typed expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exp {
    pub kind: ExpKind,
    /// The node's type, assigned by the type checker.
    pub ty: Ty,
    pub span: Span,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpKind {
    /// A literal scalar.
    Val(Value),
    /// A literal array; elements are expressions so partly-reduced arrays
    /// can hold residual elements.
    ValArr(Vec<Exp>),
    /// A record literal, field order preserved.
    StructLit(Vec<(String, Exp)>),
    /// A variable reference.
    Var(Name),
    Un(UnOp, Box<Exp>),
    Bin(BinOp, Box<Exp>, Box<Exp>),
    /// Element or slice read.
    ArrRead {
        arr: Box<Exp>,
        idx: Box<Exp>,
        kind: RangeKind,
    },
    /// Element or slice write; interpreted as an assignment through the
    /// corresponding read path.
    ArrWrite {
        arr: Box<Exp>,
        idx: Box<Exp>,
        kind: RangeKind,
        rhs: Box<Exp>,
    },
    /// Record field projection.
    Proj { base: Box<Exp>, field: String },
    /// Immutable binding. With `force_inline`, the initializer is
    /// substituted textually into the body instead of being evaluated once.
    Let {
        var: Name,
        force_inline: bool,
        bound: Box<Exp>,
        body: Box<Exp>,
    },
    /// Mutable binding; a missing initializer means the type's default.
    LetRef {
        var: Name,
        init: Option<Box<Exp>>,
        body: Box<Exp>,
    },
    /// Assignment through a deref path (`Var`, `ArrRead` or `Proj` chain).
    Assign { lhs: Box<Exp>, rhs: Box<Exp> },
    Seq(Box<Exp>, Box<Exp>),
    If {
        cond: Box<Exp>,
        then_branch: Box<Exp>,
        else_branch: Box<Exp>,
    },
    While { cond: Box<Exp>, body: Box<Exp> },
    /// Counted loop: `var` ranges over `start .. start + len`.
    For {
        var: Name,
        start: Box<Exp>,
        len: Box<Exp>,
        body: Box<Exp>,
    },
    /// A call to a function the interpreter treats as opaque.
    Call { func: Name, args: Vec<Exp> },
    Print { newline: bool, arg: Box<Exp> },
    /// User-level failure with a message.
    Error(String),
    /// Lookup-table annotation; transparent to evaluation.
    Lut(Box<Exp>),
    /// Bit permutation; not supported by the interpreter.
    BPerm(Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn new(kind: ExpKind, ty: Ty, span: Span) -> Self {
        Self { kind, ty, span }
    }

    /// Is this expression a fully reduced normal form: a `Val`, a `ValArr`
    /// of normal forms, or a `StructLit` of normal forms?
    pub fn is_ground(&self) -> bool {
        match &self.kind {
            ExpKind::Val(_) => true,
            ExpKind::ValArr(elems) => elems.iter().all(Exp::is_ground),
            ExpKind::StructLit(fields) => fields.iter().all(|(_, e)| e.is_ground()),
            _ => false,
        }
    }

    /// Get the scalar value, if this is a literal.
    pub fn as_value(&self) -> Option<&Value> {
        match &self.kind {
            ExpKind::Val(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_int)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    /// First integer-typed variable reference in evaluation order, if any.
    pub fn first_int_var(&self) -> Option<&Name> {
        match &self.kind {
            ExpKind::Val(_) | ExpKind::Error(_) => None,
            ExpKind::Var(x) => {
                if x.ty.is_int() {
                    Some(x)
                } else {
                    None
                }
            }
            ExpKind::ValArr(elems) => elems.iter().find_map(Exp::first_int_var),
            ExpKind::StructLit(fields) => fields.iter().find_map(|(_, e)| e.first_int_var()),
            ExpKind::Un(_, e) | ExpKind::Lut(e) | ExpKind::Print { arg: e, .. } => {
                e.first_int_var()
            }
            ExpKind::Bin(_, l, r)
            | ExpKind::Seq(l, r)
            | ExpKind::BPerm(l, r)
            | ExpKind::Assign { lhs: l, rhs: r } => {
                l.first_int_var().or_else(|| r.first_int_var())
            }
            ExpKind::ArrRead { arr, idx, .. } => {
                arr.first_int_var().or_else(|| idx.first_int_var())
            }
            ExpKind::ArrWrite { arr, idx, rhs, .. } => arr
                .first_int_var()
                .or_else(|| idx.first_int_var())
                .or_else(|| rhs.first_int_var()),
            ExpKind::Proj { base, .. } => base.first_int_var(),
            ExpKind::Let { bound, body, .. } => {
                bound.first_int_var().or_else(|| body.first_int_var())
            }
            ExpKind::LetRef { init, body, .. } => init
                .as_deref()
                .and_then(Exp::first_int_var)
                .or_else(|| body.first_int_var()),
            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => cond
                .first_int_var()
                .or_else(|| then_branch.first_int_var())
                .or_else(|| else_branch.first_int_var()),
            ExpKind::While { cond, body } => {
                cond.first_int_var().or_else(|| body.first_int_var())
            }
            ExpKind::For {
                start, len, body, ..
            } => start
                .first_int_var()
                .or_else(|| len.first_int_var())
                .or_else(|| body.first_int_var()),
            ExpKind::Call { args, .. } => args.iter().find_map(Exp::first_int_var),
        }
    }

    /// Copy with every span replaced by the synthetic span. Two expressions
    /// that differ only in source positions become equal, which is how the
    /// guess maps memoize structurally equal subterms.
    pub fn strip_spans(&self) -> Exp {
        let kind = match &self.kind {
            ExpKind::Val(v) => ExpKind::Val(v.clone()),
            ExpKind::ValArr(elems) => {
                ExpKind::ValArr(elems.iter().map(Exp::strip_spans).collect())
            }
            ExpKind::StructLit(fields) => ExpKind::StructLit(
                fields
                    .iter()
                    .map(|(f, e)| (f.clone(), e.strip_spans()))
                    .collect(),
            ),
            ExpKind::Var(x) => ExpKind::Var(x.clone()),
            ExpKind::Un(op, e) => ExpKind::Un(op.clone(), Box::new(e.strip_spans())),
            ExpKind::Bin(op, l, r) => {
                ExpKind::Bin(*op, Box::new(l.strip_spans()), Box::new(r.strip_spans()))
            }
            ExpKind::ArrRead { arr, idx, kind } => ExpKind::ArrRead {
                arr: Box::new(arr.strip_spans()),
                idx: Box::new(idx.strip_spans()),
                kind: *kind,
            },
            ExpKind::ArrWrite {
                arr,
                idx,
                kind,
                rhs,
            } => ExpKind::ArrWrite {
                arr: Box::new(arr.strip_spans()),
                idx: Box::new(idx.strip_spans()),
                kind: *kind,
                rhs: Box::new(rhs.strip_spans()),
            },
            ExpKind::Proj { base, field } => ExpKind::Proj {
                base: Box::new(base.strip_spans()),
                field: field.clone(),
            },
            ExpKind::Let {
                var,
                force_inline,
                bound,
                body,
            } => ExpKind::Let {
                var: var.clone(),
                force_inline: *force_inline,
                bound: Box::new(bound.strip_spans()),
                body: Box::new(body.strip_spans()),
            },
            ExpKind::LetRef { var, init, body } => ExpKind::LetRef {
                var: var.clone(),
                init: init.as_ref().map(|e| Box::new(e.strip_spans())),
                body: Box::new(body.strip_spans()),
            },
            ExpKind::Assign { lhs, rhs } => ExpKind::Assign {
                lhs: Box::new(lhs.strip_spans()),
                rhs: Box::new(rhs.strip_spans()),
            },
            ExpKind::Seq(l, r) => {
                ExpKind::Seq(Box::new(l.strip_spans()), Box::new(r.strip_spans()))
            }
            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExpKind::If {
                cond: Box::new(cond.strip_spans()),
                then_branch: Box::new(then_branch.strip_spans()),
                else_branch: Box::new(else_branch.strip_spans()),
            },
            ExpKind::While { cond, body } => ExpKind::While {
                cond: Box::new(cond.strip_spans()),
                body: Box::new(body.strip_spans()),
            },
            ExpKind::For {
                var,
                start,
                len,
                body,
            } => ExpKind::For {
                var: var.clone(),
                start: Box::new(start.strip_spans()),
                len: Box::new(len.strip_spans()),
                body: Box::new(body.strip_spans()),
            },
            ExpKind::Call { func, args } => ExpKind::Call {
                func: func.clone(),
                args: args.iter().map(Exp::strip_spans).collect(),
            },
            ExpKind::Print { newline, arg } => ExpKind::Print {
                newline: *newline,
                arg: Box::new(arg.strip_spans()),
            },
            ExpKind::Error(msg) => ExpKind::Error(msg.clone()),
            ExpKind::Lut(e) => ExpKind::Lut(Box::new(e.strip_spans())),
            ExpKind::BPerm(l, r) => {
                ExpKind::BPerm(Box::new(l.strip_spans()), Box::new(r.strip_spans()))
            }
        };
        Exp::new(kind, self.ty.clone(), Span::synthetic())
    }

    /// Substitute `replacement` for free occurrences of the variable with
    /// the given unique id. Binders are unique, so capture cannot occur; a
    /// binder reusing the id nonetheless stops the substitution under it.
    pub fn substitute(&self, target: UniqId, replacement: &Exp) -> Exp {
        let sub = |e: &Exp| Box::new(e.substitute(target, replacement));
        let kind = match &self.kind {
            ExpKind::Var(x) if x.uniq == target => return replacement.clone(),
            ExpKind::Var(x) => ExpKind::Var(x.clone()),
            ExpKind::Val(v) => ExpKind::Val(v.clone()),
            ExpKind::ValArr(elems) => ExpKind::ValArr(
                elems.iter().map(|e| e.substitute(target, replacement)).collect(),
            ),
            ExpKind::StructLit(fields) => ExpKind::StructLit(
                fields
                    .iter()
                    .map(|(f, e)| (f.clone(), e.substitute(target, replacement)))
                    .collect(),
            ),
            ExpKind::Un(op, e) => ExpKind::Un(op.clone(), sub(e)),
            ExpKind::Bin(op, l, r) => ExpKind::Bin(*op, sub(l), sub(r)),
            ExpKind::ArrRead { arr, idx, kind } => ExpKind::ArrRead {
                arr: sub(arr),
                idx: sub(idx),
                kind: *kind,
            },
            ExpKind::ArrWrite {
                arr,
                idx,
                kind,
                rhs,
            } => ExpKind::ArrWrite {
                arr: sub(arr),
                idx: sub(idx),
                kind: *kind,
                rhs: sub(rhs),
            },
            ExpKind::Proj { base, field } => ExpKind::Proj {
                base: sub(base),
                field: field.clone(),
            },
            ExpKind::Let {
                var,
                force_inline,
                bound,
                body,
            } => ExpKind::Let {
                var: var.clone(),
                force_inline: *force_inline,
                bound: sub(bound),
                body: if var.uniq == target {
                    Box::new((**body).clone())
                } else {
                    sub(body)
                },
            },
            ExpKind::LetRef { var, init, body } => ExpKind::LetRef {
                var: var.clone(),
                init: init.as_ref().map(|e| sub(e)),
                body: if var.uniq == target {
                    Box::new((**body).clone())
                } else {
                    sub(body)
                },
            },
            ExpKind::Assign { lhs, rhs } => ExpKind::Assign {
                lhs: sub(lhs),
                rhs: sub(rhs),
            },
            ExpKind::Seq(l, r) => ExpKind::Seq(sub(l), sub(r)),
            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExpKind::If {
                cond: sub(cond),
                then_branch: sub(then_branch),
                else_branch: sub(else_branch),
            },
            ExpKind::While { cond, body } => ExpKind::While {
                cond: sub(cond),
                body: sub(body),
            },
            ExpKind::For {
                var,
                start,
                len,
                body,
            } => ExpKind::For {
                var: var.clone(),
                start: sub(start),
                len: sub(len),
                body: if var.uniq == target {
                    Box::new((**body).clone())
                } else {
                    sub(body)
                },
            },
            ExpKind::Call { func, args } => ExpKind::Call {
                func: func.clone(),
                args: args
                    .iter()
                    .map(|e| e.substitute(target, replacement))
                    .collect(),
            },
            ExpKind::Print { newline, arg } => ExpKind::Print {
                newline: *newline,
                arg: sub(arg),
            },
            ExpKind::Error(msg) => ExpKind::Error(msg.clone()),
            ExpKind::Lut(e) => ExpKind::Lut(sub(e)),
            ExpKind::BPerm(l, r) => ExpKind::BPerm(sub(l), sub(r)),
        };
        Exp::new(kind, self.ty.clone(), self.span)
    }
}
