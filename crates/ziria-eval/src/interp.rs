//! Interpreter core: one traversal serving three evaluation modes.
//!
//! Partial mode reduces under an open environment and returns residual
//! terms where reduction cannot proceed. Full mode demands a ground normal
//! form and fails on any free variable. Approximation mode explores
//! multiple plausible reductions, guessing the outcomes of non-ground
//! subterms and tracking the assumptions per branch.
//!
//! Branching is replay-based: a run follows a recorded prefix of guess
//! choices and enqueues the alternatives it passes by, so every branch owns
//! an independent heap, guess maps, and print buffer without forking state
//! mid-recursion.

use crate::domain::{Guesses, IntDomain};
use crate::error::{EvalError, EvalFailure, EvalResult};
use crate::heap::Heap;
use crate::ops;
use crate::tycheck::TypeChecker;
use tracing::{debug, trace};
use ziria_ir::{
    build, pretty_print_exp, ArrayLen, BinOp, Exp, ExpKind, Name, RangeKind, Span, Ty, UnOp,
    UniqGen, Value,
};

/// How far reduction is pushed and what happens when it gets stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Reduce as far as possible; leave residual terms.
    Partial,
    /// Demand a ground normal form; fail on free variables.
    Full,
    /// Guess the outcomes of non-ground subterms, one branch per guess.
    Approx,
}

/// Result of a top-level evaluation: the reduced expression and the output
/// printed along the way.
pub type EvalOutcome = Result<(Exp, String), EvalFailure>;

/// Evaluation state for one branch.
pub struct EvalCtx {
    mode: EvalMode,
    heap: Heap,
    guesses: Guesses,
    prints: String,
    /// Choices taken so far in this run.
    choices: Vec<u8>,
    /// Choices this run must replay before picking fresh ones.
    prefix: Vec<u8>,
    /// Alternative prefixes discovered at fresh choice points.
    pending: Vec<Vec<u8>>,
}

impl EvalCtx {
    /// A fresh context for one evaluation under the given mode, seeded with
    /// the caller's bindings.
    pub fn new(mode: EvalMode, heap: Heap) -> Self {
        Self {
            mode,
            heap,
            guesses: Guesses::default(),
            prints: String::new(),
            choices: Vec::new(),
            prefix: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn with_prefix(heap: Heap, prefix: Vec<u8>) -> Self {
        let mut ctx = Self::new(EvalMode::Approx, heap);
        ctx.prefix = prefix;
        ctx
    }

    /// Pick one of `n` alternatives at a nondeterministic point. Replays
    /// the recorded prefix, then picks the first alternative and enqueues
    /// the rest for later runs. Zero alternatives prune the branch.
    fn choose(&mut self, n: usize) -> EvalResult<usize> {
        if n == 0 {
            return Err(EvalError::DeadBranch);
        }
        let pos = self.choices.len();
        let pick = if pos < self.prefix.len() {
            let pick = self.prefix[pos] as usize;
            if pick >= n {
                return Err(EvalError::Internal(
                    "branch replay diverged from its recording".to_string(),
                ));
            }
            pick
        } else {
            for alt in 1..n {
                let mut alternative = self.choices.clone();
                alternative.push(alt as u8);
                self.pending.push(alternative);
            }
            0
        };
        self.choices.push(pick as u8);
        Ok(pick)
    }

    // === Reduction ===

    /// Reduce an expression under the current mode.
    pub fn interpret(&mut self, exp: &Exp) -> EvalResult<Exp> {
        match &exp.kind {
            ExpKind::Val(_) => Ok(exp.clone()),

            ExpKind::ValArr(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| self.interpret(e))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Exp::new(ExpKind::ValArr(elems), exp.ty.clone(), exp.span))
            }

            ExpKind::StructLit(fields) => {
                let fields = fields
                    .iter()
                    .map(|(f, e)| Ok((f.clone(), self.interpret(e)?)))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Exp::new(ExpKind::StructLit(fields), exp.ty.clone(), exp.span))
            }

            ExpKind::Var(x) => self.read_var(x, exp),

            ExpKind::Un(op, operand) => self.reduce_un(exp, op, operand),

            ExpKind::Bin(op, l, r) => self.reduce_bin(exp, *op, l, r),

            ExpKind::ArrRead { arr, idx, kind } => {
                let arr_v = self.interpret(arr)?;
                let idx_v = self.interpret(idx)?;
                if let (ExpKind::ValArr(elems), Some(i)) = (&arr_v.kind, idx_v.as_int()) {
                    match kind {
                        RangeKind::Singleton => Ok(split_array_at(i, elems)?.clone()),
                        RangeKind::Length(n) => {
                            let slice = slice_array_at(i, *n, elems)?;
                            Ok(Exp::new(
                                ExpKind::ValArr(slice.to_vec()),
                                exp.ty.clone(),
                                exp.span,
                            ))
                        }
                    }
                } else {
                    let residual = Exp::new(
                        ExpKind::ArrRead {
                            arr: Box::new(arr_v),
                            idx: Box::new(idx_v),
                            kind: *kind,
                        },
                        exp.ty.clone(),
                        exp.span,
                    );
                    self.stuck(residual, EvalError::FreeVariables)
                }
            }

            ExpKind::ArrWrite {
                arr,
                idx,
                kind,
                rhs,
            } => {
                // An array write is an assignment through the read path.
                let elem_ty = arr.ty.elem_ty().cloned().unwrap_or(Ty::Unit);
                let lhs_ty = match kind {
                    RangeKind::Singleton => elem_ty,
                    RangeKind::Length(n) => Ty::Array(ArrayLen::Literal(*n), Box::new(elem_ty)),
                };
                let lhs = Exp::new(
                    ExpKind::ArrRead {
                        arr: arr.clone(),
                        idx: idx.clone(),
                        kind: *kind,
                    },
                    lhs_ty,
                    exp.span,
                );
                let rhs_v = self.interpret(rhs)?;
                self.exec_assign(&lhs, rhs_v)?;
                Ok(unit_val(exp.span))
            }

            ExpKind::Proj { base, field } => {
                let base_v = self.interpret(base)?;
                if let ExpKind::StructLit(fields) = &base_v.kind {
                    Ok(find_field(&base_v.ty, fields, field)?.clone())
                } else {
                    let residual = Exp::new(
                        ExpKind::Proj {
                            base: Box::new(base_v),
                            field: field.clone(),
                        },
                        exp.ty.clone(),
                        exp.span,
                    );
                    self.stuck(residual, EvalError::FreeVariables)
                }
            }

            ExpKind::Let {
                var,
                force_inline,
                bound,
                body,
            } => {
                if *force_inline {
                    // Substitute the unreduced initializer: its effects
                    // happen at every use site, as written.
                    let inlined = body.substitute(var.uniq, bound);
                    return self.interpret(&inlined);
                }
                let bound_v = self.interpret(bound)?;
                if bound_v.is_ground() {
                    let saved = self.heap.bind(var, bound_v);
                    let body_v = self.interpret(body);
                    self.heap.unbind(var, saved);
                    body_v
                } else {
                    self.keep_let(exp, var, *force_inline, bound_v, body)
                }
            }

            ExpKind::LetRef { var, init, body } => {
                let init_v = match init {
                    Some(init) => self.interpret(init)?,
                    None => initial_value(&var.ty, exp.span)?,
                };
                if init_v.is_ground() {
                    let saved = self.heap.bind(var, init_v);
                    let body_v = self.interpret(body);
                    self.heap.unbind(var, saved);
                    body_v
                } else {
                    // The reference cannot be tracked; keep the binder and
                    // leave the body untouched rather than lose its writes.
                    debug_assert!(self.mode != EvalMode::Full);
                    Ok(Exp::new(
                        ExpKind::LetRef {
                            var: var.clone(),
                            init: Some(Box::new(init_v)),
                            body: body.clone(),
                        },
                        exp.ty.clone(),
                        exp.span,
                    ))
                }
            }

            ExpKind::Assign { lhs, rhs } => {
                let rhs_v = self.interpret(rhs)?;
                self.exec_assign(lhs, rhs_v)?;
                Ok(unit_val(exp.span))
            }

            ExpKind::Seq(first, second) => {
                self.interpret(first)?;
                self.interpret(second)
            }

            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.interpret(cond)?;
                if self.demand_cond(c)? {
                    self.interpret(then_branch)
                } else {
                    self.interpret(else_branch)
                }
            }

            ExpKind::While { cond, body } => {
                loop {
                    let c = self.interpret(cond)?;
                    if !self.demand_cond(c)? {
                        return Ok(unit_val(exp.span));
                    }
                    self.interpret(body)?;
                }
            }

            ExpKind::For {
                var,
                start,
                len,
                body,
            } => {
                let start_v = self.interpret(start)?;
                let start_n = self.demand_count(start_v)?;
                let len_v = self.interpret(len)?;
                let len_n = self.demand_count(len_v)?;
                // A negative length means zero iterations.
                for off in 0..len_n.max(0) {
                    let i = start_n.wrapping_add(off);
                    let saved = self
                        .heap
                        .bind(var, build::val(Value::Int(i), var.ty.clone()));
                    let body_r = self.interpret(body);
                    self.heap.unbind(var, saved);
                    body_r?;
                }
                Ok(unit_val(exp.span))
            }

            ExpKind::Call { func, args } => {
                if self.mode == EvalMode::Full {
                    return Err(EvalError::Unsupported("function call"));
                }
                // Opaque to the interpreter: reduce the arguments and keep
                // the call residual so its effects are never dropped.
                let args = args
                    .iter()
                    .map(|a| self.interpret(a))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Exp::new(
                    ExpKind::Call {
                        func: func.clone(),
                        args,
                    },
                    exp.ty.clone(),
                    exp.span,
                ))
            }

            ExpKind::Print { newline, arg } => {
                let arg_v = self.interpret(arg)?;
                self.prints.push_str(&pretty_print_exp(&arg_v));
                if *newline {
                    self.prints.push('\n');
                }
                Ok(unit_val(exp.span))
            }

            ExpKind::Error(msg) => Err(EvalError::User(msg.clone())),

            ExpKind::Lut(inner) => self.interpret(inner),

            ExpKind::BPerm(_, _) => Err(EvalError::Unsupported("bit permutation")),
        }
    }

    fn read_var(&mut self, x: &Name, exp: &Exp) -> EvalResult<Exp> {
        if let Some(v) = self.heap.read(x) {
            return Ok(v.clone());
        }
        match self.mode {
            EvalMode::Partial => Ok(exp.clone()),
            EvalMode::Full => Err(EvalError::FreeVariables),
            EvalMode::Approx => {
                // Boolean variables guess eagerly (memoized, so every read
                // agrees within a branch). Integer variables stay residual:
                // a comparison further up refines their domain far more
                // precisely than sampling would, and a read collapses to a
                // value once the domain is a single point.
                if x.ty == Ty::Bool {
                    return self.guess_bool(exp);
                }
                if x.ty.is_int() {
                    let key = exp.strip_spans();
                    if let Some(n) = self.guesses.int_domain(&key).as_singleton() {
                        return Ok(build::val(Value::Int(n), x.ty.clone()));
                    }
                }
                Ok(exp.clone())
            }
        }
    }

    fn reduce_un(&mut self, exp: &Exp, op: &UnOp, operand: &Exp) -> EvalResult<Exp> {
        let v = self.interpret(operand)?;
        if *op == UnOp::ALength {
            // Dedicated reduction: the length of any array literal is
            // known, ground elements or not.
            if let ExpKind::ValArr(elems) = &v.kind {
                return Ok(build::val(Value::Int(elems.len() as i64), exp.ty.clone()));
            }
        } else if let ExpKind::Val(scalar) = &v.kind {
            let out = ops::un_op(op, (scalar, &v.ty))?;
            return Ok(Exp::new(ExpKind::Val(out), exp.ty.clone(), exp.span));
        } else if v.is_ground() {
            // Ground but not scalar: no operator family applies.
            return Err(EvalError::OpDomain {
                op: format!("{:?}", op),
                operands: v.ty.to_string(),
            });
        }
        let residual = Exp::new(
            ExpKind::Un(op.clone(), Box::new(v)),
            exp.ty.clone(),
            exp.span,
        );
        self.stuck(residual, EvalError::FreeVariables)
    }

    fn reduce_bin(&mut self, exp: &Exp, op: BinOp, l: &Exp, r: &Exp) -> EvalResult<Exp> {
        let lv = self.interpret(l)?;
        let rv = self.interpret(r)?;
        if let (ExpKind::Val(a), ExpKind::Val(b)) = (&lv.kind, &rv.kind) {
            let out = ops::bin_op(op, (a, &lv.ty), (b, &rv.ty))?;
            return Ok(Exp::new(ExpKind::Val(out), exp.ty.clone(), exp.span));
        }
        if lv.is_ground() && rv.is_ground() {
            // Ground arrays or structs: no operator family applies.
            return Err(EvalError::OpDomain {
                op: format!("{:?}", op),
                operands: format!("{}, {}", lv.ty, rv.ty),
            });
        }
        let residual = Exp::new(
            ExpKind::Bin(op, Box::new(lv), Box::new(rv)),
            exp.ty.clone(),
            exp.span,
        );
        self.stuck(residual, EvalError::FreeVariables)
    }

    /// A non-ground let binding is kept, not substituted: duplicating or
    /// dropping the initializer's residual effects would change behavior.
    /// The body still reduces, with the variable left free.
    fn keep_let(
        &mut self,
        exp: &Exp,
        var: &Name,
        force_inline: bool,
        bound_v: Exp,
        body: &Exp,
    ) -> EvalResult<Exp> {
        debug_assert!(self.mode != EvalMode::Full);
        let body_v = self.interpret(body)?;
        Ok(Exp::new(
            ExpKind::Let {
                var: var.clone(),
                force_inline,
                bound: Box::new(bound_v),
                body: Box::new(body_v),
            },
            exp.ty.clone(),
            exp.span,
        ))
    }

    /// Mode-dependent handling of an expression that cannot reduce:
    /// residualize, fail, or hand it to the guesser.
    fn stuck(&mut self, residual: Exp, full_err: EvalError) -> EvalResult<Exp> {
        match self.mode {
            EvalMode::Partial => Ok(residual),
            EvalMode::Full => Err(full_err),
            EvalMode::Approx => self.guess(&residual),
        }
    }

    /// A control-flow condition must be a ground boolean; the approximation
    /// mode may guess it.
    fn demand_cond(&mut self, cond: Exp) -> EvalResult<bool> {
        if let Some(b) = cond.as_bool() {
            return Ok(b);
        }
        if self.mode == EvalMode::Approx {
            let grounded = self.demand_ground(cond)?;
            if let Some(b) = grounded.as_bool() {
                return Ok(b);
            }
        }
        Err(EvalError::ControlFlowNotGround)
    }

    /// A loop bound must be a ground integer; the approximation mode may
    /// guess it.
    fn demand_count(&mut self, bound: Exp) -> EvalResult<i64> {
        if let Some(n) = bound.as_int() {
            return Ok(n);
        }
        if self.mode == EvalMode::Approx {
            let grounded = self.demand_ground(bound)?;
            if let Some(n) = grounded.as_int() {
                return Ok(n);
            }
        }
        Err(EvalError::ControlFlowNotGround)
    }

    // === Assignment through a deref path ===

    fn exec_assign(&mut self, lhs: &Exp, rhs: Exp) -> EvalResult<()> {
        let (root, steps) = self.resolve_path(lhs)?;
        let cur = match self.heap.read(&root) {
            Some(v) => v.clone(),
            None => {
                return Err(EvalError::NotInScope {
                    name: root.name.clone(),
                })
            }
        };
        let updated = update_along(&cur, &steps, rhs)?;
        self.heap.write(&root, updated)
    }

    /// Walk the deref path down to its root variable, reducing every index
    /// along the way. Indices must come out ground.
    fn resolve_path(&mut self, lhs: &Exp) -> EvalResult<(Name, Vec<PathStep>)> {
        match &lhs.kind {
            ExpKind::Var(x) => Ok((x.clone(), Vec::new())),
            ExpKind::ArrRead { arr, idx, kind } => {
                let (root, mut steps) = self.resolve_path(arr)?;
                let idx_v = self.interpret(idx)?;
                let i = idx_v.as_int().ok_or(EvalError::PartialAssignment)?;
                steps.push(match kind {
                    RangeKind::Singleton => PathStep::Elem(i),
                    RangeKind::Length(n) => PathStep::Slice(i, *n),
                });
                Ok((root, steps))
            }
            ExpKind::Proj { base, field } => {
                let (root, mut steps) = self.resolve_path(base)?;
                steps.push(PathStep::Field(field.clone()));
                Ok((root, steps))
            }
            _ => Err(EvalError::Internal(
                "malformed assignment path".to_string(),
            )),
        }
    }

    // === Guessing (approximation mode) ===

    /// Guess the outcome of a non-ground term. Comparisons against a ground
    /// integer literal branch on the operand's domain; other boolean terms
    /// get a memoized two-way guess; integer terms are resolved by fixing
    /// the value of a free integer variable and re-reducing. Anything else
    /// stays residual.
    fn guess(&mut self, exp: &Exp) -> EvalResult<Exp> {
        if let ExpKind::Bin(op, l, r) = &exp.kind {
            if op.is_comparison() {
                let candidate = match (l.as_int(), r.as_int()) {
                    (None, Some(k)) if l.ty.is_int() && !l.is_ground() => Some((&**l, *op, k)),
                    (Some(k), None) if r.ty.is_int() && !r.is_ground() => {
                        op.flipped().map(|flipped| (&**r, flipped, k))
                    }
                    _ => None,
                };
                if let Some((term, cmp, k)) = candidate {
                    let term = term.clone();
                    return self.guess_comparison(exp, &term, cmp, k);
                }
            }
        }
        if exp.ty == Ty::Bool {
            return self.guess_bool(exp);
        }
        if exp.ty.is_int() {
            if matches!(exp.kind, ExpKind::Var(_)) {
                return self.guess_int_value(exp);
            }
            if let Some(x) = exp.first_int_var() {
                let var_exp = build::var(&x.clone());
                self.guess_int_value(&var_exp)?;
                // The variable now reads back its guessed value.
                return self.interpret(exp);
            }
            return self.guess_int_value(exp);
        }
        Ok(exp.clone())
    }

    /// Branch on the truth of `term ⊙ k`, narrowing `term`'s domain with
    /// the guessed outcome. A branch whose narrowed domain is empty is
    /// pruned before it starts.
    fn guess_comparison(
        &mut self,
        whole: &Exp,
        term: &Exp,
        op: BinOp,
        k: i64,
    ) -> EvalResult<Exp> {
        let key = term.strip_spans();
        let dom = self.guesses.int_domain(&key);
        let negated = op
            .negated()
            .ok_or_else(|| EvalError::Internal("comparison without a negation".to_string()))?;
        let mut options = Vec::new();
        for (outcome, constraint) in [(true, op), (false, negated)] {
            if let Some(region) = IntDomain::from_comparison(constraint, k) {
                let narrowed = dom.intersect(&region);
                if !narrowed.is_empty() {
                    options.push((outcome, narrowed));
                }
            }
        }
        let pick = self.choose(options.len())?;
        let (outcome, narrowed) = options.swap_remove(pick);
        trace!(
            term = %pretty_print_exp(term),
            op = ?op,
            k,
            outcome,
            "guessed comparison"
        );
        self.guesses.ints.insert(key, narrowed);
        Ok(Exp::new(
            ExpKind::Val(Value::Bool(outcome)),
            Ty::Bool,
            whole.span,
        ))
    }

    /// Two-way guess on a boolean term, memoized on its span-stripped form
    /// so every occurrence resolves the same way within a branch.
    fn guess_bool(&mut self, exp: &Exp) -> EvalResult<Exp> {
        let key = exp.strip_spans();
        if let Some(b) = self.guesses.bools.get(&key) {
            return Ok(Exp::new(ExpKind::Val(Value::Bool(*b)), Ty::Bool, exp.span));
        }
        let pick = self.choose(2)?;
        let outcome = pick == 0;
        trace!(term = %pretty_print_exp(exp), outcome, "guessed boolean");
        self.guesses.bools.insert(key, outcome);
        Ok(Exp::new(
            ExpKind::Val(Value::Bool(outcome)),
            Ty::Bool,
            exp.span,
        ))
    }

    /// Fix an integer term to a concrete value sampled from its domain,
    /// collapsing the domain to that value for the rest of the branch.
    fn guess_int_value(&mut self, exp: &Exp) -> EvalResult<Exp> {
        let key = exp.strip_spans();
        let dom = self.guesses.int_domain(&key);
        let samples = dom.representatives();
        let pick = self.choose(samples.len())?;
        let n = samples[pick];
        trace!(term = %pretty_print_exp(exp), value = n, "guessed integer value");
        self.guesses.ints.insert(key, IntDomain::singleton(n));
        Ok(Exp::new(
            ExpKind::Val(Value::Int(n)),
            exp.ty.clone(),
            exp.span,
        ))
    }

    /// Guess until the term is ground or nothing more can be guessed.
    fn demand_ground(&mut self, exp: Exp) -> EvalResult<Exp> {
        let mut cur = exp;
        loop {
            if cur.is_ground() {
                return Ok(cur);
            }
            let next = self.guess(&cur)?;
            if next == cur {
                // Not guessable; leave it residual.
                return Ok(cur);
            }
            cur = next;
        }
    }
}

/// A resolved step of an assignment path, root outward.
enum PathStep {
    Elem(i64),
    Slice(i64, usize),
    Field(String),
}

/// Rebuild `cur` with `rhs` spliced in along the path.
fn update_along(cur: &Exp, steps: &[PathStep], rhs: Exp) -> EvalResult<Exp> {
    let Some((step, rest)) = steps.split_first() else {
        return Ok(rhs);
    };
    match step {
        PathStep::Elem(i) => {
            let ExpKind::ValArr(elems) = &cur.kind else {
                return Err(EvalError::PartialAssignment);
            };
            let elem = split_array_at(*i, elems)?;
            let updated = update_along(elem, rest, rhs)?;
            let mut elems = elems.clone();
            elems[*i as usize] = updated;
            Ok(Exp::new(ExpKind::ValArr(elems), cur.ty.clone(), cur.span))
        }
        PathStep::Slice(i, n) => {
            let ExpKind::ValArr(elems) = &cur.kind else {
                return Err(EvalError::PartialAssignment);
            };
            let slice = slice_array_at(*i, *n, elems)?;
            let elem_ty = cur.ty.elem_ty().cloned().unwrap_or(Ty::Unit);
            let mid = Exp::new(
                ExpKind::ValArr(slice.to_vec()),
                Ty::Array(ArrayLen::Literal(*n), Box::new(elem_ty)),
                cur.span,
            );
            let updated = update_along(&mid, rest, rhs)?;
            let ExpKind::ValArr(mid_elems) = updated.kind else {
                return Err(EvalError::Internal(
                    "slice update did not produce an array".to_string(),
                ));
            };
            if mid_elems.len() != *n {
                return Err(EvalError::Internal(
                    "slice update changed the slice length".to_string(),
                ));
            }
            let start = *i as usize;
            let mut elems = elems.clone();
            elems.splice(start..start + n, mid_elems);
            Ok(Exp::new(ExpKind::ValArr(elems), cur.ty.clone(), cur.span))
        }
        PathStep::Field(field) => {
            let ExpKind::StructLit(fields) = &cur.kind else {
                return Err(EvalError::PartialAssignment);
            };
            let old = find_field(&cur.ty, fields, field)?;
            let updated = update_along(old, rest, rhs)?;
            let fields = fields
                .iter()
                .map(|(f, e)| {
                    if f == field {
                        (f.clone(), updated.clone())
                    } else {
                        (f.clone(), e.clone())
                    }
                })
                .collect();
            Ok(Exp::new(ExpKind::StructLit(fields), cur.ty.clone(), cur.span))
        }
    }
}

// === Normal-form helpers ===

/// The element at `i`, or out of bounds.
fn split_array_at(i: i64, elems: &[Exp]) -> EvalResult<&Exp> {
    if i < 0 || i as usize >= elems.len() {
        return Err(EvalError::OutOfBounds {
            index: i,
            length: elems.len(),
        });
    }
    Ok(&elems[i as usize])
}

/// The slice `[i, i + n)`, or out of bounds.
fn slice_array_at(i: i64, n: usize, elems: &[Exp]) -> EvalResult<&[Exp]> {
    if i < 0 || (i as usize).saturating_add(n) > elems.len() {
        return Err(EvalError::OutOfBounds {
            index: i,
            length: elems.len(),
        });
    }
    Ok(&elems[i as usize..i as usize + n])
}

/// The named field's value, order preserved.
fn find_field<'a>(ty: &Ty, fields: &'a [(String, Exp)], field: &str) -> EvalResult<&'a Exp> {
    fields
        .iter()
        .find(|(f, _)| f == field)
        .map(|(_, e)| e)
        .ok_or_else(|| EvalError::UnknownField {
            struct_name: match ty {
                Ty::Struct(name, _) => name.clone(),
                _ => "?".to_string(),
            },
            field: field.to_string(),
        })
}

/// The type-driven initial value of an uninitialized mutable binding.
fn initial_value(ty: &Ty, span: Span) -> EvalResult<Exp> {
    let kind = match ty {
        Ty::Unit => ExpKind::Val(Value::Unit),
        Ty::Bit => ExpKind::Val(Value::Bit(false)),
        Ty::Bool => ExpKind::Val(Value::Bool(false)),
        Ty::Int(_) => ExpKind::Val(Value::Int(0)),
        Ty::Double => ExpKind::Val(Value::Double(0.0)),
        Ty::String => ExpKind::Val(Value::Str(String::new())),
        Ty::Array(ArrayLen::Literal(n), elem) => {
            let e = initial_value(elem, span)?;
            ExpKind::ValArr(vec![e; *n])
        }
        Ty::Array(ArrayLen::Var(x), _) => {
            return Err(EvalError::SymbolicLength(x.clone()));
        }
        Ty::Struct(_, fields) => {
            let fields = fields
                .iter()
                .map(|(f, t)| Ok((f.clone(), initial_value(t, span)?)))
                .collect::<EvalResult<Vec<_>>>()?;
            ExpKind::StructLit(fields)
        }
        Ty::Arrow(_, _) => {
            return Err(EvalError::Internal(
                "no initial value for a function type".to_string(),
            ))
        }
    };
    Ok(Exp::new(kind, ty.clone(), span))
}

fn unit_val(span: Span) -> Exp {
    Exp::new(ExpKind::Val(Value::Unit), Ty::Unit, span)
}

// === Top-level API ===

fn run_single(mode: EvalMode, heap: Heap, exp: &Exp) -> EvalOutcome {
    let mut ctx = EvalCtx::new(mode, heap);
    match ctx.interpret(exp) {
        Ok(v) => {
            if mode == EvalMode::Full && !v.is_ground() {
                return Err(EvalFailure {
                    error: EvalError::FreeVariables,
                    prints: ctx.prints,
                });
            }
            Ok((v, ctx.prints))
        }
        Err(error) => Err(EvalFailure {
            error,
            prints: ctx.prints,
        }),
    }
}

/// Reduce as far as possible, leaving residual terms where reduction is not
/// possible.
pub fn eval_partial(exp: &Exp) -> EvalOutcome {
    eval_partial_env(Heap::new(), exp)
}

/// Partial evaluation under a seeded heap of known bindings.
pub fn eval_partial_env(heap: Heap, exp: &Exp) -> EvalOutcome {
    debug!(mode = "partial", "evaluating");
    run_single(EvalMode::Partial, heap, exp)
}

/// Reduce to a ground normal form; any free variable is an error.
pub fn eval_full(exp: &Exp) -> EvalOutcome {
    eval_full_env(Heap::new(), exp)
}

/// Full evaluation under a seeded heap of known bindings.
pub fn eval_full_env(heap: Heap, exp: &Exp) -> EvalOutcome {
    debug!(mode = "full", "evaluating");
    run_single(EvalMode::Full, heap, exp)
}

/// Fully evaluate and project out an integer result.
pub fn eval_int(exp: &Exp) -> Result<(i64, String), EvalFailure> {
    let (v, prints) = eval_full(exp)?;
    match v.as_int() {
        Some(n) => Ok((n, prints)),
        None => Err(EvalFailure {
            error: EvalError::ResultShape {
                expected: "an integer",
                actual: pretty_print_exp(&v),
            },
            prints,
        }),
    }
}

/// Fully evaluate and project out a boolean result.
pub fn eval_bool(exp: &Exp) -> Result<(bool, String), EvalFailure> {
    let (v, prints) = eval_full(exp)?;
    match v.as_bool() {
        Some(b) => Ok((b, prints)),
        None => Err(EvalFailure {
            error: EvalError::ResultShape {
                expected: "a boolean",
                actual: pretty_print_exp(&v),
            },
            prints,
        }),
    }
}

/// Enumerate every approximation branch that ends in success, with its
/// prints. Branches that error out or guess themselves into an empty domain
/// are silently dropped; see `provable` for what that implies.
pub fn approximate(exp: &Exp) -> Vec<(Exp, String)> {
    debug!(mode = "approx", "evaluating");
    let mut stack = vec![Vec::new()];
    let mut kept = Vec::new();
    let mut explored = 0usize;
    while let Some(prefix) = stack.pop() {
        let mut ctx = EvalCtx::with_prefix(Heap::new(), prefix);
        let result = ctx
            .interpret(exp)
            .and_then(|v| ctx.demand_ground(v));
        stack.append(&mut ctx.pending);
        explored += 1;
        match result {
            Ok(v) => kept.push((v, ctx.prints)),
            Err(error) => trace!(%error, "dropped branch"),
        }
    }
    trace!(explored, kept = kept.len(), "approximation finished");
    kept
}

/// Is there a guess under which the expression evaluates to `true`?
pub fn satisfiable(exp: &Exp) -> bool {
    approximate(exp)
        .iter()
        .any(|(v, _)| v.ty == Ty::Bool && v.as_bool() == Some(true))
}

/// Does the expression hold under every guess the approximation explores?
///
/// Defined as `!satisfiable(!exp)`. Sound only with respect to the guessing
/// strategy. Like the branch enumeration itself, this treats branches that
/// die with an error as *not* counterexamples: a predicate can be provable
/// even though some instantiations of it fail to evaluate.
pub fn provable(exp: &Exp) -> bool {
    !satisfiable(&build::not(exp.clone()))
}

/// Does `a` imply `b` under every guess? Defined as `provable(!a || b)`.
pub fn implies(a: &Exp, b: &Exp) -> bool {
    provable(&build::or(build::not(a.clone()), b.clone()))
}

/// Type check a source expression, then fully evaluate it to an integer.
/// Type-checker failures are forwarded verbatim.
pub fn eval_src_int<C: TypeChecker>(
    checker: &mut C,
    src: &C::Source,
) -> Result<(i64, String), EvalFailure> {
    let mut gen = UniqGen::new();
    match checker.elaborate(src, &mut gen) {
        Ok((exp, _ty)) => eval_int(&exp),
        Err(message) => Err(EvalFailure {
            error: EvalError::TypeCheck(message),
            prints: String::new(),
        }),
    }
}

/// Type check a source expression, then fully evaluate it to a boolean.
pub fn eval_src_bool<C: TypeChecker>(
    checker: &mut C,
    src: &C::Source,
) -> Result<(bool, String), EvalFailure> {
    let mut gen = UniqGen::new();
    match checker.elaborate(src, &mut gen) {
        Ok((exp, _ty)) => eval_bool(&exp),
        Err(message) => Err(EvalFailure {
            error: EvalError::TypeCheck(message),
            prints: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ziria_ir::build;

    fn name(uniq: u64, n: &str) -> Name {
        Name::new(uniq, n, Ty::int32())
    }

    #[test]
    fn test_ground_arithmetic() {
        // (1 + 2) * (3 + 4)
        let e = build::mult(
            build::add(build::int32(1), build::int32(2)),
            build::add(build::int32(3), build::int32(4)),
        );
        assert_eq!(eval_int(&e).unwrap(), (21, String::new()));
    }

    #[test]
    fn test_partial_residualizes_free_vars() {
        let a = name(0, "a");
        let e = build::add(
            build::var(&a),
            build::mult(build::int32(2), build::int32(3)),
        );
        let (v, prints) = eval_partial(&e).unwrap();
        assert_eq!(prints, "");
        assert_eq!(pretty_print_exp(&v), "a + 6");
    }

    #[test]
    fn test_full_fails_on_free_vars() {
        let a = name(0, "a");
        let e = build::add(build::var(&a), build::int32(6));
        let err = eval_full(&e).unwrap_err();
        assert_eq!(err.error, EvalError::FreeVariables);
        assert_eq!(err.error.to_string(), "Free variables");
    }

    #[test]
    fn test_let_scopes_are_lifo() {
        let x = name(0, "x");
        let y = name(1, "y");
        let e = build::let_(
            x.clone(),
            build::int32(5),
            build::let_(
                y.clone(),
                build::int32(7),
                build::add(build::var(&x), build::var(&y)),
            ),
        );
        let (v, _) = eval_partial(&e).unwrap();
        assert_eq!(v.as_int(), Some(12));
    }

    #[test]
    fn test_letref_assignment() {
        let r = name(0, "r");
        let incr = build::assign(
            build::var(&r),
            build::add(build::var(&r), build::int32(1)),
        );
        let e = build::let_ref(
            r.clone(),
            build::int32(0),
            build::seqs(vec![incr.clone(), incr, build::var(&r)]),
        );
        let (v, _) = eval_partial(&e).unwrap();
        assert_eq!(v.as_int(), Some(2));
    }

    #[test]
    fn test_for_loop_sums() {
        let acc = name(0, "acc");
        let i = name(1, "i");
        // var acc := 0 in for i in [1, 4] { acc := acc + i }; acc
        let body = build::assign(
            build::var(&acc),
            build::add(build::var(&acc), build::var(&i)),
        );
        let e = build::let_ref(
            acc.clone(),
            build::int32(0),
            build::seq(
                build::for_(i.clone(), build::int32(1), build::int32(4), body),
                build::var(&acc),
            ),
        );
        assert_eq!(eval_int(&e).unwrap().0, 1 + 2 + 3 + 4);
    }

    #[test]
    fn test_while_loop() {
        let n = name(0, "n");
        // var n := 5 in while n > 0 { n := n - 1 }; n
        let e = build::let_ref(
            n.clone(),
            build::int32(5),
            build::seq(
                build::while_(
                    build::bin(BinOp::Gt, build::var(&n), build::int32(0)),
                    build::assign(
                        build::var(&n),
                        build::sub(build::var(&n), build::int32(1)),
                    ),
                ),
                build::var(&n),
            ),
        );
        assert_eq!(eval_int(&e).unwrap().0, 0);
    }

    #[test]
    fn test_control_flow_needs_ground_condition() {
        let c = Name::new(0, "c", Ty::Bool);
        let e = build::if_(build::var(&c), build::int32(1), build::int32(2));
        let err = eval_partial(&e).unwrap_err();
        assert_eq!(err.error, EvalError::ControlFlowNotGround);
    }

    #[test]
    fn test_array_read_and_out_of_bounds() {
        let arr = build::arr(vec![build::int32(10), build::int32(20), build::int32(30)]);
        let ok = build::arr_read(arr.clone(), build::int32(1), RangeKind::Singleton);
        assert_eq!(eval_int(&ok).unwrap().0, 20);

        let oob = build::arr_read(arr.clone(), build::int32(5), RangeKind::Singleton);
        for outcome in [eval_partial(&oob), eval_full(&oob)] {
            let err = outcome.unwrap_err();
            assert_eq!(
                err.error,
                EvalError::OutOfBounds {
                    index: 5,
                    length: 3
                }
            );
        }
        assert!(approximate(&oob).is_empty());
    }

    #[test]
    fn test_slice_read() {
        let arr = build::arr((1..=5).map(build::int32).collect());
        let e = build::arr_read(arr, build::int32(1), RangeKind::Length(2));
        let (v, _) = eval_full(&e).unwrap();
        assert_eq!(pretty_print_exp(&v), "{2, 3}");
    }

    #[test]
    fn test_print_order_and_capture() {
        let e = build::seq(
            build::println(build::int32(1)),
            build::seq(build::println(build::int32(2)), build::int32(3)),
        );
        let (n, prints) = eval_int(&e).unwrap();
        assert_eq!(n, 3);
        assert_eq!(prints, "1\n2\n");
    }

    #[test]
    fn test_prints_kept_on_error() {
        let e = build::seq(
            build::println(build::string("before")),
            build::error("boom", Ty::int32()),
        );
        let err = eval_full(&e).unwrap_err();
        assert_eq!(err.error, EvalError::User("boom".to_string()));
        assert_eq!(err.prints, "\"before\"\n");
    }

    #[test]
    fn test_force_inline_duplicates_effects() {
        let x = name(0, "x");
        // let inline x = (print 7; 7) in x + x prints twice.
        let noisy = build::seq(build::println(build::int32(7)), build::int32(7));
        let e = build::let_force_inline(
            x.clone(),
            noisy,
            build::add(build::var(&x), build::var(&x)),
        );
        let (n, prints) = eval_int(&e).unwrap();
        assert_eq!(n, 14);
        assert_eq!(prints, "7\n7\n");
    }

    #[test]
    fn test_default_initializer() {
        let a = Name::new(
            0,
            "a",
            Ty::Array(ArrayLen::Literal(3), Box::new(Ty::int32())),
        );
        let e = build::let_ref_default(
            a.clone(),
            build::arr_read(build::var(&a), build::int32(2), RangeKind::Singleton),
        );
        assert_eq!(eval_int(&e).unwrap().0, 0);
    }

    #[test]
    fn test_symbolic_length_default_fails() {
        let a = Name::new(
            0,
            "a",
            Ty::Array(ArrayLen::Var("n".to_string()), Box::new(Ty::int32())),
        );
        let e = build::let_ref_default(a.clone(), build::int32(1));
        let err = eval_partial(&e).unwrap_err();
        assert_eq!(err.error, EvalError::SymbolicLength("n".to_string()));
    }

    #[test]
    fn test_alength_on_unreduced_literal() {
        let x = name(0, "x");
        // length of an array literal is known even with a residual element.
        let e = build::alength(build::arr(vec![build::var(&x), build::int32(2)]));
        let (v, _) = eval_partial(&e).unwrap();
        assert_eq!(v.as_int(), Some(2));
    }

    #[test]
    fn test_lut_is_transparent() {
        let e = build::lut(build::add(build::int32(2), build::int32(3)));
        assert_eq!(eval_int(&e).unwrap().0, 5);
    }

    #[test]
    fn test_bperm_is_rejected() {
        let arr = build::arr(vec![build::bit(false), build::bit(true)]);
        let e = Exp::new(
            ExpKind::BPerm(Box::new(arr.clone()), Box::new(arr)),
            Ty::Unit,
            Span::synthetic(),
        );
        let err = eval_partial(&e).unwrap_err();
        assert_eq!(err.error, EvalError::Unsupported("bit permutation"));
    }
}
