//! Pretty printer for IR expressions.
//!
//! The output is deterministic and, on ground values, distinct for values
//! of distinct types (`'1` vs `true` vs `1` vs `1.0` vs `"1"`; non-default
//! integer widths carry a suffix). `print` statements and diagnostics rely
//! on this.

use crate::exp::{BinOp, Exp, ExpKind, RangeKind, UnOp};
use crate::ty::{IntWidth, Ty};
use crate::value::Value;

/// Pretty print an expression to a string.
pub fn pretty_print_exp(exp: &Exp) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print_exp(exp, 0);
    printer.output
}

/// Pretty print a type to a string.
pub fn pretty_print_ty(ty: &Ty) -> String {
    ty.to_string()
}

struct PrettyPrinter {
    output: String,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn print_val(&mut self, v: &Value, ty: &Ty) {
        self.write(&v.to_string());
        // Integer literals carry a width suffix except at the default width.
        if let (Value::Int(_), Ty::Int(w)) = (v, ty) {
            match w {
                IntWidth::W8 => self.write("i8"),
                IntWidth::W16 => self.write("i16"),
                IntWidth::W32 => {}
                IntWidth::W64 => self.write("i64"),
            }
        }
    }

    fn print_exp(&mut self, exp: &Exp, prec: u8) {
        match &exp.kind {
            ExpKind::Val(v) => self.print_val(v, &exp.ty),
            ExpKind::ValArr(elems) => {
                self.write("{");
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_exp(e, 0);
                }
                self.write("}");
            }
            ExpKind::StructLit(fields) => {
                if let Ty::Struct(name, _) = &exp.ty {
                    self.write(name);
                }
                self.write("{");
                for (i, (f, e)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.write("; ");
                    }
                    self.write(f);
                    self.write(" = ");
                    self.print_exp(e, 0);
                }
                self.write("}");
            }
            ExpKind::Var(x) => self.write(&x.name),
            ExpKind::Un(op, e) => self.print_un(op, e, prec),
            ExpKind::Bin(op, l, r) => self.print_bin(*op, l, r, prec),
            ExpKind::ArrRead { arr, idx, kind } => {
                self.print_exp(arr, POSTFIX);
                self.write("[");
                self.print_exp(idx, 0);
                if let RangeKind::Length(n) = kind {
                    self.write(&format!(", {}", n));
                }
                self.write("]");
            }
            ExpKind::ArrWrite {
                arr,
                idx,
                kind,
                rhs,
            } => {
                self.print_exp(arr, POSTFIX);
                self.write("[");
                self.print_exp(idx, 0);
                if let RangeKind::Length(n) = kind {
                    self.write(&format!(", {}", n));
                }
                self.write("] := ");
                self.print_exp(rhs, 0);
            }
            ExpKind::Proj { base, field } => {
                self.print_exp(base, POSTFIX);
                self.write(".");
                self.write(field);
            }
            ExpKind::Let {
                var,
                force_inline,
                bound,
                body,
            } => {
                self.paren_if(prec > 0, |p| {
                    p.write(if *force_inline { "let inline " } else { "let " });
                    p.write(&var.name);
                    p.write(" = ");
                    p.print_exp(bound, 0);
                    p.write(" in ");
                    p.print_exp(body, 0);
                });
            }
            ExpKind::LetRef { var, init, body } => {
                self.paren_if(prec > 0, |p| {
                    p.write("var ");
                    p.write(&var.name);
                    if let Some(init) = init {
                        p.write(" := ");
                        p.print_exp(init, 0);
                    }
                    p.write(" in ");
                    p.print_exp(body, 0);
                });
            }
            ExpKind::Assign { lhs, rhs } => {
                self.print_exp(lhs, POSTFIX);
                self.write(" := ");
                self.print_exp(rhs, 0);
            }
            ExpKind::Seq(first, second) => {
                self.paren_if(prec > 0, |p| {
                    p.print_exp(first, 1);
                    p.write("; ");
                    p.print_exp(second, 1);
                });
            }
            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.paren_if(prec > 0, |p| {
                    p.write("if ");
                    p.print_exp(cond, 0);
                    p.write(" then ");
                    p.print_exp(then_branch, 1);
                    p.write(" else ");
                    p.print_exp(else_branch, 1);
                });
            }
            ExpKind::While { cond, body } => {
                self.write("while ");
                self.print_exp(cond, POSTFIX);
                self.write(" { ");
                self.print_exp(body, 0);
                self.write(" }");
            }
            ExpKind::For {
                var,
                start,
                len,
                body,
            } => {
                self.write("for ");
                self.write(&var.name);
                self.write(" in [");
                self.print_exp(start, 0);
                self.write(", ");
                self.print_exp(len, 0);
                self.write("] { ");
                self.print_exp(body, 0);
                self.write(" }");
            }
            ExpKind::Call { func, args } => {
                self.write(&func.name);
                self.write("(");
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_exp(a, 0);
                }
                self.write(")");
            }
            ExpKind::Print { newline, arg } => {
                self.write(if *newline { "println " } else { "print " });
                self.print_exp(arg, POSTFIX);
            }
            ExpKind::Error(msg) => {
                self.write(&format!("error \"{}\"", msg.escape_default()));
            }
            ExpKind::Lut(e) => self.print_exp(e, prec),
            ExpKind::BPerm(l, r) => {
                self.write("bperm(");
                self.print_exp(l, 0);
                self.write(", ");
                self.print_exp(r, 0);
                self.write(")");
            }
        }
    }

    fn print_un(&mut self, op: &UnOp, e: &Exp, prec: u8) {
        match op {
            UnOp::Neg => self.prefix("-", e, prec),
            UnOp::Not => self.prefix("!", e, prec),
            UnOp::BwNeg => self.prefix("~", e, prec),
            UnOp::ALength => {
                self.write("length(");
                self.print_exp(e, 0);
                self.write(")");
            }
            UnOp::Cast(target) => {
                self.write(&format!("{}(", target));
                self.print_exp(e, 0);
                self.write(")");
            }
        }
    }

    fn prefix(&mut self, sym: &str, e: &Exp, prec: u8) {
        self.paren_if(prec > UNARY, |p| {
            p.write(sym);
            p.print_exp(e, UNARY);
        });
    }

    fn print_bin(&mut self, op: BinOp, l: &Exp, r: &Exp, prec: u8) {
        let (sym, my_prec) = bin_op_info(op);
        // Left associative: the right operand needs one level more.
        self.paren_if(prec > my_prec, |p| {
            p.print_exp(l, my_prec);
            p.write(" ");
            p.write(sym);
            p.write(" ");
            p.print_exp(r, my_prec + 1);
        });
    }

    fn paren_if(&mut self, cond: bool, f: impl FnOnce(&mut Self)) {
        if cond {
            self.write("(");
        }
        f(self);
        if cond {
            self.write(")");
        }
    }
}

const UNARY: u8 = 11;
const POSTFIX: u8 = 12;

fn bin_op_info(op: BinOp) -> (&'static str, u8) {
    match op {
        BinOp::Or => ("||", 2),
        BinOp::And => ("&&", 3),
        BinOp::Eq => ("==", 4),
        BinOp::Neq => ("!=", 4),
        BinOp::Lt => ("<", 4),
        BinOp::Gt => (">", 4),
        BinOp::Leq => ("<=", 4),
        BinOp::Geq => (">=", 4),
        BinOp::BwOr => ("|", 5),
        BinOp::BwXor => ("^", 6),
        BinOp::BwAnd => ("&", 7),
        BinOp::ShL => ("<<", 8),
        BinOp::ShR => (">>", 8),
        BinOp::Add => ("+", 9),
        BinOp::Sub => ("-", 9),
        BinOp::Mult => ("*", 10),
        BinOp::Div => ("/", 10),
        BinOp::Rem => ("%", 10),
        BinOp::Expon => ("**", 10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;
    use crate::exp::Name;

    #[test]
    fn test_residual_sum() {
        let a = Name::new(0, "a", Ty::int32());
        let e = build::add(build::var(&a), build::int32(6));
        assert_eq!(pretty_print_exp(&e), "a + 6");
    }

    #[test]
    fn test_precedence_parens() {
        let a = Name::new(0, "a", Ty::int32());
        // (a + 1) * 2 keeps its parentheses, a + 1 * 2 does not gain any.
        let sum = build::add(build::var(&a), build::int32(1));
        let e = build::mult(sum.clone(), build::int32(2));
        assert_eq!(pretty_print_exp(&e), "(a + 1) * 2");
        let e = build::add(build::var(&a), build::mult(build::int32(1), build::int32(2)));
        assert_eq!(pretty_print_exp(&e), "a + 1 * 2");
    }

    #[test]
    fn test_array_and_struct_literals() {
        let e = build::arr(vec![build::int32(1), build::int32(2), build::int32(3)]);
        assert_eq!(pretty_print_exp(&e), "{1, 2, 3}");
        let s = build::struct_(
            "complex",
            vec![
                ("re".to_string(), build::int32(1)),
                ("im".to_string(), build::int32(2)),
            ],
        );
        assert_eq!(pretty_print_exp(&s), "complex{re = 1; im = 2}");
    }

    #[test]
    fn test_width_suffixes() {
        assert_eq!(pretty_print_exp(&build::int8(5)), "5i8");
        assert_eq!(pretty_print_exp(&build::int32(5)), "5");
        assert_eq!(pretty_print_exp(&build::int64(5)), "5i64");
    }
}
