//! Constant-expression sub-visitor (spec §4.5 "Constant expression evaluation", §9
//! "Constant evaluator exceptions"). The original throws a C++ exception out of the
//! visitor the moment it meets a non-constant variable access; we return a `Result`
//! instead, matching `ashley::glsl`'s report-vs-`Result` split (see DESIGN.md) — the
//! caller turns `Err` into an "expected constant expression" report.

use crate::ast::{BinaryOp, Decl, DeclKind, Expr, ExprId, ExprKind, Module, SymbolRef, UnaryOp};
use crate::variant::{Variant, VariantError};

#[derive(Clone, Debug)]
pub enum ConstEvalError {
    /// The expression at this node reads something that isn't a `const`/`static const`
    /// initializer — the walk cannot continue constant-folding through it.
    NotConstant(ExprId),
    Arithmetic(VariantError),
}

impl From<VariantError> for ConstEvalError {
    fn from(e: VariantError) -> Self {
        ConstEvalError::Arithmetic(e)
    }
}

type CResult = Result<Variant, ConstEvalError>;

/// Evaluates `id` under the constraint "no variable accesses except references to
/// `const`/`static const` initializers" (spec §4.5).
pub fn eval(module: &Module, id: ExprId) -> CResult {
    let expr: &Expr = &module.exprs[id];
    match &expr.kind {
        ExprKind::LiteralBool(b) => Ok(Variant::Bool(*b)),
        ExprKind::LiteralInt(i) => Ok(Variant::Int(*i)),
        ExprKind::LiteralFloat(f) => Ok(Variant::Real(*f)),
        ExprKind::LiteralString(_) => Err(ConstEvalError::NotConstant(id)),
        ExprKind::Bracket(inner) => eval(module, *inner),
        ExprKind::Unary { op, operand } => {
            let v = eval(module, *operand)?;
            Ok(match op {
                UnaryOp::Neg => v.neg()?,
                UnaryOp::Not => v.logical_not()?,
                UnaryOp::BitNot => v.bit_not()?,
                UnaryOp::PreInc => v.pre_increment()?,
                UnaryOp::PreDec => v.pre_decrement()?,
            })
        }
        ExprKind::Binary { op, left, right } => {
            let l = eval(module, *left)?;
            let r = eval(module, *right)?;
            Ok(match op {
                BinaryOp::Add => l.add(&r)?,
                BinaryOp::Sub => l.sub(&r)?,
                BinaryOp::Mul => l.mul(&r)?,
                BinaryOp::Div => l.div(&r)?,
                BinaryOp::Mod => l.rem(&r)?,
                BinaryOp::And => l.logical_and(&r)?,
                BinaryOp::Or => l.logical_or(&r)?,
                BinaryOp::BitAnd => l.bit_and(&r)?,
                BinaryOp::BitOr => l.bit_or(&r)?,
                BinaryOp::BitXor => l.bit_xor(&r)?,
                BinaryOp::Shl => l.shl(&r)?,
                BinaryOp::Shr => l.shr(&r)?,
                BinaryOp::Eq => l.eq_op(&r)?,
                BinaryOp::Ne => l.ne_op(&r)?,
                BinaryOp::Lt => l.lt(&r)?,
                BinaryOp::Le => l.le(&r)?,
                BinaryOp::Gt => l.gt(&r)?,
                BinaryOp::Ge => l.ge(&r)?,
            })
        }
        ExprKind::Ternary { condition, then_expr, else_expr } => {
            let c = eval(module, *condition)?;
            if c.to_bool() {
                eval(module, *then_expr)
            } else {
                eval(module, *else_expr)
            }
        }
        ExprKind::Cast { operand, .. } => eval(module, *operand),
        ExprKind::Sequence(items) | ExprKind::InitializerList(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(module, *item)?);
            }
            Ok(Variant::Array(values))
        }
        ExprKind::Object { symbol, .. } => match symbol {
            SymbolRef::Decl(decl_id) => match &module.decls[*decl_id].kind {
                DeclKind::Variable { is_const: true, initializer: Some(init), .. } => eval(module, *init),
                _ => Err(ConstEvalError::NotConstant(id)),
            },
            _ => Err(ConstEvalError::NotConstant(id)),
        },
        _ => Err(ConstEvalError::NotConstant(id)),
    }
}

/// True iff `decl` is a `const`/`static const` variable whose initializer is itself
/// constant-evaluable (used to decide whether an `Object` reference to it may
/// participate in a constant expression).
pub fn is_constant_decl(decl: &Decl) -> bool {
    matches!(&decl.kind, DeclKind::Variable { is_const: true, initializer: Some(_), .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, DeclKind, Module};
    use crate::source::{Origin, SourceArea, SourcePosition};

    fn area() -> SourceArea {
        SourceArea::point(SourcePosition::new(Origin(0), 1, 1))
    }

    fn push_expr(module: &mut Module, kind: ExprKind) -> ExprId {
        module.exprs.push(Expr {
            kind,
            area: area(),
            flags: Default::default(),
            leading_comment: None,
            resolved_type: None,
            constant_value: None,
        })
    }

    #[test]
    fn folds_arithmetic_through_brackets() {
        let mut module = Module::new();
        let two = push_expr(&mut module, ExprKind::LiteralInt(2));
        let three = push_expr(&mut module, ExprKind::LiteralInt(3));
        let sum = push_expr(&mut module, ExprKind::Binary { op: BinaryOp::Add, left: two, right: three });
        let bracketed = push_expr(&mut module, ExprKind::Bracket(sum));
        assert_eq!(eval(&module, bracketed).unwrap(), Variant::Int(5));
    }

    #[test]
    fn non_const_variable_access_is_rejected() {
        let mut module = Module::new();
        let decl = module.decls.push(Decl {
            kind: DeclKind::Variable {
                name: "x".into(),
                ty: module.int_type,
                semantic: None,
                register: None,
                pack_offset: None,
                initializer: None,
                is_const: false,
            },
            area: area(),
            flags: Default::default(),
            leading_comment: None,
        });
        let reference = push_expr(
            &mut module,
            ExprKind::Object {
                ident: crate::ast::VarIdent { namespace: None, name: "x".into(), area: area() },
                symbol: SymbolRef::Decl(decl),
            },
        );
        assert!(matches!(eval(&module, reference), Err(ConstEvalError::NotConstant(_))));
    }
}
