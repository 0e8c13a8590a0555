//! Overload resolution and the built-in intrinsic table (spec §4.5 "Overload
//! resolution", GLOSSARY "Intrinsic"). Ported as "a representative, extensible subset"
//! of the original's several-hundred-entry intrinsic catalogue per SPEC_FULL.md §E —
//! the resolution *logic* exercised by spec §8 does not depend on table size.

use crate::ast::types::{is_castable_to, Castability, DataType, TypeContext, TypeDenoter};
use crate::ast::{Decl, DeclId, DeclKind, Id, Module};

/// Result of resolving a call's argument types against a set of candidate signatures.
pub enum Resolution {
    Unique(DeclId),
    Ambiguous(Vec<DeclId>),
    NoMatch,
}

/// Ranks how well `arg` converts to `param`: lower is better. `None` means "does not
/// convert at all" (spec §3.6 `is_castable_to` returning `Illegal`).
fn conversion_rank(ctx: &dyn TypeContext, arg: Id<TypeDenoter>, param: Id<TypeDenoter>) -> Option<u32> {
    if arg == param {
        return Some(0);
    }
    match is_castable_to(ctx, arg, param) {
        Castability::Ok => Some(1),
        Castability::TruncatesWithWarning => Some(2),
        Castability::Illegal => None,
    }
}

fn signature_of(decl: &Decl) -> Option<(&[crate::ast::Parameter], Id<TypeDenoter>)> {
    match &decl.kind {
        DeclKind::Function { parameters, return_type, .. } => Some((parameters, *return_type)),
        _ => None,
    }
}

/// Picks the best-matching overload among `candidates` for `arg_types` (spec §4.5: "the
/// unique overload with the best conversion sequence. Ties are errors").
pub fn resolve(module: &Module, candidates: &[DeclId], arg_types: &[Id<TypeDenoter>]) -> Resolution {
    let mut best_rank: Option<u32> = None;
    let mut best: Vec<DeclId> = Vec::new();
    for &cand in candidates {
        let Some((params, _)) = signature_of(&module.decls[cand]) else { continue };
        if params.len() != arg_types.len() {
            continue;
        }
        let mut total = 0u32;
        let mut ok = true;
        for (param, &arg_ty) in params.iter().zip(arg_types) {
            match conversion_rank(module, arg_ty, param.ty) {
                Some(r) => total += r,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            continue;
        }
        match best_rank {
            None => {
                best_rank = Some(total);
                best = vec![cand];
            }
            Some(r) if total < r => {
                best_rank = Some(total);
                best = vec![cand];
            }
            Some(r) if total == r => best.push(cand),
            _ => {}
        }
    }
    match best.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Unique(best[0]),
        _ => Resolution::Ambiguous(best),
    }
}

/// Arity accepted by an intrinsic.
#[derive(Copy, Clone)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
}

impl Arity {
    fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == *k,
            Arity::Range(lo, hi) => n >= *lo && n <= *hi,
        }
    }
}

/// How an intrinsic's result type is derived from its (already analyzed) argument types.
#[derive(Copy, Clone)]
pub enum ResultRule {
    /// Same type as the given argument index.
    SameAsArg(usize),
    /// Scalar component of the given argument's type (e.g. `dot` -> the vector's base type).
    ScalarOfArg(usize),
    Void,
    Bool,
    /// `float4x4`-style fixed matrix/vector, independent of arguments (`mul` approximates
    /// via `SameAsArg` in the common case; this covers constructors with no arguments).
    Fixed(TypeDenoter),
}

pub struct IntrinsicDef {
    pub name: &'static str,
    pub arity: Arity,
    pub result: ResultRule,
}

/// A representative HLSL intrinsic catalogue (spec GLOSSARY "Intrinsic": `mul`, `clip`,
/// `sincos`, and friends).
pub const INTRINSICS: &[IntrinsicDef] = &[
    IntrinsicDef { name: "mul", arity: Arity::Exact(2), result: ResultRule::SameAsArg(1) },
    IntrinsicDef { name: "dot", arity: Arity::Exact(2), result: ResultRule::ScalarOfArg(0) },
    IntrinsicDef { name: "cross", arity: Arity::Exact(2), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "normalize", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "length", arity: Arity::Exact(1), result: ResultRule::ScalarOfArg(0) },
    IntrinsicDef { name: "distance", arity: Arity::Exact(2), result: ResultRule::ScalarOfArg(0) },
    IntrinsicDef { name: "reflect", arity: Arity::Exact(2), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "refract", arity: Arity::Exact(3), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "saturate", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "clamp", arity: Arity::Exact(3), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "lerp", arity: Arity::Exact(3), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "max", arity: Arity::Exact(2), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "min", arity: Arity::Exact(2), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "abs", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "sqrt", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "rsqrt", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "pow", arity: Arity::Exact(2), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "exp", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "exp2", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "log", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "log2", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "sin", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "cos", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "tan", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "sincos", arity: Arity::Exact(3), result: ResultRule::Void },
    IntrinsicDef { name: "floor", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "ceil", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "round", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "frac", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "mad", arity: Arity::Exact(3), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "step", arity: Arity::Exact(2), result: ResultRule::SameAsArg(1) },
    IntrinsicDef { name: "smoothstep", arity: Arity::Exact(3), result: ResultRule::SameAsArg(2) },
    IntrinsicDef { name: "transpose", arity: Arity::Exact(1), result: ResultRule::SameAsArg(0) },
    IntrinsicDef { name: "determinant", arity: Arity::Exact(1), result: ResultRule::ScalarOfArg(0) },
    IntrinsicDef { name: "clip", arity: Arity::Exact(1), result: ResultRule::Void },
    IntrinsicDef { name: "any", arity: Arity::Exact(1), result: ResultRule::Bool },
    IntrinsicDef { name: "all", arity: Arity::Exact(1), result: ResultRule::Bool },
    IntrinsicDef { name: "tex2D", arity: Arity::Range(2, 4), result: ResultRule::Fixed(TypeDenoter::Vector(DataType::Float, 4)) },
    IntrinsicDef { name: "texCUBE", arity: Arity::Range(2, 4), result: ResultRule::Fixed(TypeDenoter::Vector(DataType::Float, 4)) },
    IntrinsicDef { name: "Sample", arity: Arity::Range(2, 4), result: ResultRule::Fixed(TypeDenoter::Vector(DataType::Float, 4)) },
];

pub fn lookup(name: &str) -> Option<&'static IntrinsicDef> {
    INTRINSICS.iter().find(|i| i.name == name)
}

impl IntrinsicDef {
    pub fn accepts_arity(&self, n: usize) -> bool {
        self.arity.accepts(n)
    }

    /// Resolves the intrinsic's result type denoter from its (already-typed) arguments.
    pub fn result_type(&self, module: &mut Module, arg_types: &[Id<TypeDenoter>]) -> Id<TypeDenoter> {
        match self.result {
            ResultRule::SameAsArg(i) => arg_types.get(i).copied().unwrap_or(module.error_type),
            ResultRule::ScalarOfArg(i) => {
                let ty = arg_types.get(i).copied().unwrap_or(module.error_type);
                match module.types[ty] {
                    TypeDenoter::Vector(dt, _) => module.base_type_of(dt),
                    TypeDenoter::Base(dt) => module.base_type_of(dt),
                    _ => module.error_type,
                }
            }
            ResultRule::Void => module.void_type,
            ResultRule::Bool => module.bool_type,
            ResultRule::Fixed(ref ty) => module.types.add(ty.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::DataType;

    #[test]
    fn dot_product_result_is_scalar() {
        let mut module = Module::new();
        let v4 = module.vector_type_of(DataType::Float, 4);
        let def = lookup("dot").unwrap();
        let result = def.result_type(&mut module, &[v4, v4]);
        assert!(matches!(module.types[result], TypeDenoter::Base(DataType::Float)));
    }

    #[test]
    fn unknown_intrinsic_is_absent() {
        assert!(lookup("not_a_real_intrinsic").is_none());
    }
}
