//! Type denoters: a tagged algebra separate from syntactic spelling (spec §3.6).
//!
//! Modeled directly on `ashley::ast::TypeDesc`/`PrimitiveType` (see DESIGN.md):
//! `Id<T>`-indexed arena storage rather than an owned recursive enum, so type denoters
//! can be shared/deduplicated and referred to from many AST nodes without cloning.

use super::{Id, StructDeclId};
use smol_str::SmolStr;
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum DataType {
    Void,
    Bool,
    Int,
    UInt,
    Half,
    Float,
    Double,
}

impl DataType {
    pub fn is_floating_point(&self) -> bool {
        matches!(self, DataType::Half | DataType::Float | DataType::Double)
    }
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Bool | DataType::Int | DataType::UInt)
    }
    /// HLSL implicit-conversion rank: higher can represent everything lower can.
    /// Used by `common_type` and by `is_castable_to`'s widening/narrowing checks.
    pub fn rank(&self) -> u8 {
        match self {
            DataType::Void => 0,
            DataType::Bool => 1,
            DataType::Int => 2,
            DataType::UInt => 3,
            DataType::Half => 4,
            DataType::Float => 5,
            DataType::Double => 6,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::UInt => "uint",
            DataType::Half => "half",
            DataType::Float => "float",
            DataType::Double => "double",
        };
        write!(f, "{s}")
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum BufferType {
    Buffer,
    StructuredBuffer,
    RwStructuredBuffer,
    ByteAddressBuffer,
    RwByteAddressBuffer,
    AppendStructuredBuffer,
    ConsumeStructuredBuffer,
    RwBuffer,
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    TextureCubeArray,
    Texture2DMs,
    Texture2DMsArray,
    RwTexture1D,
    RwTexture2D,
    RwTexture3D,
    InputPatch,
    OutputPatch,
    ConstantBuffer,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum SamplerType {
    Sampler,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    SamplerState,
    SamplerComparisonState,
}

/// Dimension of an array type: either a compile-time-constant extent (resolved to a
/// `u32` by the analyzer's constant evaluator) or an as-yet-unresolved expression handle.
#[derive(Copy, Clone, Debug)]
pub enum ArrayDimension {
    Resolved(u32),
    Unresolved(Id<super::Expr>),
}

/// The tagged type-denoter algebra (spec §3.6).
#[derive(Clone, Debug)]
pub enum TypeDenoter {
    Void,
    Error,
    Base(DataType),
    Vector(DataType, u8),
    Matrix(DataType, u8, u8),
    Buffer(BufferType, Option<Id<TypeDenoter>>, Option<u32>),
    Sampler(SamplerType),
    Struct(StructRef),
    Alias(AliasRef),
    Array(Id<TypeDenoter>, Vec<ArrayDimension>),
}

/// A reference to a struct declaration, resolved by name during parsing and backfilled
/// to an arena index once the declaration is registered (spec §3.6, §9 "non-owning
/// back-references").
#[derive(Clone, Debug)]
pub enum StructRef {
    Resolved(StructDeclId),
    Unresolved(SmolStr),
}

#[derive(Clone, Debug)]
pub enum AliasRef {
    Resolved(super::AliasDeclId),
    Unresolved(SmolStr),
}

/// Owns every distinct type denoter referenced by a translation unit.
#[derive(Default)]
pub struct TypeTable {
    pub items: Vec<TypeDenoter>,
}

impl TypeTable {
    pub fn new() -> TypeTable {
        TypeTable { items: Vec::new() }
    }

    pub fn add(&mut self, ty: TypeDenoter) -> Id<TypeDenoter> {
        self.items.push(ty);
        Id::from_index(self.items.len() - 1)
    }

    pub fn get(&self, id: Id<TypeDenoter>) -> &TypeDenoter {
        &self.items[id.index()]
    }
}

impl std::ops::Index<Id<TypeDenoter>> for TypeTable {
    type Output = TypeDenoter;
    fn index(&self, id: Id<TypeDenoter>) -> &TypeDenoter {
        self.get(id)
    }
}

/// Context needed to resolve alias chains and compute castability: the type table plus
/// lookup of struct/alias declarations by id. Kept as a trait so `ast::Module` can
/// implement it without `types.rs` depending on the rest of the AST module's
/// declaration arenas directly.
pub trait TypeContext {
    fn types(&self) -> &TypeTable;
    fn alias_target(&self, id: super::AliasDeclId) -> Id<TypeDenoter>;
}

/// Sign of a vector-truncation comparison: negative when `a` is wider than `b`
/// (truncation, warn), positive when narrower (illegal, error), zero when equal widths
/// (spec §3.6 `find_vector_truncation`).
pub fn find_vector_truncation(a: &TypeDenoter, b: &TypeDenoter) -> Option<i32> {
    let width = |t: &TypeDenoter| -> Option<u8> {
        match t {
            TypeDenoter::Base(_) => Some(1),
            TypeDenoter::Vector(_, n) => Some(*n),
            _ => None,
        }
    };
    let (wa, wb) = (width(a)?, width(b)?);
    Some(wb as i32 - wa as i32)
}

/// Resolves alias links transitively to a canonical (non-alias) form (spec §3.6
/// `aliased()`).
pub fn aliased<'a>(ctx: &'a dyn TypeContext, id: Id<TypeDenoter>) -> Id<TypeDenoter> {
    let mut current = id;
    loop {
        match ctx.types().get(current) {
            TypeDenoter::Alias(AliasRef::Resolved(alias_id)) => {
                current = ctx.alias_target(*alias_id);
            }
            _ => return current,
        }
    }
}

/// HLSL implicit-conversion rules (spec §3.6 `is_castable_to`). Returns `Ok(true)` for a
/// lossless-or-conventionally-accepted conversion, `Ok(false)` for one that is outright
/// illegal, and `Err(truncation_sign)` for a vector truncation (castable, but the caller
/// should emit a truncation warning using the returned sign).
pub enum Castability {
    Ok,
    Illegal,
    TruncatesWithWarning,
}

pub fn is_castable_to(ctx: &dyn TypeContext, from: Id<TypeDenoter>, to: Id<TypeDenoter>) -> Castability {
    let from_c = aliased(ctx, from);
    let to_c = aliased(ctx, to);
    let from_ty = ctx.types().get(from_c);
    let to_ty = ctx.types().get(to_c);

    match (from_ty, to_ty) {
        (TypeDenoter::Error, _) | (_, TypeDenoter::Error) => Castability::Ok,
        (TypeDenoter::Base(a), TypeDenoter::Base(b)) => {
            if a == b || a.is_integral() || b.is_floating_point() || b.is_integral() {
                Castability::Ok
            } else {
                Castability::Illegal
            }
        }
        (TypeDenoter::Base(_), TypeDenoter::Vector(_, _)) => Castability::Ok,
        (TypeDenoter::Vector(_, na), TypeDenoter::Vector(_, nb)) => {
            if na == nb {
                Castability::Ok
            } else if na > nb {
                Castability::TruncatesWithWarning
            } else {
                Castability::Illegal
            }
        }
        (TypeDenoter::Vector(_, _), TypeDenoter::Base(_)) => Castability::TruncatesWithWarning,
        (TypeDenoter::Matrix(_, ra, ca), TypeDenoter::Matrix(_, rb, cb)) => {
            if ra == rb && ca == cb {
                Castability::Ok
            } else {
                Castability::Illegal
            }
        }
        (TypeDenoter::Struct(a), TypeDenoter::Struct(b)) => match (a, b) {
            (StructRef::Resolved(x), StructRef::Resolved(y)) if x == y => Castability::Ok,
            _ => Castability::Illegal,
        },
        (TypeDenoter::Void, TypeDenoter::Void) => Castability::Ok,
        _ => Castability::Illegal,
    }
}

/// Computes the common result type of a binary arithmetic operator per HLSL's usual
/// arithmetic conversions: highest-rank scalar type, widest vector/matrix shape.
pub fn common_type(ctx: &mut dyn TypeContextMut, a: Id<TypeDenoter>, b: Id<TypeDenoter>) -> Id<TypeDenoter> {
    let a_c = aliased(ctx.as_context(), a);
    let b_c = aliased(ctx.as_context(), b);
    let (ta, tb) = (ctx.as_context().types().get(a_c).clone(), ctx.as_context().types().get(b_c).clone());
    match (ta, tb) {
        (TypeDenoter::Error, _) | (_, TypeDenoter::Error) => ctx.error_type(),
        (TypeDenoter::Base(x), TypeDenoter::Base(y)) => {
            ctx.base_type(if x.rank() >= y.rank() { x } else { y })
        }
        (TypeDenoter::Vector(x, n), TypeDenoter::Base(y)) | (TypeDenoter::Base(y), TypeDenoter::Vector(x, n)) => {
            ctx.vector_type(if x.rank() >= y.rank() { x } else { y }, n)
        }
        (TypeDenoter::Vector(x, n), TypeDenoter::Vector(y, m)) if n == m => {
            ctx.vector_type(if x.rank() >= y.rank() { x } else { y }, n)
        }
        _ => ctx.error_type(),
    }
}

/// A mutable extension of [`TypeContext`] that can also mint new base/vector type
/// denoters on demand, used by `common_type` which may need a type not yet interned.
pub trait TypeContextMut {
    fn as_context(&self) -> &dyn TypeContext;
    fn error_type(&mut self) -> Id<TypeDenoter>;
    fn base_type(&mut self, dt: DataType) -> Id<TypeDenoter>;
    fn vector_type(&mut self, dt: DataType, len: u8) -> Id<TypeDenoter>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_sign_matches_spec_convention() {
        let a = TypeDenoter::Vector(DataType::Float, 4);
        let b = TypeDenoter::Vector(DataType::Float, 2);
        // a is wider than b => negative.
        assert_eq!(find_vector_truncation(&a, &b), Some(-2));
        assert_eq!(find_vector_truncation(&b, &a), Some(2));
        assert_eq!(find_vector_truncation(&a, &a), Some(0));
    }

    #[test]
    fn rank_orders_integral_below_floating_point() {
        assert!(DataType::Int.rank() < DataType::Float.rank());
        assert!(DataType::Float.rank() < DataType::Double.rank());
    }
}
