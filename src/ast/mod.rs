//! The AST: a closed, tagged-variant node set plus the arena that owns it (spec §3.5,
//! §3.9, §9). Arena/Id pattern lifted from `ashley::ast::Arena`/`Id` (see DESIGN.md):
//! cross-references between nodes (`symbol_ref`, `struct_decl_ref`, ...) are plain `Id<T>`
//! values, never owning pointers, so the tree can be built, and later walked by many
//! passes holding only shared references to the owning [`Module`].

pub mod types;

use crate::source::SourceArea;
use crate::variant::Variant;
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

pub use types::{ArrayDimension, BufferType, DataType, SamplerType, StructRef, TypeContext, TypeContextMut, TypeDenoter, TypeTable};

/// An index into some `Arena<T>`, carrying `T` only as a type-level tag (spec §9: "arena
/// indices ... never owning pointers").
pub struct Id<T>(u32, PhantomData<fn() -> T>);

impl<T> Id<T> {
    pub fn from_index(index: usize) -> Id<T> {
        Id(index as u32, PhantomData)
    }
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for Id<T> {}
impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}
impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}
impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}
impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every node of one kind (all `Decl`s, all `Stmt`s, or all `Expr`s).
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}
impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { items: Vec::new() }
    }
}
impl<T> Arena<T> {
    pub fn new() -> Arena<T> {
        Arena::default()
    }
    pub fn push(&mut self, item: T) -> Id<T> {
        self.items.push(item);
        Id::from_index(self.items.len() - 1)
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items.iter().enumerate().map(|(i, t)| (Id::from_index(i), t))
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        &self.items[id.index()]
    }
}
impl<T> IndexMut<Id<T>> for Arena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.items[id.index()]
    }
}

/// Flags attached to every node (spec §3.5). Not every flag applies to every node kind;
/// unused fields simply stay at their default.
#[derive(Clone, Debug, Default)]
pub struct NodeFlags {
    pub is_referenced: bool,
    pub was_marked: bool,
    pub is_dead_code: bool,
    pub is_read_from: bool,
    pub is_parameter: bool,
    pub is_static: bool,
    pub is_forward_decl: bool,
    pub has_non_return_control_path: bool,
    pub is_end_of_function: bool,
    pub is_build_in: bool,
}

pub type DeclId = Id<Decl>;
pub type StmtId = Id<Stmt>;
pub type ExprId = Id<Expr>;
pub type FuncDeclId = DeclId;
pub type StructDeclId = DeclId;
pub type AliasDeclId = DeclId;
pub type BufferDeclId = DeclId;

/// Semantic annotation on a parameter/return (spec GLOSSARY "Semantic"), e.g. `POSITION`,
/// `SV_Target0`. The trailing index (`0` in `SV_Target0`) is split out since the analyzer
/// matches base names against the per-stage semantics table.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Semantic {
    pub name: SmolStr,
    pub index: Option<u32>,
}

/// HLSL `register(...)` binding (spec §3.5, GLOSSARY).
#[derive(Clone, Debug)]
pub struct RegisterBinding {
    pub slot_class: char, // 'b','t','s','u' etc.
    pub slot: u32,
    pub space: Option<u32>,
}

/// HLSL `packoffset(...)` binding.
#[derive(Clone, Debug)]
pub struct PackOffsetBinding {
    pub component: SmolStr,
    pub sub_component: Option<SmolStr>,
}

/// Attribute with arguments, e.g. `[numthreads(8,8,1)]`, `[maxvertexcount(3)]`.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: SmolStr,
    pub arguments: Vec<ExprId>,
    pub area: SourceArea,
}

#[derive(Clone, Debug)]
pub struct CodeBlock {
    pub statements: Vec<StmtId>,
    pub area: SourceArea,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    /// `None` is the `default:` case.
    pub case_value: Option<ExprId>,
    pub statements: Vec<StmtId>,
}

#[derive(Clone, Debug)]
pub struct VarIdent {
    pub namespace: Option<SmolStr>,
    pub name: SmolStr,
    pub area: SourceArea,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: SmolStr,
    pub ty: Id<TypeDenoter>,
    pub semantic: Option<Semantic>,
    pub area: SourceArea,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: SmolStr,
    pub ty: Id<TypeDenoter>,
    pub input_modifier: InputModifier,
    pub semantic: Option<Semantic>,
    pub default_value: Option<ExprId>,
    pub area: SourceArea,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InputModifier {
    In,
    Out,
    InOut,
}

/// Declaration node kinds (spec §3.5 "Declarations").
#[derive(Clone, Debug)]
pub enum DeclKind {
    Function {
        name: SmolStr,
        return_type: Id<TypeDenoter>,
        return_semantic: Option<Semantic>,
        parameters: Vec<Parameter>,
        body: Option<CodeBlock>,
        attributes: Vec<Attribute>,
    },
    Variable {
        name: SmolStr,
        ty: Id<TypeDenoter>,
        semantic: Option<Semantic>,
        register: Option<RegisterBinding>,
        pack_offset: Option<PackOffsetBinding>,
        initializer: Option<ExprId>,
        is_const: bool,
    },
    Buffer {
        name: SmolStr,
        ty: Id<TypeDenoter>,
        register: Option<RegisterBinding>,
    },
    Sampler {
        name: SmolStr,
        ty: Id<TypeDenoter>,
        register: Option<RegisterBinding>,
    },
    UniformBuffer {
        name: SmolStr,
        is_texture_buffer: bool,
        fields: Vec<DeclId>,
        register: Option<RegisterBinding>,
    },
    Struct {
        name: Option<SmolStr>,
        fields: Vec<Field>,
        /// The name as written after `:` in `struct S : Base { ... }`, before the
        /// analyzer resolves it to the base struct's declaration (spec §3.5, §7
        /// "illegal multiple/recursive inheritance").
        base_name: Option<SmolStr>,
        base: Option<StructDeclId>,
    },
    Alias {
        name: SmolStr,
        target: Id<TypeDenoter>,
    },
}

#[derive(Clone, Debug)]
pub struct Decl {
    pub kind: DeclKind,
    pub area: SourceArea,
    pub flags: NodeFlags,
    pub leading_comment: Option<SmolStr>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ControlTransferKind {
    Break,
    Continue,
}

/// Statement node kinds (spec §3.5 "Statements").
#[derive(Clone, Debug)]
pub enum StmtKind {
    Null,
    Code(CodeBlock),
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        iteration: Option<ExprId>,
        body: StmtId,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        condition: ExprId,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    Switch {
        selector: ExprId,
        cases: Vec<SwitchCase>,
    },
    Return {
        value: Option<ExprId>,
    },
    ControlTransfer(ControlTransferKind),
    Discard,
    Expression(ExprId),
    Declaration(DeclId),
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub area: SourceArea,
    pub flags: NodeFlags,
    pub leading_comment: Option<SmolStr>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PostUnaryOp {
    PostInc,
    PostDec,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
}

/// Where an identifier or member access resolved to, attached by the analyzer.
#[derive(Copy, Clone, Debug)]
pub enum SymbolRef {
    Unresolved,
    Decl(DeclId),
    Parameter(u32),
    Local(StmtId),
}

/// Expression node kinds (spec §3.5 "Expressions"). Every variant carries an
/// analyzer-filled `resolved_type`, initially `None` (spec Invariant 1: every
/// non-literal expression ends up with a resolved type denoter after analysis).
#[derive(Clone, Debug)]
pub enum ExprKind {
    LiteralBool(bool),
    LiteralInt(i64),
    LiteralFloat(f64),
    LiteralString(SmolStr),
    TypeSpecifier(Id<TypeDenoter>),
    Ternary {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    PostUnary {
        op: PostUnaryOp,
        operand: ExprId,
    },
    Assign {
        op: AssignOp,
        place: ExprId,
        value: ExprId,
    },
    Call {
        callee: SmolStr,
        arguments: Vec<ExprId>,
        resolved_callee: Option<FuncDeclId>,
    },
    Bracket(ExprId),
    Cast {
        target_type: Id<TypeDenoter>,
        operand: ExprId,
    },
    Object {
        ident: VarIdent,
        symbol: SymbolRef,
    },
    Member {
        base: ExprId,
        member: SmolStr,
    },
    ArrayIndex {
        base: ExprId,
        index: ExprId,
    },
    InitializerList(Vec<ExprId>),
    Sequence(Vec<ExprId>),
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub area: SourceArea,
    pub flags: NodeFlags,
    pub leading_comment: Option<SmolStr>,
    pub resolved_type: Option<Id<TypeDenoter>>,
    /// Cached constant value, filled in by the analyzer's constant evaluator for
    /// expressions it proves constant (spec §4.5 "Constant expression evaluation").
    pub constant_value: Option<Variant>,
}

/// The Program root (spec §3.5): owns every declaration/statement/expression node
/// beneath it, plus the type table, exclusively (spec §3.9). Everything else in the
/// pipeline borrows a `Module`/`&mut Module`.
pub struct Module {
    pub decls: Arena<Decl>,
    pub stmts: Arena<Stmt>,
    pub exprs: Arena<Expr>,
    pub types: TypeTable,
    /// Top-level ordered list of global statements (spec §3.5 Program).
    pub globals: Vec<DeclId>,
    /// The preprocessed translation unit's source map, carried on the root so a
    /// diagnostic can still be rendered with its source line after parsing has finished
    /// and the preprocessor itself has gone out of scope (spec §3.9).
    pub source_map: crate::source::SourceMap,
    pub void_type: Id<TypeDenoter>,
    pub error_type: Id<TypeDenoter>,
    pub bool_type: Id<TypeDenoter>,
    pub int_type: Id<TypeDenoter>,
    pub uint_type: Id<TypeDenoter>,
    pub float_type: Id<TypeDenoter>,
    pub double_type: Id<TypeDenoter>,
}

impl Module {
    pub fn new() -> Module {
        let mut types = TypeTable::new();
        let void_type = types.add(TypeDenoter::Void);
        let error_type = types.add(TypeDenoter::Error);
        let bool_type = types.add(TypeDenoter::Base(DataType::Bool));
        let int_type = types.add(TypeDenoter::Base(DataType::Int));
        let uint_type = types.add(TypeDenoter::Base(DataType::UInt));
        let float_type = types.add(TypeDenoter::Base(DataType::Float));
        let double_type = types.add(TypeDenoter::Base(DataType::Double));
        Module {
            decls: Arena::new(),
            stmts: Arena::new(),
            exprs: Arena::new(),
            types,
            globals: Vec::new(),
            source_map: crate::source::SourceMap::new(),
            void_type,
            error_type,
            bool_type,
            int_type,
            uint_type,
            float_type,
            double_type,
        }
    }

    pub fn base_type_of(&self, dt: DataType) -> Id<TypeDenoter> {
        match dt {
            DataType::Void => self.void_type,
            DataType::Bool => self.bool_type,
            DataType::Int => self.int_type,
            DataType::UInt => self.uint_type,
            DataType::Float => self.float_type,
            DataType::Double => self.double_type,
            DataType::Half => self.float_type,
        }
    }

    pub fn vector_type_of(&mut self, dt: DataType, len: u8) -> Id<TypeDenoter> {
        self.types.add(TypeDenoter::Vector(dt, len))
    }

    pub fn func_name(&self, id: FuncDeclId) -> &str {
        match &self.decls[id].kind {
            DeclKind::Function { name, .. } => name.as_str(),
            _ => panic!("not a function decl"),
        }
    }
}

impl TypeContext for Module {
    fn types(&self) -> &TypeTable {
        &self.types
    }
    fn alias_target(&self, id: AliasDeclId) -> Id<TypeDenoter> {
        match &self.decls[id].kind {
            DeclKind::Alias { target, .. } => *target,
            _ => self.error_type,
        }
    }
}

impl TypeContextMut for Module {
    fn as_context(&self) -> &dyn TypeContext {
        self
    }
    fn error_type(&mut self) -> Id<TypeDenoter> {
        self.error_type
    }
    fn base_type(&mut self, dt: DataType) -> Id<TypeDenoter> {
        self.base_type_of(dt)
    }
    fn vector_type(&mut self, dt: DataType, len: u8) -> Id<TypeDenoter> {
        self.vector_type_of(dt, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_ids_round_trip() {
        let mut arena: Arena<i32> = Arena::new();
        let a = arena.push(10);
        let b = arena.push(20);
        assert_eq!(arena[a], 10);
        assert_eq!(arena[b], 20);
    }

    #[test]
    fn module_seeds_primitive_types() {
        let module = Module::new();
        assert!(matches!(module.types[module.int_type], TypeDenoter::Base(DataType::Int)));
    }
}
