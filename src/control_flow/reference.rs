//! Reference (reachability) analyzer (spec §4.6 "Reference analyzer", Invariant 6):
//! flood-fills from the entry point through call expressions, variable/type references,
//! and struct/buffer member access, setting `is_referenced` on every declaration reached.
//! A declaration the emitter never has to touch — an unreachable helper function, an
//! unused struct — is one nothing in this closure ever visits.

use crate::ast::types::{AliasRef, TypeDenoter};
use crate::ast::{CodeBlock, DeclId, DeclKind, Expr, ExprId, ExprKind, Id, Module, StmtId, StmtKind, SymbolRef};
use std::collections::{HashSet, VecDeque};

pub fn analyze(module: &mut Module, entry_point: &str) {
    let mut visited: HashSet<DeclId> = HashSet::new();
    let mut queue: VecDeque<DeclId> = VecDeque::new();

    let entry = module.globals.iter().copied().find(|&d| matches!(&module.decls[d].kind, DeclKind::Function { name, .. } if name.as_str() == entry_point));
    let Some(entry) = entry else { return };
    visited.insert(entry);
    queue.push_back(entry);

    while let Some(decl_id) = queue.pop_front() {
        module.decls[decl_id].flags.is_referenced = true;
        module.decls[decl_id].flags.was_marked = true;
        let kind = module.decls[decl_id].kind.clone();
        match kind {
            DeclKind::Function { parameters, body, return_type, .. } => {
                mark_type(module, return_type, &mut visited, &mut queue);
                for p in &parameters {
                    mark_type(module, p.ty, &mut visited, &mut queue);
                }
                if let Some(block) = body {
                    walk_block(module, &block, &mut visited, &mut queue);
                }
            }
            DeclKind::Variable { ty, initializer, .. } => {
                mark_type(module, ty, &mut visited, &mut queue);
                if let Some(init) = initializer {
                    walk_expr(module, init, &mut visited, &mut queue);
                }
            }
            DeclKind::Buffer { ty, .. } | DeclKind::Sampler { ty, .. } => {
                mark_type(module, ty, &mut visited, &mut queue);
            }
            DeclKind::UniformBuffer { fields, .. } => {
                for f in fields {
                    enqueue(f, &mut visited, &mut queue);
                }
            }
            DeclKind::Struct { fields, base, .. } => {
                for f in &fields {
                    mark_type(module, f.ty, &mut visited, &mut queue);
                }
                if let Some(b) = base {
                    enqueue(b, &mut visited, &mut queue);
                }
            }
            DeclKind::Alias { target, .. } => {
                mark_type(module, target, &mut visited, &mut queue);
            }
        }
    }
}

fn enqueue(decl_id: DeclId, visited: &mut HashSet<DeclId>, queue: &mut VecDeque<DeclId>) {
    if visited.insert(decl_id) {
        queue.push_back(decl_id);
    }
}

fn mark_type(module: &Module, ty: Id<TypeDenoter>, visited: &mut HashSet<DeclId>, queue: &mut VecDeque<DeclId>) {
    match module.types[ty].clone() {
        TypeDenoter::Struct(crate::ast::StructRef::Resolved(d)) => enqueue(d, visited, queue),
        TypeDenoter::Alias(AliasRef::Resolved(d)) => enqueue(d, visited, queue),
        TypeDenoter::Array(sub, _) => mark_type(module, sub, visited, queue),
        TypeDenoter::Buffer(_, Some(sub), _) => mark_type(module, sub, visited, queue),
        _ => {}
    }
}

fn walk_block(module: &Module, block: &CodeBlock, visited: &mut HashSet<DeclId>, queue: &mut VecDeque<DeclId>) {
    for &s in &block.statements {
        walk_stmt(module, s, visited, queue);
    }
}

fn walk_stmt(module: &Module, stmt_id: StmtId, visited: &mut HashSet<DeclId>, queue: &mut VecDeque<DeclId>) {
    let kind = module.stmts[stmt_id].kind.clone();
    match kind {
        StmtKind::Null | StmtKind::ControlTransfer(_) | StmtKind::Discard => {}
        StmtKind::Code(block) => walk_block(module, &block, visited, queue),
        StmtKind::For { init, condition, iteration, body } => {
            if let Some(i) = init {
                walk_stmt(module, i, visited, queue);
            }
            if let Some(c) = condition {
                walk_expr(module, c, visited, queue);
            }
            if let Some(it) = iteration {
                walk_expr(module, it, visited, queue);
            }
            walk_stmt(module, body, visited, queue);
        }
        StmtKind::While { condition, body } => {
            walk_expr(module, condition, visited, queue);
            walk_stmt(module, body, visited, queue);
        }
        StmtKind::DoWhile { body, condition } => {
            walk_stmt(module, body, visited, queue);
            walk_expr(module, condition, visited, queue);
        }
        StmtKind::If { condition, then_branch, else_branch } => {
            walk_expr(module, condition, visited, queue);
            walk_stmt(module, then_branch, visited, queue);
            if let Some(e) = else_branch {
                walk_stmt(module, e, visited, queue);
            }
        }
        StmtKind::Switch { selector, cases } => {
            walk_expr(module, selector, visited, queue);
            for case in cases {
                if let Some(v) = case.case_value {
                    walk_expr(module, v, visited, queue);
                }
                for s in case.statements {
                    walk_stmt(module, s, visited, queue);
                }
            }
        }
        StmtKind::Return { value } => {
            if let Some(v) = value {
                walk_expr(module, v, visited, queue);
            }
        }
        StmtKind::Expression(e) => walk_expr(module, e, visited, queue),
        StmtKind::Declaration(d) => enqueue(d, visited, queue),
    }
}

fn walk_expr(module: &Module, expr_id: ExprId, visited: &mut HashSet<DeclId>, queue: &mut VecDeque<DeclId>) {
    let expr: &Expr = &module.exprs[expr_id];
    if let Some(t) = expr.resolved_type {
        mark_type(module, t, visited, queue);
    }
    match expr.kind.clone() {
        ExprKind::Object { symbol: SymbolRef::Decl(d), .. } => enqueue(d, visited, queue),
        ExprKind::Object { .. } | ExprKind::LiteralBool(_) | ExprKind::LiteralInt(_) | ExprKind::LiteralFloat(_) | ExprKind::LiteralString(_) | ExprKind::TypeSpecifier(_) => {}
        ExprKind::Ternary { condition, then_expr, else_expr } => {
            walk_expr(module, condition, visited, queue);
            walk_expr(module, then_expr, visited, queue);
            walk_expr(module, else_expr, visited, queue);
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr(module, left, visited, queue);
            walk_expr(module, right, visited, queue);
        }
        ExprKind::Unary { operand, .. } | ExprKind::PostUnary { operand, .. } => {
            walk_expr(module, operand, visited, queue);
        }
        ExprKind::Bracket(operand) => walk_expr(module, operand, visited, queue),
        ExprKind::Cast { target_type, operand } => {
            mark_type(module, target_type, visited, queue);
            walk_expr(module, operand, visited, queue);
        }
        ExprKind::Assign { place, value, .. } => {
            walk_expr(module, place, visited, queue);
            walk_expr(module, value, visited, queue);
        }
        ExprKind::Call { arguments, resolved_callee, .. } => {
            if let Some(d) = resolved_callee {
                enqueue(d, visited, queue);
            }
            for a in arguments {
                walk_expr(module, a, visited, queue);
            }
        }
        ExprKind::Member { base, .. } => walk_expr(module, base, visited, queue),
        ExprKind::ArrayIndex { base, index } => {
            walk_expr(module, base, visited, queue);
            walk_expr(module, index, visited, queue);
        }
        ExprKind::InitializerList(items) | ExprKind::Sequence(items) => {
            for i in items {
                walk_expr(module, i, visited, queue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{InputShaderVersion, ShaderTarget, WarningFlags};
    use crate::report::{PlainTextLog, ReportHandler};

    fn parse_and_mark(src: &str, entry: &str) -> Module {
        let mut log = PlainTextLog { sink: String::new() };
        let mut handler = ReportHandler::new(&mut log);
        let mut map = crate::source::SourceMap::new();
        let origin = map.add_origin("t.hlsl", 1, 1);
        let scanner = crate::scanner::Scanner::new(crate::source::SourceBuffer::new(src, origin), InputShaderVersion::Hlsl5, crate::scanner::ScannerMode::Language);
        let parser = crate::parser::Parser::new(scanner, &mut handler, false);
        let mut module = parser.parse_translation_unit();
        let mut analyzer = crate::analyzer::Analyzer::new(&mut handler, WarningFlags::all());
        analyzer.analyze(&mut module, entry, ShaderTarget::Fragment);
        analyze(&mut module, entry);
        module
    }

    #[test]
    fn reachable_helper_is_referenced_unreachable_is_not() {
        let module = parse_and_mark(
            "float4 helper(){ return float4(1,1,1,1); } float4 dead(){ return float4(0,0,0,0); } float4 main() : SV_Target { return helper(); }",
            "main",
        );
        let helper = module.globals.iter().copied().find(|&d| module.func_name(d) == "helper").unwrap();
        let dead = module.globals.iter().copied().find(|&d| module.func_name(d) == "dead").unwrap();
        assert!(module.decls[helper].flags.is_referenced);
        assert!(!module.decls[dead].flags.is_referenced);
    }
}
