//! Return-path coverage analysis and dead-code-after-return marking (spec §4.6
//! "Return-path analyzer"): a stack machine over a boolean "has-return-on-this-path"
//! value, walked the same way `Analyzer` walks statement lists (see
//! `crate::analyzer::mod`), but kept as its own pass since it runs after overload/type
//! resolution has stabilized every `Decl`'s shape.

use crate::ast::types::TypeDenoter;
use crate::ast::{CodeBlock, ControlTransferKind, DeclKind, Module, StmtId, StmtKind, SwitchCase};
use crate::interfaces::WarningFlags;
use crate::report::{DiagnosticCode, Phase, Report, ReportHandler, ReportType};

/// Runs the return-path check over every function in `module`, flagging
/// `has_non_return_control_path` on non-void functions that do not return on all paths
/// (spec Invariant 3) and `is_dead_code` on statements following an unconditional return
/// (spec §8 scenario 3).
pub fn analyze(module: &mut Module, handler: &mut ReportHandler<'_>, warnings: WarningFlags) {
    let globals = module.globals.clone();
    for decl_id in globals {
        let (block, is_void, is_forward_decl, area, name) = match &module.decls[decl_id].kind {
            DeclKind::Function { body: Some(body), return_type, name, .. } => {
                let is_void = matches!(module.types[*return_type], TypeDenoter::Void);
                (body.clone(), is_void, module.decls[decl_id].flags.is_forward_decl, module.decls[decl_id].area, name.clone())
            }
            _ => continue,
        };
        let all_paths_return = analyze_block(module, handler, &block, warnings.dead_code);
        if !is_void && !all_paths_return && !is_forward_decl {
            module.decls[decl_id].flags.has_non_return_control_path = true;
            handler.submit(
                Report::new(ReportType::Error, Phase::Context, format!("not all control paths of '{name}' return a value"))
                    .with_code(DiagnosticCode::MissingReturn)
                    .with_area(area),
            );
        }
    }
}

/// Walks one statement list; once a statement is found that always returns, every
/// statement after it in the same list is unreachable.
fn analyze_block(module: &mut Module, handler: &mut ReportHandler<'_>, block: &CodeBlock, warn_dead: bool) -> bool {
    let mut returns = false;
    for &stmt_id in &block.statements {
        if returns {
            mark_dead(module, handler, stmt_id, warn_dead);
        }
        if analyze_stmt(module, handler, stmt_id, warn_dead) {
            returns = true;
        }
    }
    returns
}

fn mark_dead(module: &mut Module, handler: &mut ReportHandler<'_>, stmt_id: StmtId, warn_dead: bool) {
    module.stmts[stmt_id].flags.is_dead_code = true;
    if warn_dead {
        let area = module.stmts[stmt_id].area;
        handler.submit(
            Report::new(ReportType::Warning, Phase::Context, "statement is unreachable")
                .with_code(DiagnosticCode::DeadCode)
                .with_area(area),
        );
    }
}

/// Returns whether `stmt_id` itself guarantees a return on every path through it.
fn analyze_stmt(module: &mut Module, handler: &mut ReportHandler<'_>, stmt_id: StmtId, warn_dead: bool) -> bool {
    let kind = module.stmts[stmt_id].kind.clone();
    match kind {
        StmtKind::Return { .. } => true,
        StmtKind::Code(block) => analyze_block(module, handler, &block, warn_dead),
        StmtKind::If { condition: _, then_branch, else_branch } => {
            let then_ret = analyze_stmt(module, handler, then_branch, warn_dead);
            let else_ret = match else_branch {
                Some(e) => analyze_stmt(module, handler, e, warn_dead),
                None => false,
            };
            then_ret && else_ret
        }
        StmtKind::Switch { selector: _, cases } => analyze_switch(module, handler, &cases, warn_dead),
        StmtKind::For { body, .. } | StmtKind::While { body, .. } => {
            analyze_stmt(module, handler, body, warn_dead);
            false
        }
        StmtKind::DoWhile { body, .. } => {
            analyze_stmt(module, handler, body, warn_dead);
            false
        }
        _ => false,
    }
}

/// A `switch` guarantees a return iff it has a `default` case and every case either
/// returns on its own or falls through (no `break`) into a case that does (spec §4.6:
/// "fallthrough-to-return counts").
fn analyze_switch(module: &mut Module, handler: &mut ReportHandler<'_>, cases: &[SwitchCase], warn_dead: bool) -> bool {
    let has_default = cases.iter().any(|c| c.case_value.is_none());
    let mut results = vec![false; cases.len()];
    for i in (0..cases.len()).rev() {
        let case = &cases[i];
        let mut local_return = false;
        let mut broke = false;
        for &s in &case.statements {
            if local_return {
                mark_dead(module, handler, s, warn_dead);
            }
            if analyze_stmt(module, handler, s, warn_dead) {
                local_return = true;
            }
            if matches!(module.stmts[s].kind, StmtKind::ControlTransfer(ControlTransferKind::Break)) {
                broke = true;
            }
        }
        let next_returns = results.get(i + 1).copied().unwrap_or(false);
        results[i] = local_return || (!broke && next_returns);
    }
    has_default && !cases.is_empty() && results.iter().all(|&r| r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::InputShaderVersion;
    use crate::report::PlainTextLog;

    fn run_analysis(src: &str) -> (Module, bool, bool) {
        let mut log = PlainTextLog { sink: String::new() };
        let mut handler = ReportHandler::new(&mut log);
        let mut map = crate::source::SourceMap::new();
        let origin = map.add_origin("t.hlsl", 1, 1);
        let scanner = crate::scanner::Scanner::new(crate::source::SourceBuffer::new(src, origin), InputShaderVersion::Hlsl5, crate::scanner::ScannerMode::Language);
        let parser = crate::parser::Parser::new(scanner, &mut handler, false);
        let mut module = parser.parse_translation_unit();
        let mut analyzer = crate::analyzer::Analyzer::new(&mut handler, WarningFlags::all());
        analyzer.analyze(&mut module, "f", crate::interfaces::ShaderTarget::Fragment);
        analyze(&mut module, &mut handler, WarningFlags::all());
        (module, handler.has_errors(), log.sink.contains("unreachable"))
    }

    #[test]
    fn missing_return_on_some_path_is_an_error() {
        let (module, errs, _) = run_analysis("int f(int x){ if (x>0) return 1; }");
        let decl = module.globals[0];
        assert!(module.decls[decl].flags.has_non_return_control_path);
        assert!(errs);
    }

    #[test]
    fn statement_after_return_is_dead_code() {
        let (module, _, warned) = run_analysis("int f(){ return 1; int x = 2; }");
        let decl = module.globals[0];
        if let DeclKind::Function { body: Some(block), .. } = &module.decls[decl].kind {
            let dead_stmt = block.statements[1];
            assert!(module.stmts[dead_stmt].flags.is_dead_code);
        } else {
            panic!("expected function body");
        }
        assert!(warned);
    }

    #[test]
    fn if_else_both_returning_covers_all_paths() {
        let (module, errs, _) = run_analysis("int f(int x){ if (x>0) return 1; else return 0; }");
        let decl = module.globals[0];
        assert!(!module.decls[decl].flags.has_non_return_control_path);
        assert!(!errs);
    }
}
