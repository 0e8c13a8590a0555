//! End-of-scope analyzer (spec §4.6 "End-of-scope analyzer"): marks every `return`
//! statement that is syntactically last in its function body, or last in every terminal
//! branch of an `if`/`else` that is itself last, with `is_end_of_function` — a hint the
//! (out-of-scope) emitter can use to elide a trailing `return` the target language
//! doesn't require.

use crate::ast::{CodeBlock, DeclKind, Module, StmtId, StmtKind};

pub fn analyze(module: &mut Module) {
    let globals = module.globals.clone();
    for decl_id in globals {
        let body = match &module.decls[decl_id].kind {
            DeclKind::Function { body: Some(body), .. } => body.clone(),
            _ => continue,
        };
        mark_block_tail(module, &body);
    }
}

fn mark_block_tail(module: &mut Module, block: &CodeBlock) {
    if let Some(&last) = block.statements.last() {
        mark_stmt_tail(module, last);
    }
}

fn mark_stmt_tail(module: &mut Module, stmt_id: StmtId) {
    let kind = module.stmts[stmt_id].kind.clone();
    match kind {
        StmtKind::Return { .. } => {
            module.stmts[stmt_id].flags.is_end_of_function = true;
        }
        StmtKind::Code(block) => mark_block_tail(module, &block),
        StmtKind::If { then_branch, else_branch: Some(else_branch), .. } => {
            mark_stmt_tail(module, then_branch);
            mark_stmt_tail(module, else_branch);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{InputShaderVersion, ShaderTarget, WarningFlags};
    use crate::report::{PlainTextLog, ReportHandler};

    fn parse_and_mark(src: &str) -> Module {
        let mut log = PlainTextLog { sink: String::new() };
        let mut handler = ReportHandler::new(&mut log);
        let mut map = crate::source::SourceMap::new();
        let origin = map.add_origin("t.hlsl", 1, 1);
        let scanner = crate::scanner::Scanner::new(crate::source::SourceBuffer::new(src, origin), InputShaderVersion::Hlsl5, crate::scanner::ScannerMode::Language);
        let parser = crate::parser::Parser::new(scanner, &mut handler, false);
        let mut module = parser.parse_translation_unit();
        let mut analyzer = crate::analyzer::Analyzer::new(&mut handler, WarningFlags::all());
        analyzer.analyze(&mut module, "f", ShaderTarget::Fragment);
        analyze(&mut module);
        module
    }

    #[test]
    fn trailing_return_is_flagged() {
        let module = parse_and_mark("int f(){ int x = 1; return x; }");
        let decl = module.globals[0];
        if let DeclKind::Function { body: Some(block), .. } = &module.decls[decl].kind {
            let last = *block.statements.last().unwrap();
            assert!(module.stmts[last].flags.is_end_of_function);
        } else {
            panic!("expected function body");
        }
    }

    #[test]
    fn both_branches_of_a_trailing_if_else_are_flagged() {
        let module = parse_and_mark("int f(int x){ if (x>0) return 1; else return 0; }");
        let decl = module.globals[0];
        if let DeclKind::Function { body: Some(block), .. } = &module.decls[decl].kind {
            let if_stmt = *block.statements.last().unwrap();
            if let StmtKind::If { then_branch, else_branch: Some(else_branch), .. } = &module.stmts[if_stmt].kind {
                assert!(module.stmts[*then_branch].flags.is_end_of_function);
                assert!(module.stmts[*else_branch].flags.is_end_of_function);
            } else {
                panic!("expected if/else");
            }
        } else {
            panic!("expected function body");
        }
    }
}
