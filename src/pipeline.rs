//! Wires the stages together (spec §2, §6.1 `compile`): preprocess, parse, analyze, then
//! run the control-flow passes over the resulting [`Module`]. Kept as its own module so
//! `interfaces::compile` stays a thin adapter over whatever `Log`/emit closure the caller
//! supplies.

use crate::analyzer::Analyzer;
use crate::ast::Module;
use crate::control_flow;
use crate::interfaces::InputDescriptor;
use crate::parser::Parser;
use crate::preprocessor::Preprocessor;
use crate::report::{Report, ReportHandler};
use crate::scanner::{Scanner, ScannerMode};
use crate::source::Origin;

pub fn run(input: InputDescriptor<'_>, handler: &mut ReportHandler<'_>) -> Result<Module, Report> {
    let InputDescriptor {
        filename,
        source,
        entry_point,
        shader_target,
        shader_version_in,
        predefined_macros,
        include_handler,
        warnings,
        ..
    } = input;

    let mut preprocessor = Preprocessor::new(include_handler, handler, shader_version_in, &predefined_macros);
    let (tokens, source_map) = preprocessor
        .run(&filename, &source)
        .map_err(|e| e.into_report(None))?;
    let pack_matrix_row_major = preprocessor.pack_matrix_row_major().unwrap_or(false);

    let scanner = Scanner::from_tokens(tokens, Origin(0), shader_version_in);
    let scanner = {
        let mut s = scanner;
        s.set_mode(ScannerMode::Language);
        s
    };
    let parser = Parser::new(scanner, handler, pack_matrix_row_major);
    let mut module = parser.parse_translation_unit();
    module.source_map = source_map;

    if handler.has_errors() {
        return Ok(module);
    }

    let mut analyzer = Analyzer::new(handler, warnings);
    analyzer.analyze(&mut module, &entry_point, shader_target);
    control_flow::analyze(&mut module, handler, warnings, &entry_point);

    Ok(module)
}
