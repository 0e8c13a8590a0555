//! Control-flow passes that run after the analyzer has stabilized every declaration's
//! shape (spec §4.6): return-path coverage, end-of-scope return marking, and reachability
//! from the entry point. Each pass is kept independent since they read different parts of
//! the flag set and none depends on another having run first.

pub mod end_of_scope;
pub mod reference;
pub mod return_path;

use crate::ast::Module;
use crate::interfaces::WarningFlags;
use crate::report::ReportHandler;

pub fn analyze(module: &mut Module, handler: &mut ReportHandler<'_>, warnings: WarningFlags, entry_point: &str) {
    return_path::analyze(module, handler, warnings);
    end_of_scope::analyze(module);
    reference::analyze(module, entry_point);
}
