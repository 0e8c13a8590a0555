//! Offline HLSL (and the Cg keyword superset) cross-compiler frontend: preprocessor,
//! scanner, parser, type/symbol analyzer, and control-flow passes feeding a fully
//! resolved [`ast::Module`] (spec §1, §2). Emitting GLSL/ESSL/VKSL/Metal text from that
//! module is a separate, out-of-scope concern (spec §1 Non-goals) left to a caller's
//! own backend, driven through [`interfaces::compile`].

pub mod ast;
pub mod token;
pub mod keywords;
pub mod source;
pub mod scanner;
pub mod symbol;
pub mod variant;
pub mod preprocessor;
pub mod parser;
pub mod analyzer;
pub mod control_flow;
pub mod report;
pub mod interfaces;
pub mod pipeline;

pub use interfaces::compile;
