//! External interfaces (spec §6): the enumerations, option bags, and collaborator traits
//! through which the pipeline is driven and through which it reaches the explicitly
//! out-of-scope external collaborators (CLI shell, presetting runner, include resolver,
//! disassembler, code emitters).

use crate::ast::Module;
use crate::report::{Log, Report};
use std::fmt;
use strum::{Display, EnumString};

/// spec §6.2 "Shader target".
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, EnumString)]
pub enum ShaderTarget {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

/// spec §6.2 "Input shader version".
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, EnumString)]
pub enum InputShaderVersion {
    Cg,
    Hlsl3,
    Hlsl4,
    Hlsl5,
    Hlsl6,
    Glsl,
    Essl,
    Vksl,
}

/// spec §6.2 "Output shader version" — GLSL/ESSL/VKSL/Metal, each carrying its numeric
/// version so the (out-of-scope) emitter can gate feature availability.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OutputShaderVersion {
    Glsl(u16),
    Essl(u16),
    Vksl(u16),
    Metal(u16),
}

impl fmt::Display for OutputShaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputShaderVersion::Glsl(v) => write!(f, "GLSL {}", v),
            OutputShaderVersion::Essl(v) => write!(f, "ESSL {}", v),
            OutputShaderVersion::Vksl(v) => write!(f, "VKSL {}", v),
            OutputShaderVersion::Metal(v) => write!(f, "Metal {}.{}", v / 10, v % 10),
        }
    }
}

/// spec §6.3 — all boolean unless noted.
#[derive(Copy, Clone, Debug)]
pub struct Options {
    pub preprocess_only: bool,
    pub validate_only: bool,
    pub show_ast: bool,
    pub show_times: bool,
    pub optimize: bool,
    pub allow_extensions: bool,
    pub explicit_binding: bool,
    pub auto_binding: bool,
    pub auto_binding_start_slot: u32,
    pub preserve_comments: bool,
    pub prefer_wrappers: bool,
    pub unroll_array_initializers: bool,
    pub obfuscate: bool,
    pub row_major_alignment: bool,
    pub separate_shaders: bool,
    pub separate_samplers: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            preprocess_only: false,
            validate_only: false,
            show_ast: false,
            show_times: false,
            optimize: false,
            allow_extensions: false,
            explicit_binding: false,
            auto_binding: false,
            auto_binding_start_slot: 0,
            preserve_comments: false,
            prefer_wrappers: false,
            unroll_array_initializers: false,
            obfuscate: false,
            row_major_alignment: false,
            separate_shaders: false,
            separate_samplers: false,
        }
    }
}

/// spec §6.4 "Formatting".
#[derive(Clone, Debug)]
pub struct Formatting {
    pub blanks: bool,
    pub always_braced_scopes: bool,
    pub compact_wrappers: bool,
    pub line_marks: bool,
    pub line_separation: bool,
    pub new_line_open_scope: bool,
    pub indent: String,
}

impl Default for Formatting {
    fn default() -> Self {
        Formatting {
            blanks: true,
            always_braced_scopes: false,
            compact_wrappers: false,
            line_marks: false,
            line_separation: true,
            new_line_open_scope: false,
            indent: "    ".to_string(),
        }
    }
}

/// spec §6.5 "Name mangling".
#[derive(Clone, Debug)]
pub struct NameMangling {
    pub input_prefix: String,
    pub output_prefix: String,
    pub reserved_word_prefix: String,
    pub temporary_prefix: String,
    pub namespace_prefix: String,
    pub rename_buffer_fields: bool,
    pub use_always_semantics: bool,
}

impl Default for NameMangling {
    fn default() -> Self {
        NameMangling {
            input_prefix: "_in_".to_string(),
            output_prefix: "_out_".to_string(),
            reserved_word_prefix: "_".to_string(),
            temporary_prefix: "_tmp_".to_string(),
            namespace_prefix: "_ns_".to_string(),
            rename_buffer_fields: false,
            use_always_semantics: false,
        }
    }
}

/// spec §6.6: `include(name, use_search_paths) -> character stream`. Implementations
/// must throw (return `Err`) on failure; the preprocessor turns that into an error
/// report at the `#include` directive site (spec §4.3 "Includes").
pub trait IncludeHandler {
    fn include(&mut self, name: &str, use_search_paths: bool) -> Result<String, IncludeError>;
}

#[derive(thiserror::Error, Debug)]
#[error("could not include '{name}': {message}")]
pub struct IncludeError {
    pub name: String,
    pub message: String,
}

/// An `IncludeHandler` that never resolves anything, for translation units known not to
/// use `#include`.
pub struct NullIncludeHandler;

impl IncludeHandler for NullIncludeHandler {
    fn include(&mut self, name: &str, _use_search_paths: bool) -> Result<String, IncludeError> {
        Err(IncludeError {
            name: name.to_string(),
            message: "no include handler configured".to_string(),
        })
    }
}

/// spec §6.1 `input_desc`.
pub struct InputDescriptor<'a> {
    pub filename: String,
    pub source: String,
    pub entry_point: String,
    pub secondary_entry_point: Option<String>,
    pub shader_target: ShaderTarget,
    pub shader_version_in: InputShaderVersion,
    pub predefined_macros: Vec<(String, String)>,
    pub include_handler: &'a mut dyn IncludeHandler,
    pub warnings: WarningFlags,
    pub extensions: ExtensionFlags,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct WarningFlags {
    pub vector_truncation: bool,
    pub implicit_conversion: bool,
    pub unused_variable: bool,
    pub dead_code: bool,
    pub empty_statement_body: bool,
}

impl WarningFlags {
    pub fn all() -> WarningFlags {
        WarningFlags {
            vector_truncation: true,
            implicit_conversion: true,
            unused_variable: true,
            dead_code: true,
            empty_statement_body: true,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ExtensionFlags {
    pub allow_cg_keywords: bool,
}

/// spec §6.1 `output_desc`.
pub struct OutputDescriptor {
    pub shader_version_out: OutputShaderVersion,
    pub options: Options,
    pub vertex_semantics_map: Vec<(String, u32)>,
    pub name_mangling: NameMangling,
    pub formatting: Formatting,
    pub uniform_packing: bool,
}

/// spec §6.1: `compile(input_desc, output_desc, log) -> bool`, true iff no errors were
/// reported. This crate's scope ends at producing a fully analyzed [`Module`]; handing
/// it to a target-specific emitter is the out-of-scope collaborator's job (spec §1), so
/// `compile` takes an optional emit closure instead of a hardcoded backend list.
pub fn compile(
    input: InputDescriptor<'_>,
    _output: &OutputDescriptor,
    log: &mut dyn Log,
    mut emit: impl FnMut(&Module),
) -> bool {
    let mut handler = crate::report::ReportHandler::new(log);
    match crate::pipeline::run(input, &mut handler) {
        Ok(module) => {
            if !handler.has_errors() {
                emit(&module);
            }
            !handler.has_errors()
        }
        Err(report) => {
            handler.submit(report);
            false
        }
    }
}
