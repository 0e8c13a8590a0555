//! End-to-end scenarios driven entirely through `compile()`, matching the concrete
//! inputs/outputs laid out for the pipeline as a whole (preprocessor through
//! control-flow passes).

use hlslxc::interfaces::{InputDescriptor, InputShaderVersion, NullIncludeHandler, ShaderTarget, WarningFlags};
use hlslxc::report::{Log, PlainTextLog, Report};

struct CollectLog {
    reports: Vec<Report>,
}

impl Log for CollectLog {
    fn submit(&mut self, report: &Report) {
        self.reports.push(report.clone());
    }
}

fn input<'a>(source: &str, entry_point: &str, include_handler: &'a mut NullIncludeHandler) -> InputDescriptor<'a> {
    InputDescriptor {
        filename: "t.hlsl".to_string(),
        source: source.to_string(),
        entry_point: entry_point.to_string(),
        secondary_entry_point: None,
        shader_target: ShaderTarget::Fragment,
        shader_version_in: InputShaderVersion::Hlsl5,
        predefined_macros: Vec::new(),
        include_handler,
        warnings: WarningFlags::all(),
        extensions: Default::default(),
    }
}

#[test]
fn macro_expansion_produces_a_clean_compile() {
    let mut include = NullIncludeHandler;
    let desc = input(
        "#define SQR(x) ((x)*(x))\nfloat4 main() : SV_Target { float a = 1.0; float y = SQR(a+1); return float4(y,0,0,1); }",
        "main",
        &mut include,
    );
    let mut log = CollectLog { reports: Vec::new() };
    let ok = hlslxc::compile(desc, &hlslxc::interfaces::OutputDescriptor {
        shader_version_out: hlslxc::interfaces::OutputShaderVersion::Glsl(450),
        options: Default::default(),
        vertex_semantics_map: Vec::new(),
        name_mangling: Default::default(),
        formatting: Default::default(),
        uniform_packing: false,
    }, &mut log, |_module| {});
    assert!(ok, "expected a clean compile, got: {:?}", log.reports);
}

#[test]
fn non_returning_path_is_reported_as_an_error() {
    let mut include = NullIncludeHandler;
    let desc = input("int f(int x){ if (x>0) return 1; } float4 main() : SV_Target { f(1); return float4(0,0,0,1); }", "main", &mut include);
    let mut log = CollectLog { reports: Vec::new() };
    let ok = hlslxc::compile(desc, &hlslxc::interfaces::OutputDescriptor {
        shader_version_out: hlslxc::interfaces::OutputShaderVersion::Glsl(450),
        options: Default::default(),
        vertex_semantics_map: Vec::new(),
        name_mangling: Default::default(),
        formatting: Default::default(),
        uniform_packing: false,
    }, &mut log, |_module| {});
    assert!(!ok);
    assert!(log.reports.iter().any(|r| matches!(r.code, Some(hlslxc::report::DiagnosticCode::MissingReturn))));
}

#[test]
fn undeclared_identifier_reports_a_did_you_mean_hint() {
    let mut include = NullIncludeHandler;
    let desc = input(
        "float4 main() : SV_Target { float position = 1.0; return float4(postion,0,0,1); }",
        "main",
        &mut include,
    );
    let mut log = PlainTextLog { sink: String::new() };
    let ok = hlslxc::compile(desc, &hlslxc::interfaces::OutputDescriptor {
        shader_version_out: hlslxc::interfaces::OutputShaderVersion::Glsl(450),
        options: Default::default(),
        vertex_semantics_map: Vec::new(),
        name_mangling: Default::default(),
        formatting: Default::default(),
        uniform_packing: false,
    }, &mut log, |_module| {});
    assert!(!ok);
    assert!(log.sink.contains("did you mean 'position'?"));
}

#[test]
fn dead_code_after_return_still_compiles_with_a_warning() {
    let mut include = NullIncludeHandler;
    let desc = input(
        "float4 main() : SV_Target { return float4(0,0,0,1); float unreachable = 2.0; }",
        "main",
        &mut include,
    );
    let mut log = PlainTextLog { sink: String::new() };
    let ok = hlslxc::compile(desc, &hlslxc::interfaces::OutputDescriptor {
        shader_version_out: hlslxc::interfaces::OutputShaderVersion::Glsl(450),
        options: Default::default(),
        vertex_semantics_map: Vec::new(),
        name_mangling: Default::default(),
        formatting: Default::default(),
        uniform_packing: false,
    }, &mut log, |_module| {});
    assert!(ok);
    assert!(log.sink.contains("unreachable") || log.sink.contains("DeadCode"));
}

#[test]
fn include_once_makes_a_second_include_a_no_op() {
    struct FixtureIncludeHandler;
    impl hlslxc::interfaces::IncludeHandler for FixtureIncludeHandler {
        fn include(&mut self, name: &str, _use_search_paths: bool) -> Result<String, hlslxc::interfaces::IncludeError> {
            if name == "common.hlsl" {
                Ok("#pragma once\nstatic const float kPi = 3.14159;\n".to_string())
            } else {
                Err(hlslxc::interfaces::IncludeError { name: name.to_string(), message: "not found".to_string() })
            }
        }
    }
    let mut include = FixtureIncludeHandler;
    let desc = InputDescriptor {
        filename: "t.hlsl".to_string(),
        source: "#include \"common.hlsl\"\n#include \"common.hlsl\"\nfloat4 main() : SV_Target { return float4(kPi,0,0,1); }".to_string(),
        entry_point: "main".to_string(),
        secondary_entry_point: None,
        shader_target: ShaderTarget::Fragment,
        shader_version_in: InputShaderVersion::Hlsl5,
        predefined_macros: Vec::new(),
        include_handler: &mut include,
        warnings: WarningFlags::all(),
        extensions: Default::default(),
    };
    let mut log = CollectLog { reports: Vec::new() };
    let ok = hlslxc::compile(desc, &hlslxc::interfaces::OutputDescriptor {
        shader_version_out: hlslxc::interfaces::OutputShaderVersion::Glsl(450),
        options: Default::default(),
        vertex_semantics_map: Vec::new(),
        name_mangling: Default::default(),
        formatting: Default::default(),
        uniform_packing: false,
    }, &mut log, |_module| {});
    assert!(ok, "expected a clean compile, got: {:?}", log.reports);
    assert!(!log.reports.iter().any(|r| matches!(r.code, Some(hlslxc::report::DiagnosticCode::DuplicateDeclaration))));
}
