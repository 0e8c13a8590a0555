//! HLSL (and Cg superset) keyword tables (spec §4.2), supplemented per
//! SPEC_FULL.md §E from the original's `HLSLKeywords.cpp`: keyword recognition is
//! parameterized by the input dialect/version, since some keywords are reserved in one
//! version and unsupported (valid spelling, but rejected because the targeted shader
//! model doesn't have the feature) in another.

use crate::interfaces::InputShaderVersion;
use crate::token::KeywordClass;
use std::collections::HashMap;

/// What happens when this spelling is scanned as an identifier-shaped token, for a given
/// input dialect/version.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum KeywordLookup {
    /// Not a keyword at all in this dialect; scans as a plain identifier.
    NotAKeyword,
    /// A real, usable keyword of the given class.
    Keyword(KeywordClass),
    /// A keyword spelling that is reserved (cannot be used as an identifier) but not
    /// implemented — scanning it is a lexical error (spec §4.2, §7 "reserved keyword").
    Reserved,
    /// A keyword spelling recognized by a *different* version/dialect than the one
    /// requested — scanning it is a different lexical error ("unsupported keyword").
    Unsupported,
}

struct KeywordTable {
    entries: HashMap<&'static str, (KeywordClass, InputShaderVersion)>,
    reserved: &'static [&'static str],
}

fn base_table() -> KeywordTable {
    use InputShaderVersion::*;
    use KeywordClass::*;
    let mut entries = HashMap::new();

    macro_rules! kw {
        ($name:literal, $class:expr, $since:expr) => {
            entries.insert($name, ($class, $since));
        };
    }

    for (spelling, dims) in [("float", 0), ("int", 0), ("uint", 0), ("bool", 0), ("double", 0), ("half", 0)] {
        let _ = dims;
        kw!(spelling, ScalarType, Hlsl3);
    }
    kw!("void", TypeModifier, Hlsl3);
    kw!("string", ScalarType, Hlsl3);
    kw!("dword", ScalarType, Hlsl3);

    for base in ["float", "int", "uint", "bool", "half", "double"] {
        for n in 1..=4 {
            let s: &'static str = Box::leak(format!("{base}{n}").into_boxed_str());
            entries.insert(s, (VectorType, Hlsl3));
            for m in 1..=4 {
                let s2: &'static str = Box::leak(format!("{base}{n}x{m}").into_boxed_str());
                entries.insert(s2, (MatrixType, Hlsl3));
            }
        }
    }
    kw!("vector", VectorType, Hlsl3);
    kw!("matrix", MatrixType, Hlsl3);

    kw!("struct", Struct, Hlsl3);
    kw!("typedef", Typedef, Hlsl3);
    kw!("class", Struct, Hlsl5);
    kw!("interface", Struct, Hlsl5);

    kw!("if", ControlFlow, Hlsl3);
    kw!("else", ControlFlow, Hlsl3);
    kw!("for", ControlFlow, Hlsl3);
    kw!("while", ControlFlow, Hlsl3);
    kw!("do", ControlFlow, Hlsl3);
    kw!("switch", ControlFlow, Hlsl3);
    kw!("case", ControlFlow, Hlsl3);
    kw!("default", ControlFlow, Hlsl3);

    kw!("return", Return, Hlsl3);
    kw!("break", ControlTransfer, Hlsl3);
    kw!("continue", ControlTransfer, Hlsl3);
    kw!("discard", Discard, Hlsl3);

    kw!("in", InputModifier, Hlsl3);
    kw!("out", InputModifier, Hlsl3);
    kw!("inout", InputModifier, Hlsl3);
    kw!("uniform", InputModifier, Hlsl3);

    kw!("linear", InterpolationModifier, Hlsl4);
    kw!("centroid", InterpolationModifier, Hlsl4);
    kw!("nointerpolation", InterpolationModifier, Hlsl4);
    kw!("noperspective", InterpolationModifier, Hlsl4);
    kw!("sample", InterpolationModifier, Hlsl4);

    kw!("const", TypeModifier, Hlsl3);
    kw!("row_major", TypeModifier, Hlsl3);
    kw!("column_major", TypeModifier, Hlsl3);
    kw!("precise", TypeModifier, Hlsl5);

    kw!("static", StorageClass, Hlsl3);
    kw!("extern", StorageClass, Hlsl3);
    kw!("shared", StorageClass, Hlsl3);
    kw!("groupshared", StorageClass, Hlsl4);
    kw!("volatile", StorageClass, Hlsl3);
    kw!("inline", StorageClass, Hlsl3);

    kw!("cbuffer", UniformBuffer, Hlsl4);
    kw!("tbuffer", UniformBuffer, Hlsl4);
    kw!("register", TypeModifier, Hlsl3);
    kw!("packoffset", TypeModifier, Hlsl3);

    kw!("Buffer", Buffer, Hlsl4);
    kw!("StructuredBuffer", Buffer, Hlsl5);
    kw!("RWStructuredBuffer", Buffer, Hlsl5);
    kw!("ByteAddressBuffer", Buffer, Hlsl5);
    kw!("RWByteAddressBuffer", Buffer, Hlsl5);
    kw!("AppendStructuredBuffer", Buffer, Hlsl5);
    kw!("ConsumeStructuredBuffer", Buffer, Hlsl5);
    kw!("RWBuffer", Buffer, Hlsl5);
    kw!("RWTexture1D", Buffer, Hlsl5);
    kw!("RWTexture2D", Buffer, Hlsl5);
    kw!("RWTexture3D", Buffer, Hlsl5);
    kw!("Texture1D", Buffer, Hlsl4);
    kw!("Texture2D", Buffer, Hlsl4);
    kw!("Texture3D", Buffer, Hlsl4);
    kw!("TextureCube", Buffer, Hlsl4);
    kw!("Texture1DArray", Buffer, Hlsl4);
    kw!("Texture2DArray", Buffer, Hlsl4);
    kw!("TextureCubeArray", Buffer, Hlsl4);
    kw!("Texture2DMS", Buffer, Hlsl4);
    kw!("Texture2DMSArray", Buffer, Hlsl4);
    kw!("InputPatch", Buffer, Hlsl5);
    kw!("OutputPatch", Buffer, Hlsl5);

    kw!("sampler", Sampler, Hlsl3);
    kw!("sampler1D", Sampler, Hlsl3);
    kw!("sampler2D", Sampler, Hlsl3);
    kw!("sampler3D", Sampler, Hlsl3);
    kw!("samplerCUBE", Sampler, Hlsl3);
    kw!("SamplerState", Sampler, Hlsl4);
    kw!("SamplerComparisonState", Sampler, Hlsl4);

    kw!("technique", Technique, Hlsl3);
    kw!("technique10", Technique, Hlsl4);
    kw!("technique11", Technique, Hlsl5);
    kw!("pass", Technique, Hlsl3);

    // Cg keyword-superset extensions (spec GLOSSARY: "only its keyword extensions ...
    // are recognized").
    kw!("fixed", Cg, Cg);
    kw!("fixed2", Cg, Cg);
    kw!("fixed3", Cg, Cg);
    kw!("fixed4", Cg, Cg);
    kw!("half2", Cg, Cg);
    kw!("half3", Cg, Cg);
    kw!("half4", Cg, Cg);

    KeywordTable {
        entries,
        reserved: &["sizeof", "template", "namespace", "using", "explicit", "catch", "throw", "try", "new", "delete"],
    }
}

thread_local! {
    static TABLE: KeywordTable = base_table();
}

/// Looks up `spelling` for the given dialect/version. `Keyword`-class predefined
/// type-alias spellings (`DWORD`, `FLOAT`, `VECTOR`, `MATRIX`, `STRING`) are *not*
/// reported here: those are ordinary identifiers lexically, pre-registered as known
/// type names in the parser's type-name table instead (spec §4.4), matching how the
/// original treats them as built-in `typedef`s rather than scanner keywords.
pub fn lookup(spelling: &str, version: InputShaderVersion) -> KeywordLookup {
    TABLE.with(|table| {
        if table.reserved.contains(&spelling) {
            return KeywordLookup::Reserved;
        }
        match table.entries.get(spelling) {
            None => KeywordLookup::NotAKeyword,
            Some((class, since)) => {
                if matches!(class, KeywordClass::Cg) && version != InputShaderVersion::Cg {
                    return KeywordLookup::Unsupported;
                }
                if version_order(version) < version_order(*since) {
                    KeywordLookup::Unsupported
                } else {
                    KeywordLookup::Keyword(*class)
                }
            }
        }
    })
}

fn version_order(v: InputShaderVersion) -> u8 {
    use InputShaderVersion::*;
    match v {
        Cg => 0,
        Hlsl3 => 3,
        Hlsl4 => 4,
        Hlsl5 => 5,
        Hlsl6 => 6,
        Glsl | Essl | Vksl => 10,
    }
}

/// Predeclared built-in type aliases recognized by the parser regardless of dialect
/// (spec §3.5 `is_build_in`, §4.4). Not scanner keywords — ordinary identifiers that the
/// parser seeds its type-name table with at start of compilation.
pub const BUILT_IN_TYPE_ALIASES: &[(&str, &str)] = &[
    ("DWORD", "uint"),
    ("FLOAT", "float"),
    ("VECTOR", "float4"),
    ("MATRIX", "float4x4"),
    ("STRING", "string"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_scalar_and_vector_types() {
        assert_eq!(
            lookup("float3", InputShaderVersion::Hlsl5),
            KeywordLookup::Keyword(KeywordClass::VectorType)
        );
    }

    #[test]
    fn rwbuffer_unsupported_before_sm5() {
        assert_eq!(lookup("RWBuffer", InputShaderVersion::Hlsl4), KeywordLookup::Unsupported);
        assert_eq!(
            lookup("RWBuffer", InputShaderVersion::Hlsl5),
            KeywordLookup::Keyword(KeywordClass::Buffer)
        );
    }

    #[test]
    fn reserved_keyword_detected() {
        assert_eq!(lookup("template", InputShaderVersion::Hlsl5), KeywordLookup::Reserved);
    }

    #[test]
    fn cg_keyword_unsupported_outside_cg_dialect() {
        assert_eq!(lookup("fixed4", InputShaderVersion::Hlsl5), KeywordLookup::Unsupported);
        assert_eq!(
            lookup("fixed4", InputShaderVersion::Cg),
            KeywordLookup::Keyword(KeywordClass::Cg)
        );
    }

    #[test]
    fn plain_identifier_is_not_a_keyword() {
        assert_eq!(lookup("myVariable", InputShaderVersion::Hlsl5), KeywordLookup::NotAKeyword);
    }
}
