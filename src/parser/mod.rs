//! Recursive-descent parser (spec §4.4): builds the AST defined in [`crate::ast`] directly
//! from a token source, using [`crate::symbol::TypeNameTable`] to disambiguate casts from
//! parenthesized expressions and a captured-token replay (reusing the scanner's pushed-
//! token-string stack, see [`crate::scanner::Scanner::push_tokens`]) to back out of a
//! speculative parse that turns out not to be a cast.

use crate::ast::types::{BufferType, SamplerType};
use crate::ast::*;
use crate::report::{DiagnosticCode, Phase, Report, ReportHandler, ReportType};
use crate::scanner::{Scanner, ScannerMode};
use crate::source::SourceArea;
use crate::symbol::TypeNameTable;
use crate::token::{KeywordClass, LiteralKind, OperatorKind, Token, TokenKind, TokenString};
use smol_str::SmolStr;

#[derive(thiserror::Error, Debug, Clone)]
pub enum ParseError {
    #[error("unexpected token '{found}'{expected}")]
    UnexpectedToken { found: String, expected: String },
    #[error("unexpected end of file{0}")]
    UnexpectedEof(String),
    #[error("{0}")]
    Custom(String),
}

impl ParseError {
    fn code(&self) -> DiagnosticCode {
        match self {
            ParseError::UnexpectedEof(_) => DiagnosticCode::MissingClosingBrace,
            _ => DiagnosticCode::UnexpectedToken,
        }
    }

    fn into_report(self, area: SourceArea) -> Report {
        let code = self.code();
        Report::new(ReportType::Error, Phase::Syntax, self.to_string()).with_code(code).with_area(area)
    }
}

pub struct Parser<'rep, 'log> {
    scanner: Scanner,
    type_names: TypeNameTable,
    module: Module,
    handler: &'rep mut ReportHandler<'log>,
    /// When `Some`, every token pulled from the scanner is also appended here, so a
    /// failed speculative parse (cast-vs-bracket) can replay it via `scanner.push_tokens`.
    capture: Option<TokenString>,
    last_area: SourceArea,
    pack_matrix_row_major_default: bool,
}

type PResult<T> = Result<T, ParseError>;

impl<'rep, 'log> Parser<'rep, 'log> {
    pub fn new(scanner: Scanner, handler: &'rep mut ReportHandler<'log>, pack_matrix_row_major_default: bool) -> Parser<'rep, 'log> {
        let dummy_area = SourceArea::point(crate::source::SourcePosition::new(crate::source::Origin(0), 1, 1));
        Parser {
            scanner,
            type_names: TypeNameTable::new(),
            module: Module::new(),
            handler,
            capture: None,
            last_area: dummy_area,
            pack_matrix_row_major_default,
        }
    }

    pub fn parse_translation_unit(mut self) -> Module {
        loop {
            match self.peek_kind() {
                Ok(TokenKind::Eof) => break,
                _ => {}
            }
            match self.parse_global_decl() {
                Ok(Some(id)) => self.module.globals.push(id),
                Ok(None) => {}
                Err(e) => {
                    let area = self.last_area;
                    self.handler.submit(e.into_report(area));
                    self.resync_to_decl_boundary();
                }
            }
        }
        self.module
    }

    // ---- token stream helpers -------------------------------------------------------

    fn next(&mut self) -> PResult<Token> {
        let tok = self.scanner.next().map_err(|e| ParseError::Custom(e.to_string()))?;
        self.last_area = tok.area;
        if let Some(cap) = &mut self.capture {
            cap.push(tok.clone());
        }
        Ok(tok)
    }

    fn peek(&mut self) -> PResult<Token> {
        Ok(self.scanner.peek().map_err(|e| ParseError::Custom(e.to_string()))?.clone())
    }

    fn peek_kind(&mut self) -> PResult<TokenKind> {
        Ok(self.peek()?.kind)
    }

    fn check_spelling(&mut self, s: &str) -> bool {
        self.peek().map(|t| t.spelling.as_str() == s).unwrap_or(false)
    }

    fn eat_spelling(&mut self, s: &str) -> PResult<bool> {
        if self.check_spelling(s) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_spelling(&mut self, s: &str) -> PResult<Token> {
        let tok = self.next()?;
        if tok.spelling.as_str() != s {
            return Err(ParseError::UnexpectedToken {
                found: tok.spelling.to_string(),
                expected: format!(", expected '{s}'"),
            });
        }
        Ok(tok)
    }

    fn expect_ident(&mut self) -> PResult<Token> {
        let tok = self.next()?;
        if tok.kind != TokenKind::Ident {
            return Err(ParseError::UnexpectedToken {
                found: tok.spelling.to_string(),
                expected: ", expected identifier".to_string(),
            });
        }
        Ok(tok)
    }

    /// Closes a `<...>` template argument list, splitting a scanned `>>` into two `>`
    /// tokens when the closing bracket is immediately followed by another (nested
    /// generic), the classic angle-bracket lexing problem (spec §4.4 "template mode").
    fn expect_close_angle(&mut self) -> PResult<()> {
        let tok = self.next()?;
        match tok.spelling.as_str() {
            ">" => Ok(()),
            ">>" => {
                let mut split = TokenString::new();
                split.push(Token::new(TokenKind::Operator(OperatorKind::Binary), ">", tok.area));
                self.scanner.push_tokens(split);
                Ok(())
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: ", expected '>'".to_string(),
            }),
        }
    }

    fn resync_to_decl_boundary(&mut self) {
        let mut depth: i32 = 0;
        loop {
            let tok = match self.scanner.next() {
                Ok(t) => t,
                Err(_) => continue,
            };
            match tok.kind {
                TokenKind::Eof => return,
                TokenKind::Punctuation if tok.spelling.as_str() == "{" => depth += 1,
                TokenKind::Punctuation if tok.spelling.as_str() == "}" => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Punctuation if tok.spelling.as_str() == ";" && depth == 0 => return,
                _ => {}
            }
        }
    }

    // ---- speculative cast parsing -----------------------------------------------------

    fn looks_like_type_start(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(match tok.kind {
            TokenKind::Keyword(KeywordClass::ScalarType | KeywordClass::VectorType | KeywordClass::MatrixType) => true,
            TokenKind::Ident => self.type_names.is_type_name(&tok.spelling),
            _ => false,
        })
    }

    fn can_start_unary_expr(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(match &tok.kind {
            TokenKind::Ident | TokenKind::Literal(_) => true,
            TokenKind::Keyword(KeywordClass::ScalarType | KeywordClass::VectorType | KeywordClass::MatrixType) => true,
            TokenKind::Punctuation if tok.spelling.as_str() == "(" => true,
            TokenKind::Operator(OperatorKind::Binary) if matches!(tok.spelling.as_str(), "-" | "+" | "!" | "~") => true,
            TokenKind::Operator(OperatorKind::IncDec) => true,
            _ => false,
        })
    }

    /// Attempts to parse a cast target starting at the current `(`. On failure, replays
    /// every token it speculatively consumed and returns `Ok(None)` so the caller falls
    /// back to parsing a parenthesized expression.
    fn try_parse_cast(&mut self) -> PResult<Option<Id<TypeDenoter>>> {
        if !self.check_spelling("(") {
            return Ok(None);
        }
        let outer_capture_was_active = self.capture.is_some();
        if !outer_capture_was_active {
            self.capture = Some(TokenString::new());
        }
        let result = (|| -> PResult<Option<Id<TypeDenoter>>> {
            self.next()?; // '('
            if !self.looks_like_type_start()? {
                return Ok(None);
            }
            let ty = self.parse_type()?;
            if !self.eat_spelling(")")? {
                return Ok(None);
            }
            if !self.can_start_unary_expr()? {
                return Ok(None);
            }
            Ok(Some(ty))
        })();

        match result {
            Ok(Some(ty)) => {
                if !outer_capture_was_active {
                    self.capture = None;
                }
                Ok(Some(ty))
            }
            Ok(None) => {
                if !outer_capture_was_active {
                    let buf = self.capture.take().unwrap();
                    self.scanner.push_tokens(buf);
                }
                Ok(None)
            }
            Err(e) => {
                if !outer_capture_was_active {
                    let buf = self.capture.take().unwrap();
                    self.scanner.push_tokens(buf);
                }
                Err(e)
            }
        }
    }

    // ---- types --------------------------------------------------------------------

    fn base_type_from_spelling(spelling: &str) -> Option<DataType> {
        Some(match spelling {
            "float" | "FLOAT" => DataType::Float,
            "int" => DataType::Int,
            "uint" | "dword" | "DWORD" => DataType::UInt,
            "bool" => DataType::Bool,
            "half" => DataType::Half,
            "double" => DataType::Double,
            "void" => DataType::Void,
            _ => return None,
        })
    }

    fn parse_vector_or_matrix_spelling(spelling: &str) -> Option<TypeDenoter> {
        let base_name: String = spelling.chars().take_while(|c| c.is_alphabetic()).collect();
        let base = Self::base_type_from_spelling(&base_name)?;
        let digits = &spelling[base_name.len()..];
        if let Some((rows, cols)) = digits.split_once('x') {
            Some(TypeDenoter::Matrix(base, rows.parse().ok()?, cols.parse().ok()?))
        } else {
            Some(TypeDenoter::Vector(base, digits.parse().ok()?))
        }
    }

    fn buffer_type_from_spelling(spelling: &str) -> Option<BufferType> {
        Some(match spelling {
            "Buffer" => BufferType::Buffer,
            "StructuredBuffer" => BufferType::StructuredBuffer,
            "RWStructuredBuffer" => BufferType::RwStructuredBuffer,
            "ByteAddressBuffer" => BufferType::ByteAddressBuffer,
            "RWByteAddressBuffer" => BufferType::RwByteAddressBuffer,
            "AppendStructuredBuffer" => BufferType::AppendStructuredBuffer,
            "ConsumeStructuredBuffer" => BufferType::ConsumeStructuredBuffer,
            "RWBuffer" => BufferType::RwBuffer,
            "Texture1D" => BufferType::Texture1D,
            "Texture2D" => BufferType::Texture2D,
            "Texture3D" => BufferType::Texture3D,
            "TextureCube" => BufferType::TextureCube,
            "Texture1DArray" => BufferType::Texture1DArray,
            "Texture2DArray" => BufferType::Texture2DArray,
            "TextureCubeArray" => BufferType::TextureCubeArray,
            "Texture2DMS" => BufferType::Texture2DMs,
            "Texture2DMSArray" => BufferType::Texture2DMsArray,
            "RWTexture1D" => BufferType::RwTexture1D,
            "RWTexture2D" => BufferType::RwTexture2D,
            "RWTexture3D" => BufferType::RwTexture3D,
            "InputPatch" => BufferType::InputPatch,
            "OutputPatch" => BufferType::OutputPatch,
            _ => return None,
        })
    }

    fn sampler_type_from_spelling(spelling: &str) -> Option<SamplerType> {
        Some(match spelling {
            "sampler" => SamplerType::Sampler,
            "sampler1D" => SamplerType::Sampler1D,
            "sampler2D" => SamplerType::Sampler2D,
            "sampler3D" => SamplerType::Sampler3D,
            "samplerCUBE" => SamplerType::SamplerCube,
            "SamplerState" => SamplerType::SamplerState,
            "SamplerComparisonState" => SamplerType::SamplerComparisonState,
            _ => return None,
        })
    }

    /// Parses a type-specifier (spec §3.6, §4.4). Does not consume a trailing array
    /// declarator — that is the job of [`Parser::parse_declarator_suffix`].
    fn parse_type(&mut self) -> PResult<Id<TypeDenoter>> {
        let tok = self.next()?;
        match &tok.kind {
            TokenKind::Keyword(KeywordClass::ScalarType) | TokenKind::Keyword(KeywordClass::TypeModifier) if tok.spelling.as_str() == "void" => {
                Ok(self.module.void_type)
            }
            TokenKind::Keyword(KeywordClass::ScalarType) => {
                let dt = Self::base_type_from_spelling(&tok.spelling).ok_or_else(|| ParseError::Custom(format!("unknown scalar type '{}'", tok.spelling)))?;
                Ok(self.module.base_type_of(dt))
            }
            TokenKind::Keyword(KeywordClass::VectorType) if tok.spelling.as_str() == "vector" => self.parse_generic_vector_or_matrix(false),
            TokenKind::Keyword(KeywordClass::MatrixType) if tok.spelling.as_str() == "matrix" => self.parse_generic_vector_or_matrix(true),
            TokenKind::Keyword(KeywordClass::VectorType) | TokenKind::Keyword(KeywordClass::MatrixType) => {
                let denoter = Self::parse_vector_or_matrix_spelling(&tok.spelling)
                    .ok_or_else(|| ParseError::Custom(format!("malformed vector/matrix type '{}'", tok.spelling)))?;
                Ok(self.module.types.add(denoter))
            }
            TokenKind::Keyword(KeywordClass::Buffer) => {
                let buf_ty = Self::buffer_type_from_spelling(&tok.spelling).ok_or_else(|| ParseError::Custom(format!("unknown buffer type '{}'", tok.spelling)))?;
                let elem = if self.eat_spelling("<")? {
                    let inner = self.parse_type()?;
                    self.expect_close_angle()?;
                    Some(inner)
                } else {
                    None
                };
                Ok(self.module.types.add(TypeDenoter::Buffer(buf_ty, elem, None)))
            }
            TokenKind::Keyword(KeywordClass::Sampler) => {
                let sam_ty = Self::sampler_type_from_spelling(&tok.spelling).ok_or_else(|| ParseError::Custom(format!("unknown sampler type '{}'", tok.spelling)))?;
                Ok(self.module.types.add(TypeDenoter::Sampler(sam_ty)))
            }
            TokenKind::Keyword(KeywordClass::Struct) => {
                // Anonymous inline struct type used as a specifier, e.g. `struct { ... } x;`.
                let decl_id = self.parse_struct_body(None)?;
                Ok(self.module.types.add(TypeDenoter::Struct(StructRef::Resolved(decl_id))))
            }
            TokenKind::Ident if self.type_names.is_type_name(&tok.spelling) => {
                Ok(self.module.types.add(TypeDenoter::Alias(crate::ast::types::AliasRef::Unresolved(tok.spelling.clone()))))
            }
            _ => Err(ParseError::UnexpectedToken {
                found: tok.spelling.to_string(),
                expected: ", expected a type".to_string(),
            }),
        }
    }

    fn parse_generic_vector_or_matrix(&mut self, is_matrix: bool) -> PResult<Id<TypeDenoter>> {
        if !self.eat_spelling("<")? {
            return Ok(self.module.types.add(if is_matrix {
                TypeDenoter::Matrix(DataType::Float, 4, 4)
            } else {
                TypeDenoter::Vector(DataType::Float, 4)
            }));
        }
        let base_tok = self.next()?;
        let base = Self::base_type_from_spelling(&base_tok.spelling).ok_or_else(|| ParseError::Custom("expected scalar type in generic vector/matrix".to_string()))?;
        self.expect_spelling(",")?;
        let rows: u8 = self.expect_uint_literal()?;
        let denoter = if is_matrix {
            self.expect_spelling(",")?;
            let cols: u8 = self.expect_uint_literal()?;
            TypeDenoter::Matrix(base, rows, cols)
        } else {
            TypeDenoter::Vector(base, rows)
        };
        self.expect_close_angle()?;
        Ok(self.module.types.add(denoter))
    }

    fn expect_uint_literal(&mut self) -> PResult<u8> {
        let tok = self.next()?;
        tok.spelling.parse().map_err(|_| ParseError::Custom(format!("expected integer, found '{}'", tok.spelling)))
    }

    // ---- declarations ---------------------------------------------------------------

    fn parse_global_decl(&mut self) -> PResult<Option<DeclId>> {
        if self.eat_spelling(";")? {
            return Ok(None);
        }
        let attributes = self.parse_attributes()?;

        if self.check_keyword(KeywordClass::Typedef) {
            self.next()?;
            return self.parse_typedef().map(Some);
        }
        if self.check_keyword(KeywordClass::Struct) {
            self.next()?;
            let name_tok = self.peek()?;
            let name = if name_tok.kind == TokenKind::Ident {
                self.next()?;
                Some(name_tok.spelling)
            } else {
                None
            };
            let decl_id = self.parse_struct_body(name)?;
            self.eat_spelling(";")?;
            return Ok(Some(decl_id));
        }
        if self.check_keyword(KeywordClass::UniformBuffer) {
            return self.parse_uniform_buffer().map(Some);
        }
        if self.check_keyword(KeywordClass::Technique) {
            self.skip_technique_block()?;
            return Ok(None);
        }

        // Otherwise: `<modifiers> <type> <ident> ( ... )` (function) or `... ;` (variable),
        // or a buffer/sampler object declaration (`Texture2D tex : register(t0);`).
        let is_const = self.parse_modifiers()?;
        let area = self.peek()?.area;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;

        if self.check_spelling("(") {
            return self.parse_function(ty, name, attributes).map(Some);
        }

        let ty = self.parse_array_suffix(ty)?;
        let (semantic, register, pack_offset) = self.parse_binding_suffix()?;
        let initializer = if self.eat_spelling("=")? { Some(self.parse_assignment_expr()?) } else { None };
        self.expect_spelling(";")?;

        let kind = if let TypeDenoter::Buffer(..) = &self.module.types[ty] {
            DeclKind::Buffer { name: name.spelling.clone(), ty, register }
        } else if let TypeDenoter::Sampler(_) = &self.module.types[ty] {
            DeclKind::Sampler { name: name.spelling.clone(), ty, register }
        } else {
            DeclKind::Variable {
                name: name.spelling.clone(),
                ty,
                semantic,
                register,
                pack_offset,
                initializer,
                is_const,
            }
        };
        Ok(Some(self.module.decls.push(Decl {
            kind,
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
        })))
    }

    fn check_keyword(&mut self, class: KeywordClass) -> bool {
        matches!(self.peek().map(|t| t.kind), Ok(TokenKind::Keyword(c)) if c == class)
    }

    fn eat_keyword_spelling(&mut self, spelling: &str) -> PResult<bool> {
        if self.check_spelling(spelling) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes every storage-class/type-modifier/interpolation-modifier/`uniform`
    /// keyword in front of a type-specifier, reporting whether `const` was among them
    /// regardless of where in the run it appeared (HLSL allows `static const` as well as
    /// `const static`).
    fn parse_modifiers(&mut self) -> PResult<bool> {
        let mut is_const = false;
        loop {
            if self.check_keyword(KeywordClass::StorageClass) || self.check_keyword(KeywordClass::TypeModifier) || self.check_keyword(KeywordClass::InterpolationModifier) {
                let tok = self.next()?;
                if tok.spelling.as_str() == "const" {
                    is_const = true;
                }
            } else if self.check_spelling("uniform") {
                self.next()?;
            } else {
                break;
            }
        }
        Ok(is_const)
    }

    fn parse_attributes(&mut self) -> PResult<Vec<Attribute>> {
        let mut out = Vec::new();
        while self.check_spelling("[") {
            self.next()?;
            let name_tok = self.expect_ident()?;
            let mut arguments = Vec::new();
            if self.eat_spelling("(")? {
                if !self.check_spelling(")") {
                    loop {
                        arguments.push(self.parse_assignment_expr()?);
                        if !self.eat_spelling(",")? {
                            break;
                        }
                    }
                }
                self.expect_spelling(")")?;
            }
            self.expect_spelling("]")?;
            out.push(Attribute {
                name: name_tok.spelling,
                arguments,
                area: name_tok.area,
            });
        }
        Ok(out)
    }

    fn parse_typedef(&mut self) -> PResult<DeclId> {
        let area = self.last_area;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let ty = self.parse_array_suffix(ty)?;
        self.expect_spelling(";")?;
        let decl_id = self.module.decls.push(Decl {
            kind: DeclKind::Alias {
                name: name.spelling.clone(),
                target: ty,
            },
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
        });
        self.type_names.declare(name.spelling);
        Ok(decl_id)
    }

    fn parse_struct_body(&mut self, name: Option<SmolStr>) -> PResult<DeclId> {
        let area = self.last_area;
        let base_name = if self.eat_spelling(":")? {
            let base_tok = self.expect_ident()?;
            if let Some(self_name) = &name {
                if base_tok.spelling == *self_name {
                    self.handler.submit(
                        Report::new(ReportType::Error, Phase::Syntax, format!("struct '{self_name}' cannot inherit from itself"))
                            .with_code(DiagnosticCode::IllegalRecursiveInheritance)
                            .with_area(base_tok.area),
                    );
                }
            }
            // The original (`HLSLParser.cpp`) rejects more than one base after the `:`;
            // a following comma means the user wrote multiple inheritance.
            if self.check_spelling(",") {
                let comma_area = self.peek()?.area;
                self.handler.submit(
                    Report::new(ReportType::Error, Phase::Syntax, "structs may only inherit from a single base type")
                        .with_code(DiagnosticCode::IllegalMultipleInheritance)
                        .with_area(comma_area),
                );
                while self.eat_spelling(",")? {
                    self.expect_ident()?;
                }
            }
            Some(base_tok.spelling)
        } else {
            None
        };
        self.expect_spelling("{")?;
        let mut fields = Vec::new();
        while !self.check_spelling("}") {
            let field_ty = self.parse_type()?;
            loop {
                let field_name = self.expect_ident()?;
                let field_ty = self.parse_array_suffix(field_ty)?;
                let (semantic, _register, _pack) = self.parse_binding_suffix()?;
                fields.push(Field {
                    name: field_name.spelling,
                    ty: field_ty,
                    semantic,
                    area: field_name.area,
                });
                if !self.eat_spelling(",")? {
                    break;
                }
            }
            self.expect_spelling(";")?;
        }
        self.expect_spelling("}")?;
        // `base_name` records only the base type's spelling for now; the analyzer
        // resolves it to a struct id once every declaration is registered.
        if let Some(n) = &name {
            self.type_names.declare(n.clone());
        }
        Ok(self.module.decls.push(Decl {
            kind: DeclKind::Struct { name, fields, base_name, base: None },
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
        }))
    }

    /// `technique`/`technique10`/`technique11` blocks are an effects-framework construct
    /// with no counterpart in a shader-stage compiler's AST; report and skip the balanced
    /// `{ ... }` block rather than failing to parse it (spec's effects/techniques
    /// Non-goal — DiagnosticCode::TechniqueIgnored exists precisely for this).
    fn skip_technique_block(&mut self) -> PResult<()> {
        let area = self.peek()?.area;
        self.next()?; // technique keyword
        self.handler.submit(
            Report::new(ReportType::Warning, Phase::Syntax, "technique/pass blocks are not part of a shader stage and are ignored")
                .with_code(DiagnosticCode::TechniqueIgnored)
                .with_area(area),
        );
        while !self.check_spelling("{") && !matches!(self.peek_kind(), Ok(TokenKind::Eof)) {
            self.next()?;
        }
        if self.check_spelling("{") {
            let mut depth = 0i32;
            loop {
                let tok = self.next()?;
                match tok.kind {
                    TokenKind::Eof => break,
                    TokenKind::Punctuation if tok.spelling.as_str() == "{" => depth += 1,
                    TokenKind::Punctuation if tok.spelling.as_str() == "}" => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn parse_uniform_buffer(&mut self) -> PResult<DeclId> {
        let area = self.peek()?.area;
        let kw = self.next()?;
        let is_texture_buffer = kw.spelling.as_str() == "tbuffer";
        let name = self.expect_ident()?;
        let register = if self.eat_spelling(":")? {
            self.parse_register_binding()?
        } else {
            None
        };
        self.expect_spelling("{")?;
        let mut fields = Vec::new();
        while !self.check_spelling("}") {
            let field_ty = self.parse_type()?;
            let field_name = self.expect_ident()?;
            let field_ty = self.parse_array_suffix(field_ty)?;
            let (_, field_register, field_pack) = self.parse_binding_suffix()?;
            self.expect_spelling(";")?;
            fields.push(self.module.decls.push(Decl {
                kind: DeclKind::Variable {
                    name: field_name.spelling,
                    ty: field_ty,
                    semantic: None,
                    register: field_register,
                    pack_offset: field_pack,
                    initializer: None,
                    is_const: false,
                },
                area: field_name.area,
                flags: NodeFlags::default(),
                leading_comment: None,
            }));
        }
        self.expect_spelling("}")?;
        self.eat_spelling(";")?;
        Ok(self.module.decls.push(Decl {
            kind: DeclKind::UniformBuffer {
                name: name.spelling,
                is_texture_buffer,
                fields,
                register,
            },
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
        }))
    }

    fn parse_function(&mut self, return_type: Id<TypeDenoter>, name: Token, attributes: Vec<Attribute>) -> PResult<DeclId> {
        self.expect_spelling("(")?;
        let mut parameters = Vec::new();
        self.type_names.open_scope();
        if !self.check_spelling(")") {
            loop {
                let input_modifier = self.parse_input_modifier()?;
                let param_ty = self.parse_type()?;
                let param_name = self.expect_ident()?;
                let param_ty = self.parse_array_suffix(param_ty)?;
                let (semantic, _, _) = self.parse_binding_suffix()?;
                let default_value = if self.eat_spelling("=")? { Some(self.parse_assignment_expr()?) } else { None };
                parameters.push(Parameter {
                    name: param_name.spelling,
                    ty: param_ty,
                    input_modifier,
                    semantic,
                    default_value,
                    area: param_name.area,
                });
                if !self.eat_spelling(",")? {
                    break;
                }
            }
        }
        self.expect_spelling(")")?;
        let return_semantic = if self.eat_spelling(":")? {
            Some(self.parse_semantic()?)
        } else {
            None
        };

        let body = if self.check_spelling("{") {
            Some(self.parse_code_block()?)
        } else {
            self.expect_spelling(";")?;
            None
        };
        self.type_names.close_scope();

        let mut flags = NodeFlags::default();
        flags.is_forward_decl = body.is_none();

        Ok(self.module.decls.push(Decl {
            kind: DeclKind::Function {
                name: name.spelling.clone(),
                return_type,
                return_semantic,
                parameters,
                body,
                attributes,
            },
            area: name.area,
            flags,
            leading_comment: None,
        }))
    }

    fn parse_input_modifier(&mut self) -> PResult<InputModifier> {
        if self.eat_keyword_spelling("inout")? {
            Ok(InputModifier::InOut)
        } else if self.eat_keyword_spelling("out")? {
            Ok(InputModifier::Out)
        } else {
            self.eat_keyword_spelling("in")?;
            self.eat_keyword_spelling("uniform")?;
            Ok(InputModifier::In)
        }
    }

    fn parse_array_suffix(&mut self, elem_ty: Id<TypeDenoter>) -> PResult<Id<TypeDenoter>> {
        if !self.check_spelling("[") {
            return Ok(elem_ty);
        }
        let mut dims = Vec::new();
        while self.eat_spelling("[")? {
            if self.check_spelling("]") {
                dims.push(ArrayDimension::Resolved(0));
            } else {
                let expr = self.parse_assignment_expr()?;
                dims.push(ArrayDimension::Unresolved(expr));
            }
            self.expect_spelling("]")?;
        }
        Ok(self.module.types.add(TypeDenoter::Array(elem_ty, dims)))
    }

    /// `: SEMANTIC`, `: register(...)`, `: packoffset(...)`, possibly chained.
    fn parse_binding_suffix(&mut self) -> PResult<(Option<Semantic>, Option<RegisterBinding>, Option<PackOffsetBinding>)> {
        let mut semantic = None;
        let mut register = None;
        let mut pack_offset = None;
        while self.eat_spelling(":")? {
            let peek_name = self.peek()?.spelling.clone();
            if peek_name.as_str() == "register" {
                register = self.parse_register_binding()?;
            } else if peek_name.as_str() == "packoffset" {
                pack_offset = self.parse_pack_offset()?;
            } else {
                semantic = Some(self.parse_semantic()?);
            }
        }
        Ok((semantic, register, pack_offset))
    }

    fn parse_semantic(&mut self) -> PResult<Semantic> {
        let tok = self.expect_ident()?;
        let split_at = tok.spelling.rfind(|c: char| !c.is_ascii_digit()).map(|i| i + 1).unwrap_or(0);
        let (base, digits) = tok.spelling.split_at(split_at);
        if digits.is_empty() {
            Ok(Semantic { name: tok.spelling.clone(), index: None })
        } else {
            Ok(Semantic {
                name: SmolStr::from(base),
                index: digits.parse().ok(),
            })
        }
    }

    fn parse_register_binding(&mut self) -> PResult<Option<RegisterBinding>> {
        self.expect_ident()?; // "register"
        self.expect_spelling("(")?;
        let slot_tok = self.expect_ident()?;
        let mut chars = slot_tok.spelling.chars();
        let slot_class = chars.next().unwrap_or('b');
        let slot: u32 = chars.as_str().parse().unwrap_or(0);
        let space = if self.eat_spelling(",")? {
            let space_tok = self.expect_ident()?;
            space_tok.spelling.trim_start_matches("space").parse().ok()
        } else {
            None
        };
        self.expect_spelling(")")?;
        Ok(Some(RegisterBinding { slot_class, slot, space }))
    }

    fn parse_pack_offset(&mut self) -> PResult<Option<PackOffsetBinding>> {
        self.expect_ident()?; // "packoffset"
        self.expect_spelling("(")?;
        let comp_tok = self.expect_ident()?;
        let (component, sub_component) = match comp_tok.spelling.split_once('.') {
            Some((c, s)) => (SmolStr::from(c), Some(SmolStr::from(s))),
            None => (comp_tok.spelling, None),
        };
        self.expect_spelling(")")?;
        Ok(Some(PackOffsetBinding { component, sub_component }))
    }

    // ---- statements -------------------------------------------------------------------

    fn parse_code_block(&mut self) -> PResult<CodeBlock> {
        let area = self.peek()?.area;
        self.expect_spelling("{")?;
        self.type_names.open_scope();
        let mut statements = Vec::new();
        while !self.check_spelling("}") {
            match self.parse_statement() {
                Ok(id) => statements.push(id),
                Err(e) => {
                    let area = self.last_area;
                    self.handler.submit(e.into_report(area));
                    self.resync_to_decl_boundary();
                    if self.check_spelling("}") || matches!(self.peek_kind(), Ok(TokenKind::Eof)) {
                        break;
                    }
                }
            }
        }
        self.type_names.close_scope();
        self.expect_spelling("}")?;
        Ok(CodeBlock { statements, area })
    }

    fn push_stmt(&mut self, kind: StmtKind, area: SourceArea) -> StmtId {
        self.module.stmts.push(Stmt {
            kind,
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
        })
    }

    fn parse_statement(&mut self) -> PResult<StmtId> {
        let area = self.peek()?.area;
        if self.check_spelling("{") {
            let block = self.parse_code_block()?;
            return Ok(self.push_stmt(StmtKind::Code(block), area));
        }
        if self.eat_spelling(";")? {
            return Ok(self.push_stmt(StmtKind::Null, area));
        }
        if self.check_keyword(KeywordClass::ControlFlow) {
            return self.parse_control_flow_statement();
        }
        if self.check_keyword(KeywordClass::Return) {
            self.next()?;
            let value = if self.check_spelling(";") { None } else { Some(self.parse_expr()?) };
            self.expect_spelling(";")?;
            return Ok(self.push_stmt(StmtKind::Return { value }, area));
        }
        if self.check_keyword(KeywordClass::ControlTransfer) {
            let tok = self.next()?;
            self.expect_spelling(";")?;
            let kind = if tok.spelling.as_str() == "break" {
                ControlTransferKind::Break
            } else {
                ControlTransferKind::Continue
            };
            return Ok(self.push_stmt(StmtKind::ControlTransfer(kind), area));
        }
        if self.check_keyword(KeywordClass::Discard) {
            self.next()?;
            self.expect_spelling(";")?;
            return Ok(self.push_stmt(StmtKind::Discard, area));
        }
        if self.is_declaration_start()? {
            let decl = self.parse_local_variable_decl()?;
            return Ok(self.push_stmt(StmtKind::Declaration(decl), area));
        }
        let expr = self.parse_expr()?;
        self.expect_spelling(";")?;
        Ok(self.push_stmt(StmtKind::Expression(expr), area))
    }

    fn is_declaration_start(&mut self) -> PResult<bool> {
        let tok = self.peek()?;
        Ok(match &tok.kind {
            TokenKind::Keyword(KeywordClass::ScalarType | KeywordClass::VectorType | KeywordClass::MatrixType | KeywordClass::Buffer | KeywordClass::Sampler) => true,
            TokenKind::Keyword(KeywordClass::TypeModifier | KeywordClass::StorageClass) => true,
            TokenKind::Ident => self.type_names.is_type_name(&tok.spelling),
            _ => false,
        })
    }

    fn parse_local_variable_decl(&mut self) -> PResult<DeclId> {
        let area = self.peek()?.area;
        let is_const = self.parse_modifiers()?;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let ty = self.parse_array_suffix(ty)?;
        let initializer = if self.eat_spelling("=")? {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.expect_spelling(";")?;
        Ok(self.module.decls.push(Decl {
            kind: DeclKind::Variable {
                name: name.spelling,
                ty,
                semantic: None,
                register: None,
                pack_offset: None,
                initializer,
                is_const,
            },
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
        }))
    }

    fn parse_initializer(&mut self) -> PResult<ExprId> {
        if self.check_spelling("{") {
            return self.parse_initializer_list();
        }
        self.parse_assignment_expr()
    }

    fn parse_initializer_list(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        self.expect_spelling("{")?;
        let mut elements = Vec::new();
        if !self.check_spelling("}") {
            loop {
                elements.push(self.parse_initializer()?);
                if !self.eat_spelling(",")? {
                    break;
                }
            }
        }
        self.expect_spelling("}")?;
        Ok(self.push_expr(ExprKind::InitializerList(elements), area))
    }

    fn parse_control_flow_statement(&mut self) -> PResult<StmtId> {
        let area = self.peek()?.area;
        let kw = self.next()?;
        match kw.spelling.as_str() {
            "if" => {
                self.expect_spelling("(")?;
                let condition = self.parse_expr()?;
                self.expect_spelling(")")?;
                let then_branch = self.parse_statement()?;
                let else_branch = if self.eat_keyword_spelling("else")? { Some(self.parse_statement()?) } else { None };
                Ok(self.push_stmt(StmtKind::If { condition, then_branch, else_branch }, area))
            }
            "while" => {
                self.expect_spelling("(")?;
                let condition = self.parse_expr()?;
                self.expect_spelling(")")?;
                let body = self.parse_statement()?;
                Ok(self.push_stmt(StmtKind::While { condition, body }, area))
            }
            "do" => {
                let body = self.parse_statement()?;
                self.expect_spelling("while")?;
                self.expect_spelling("(")?;
                let condition = self.parse_expr()?;
                self.expect_spelling(")")?;
                self.expect_spelling(";")?;
                Ok(self.push_stmt(StmtKind::DoWhile { body, condition }, area))
            }
            "for" => {
                self.expect_spelling("(")?;
                self.type_names.open_scope();
                let init = if self.check_spelling(";") {
                    self.next()?;
                    None
                } else if self.is_declaration_start()? {
                    // `parse_local_variable_decl` already consumes the trailing `;`.
                    Some(self.parse_local_variable_decl().map(|d| self.push_stmt(StmtKind::Declaration(d), area))?)
                } else {
                    let e = self.parse_expr()?;
                    self.expect_spelling(";")?;
                    Some(self.push_stmt(StmtKind::Expression(e), area))
                };
                let condition = if self.check_spelling(";") { None } else { Some(self.parse_expr()?) };
                self.expect_spelling(";")?;
                let iteration = if self.check_spelling(")") { None } else { Some(self.parse_expr()?) };
                self.expect_spelling(")")?;
                let body = self.parse_statement()?;
                self.type_names.close_scope();
                Ok(self.push_stmt(StmtKind::For { init, condition, iteration, body }, area))
            }
            "switch" => {
                self.expect_spelling("(")?;
                let selector = self.parse_expr()?;
                self.expect_spelling(")")?;
                self.expect_spelling("{")?;
                let mut cases = Vec::new();
                while !self.check_spelling("}") {
                    let case_value = if self.eat_keyword_spelling("case")? {
                        let v = self.parse_expr()?;
                        self.expect_spelling(":")?;
                        Some(v)
                    } else {
                        self.expect_spelling("default")?;
                        self.expect_spelling(":")?;
                        None
                    };
                    let mut statements = Vec::new();
                    while !self.check_spelling("case") && !self.check_spelling("default") && !self.check_spelling("}") {
                        statements.push(self.parse_statement()?);
                    }
                    cases.push(SwitchCase { case_value, statements });
                }
                self.expect_spelling("}")?;
                Ok(self.push_stmt(StmtKind::Switch { selector, cases }, area))
            }
            other => Err(ParseError::Custom(format!("unsupported control-flow keyword '{other}'"))),
        }
    }

    // ---- expressions ------------------------------------------------------------------

    fn push_expr(&mut self, kind: ExprKind, area: SourceArea) -> ExprId {
        self.module.exprs.push(Expr {
            kind,
            area,
            flags: NodeFlags::default(),
            leading_comment: None,
            resolved_type: None,
            constant_value: None,
        })
    }

    /// Top-level expression: the comma operator, used only where HLSL actually allows it
    /// (`for(;;)` clauses already parse a single `parse_expr` per clause, which is where
    /// a comma-joined sequence can appear).
    fn parse_expr(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        let first = self.parse_assignment_expr()?;
        if !self.check_spelling(",") {
            return Ok(first);
        }
        let mut seq = vec![first];
        while self.eat_spelling(",")? {
            seq.push(self.parse_assignment_expr()?);
        }
        Ok(self.push_expr(ExprKind::Sequence(seq), area))
    }

    fn parse_assignment_expr(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        let lhs = self.parse_ternary_expr()?;
        let op = match self.peek()?.spelling.as_str() {
            "=" => Some(AssignOp::Assign),
            "+=" => Some(AssignOp::AddAssign),
            "-=" => Some(AssignOp::SubAssign),
            "*=" => Some(AssignOp::MulAssign),
            "/=" => Some(AssignOp::DivAssign),
            "%=" => Some(AssignOp::ModAssign),
            "<<=" => Some(AssignOp::ShlAssign),
            ">>=" => Some(AssignOp::ShrAssign),
            "&=" => Some(AssignOp::AndAssign),
            "|=" => Some(AssignOp::OrAssign),
            "^=" => Some(AssignOp::XorAssign),
            _ => None,
        };
        let Some(op) = op else { return Ok(lhs) };
        self.next()?;
        let value = self.parse_assignment_expr()?;
        Ok(self.push_expr(ExprKind::Assign { op, place: lhs, value }, area))
    }

    fn parse_ternary_expr(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        let cond = self.parse_binary_expr(0)?;
        if !self.eat_spelling("?")? {
            return Ok(cond);
        }
        let then_expr = self.parse_assignment_expr()?;
        self.expect_spelling(":")?;
        let else_expr = self.parse_assignment_expr()?;
        Ok(self.push_expr(ExprKind::Ternary { condition: cond, then_expr, else_expr }, area))
    }

    /// Precedence-climbing binary-operator ladder (spec §4.4); `min_prec` is the minimum
    /// binding power to keep consuming at this recursion level.
    fn parse_binary_expr(&mut self, min_prec: u8) -> PResult<ExprId> {
        let area = self.peek()?.area;
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let spelling = self.peek()?.spelling.clone();
            let Some((op, prec)) = binary_op_info(&spelling) else { break };
            if prec < min_prec {
                break;
            }
            self.next()?;
            let rhs = self.parse_binary_expr(prec + 1)?;
            lhs = self.push_expr(ExprKind::Binary { op, left: lhs, right: rhs }, area);
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        let spelling = self.peek()?.spelling.clone();
        let unary_op = match spelling.as_str() {
            "-" => Some(UnaryOp::Neg),
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::BitNot),
            "++" => Some(UnaryOp::PreInc),
            "--" => Some(UnaryOp::PreDec),
            "+" => None, // unary plus: consume, no node
            _ => return self.parse_cast_or_postfix_expr(),
        };
        if spelling == "+" {
            self.next()?;
            return self.parse_unary_expr();
        }
        let op = unary_op.unwrap();
        self.next()?;
        let operand = self.parse_unary_expr()?;
        Ok(self.push_expr(ExprKind::Unary { op, operand }, area))
    }

    fn parse_cast_or_postfix_expr(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        if let Some(target_type) = self.try_parse_cast()? {
            let operand = self.parse_unary_expr()?;
            return Ok(self.push_expr(ExprKind::Cast { target_type, operand }, area));
        }
        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> PResult<ExprId> {
        let area = self.peek()?.area;
        let mut expr = self.parse_primary_expr()?;
        loop {
            if self.eat_spelling(".")? {
                let member = self.expect_ident()?;
                expr = self.push_expr(ExprKind::Member { base: expr, member: member.spelling }, area);
            } else if self.eat_spelling("[")? {
                let index = self.parse_expr()?;
                self.expect_spelling("]")?;
                expr = self.push_expr(ExprKind::ArrayIndex { base: expr, index }, area);
            } else if self.check_spelling("++") {
                self.next()?;
                expr = self.push_expr(ExprKind::PostUnary { op: PostUnaryOp::PostInc, operand: expr }, area);
            } else if self.check_spelling("--") {
                self.next()?;
                expr = self.push_expr(ExprKind::PostUnary { op: PostUnaryOp::PostDec, operand: expr }, area);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> PResult<ExprId> {
        let tok = self.peek()?;
        let area = tok.area;
        match &tok.kind {
            TokenKind::Literal(LiteralKind::Int) => {
                self.next()?;
                let v = crate::scanner::literal_int_value(&tok.spelling).map_err(|e| ParseError::Custom(e.to_string()))?;
                Ok(self.push_expr(ExprKind::LiteralInt(v), area))
            }
            TokenKind::Literal(LiteralKind::Float) => {
                self.next()?;
                let v = crate::scanner::literal_float_value(&tok.spelling).map_err(|e| ParseError::Custom(e.to_string()))?;
                Ok(self.push_expr(ExprKind::LiteralFloat(v), area))
            }
            TokenKind::Literal(LiteralKind::Bool) => {
                self.next()?;
                Ok(self.push_expr(ExprKind::LiteralBool(tok.spelling.as_str() == "true"), area))
            }
            TokenKind::Literal(LiteralKind::String) => {
                self.next()?;
                let unquoted = tok.spelling.trim_matches('"');
                Ok(self.push_expr(ExprKind::LiteralString(SmolStr::from(unquoted)), area))
            }
            TokenKind::Punctuation if tok.spelling.as_str() == "(" => {
                self.next()?;
                let inner = self.parse_expr()?;
                self.expect_spelling(")")?;
                Ok(self.push_expr(ExprKind::Bracket(inner), area))
            }
            TokenKind::Punctuation if tok.spelling.as_str() == "{" => self.parse_initializer_list(),
            TokenKind::Keyword(KeywordClass::ScalarType | KeywordClass::VectorType | KeywordClass::MatrixType) => {
                self.next()?;
                let callee = tok.spelling.clone();
                self.expect_spelling("(")?;
                let arguments = self.parse_argument_list()?;
                self.expect_spelling(")")?;
                Ok(self.push_expr(
                    ExprKind::Call {
                        callee,
                        arguments,
                        resolved_callee: None,
                    },
                    area,
                ))
            }
            TokenKind::Ident => {
                self.next()?;
                if self.check_spelling("(") {
                    self.next()?;
                    let arguments = self.parse_argument_list()?;
                    self.expect_spelling(")")?;
                    return Ok(self.push_expr(
                        ExprKind::Call {
                            callee: tok.spelling.clone(),
                            arguments,
                            resolved_callee: None,
                        },
                        area,
                    ));
                }
                let ident = VarIdent {
                    namespace: None,
                    name: tok.spelling.clone(),
                    area,
                };
                Ok(self.push_expr(ExprKind::Object { ident, symbol: SymbolRef::Unresolved }, area))
            }
            _ => Err(ParseError::UnexpectedToken {
                found: tok.spelling.to_string(),
                expected: ", expected an expression".to_string(),
            }),
        }
    }

    fn parse_argument_list(&mut self) -> PResult<Vec<ExprId>> {
        let mut args = Vec::new();
        if self.check_spelling(")") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment_expr()?);
            if !self.eat_spelling(",")? {
                break;
            }
        }
        Ok(args)
    }
}

fn binary_op_info(spelling: &str) -> Option<(BinaryOp, u8)> {
    Some(match spelling {
        "||" => (BinaryOp::Or, 1),
        "&&" => (BinaryOp::And, 2),
        "|" => (BinaryOp::BitOr, 3),
        "^" => (BinaryOp::BitXor, 4),
        "&" => (BinaryOp::BitAnd, 5),
        "==" => (BinaryOp::Eq, 6),
        "!=" => (BinaryOp::Ne, 6),
        "<" => (BinaryOp::Lt, 7),
        "<=" => (BinaryOp::Le, 7),
        ">" => (BinaryOp::Gt, 7),
        ">=" => (BinaryOp::Ge, 7),
        "<<" => (BinaryOp::Shl, 8),
        ">>" => (BinaryOp::Shr, 8),
        "+" => (BinaryOp::Add, 9),
        "-" => (BinaryOp::Sub, 9),
        "*" => (BinaryOp::Mul, 10),
        "/" => (BinaryOp::Div, 10),
        "%" => (BinaryOp::Mod, 10),
        _ => return None,
    })
}

/// Parses an already-preprocessed token stream into a [`Module`] (spec §2 pipeline
/// order: parser runs directly over the preprocessor's token output, not over
/// re-serialized text, so synthesized tokens from macro stringize/paste keep their exact
/// kind/spelling).
pub fn parse(
    tokens: TokenString,
    origin: crate::source::Origin,
    version: crate::interfaces::InputShaderVersion,
    handler: &mut ReportHandler<'_>,
    pack_matrix_row_major_default: bool,
) -> Module {
    let mut scanner = Scanner::from_tokens(tokens, origin, version);
    scanner.set_mode(ScannerMode::Language);
    let parser = Parser::new(scanner, handler, pack_matrix_row_major_default);
    parser.parse_translation_unit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::InputShaderVersion;
    use crate::report::PlainTextLog;
    use crate::scanner::{Scanner, ScannerMode};
    use crate::source::{Origin, SourceBuffer, SourceMap};

    fn parse_source(src: &str) -> (Module, bool) {
        let mut log = PlainTextLog { sink: String::new() };
        let mut handler = ReportHandler::new(&mut log);
        let mut map = SourceMap::new();
        let origin = map.add_origin("t.hlsl", 1, 1);
        let scanner = Scanner::new(SourceBuffer::new(src, origin), InputShaderVersion::Hlsl5, ScannerMode::Language);
        let parser = Parser::new(scanner, &mut handler, false);
        let module = parser.parse_translation_unit();
        (module, handler.has_errors())
    }

    #[test]
    fn parses_simple_function() {
        let (module, errs) = parse_source("float4 main() : SV_Target { return float4(1,0,0,1); }");
        assert!(!errs);
        assert_eq!(module.globals.len(), 1);
        assert!(matches!(module.decls[module.globals[0]].kind, DeclKind::Function { .. }));
    }

    #[test]
    fn parses_struct_and_global_variable() {
        let (module, errs) = parse_source("struct VSOut { float4 pos : SV_Position; }; VSOut g;");
        assert!(!errs);
        assert_eq!(module.globals.len(), 2);
    }

    #[test]
    fn cast_vs_bracket_disambiguation() {
        let (module, errs) = parse_source("float f() { int x = 1; float y = (float) x; float z = (x + 1); return y + z; }");
        assert!(!errs);
        let f = &module.decls[module.globals[0]];
        match &f.kind {
            DeclKind::Function { body: Some(block), .. } => assert!(block.statements.len() >= 3),
            _ => panic!("expected function with a body"),
        }
    }

    #[test]
    fn dead_simple_cbuffer_parses() {
        let (module, errs) = parse_source("cbuffer Constants : register(b0) { float4x4 worldViewProj; }");
        assert!(!errs);
        assert!(matches!(module.decls[module.globals[0]].kind, DeclKind::UniformBuffer { .. }));
    }

    #[test]
    fn for_loop_and_array_indexing_parse() {
        let (module, errs) = parse_source("void main() { float a[4]; for (int i = 0; i < 4; i = i + 1) { a[i] = 0.0; } }");
        assert!(!errs);
        let _ = module;
    }

    #[test]
    fn reports_error_and_recovers_from_malformed_statement() {
        let (module, errs) = parse_source("void main() { int x = ; int y = 1; }");
        assert!(errs);
        assert_eq!(module.globals.len(), 1);
    }
}
