//! Scanner/lexer (spec §4.2). Hand-written rather than generated (see DESIGN.md for why
//! `logos` was dropped): it needs two cooperating modes, one token of lookahead, and a
//! stack of pushed token strings so the preprocessor can re-inject macro-expanded tokens
//! into the stream it is reading from. Numeric-literal parsing helpers are modeled on
//! `graal_fx::lexer`'s `parse_int`/`parse_float`.

use crate::interfaces::InputShaderVersion;
use crate::keywords::{self, KeywordLookup};
use crate::report::DiagnosticCode;
use crate::source::{SourceArea, SourceBuffer, SourcePosition};
use crate::token::{KeywordClass, LiteralKind, OperatorKind, Token, TokenKind, TokenString};
use smol_str::SmolStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LexicalError {
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid numeric literal: {0}")]
    InvalidNumericLiteral(String),
    #[error("'{0}' is a reserved keyword and cannot be used as an identifier")]
    ReservedKeyword(String),
    #[error("'{0}' is not supported by the requested shader version/dialect")]
    UnsupportedKeyword(String),
    #[error("illegal character '{0}'")]
    IllegalCharacter(char),
}

impl LexicalError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            LexicalError::UnterminatedComment => DiagnosticCode::UnterminatedComment,
            LexicalError::UnterminatedString => DiagnosticCode::UnterminatedString,
            LexicalError::InvalidNumericLiteral(_) => DiagnosticCode::InvalidNumericLiteral,
            LexicalError::ReservedKeyword(_) => DiagnosticCode::ReservedKeyword,
            LexicalError::UnsupportedKeyword(_) => DiagnosticCode::UnsupportedKeyword,
            LexicalError::IllegalCharacter(_) => DiagnosticCode::IllegalCharacter,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ScannerMode {
    /// Surfaces whitespace/newline/line-continuation/comment tokens (spec §4.2).
    Preprocessor,
    /// Collapses trivia; only meaningful tokens are returned.
    Language,
}

struct PushedTokens {
    tokens: TokenString,
    cursor: usize,
}

pub struct Scanner {
    buffer: SourceBuffer,
    version: InputShaderVersion,
    mode: ScannerMode,
    at_line_start: bool,
    pushed: Vec<PushedTokens>,
    lookahead: Option<Token>,
}

impl Scanner {
    pub fn new(buffer: SourceBuffer, version: InputShaderVersion, mode: ScannerMode) -> Scanner {
        Scanner {
            buffer,
            version,
            mode,
            at_line_start: true,
            pushed: Vec::new(),
            lookahead: None,
        }
    }

    pub fn set_mode(&mut self, mode: ScannerMode) {
        self.mode = mode;
    }

    /// A scanner with no real source text, entirely fed by a pushed token string —
    /// used to re-run macro expansion over an already-scanned token sequence (a macro
    /// body or an argument) with the same logic that drives the top-level file scan.
    pub fn from_tokens(tokens: TokenString, origin: crate::source::Origin, version: InputShaderVersion) -> Scanner {
        let mut scanner = Scanner::new(SourceBuffer::new("", origin), version, ScannerMode::Preprocessor);
        scanner.push_tokens(tokens);
        scanner
    }

    /// Depth of the pushed-token-string stack, so a caller can tell when a frame it
    /// pushed has fully drained (used to un-paint a macro name once its expansion has
    /// been entirely re-scanned).
    pub fn pushed_depth(&self) -> usize {
        self.pushed.len()
    }

    pub fn mode(&self) -> ScannerMode {
        self.mode
    }

    /// Pushes a token string to be consumed before the underlying source resumes (spec
    /// §4.2: used by macro expansion to "inject" tokens back into the stream).
    pub fn push_tokens(&mut self, tokens: TokenString) {
        if !tokens.is_empty() {
            self.pushed.push(PushedTokens { tokens, cursor: 0 });
        }
    }

    pub fn position(&self) -> SourcePosition {
        self.buffer.position()
    }

    pub fn re_origin(&mut self, origin: crate::source::Origin) {
        self.buffer.re_origin(origin);
    }

    pub fn peek(&mut self) -> Result<&Token, LexicalError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.advance()?);
        }
        Ok(self.lookahead.as_ref().unwrap())
    }

    pub fn next(&mut self) -> Result<Token, LexicalError> {
        if let Some(tok) = self.lookahead.take() {
            return Ok(tok);
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<Token, LexicalError> {
        loop {
            let tok = self.raw_next()?;
            if self.mode == ScannerMode::Language && tok.kind.is_trivia() {
                continue;
            }
            return Ok(tok);
        }
    }

    /// Pops from the top pushed token string if one is active and not exhausted,
    /// otherwise scans directly from the source buffer.
    fn raw_next(&mut self) -> Result<Token, LexicalError> {
        loop {
            if let Some(top) = self.pushed.last_mut() {
                if top.cursor < top.tokens.tokens.len() {
                    let tok = top.tokens.tokens[top.cursor].clone();
                    top.cursor += 1;
                    return Ok(tok);
                } else {
                    self.pushed.pop();
                    continue;
                }
            }
            return self.scan_from_source();
        }
    }

    fn scan_from_source(&mut self) -> Result<Token, LexicalError> {
        let start = self.buffer.position();
        let c = self.buffer.peek();

        if c == '\0' {
            return Ok(Token::new(TokenKind::Eof, "", SourceArea::point(start)));
        }

        if c == '\n' {
            self.buffer.next();
            let tok = Token::new(TokenKind::Newline, "\n", SourceArea::new(start, 1));
            self.at_line_start = true;
            return Ok(tok);
        }

        if c == ' ' || c == '\t' || c == '\r' {
            let mut spelling = String::new();
            while matches!(self.buffer.peek(), ' ' | '\t' | '\r') {
                spelling.push(self.buffer.next());
            }
            let len = spelling.chars().count() as u32;
            return Ok(Token::new(TokenKind::Whitespace, spelling, SourceArea::new(start, len)));
        }

        if c == '\\' && self.buffer.peek_at(1) == '\n' {
            self.buffer.next();
            self.buffer.next();
            self.at_line_start = false;
            return Ok(Token::new(TokenKind::LineContinuation, "\\\n", SourceArea::new(start, 2)));
        }

        if c == '/' && self.buffer.peek_at(1) == '/' {
            let mut spelling = String::new();
            while !matches!(self.buffer.peek(), '\n' | '\0') {
                spelling.push(self.buffer.next());
            }
            let len = spelling.chars().count() as u32;
            self.at_line_start = false;
            return Ok(Token::new(TokenKind::Comment, spelling, SourceArea::new(start, len)));
        }

        if c == '/' && self.buffer.peek_at(1) == '*' {
            let mut spelling = String::new();
            spelling.push(self.buffer.next());
            spelling.push(self.buffer.next());
            loop {
                if self.buffer.is_eof() {
                    return Err(LexicalError::UnterminatedComment);
                }
                let ch = self.buffer.next();
                spelling.push(ch);
                if ch == '*' && self.buffer.peek() == '/' {
                    spelling.push(self.buffer.next());
                    break;
                }
            }
            let len = spelling.chars().count() as u32;
            self.at_line_start = false;
            return Ok(Token::new(TokenKind::Comment, spelling, SourceArea::new(start, len)));
        }

        // Directive: '#' only recognized at logical line start; elsewhere it scans as
        // plain punctuation (stringize / paste operators inside macro bodies).
        if c == '#' && self.at_line_start {
            self.buffer.next();
            let mut ws = String::new();
            while matches!(self.buffer.peek(), ' ' | '\t') {
                ws.push(self.buffer.next());
            }
            if self.buffer.peek().is_ascii_alphabetic() || self.buffer.peek() == '_' {
                let mut name = String::new();
                while self.buffer.peek().is_ascii_alphanumeric() || self.buffer.peek() == '_' {
                    name.push(self.buffer.next());
                }
                let len = (1 + ws.chars().count() + name.chars().count()) as u32;
                self.at_line_start = false;
                return Ok(Token::new(TokenKind::Directive, name, SourceArea::new(start, len)));
            } else {
                self.at_line_start = false;
                return Ok(Token::new(TokenKind::Punctuation, "#", SourceArea::new(start, 1)));
            }
        }

        self.at_line_start = false;

        if c.is_ascii_digit() || (c == '.' && self.buffer.peek_at(1).is_ascii_digit()) {
            return self.scan_number(start);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return self.scan_identifier_or_keyword(start);
        }

        if c == '"' {
            return self.scan_string(start);
        }

        self.scan_operator_or_punctuation(start)
    }

    fn scan_number(&mut self, start: SourcePosition) -> Result<Token, LexicalError> {
        let mut spelling = String::new();

        if self.buffer.peek() == '0' && matches!(self.buffer.peek_at(1), 'x' | 'X') {
            spelling.push(self.buffer.next());
            spelling.push(self.buffer.next());
            while self.buffer.peek().is_ascii_hexdigit() {
                spelling.push(self.buffer.next());
            }
            let len = spelling.chars().count() as u32;
            return Ok(Token::new(TokenKind::Literal(LiteralKind::Int), spelling, SourceArea::new(start, len)));
        }
        if self.buffer.peek() == '0' && matches!(self.buffer.peek_at(1), 'b' | 'B') {
            spelling.push(self.buffer.next());
            spelling.push(self.buffer.next());
            while matches!(self.buffer.peek(), '0' | '1') {
                spelling.push(self.buffer.next());
            }
            let len = spelling.chars().count() as u32;
            return Ok(Token::new(TokenKind::Literal(LiteralKind::Int), spelling, SourceArea::new(start, len)));
        }

        let mut is_float = false;
        while self.buffer.peek().is_ascii_digit() {
            spelling.push(self.buffer.next());
        }
        if self.buffer.peek() == '.' && self.buffer.peek_at(1) != '.' {
            is_float = true;
            spelling.push(self.buffer.next());
            while self.buffer.peek().is_ascii_digit() {
                spelling.push(self.buffer.next());
            }
        }
        if matches!(self.buffer.peek(), 'e' | 'E') {
            let save = spelling.len();
            let mut exp = String::new();
            exp.push(self.buffer.next());
            if matches!(self.buffer.peek(), '+' | '-') {
                exp.push(self.buffer.next());
            }
            if self.buffer.peek().is_ascii_digit() {
                is_float = true;
                while self.buffer.peek().is_ascii_digit() {
                    exp.push(self.buffer.next());
                }
                spelling.push_str(&exp);
            } else {
                let _ = save;
                // not actually an exponent (e.g. trailing identifier char); leave as-is,
                // the 'e' will be re-scanned as the start of an identifier token next.
            }
        }
        if matches!(self.buffer.peek(), 'f' | 'F') && is_float {
            spelling.push(self.buffer.next());
        } else if is_float && matches!(self.buffer.peek(), 'f' | 'F') {
            spelling.push(self.buffer.next());
        }

        // Octal: leading zero, no '.', no exponent, more than one digit.
        let kind = if is_float {
            LiteralKind::Float
        } else {
            LiteralKind::Int
        };
        let len = spelling.chars().count() as u32;
        Ok(Token::new(TokenKind::Literal(kind), spelling, SourceArea::new(start, len)))
    }

    fn scan_identifier_or_keyword(&mut self, start: SourcePosition) -> Result<Token, LexicalError> {
        let mut spelling = String::new();
        while self.buffer.peek().is_ascii_alphanumeric() || self.buffer.peek() == '_' {
            spelling.push(self.buffer.next());
        }
        let len = spelling.chars().count() as u32;
        let area = SourceArea::new(start, len);

        match spelling.as_str() {
            "true" | "false" => {
                return Ok(Token::new(TokenKind::Literal(LiteralKind::Bool), spelling, area));
            }
            "NULL" => {
                return Ok(Token::new(TokenKind::Literal(LiteralKind::Null), spelling, area));
            }
            _ => {}
        }

        match keywords::lookup(&spelling, self.version) {
            KeywordLookup::Keyword(class) => Ok(Token::new(TokenKind::Keyword(class), spelling, area)),
            KeywordLookup::NotAKeyword => Ok(Token::new(TokenKind::Ident, spelling, area)),
            KeywordLookup::Reserved => Err(LexicalError::ReservedKeyword(spelling)),
            KeywordLookup::Unsupported => Err(LexicalError::UnsupportedKeyword(spelling)),
        }
    }

    fn scan_string(&mut self, start: SourcePosition) -> Result<Token, LexicalError> {
        let mut spelling = String::new();
        spelling.push(self.buffer.next()); // opening quote
        loop {
            if self.buffer.is_eof() || self.buffer.peek() == '\n' {
                return Err(LexicalError::UnterminatedString);
            }
            let ch = self.buffer.next();
            spelling.push(ch);
            if ch == '"' {
                break;
            }
        }
        let len = spelling.chars().count() as u32;
        Ok(Token::new(TokenKind::Literal(LiteralKind::String), spelling, SourceArea::new(start, len)))
    }

    fn scan_operator_or_punctuation(&mut self, start: SourcePosition) -> Result<Token, LexicalError> {
        const THREE: &[&str] = &["<<=", ">>="];
        const TWO: &[&str] = &[
            "==", "!=", "<=", ">=", "<<", ">>", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "::", "##",
        ];

        let c0 = self.buffer.peek();
        let c1 = self.buffer.peek_at(1);
        let c2 = self.buffer.peek_at(2);
        let three: String = [c0, c1, c2].iter().collect();
        let two: String = [c0, c1].iter().collect();

        if THREE.contains(&three.as_str()) {
            self.buffer.next();
            self.buffer.next();
            self.buffer.next();
            return Ok(Token::new(
                TokenKind::Operator(OperatorKind::CompoundAssign),
                three,
                SourceArea::new(start, 3),
            ));
        }
        if TWO.contains(&two.as_str()) {
            self.buffer.next();
            self.buffer.next();
            let kind = match two.as_str() {
                "==" | "!=" | "<=" | ">=" | "&&" | "||" => OperatorKind::Binary,
                "<<" | ">>" => OperatorKind::Binary,
                "++" | "--" => OperatorKind::IncDec,
                "::" => OperatorKind::ScopeResolution,
                "##" => OperatorKind::Binary,
                _ => OperatorKind::CompoundAssign,
            };
            return Ok(Token::new(TokenKind::Operator(kind), two, SourceArea::new(start, 2)));
        }

        self.buffer.next();
        let spelling = c0.to_string();
        let area = SourceArea::new(start, 1);
        let tok = match c0 {
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | ';' | ':' => Token::new(TokenKind::Punctuation, spelling, area),
            '?' => Token::new(TokenKind::Operator(OperatorKind::Ternary), spelling, area),
            '.' => Token::new(TokenKind::Operator(OperatorKind::Dot), spelling, area),
            '=' => Token::new(TokenKind::Operator(OperatorKind::Assign), spelling, area),
            '+' | '-' | '*' | '/' | '%' | '<' | '>' | '&' | '|' | '^' | '!' | '~' => {
                Token::new(TokenKind::Operator(OperatorKind::Binary), spelling, area)
            }
            '#' => Token::new(TokenKind::Punctuation, spelling, area),
            other => return Err(LexicalError::IllegalCharacter(other)),
        };
        Ok(tok)
    }
}

/// Convenience used by the preprocessor and tests: collects spelling text back out of a
/// token, for numeric/string literal conversion.
pub fn literal_int_value(spelling: &str) -> Result<i64, LexicalError> {
    let s = spelling.replace('_', "");
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else if s.len() > 1 && s.starts_with('0') && s.chars().all(|c| c.is_digit(8)) {
        i64::from_str_radix(&s, 8)
    } else {
        s.parse::<i64>()
    };
    parsed.map_err(|e| LexicalError::InvalidNumericLiteral(e.to_string()))
}

pub fn literal_float_value(spelling: &str) -> Result<f64, LexicalError> {
    let s = spelling.trim_end_matches(['f', 'F']).replace('_', "");
    s.parse::<f64>().map_err(|e| LexicalError::InvalidNumericLiteral(e.to_string()))
}

pub fn spelling_of(token: &Token) -> SmolStr {
    token.spelling.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Origin, SourceMap};

    fn scanner_for(src: &str, mode: ScannerMode) -> Scanner {
        let mut map = SourceMap::new();
        let origin = map.add_origin("t", 1, 1);
        let buf = SourceBuffer::new(src, origin);
        Scanner::new(buf, InputShaderVersion::Hlsl5, mode)
    }

    #[test]
    fn language_mode_skips_whitespace() {
        let mut s = scanner_for("int   x ;", ScannerMode::Language);
        let t1 = s.next().unwrap();
        assert_eq!(t1.kind, TokenKind::Keyword(KeywordClass::ScalarType));
        let t2 = s.next().unwrap();
        assert_eq!(t2.kind, TokenKind::Ident);
        assert_eq!(t2.spelling.as_str(), "x");
    }

    #[test]
    fn preprocessor_mode_surfaces_whitespace() {
        let mut s = scanner_for("a b", ScannerMode::Preprocessor);
        let t1 = s.next().unwrap();
        assert_eq!(t1.kind, TokenKind::Ident);
        let t2 = s.next().unwrap();
        assert_eq!(t2.kind, TokenKind::Whitespace);
    }

    #[test]
    fn directive_only_recognized_at_line_start() {
        let mut s = scanner_for("#define M(x) #x", ScannerMode::Preprocessor);
        let t1 = s.next().unwrap();
        assert_eq!(t1.kind, TokenKind::Directive);
        assert_eq!(t1.spelling.as_str(), "define");
    }

    #[test]
    fn stringize_hash_is_punctuation_mid_line() {
        let mut s = scanner_for("#define M(x) #x", ScannerMode::Language);
        // define, M, (, x, ), then '#' as punctuation, then x
        for _ in 0..5 {
            s.next().unwrap();
        }
        let hash = s.next().unwrap();
        assert_eq!(hash.kind, TokenKind::Punctuation);
        assert_eq!(hash.spelling.as_str(), "#");
    }

    #[test]
    fn numeric_literals() {
        let mut s = scanner_for("1 0x1F 3.14 2.0f 0b101", ScannerMode::Language);
        assert_eq!(s.next().unwrap().kind, TokenKind::Literal(LiteralKind::Int));
        assert_eq!(s.next().unwrap().kind, TokenKind::Literal(LiteralKind::Int));
        assert_eq!(s.next().unwrap().kind, TokenKind::Literal(LiteralKind::Float));
        assert_eq!(s.next().unwrap().kind, TokenKind::Literal(LiteralKind::Float));
        assert_eq!(s.next().unwrap().kind, TokenKind::Literal(LiteralKind::Int));
    }

    #[test]
    fn reserved_keyword_errors() {
        let mut s = scanner_for("template", ScannerMode::Language);
        assert!(matches!(s.next(), Err(LexicalError::ReservedKeyword(_))));
    }

    #[test]
    fn longest_match_operators() {
        let mut s = scanner_for("<<= << <", ScannerMode::Language);
        assert_eq!(s.next().unwrap().spelling.as_str(), "<<=");
        assert_eq!(s.next().unwrap().spelling.as_str(), "<<");
        assert_eq!(s.next().unwrap().spelling.as_str(), "<");
    }

    #[test]
    fn push_tokens_is_consumed_before_source_resumes() {
        let mut s = scanner_for("tail", ScannerMode::Language);
        let mut injected = TokenString::new();
        injected.push(Token::new(
            TokenKind::Ident,
            "head",
            SourceArea::point(SourcePosition::new(Origin(0), 1, 1)),
        ));
        s.push_tokens(injected);
        assert_eq!(s.next().unwrap().spelling.as_str(), "head");
        assert_eq!(s.next().unwrap().spelling.as_str(), "tail");
    }
}
