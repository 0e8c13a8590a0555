//! Macro table and expansion (spec §3.4, §4.3). Replacement lists are stored as a small
//! op sequence (plain token / parameter / stringized parameter) with a parallel "paste
//! before" marker, rather than as a flat token string, so `#` and `##` can be applied
//! without re-scanning the body on every expansion.

use crate::source::SourceArea;
use crate::token::{LiteralKind, Token, TokenKind, TokenString};
use indexmap::IndexMap;
use smol_str::SmolStr;

#[derive(Clone, Debug)]
enum BodyPiece {
    Token(Token),
    Param(usize),
    Stringized(usize),
}

#[derive(Clone, Debug)]
pub struct MacroDef {
    /// `None` for an object-like macro; `Some(params)` for a function-like one (`params`
    /// may be empty, e.g. `#define F() ...`).
    params: Option<Vec<SmolStr>>,
    body: Vec<BodyPiece>,
    /// `paste_before[i]` is true when this body piece's first expanded token should be
    /// glued onto the previously emitted token instead of starting a new one (`##`).
    paste_before: Vec<bool>,
    pub area: SourceArea,
}

impl MacroDef {
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    pub fn arity(&self) -> Option<usize> {
        self.params.as_ref().map(|p| p.len())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    #[error("'{0}' does not take arguments")]
    NotFunctionLike(String),
    #[error("macro '{0}' requires {1} argument(s), got {2}")]
    ArgumentCountMismatch(String, usize, usize),
    #[error("'#' is only valid directly before a macro parameter")]
    StrayStringize,
    #[error("'##' would produce an invalid token")]
    InvalidPaste,
    #[error("redefinition of macro '{0}' with a different replacement list")]
    Redefinition(String),
}

#[derive(Default)]
pub struct MacroTable {
    defs: IndexMap<SmolStr, MacroDef>,
}

impl MacroTable {
    pub fn new() -> MacroTable {
        MacroTable { defs: IndexMap::new() }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(name)
    }

    pub fn undef(&mut self, name: &str) {
        self.defs.shift_remove(name);
    }

    /// Registers a macro from its raw (unsubstituted) replacement-list tokens. `params`
    /// is `None` for an object-like macro. Per spec §4.3, a redefinition with an
    /// identical replacement list is accepted (common in doubly-included headers guarded
    /// only loosely) but still warned about — the `Ok(true)` return tells the caller
    /// this happened so it can submit that warning; any other redefinition is an error.
    pub fn define(
        &mut self,
        name: SmolStr,
        params: Option<Vec<SmolStr>>,
        raw_body: TokenString,
        area: SourceArea,
    ) -> Result<bool, MacroError> {
        let def = Self::compile_body(&params, raw_body, area)?;
        if let Some(existing) = self.defs.get(&name) {
            if !Self::bodies_equivalent(existing, &def) {
                return Err(MacroError::Redefinition(name.to_string()));
            }
            return Ok(true);
        }
        self.defs.insert(name, def);
        Ok(false)
    }

    fn bodies_equivalent(a: &MacroDef, b: &MacroDef) -> bool {
        a.params == b.params
            && a.body.len() == b.body.len()
            && a.body.iter().zip(b.body.iter()).all(|(x, y)| match (x, y) {
                (BodyPiece::Token(t1), BodyPiece::Token(t2)) => t1.kind == t2.kind && t1.spelling == t2.spelling,
                (BodyPiece::Param(i), BodyPiece::Param(j)) => i == j,
                (BodyPiece::Stringized(i), BodyPiece::Stringized(j)) => i == j,
                _ => false,
            })
    }

    fn compile_body(params: &Option<Vec<SmolStr>>, raw_body: TokenString, area: SourceArea) -> Result<MacroDef, MacroError> {
        let param_index = |name: &str| params.as_ref().and_then(|ps| ps.iter().position(|p| p == name));

        let mut body = Vec::new();
        let mut paste_before = Vec::new();
        let interest: Vec<&Token> = raw_body.tokens_of_interest().collect();
        let mut i = 0;
        while i < interest.len() {
            let tok = interest[i];
            let is_paste = tok.kind == TokenKind::Operator(crate::token::OperatorKind::Binary) && tok.spelling.as_str() == "##";
            if is_paste {
                // Mark the *next* piece as pasted-before; the '##' token itself is dropped.
                i += 1;
                if i >= interest.len() {
                    return Err(MacroError::InvalidPaste);
                }
                let next = interest[i];
                push_piece(&mut body, &mut paste_before, next, param_index(next.spelling.as_str()), true);
                i += 1;
                continue;
            }
            if tok.kind == TokenKind::Punctuation && tok.spelling.as_str() == "#" {
                i += 1;
                let Some(arg_tok) = interest.get(i) else {
                    return Err(MacroError::StrayStringize);
                };
                let Some(pidx) = param_index(arg_tok.spelling.as_str()) else {
                    return Err(MacroError::StrayStringize);
                };
                body.push(BodyPiece::Stringized(pidx));
                paste_before.push(false);
                i += 1;
                continue;
            }
            push_piece(&mut body, &mut paste_before, tok, param_index(tok.spelling.as_str()), false);
            i += 1;
        }

        Ok(MacroDef {
            params: params.clone(),
            body,
            paste_before,
            area,
        })
    }

    /// Expands `def` given raw (unsubstituted, not yet macro-expanded) argument token
    /// strings — pasted operands use raw argument text per the standard's `##` rule, all
    /// other parameter occurrences are substituted with the *macro-expanded* form, which
    /// the caller is responsible for expanding via [`expand_argument`] before calling this
    /// for non-pasted positions. To keep the implementation single-pass we instead expand
    /// eagerly here: callers pass `expanded_args` (macro-expanded) and `raw_args` (as written).
    pub fn expand(&self, def: &MacroDef, expanded_args: &[TokenString], raw_args: &[TokenString]) -> Result<TokenString, MacroError> {
        let mut out = TokenString::new();
        for (idx, piece) in def.body.iter().enumerate() {
            let pasted = def.paste_before[idx];
            match piece {
                BodyPiece::Token(t) => append_maybe_pasted(&mut out, std::slice::from_ref(t), pasted)?,
                BodyPiece::Param(p) => {
                    let src = if pasted { raw_args } else { expanded_args };
                    let arg = src.get(*p).cloned().unwrap_or_default();
                    let toks: Vec<Token> = arg.tokens_of_interest().cloned().collect();
                    append_maybe_pasted(&mut out, &toks, pasted)?;
                }
                BodyPiece::Stringized(p) => {
                    let arg = raw_args.get(*p).cloned().unwrap_or_default();
                    let text = stringize(&arg);
                    let area = def.area;
                    append_maybe_pasted(&mut out, &[Token::new(TokenKind::Literal(LiteralKind::String), text, area)], pasted)?;
                }
            }
        }
        Ok(out)
    }
}

fn push_piece(body: &mut Vec<BodyPiece>, paste_before: &mut Vec<bool>, tok: &Token, param: Option<usize>, pasted: bool) {
    match param {
        Some(p) => body.push(BodyPiece::Param(p)),
        None => body.push(BodyPiece::Token(tok.clone())),
    }
    paste_before.push(pasted);
}

fn append_maybe_pasted(out: &mut TokenString, toks: &[Token], pasted: bool) -> Result<(), MacroError> {
    if toks.is_empty() {
        return Ok(());
    }
    if pasted {
        if let Some(last) = out.tokens.last().cloned() {
            let pasted_spelling = format!("{}{}", last.spelling, toks[0].spelling);
            let relexed = relex_one(&pasted_spelling, last.area).ok_or(MacroError::InvalidPaste)?;
            out.tokens.pop();
            out.push(relexed);
            for t in &toks[1..] {
                out.push(t.clone());
            }
            return Ok(());
        }
    }
    for t in toks {
        out.push(t.clone());
    }
    Ok(())
}

/// Re-lexes a pasted token's spelling in isolation, requiring it to form exactly one
/// token (spec §4.3 "token paste produces a single token or is ill-formed").
fn relex_one(spelling: &str, area: SourceArea) -> Option<Token> {
    use crate::scanner::{Scanner, ScannerMode};
    use crate::source::SourceBuffer;
    let buf = SourceBuffer::new(spelling, area.position.origin);
    let mut scanner = Scanner::new(buf, crate::interfaces::InputShaderVersion::Hlsl5, ScannerMode::Language);
    let first = scanner.next().ok()?;
    if first.is_eof() {
        return None;
    }
    let second = scanner.next().ok()?;
    if !second.is_eof() {
        return None;
    }
    Some(Token::new(first.kind, spelling.to_string(), area))
}

/// Spells out an argument's tokens-of-interest as a quoted string literal (spec §4.3
/// `#` stringize operator), escaping embedded `"` and `\`.
fn stringize(arg: &TokenString) -> String {
    let joined = arg.to_string();
    let trimmed = joined.trim();
    let mut escaped = String::with_capacity(trimmed.len() + 2);
    escaped.push('"');
    for c in trimmed.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Origin, SourceArea, SourcePosition};
    use crate::token::{KeywordClass, OperatorKind};

    fn area() -> SourceArea {
        SourceArea::point(SourcePosition::new(Origin(0), 1, 1))
    }

    fn ident(s: &str) -> Token {
        Token::new(TokenKind::Ident, s, area())
    }

    #[test]
    fn object_like_macro_substitutes_no_params() {
        let mut table = MacroTable::new();
        let mut body = TokenString::new();
        body.push(Token::new(TokenKind::Literal(LiteralKind::Int), "1", area()));
        table.define("ONE".into(), None, body, area()).unwrap();
        let def = table.get("ONE").unwrap().clone();
        let out = table.expand(&def, &[], &[]).unwrap();
        assert_eq!(out.tokens_of_interest().count(), 1);
    }

    #[test]
    fn function_like_macro_substitutes_parameter() {
        let mut table = MacroTable::new();
        let mut body = TokenString::new();
        body.push(ident("x"));
        table.define("ID".into(), Some(vec!["x".into()]), body, area()).unwrap();
        let def = table.get("ID").unwrap().clone();
        let mut arg = TokenString::new();
        arg.push(Token::new(TokenKind::Literal(LiteralKind::Int), "42", area()));
        let out = table.expand(&def, &[arg.clone()], &[arg]).unwrap();
        assert_eq!(out.tokens_of_interest().next().unwrap().spelling.as_str(), "42");
    }

    #[test]
    fn stringize_quotes_argument_text() {
        let mut table = MacroTable::new();
        let mut body = TokenString::new();
        body.push(Token::new(TokenKind::Punctuation, "#", area()));
        body.push(ident("x"));
        table.define("STR".into(), Some(vec!["x".into()]), body, area()).unwrap();
        let def = table.get("STR").unwrap().clone();
        let mut arg = TokenString::new();
        arg.push(ident("foo"));
        let out = table.expand(&def, &[arg.clone()], &[arg]).unwrap();
        let tok = out.tokens_of_interest().next().unwrap();
        assert_eq!(tok.spelling.as_str(), "\"foo\"");
        assert_eq!(tok.kind, TokenKind::Literal(LiteralKind::String));
    }

    #[test]
    fn paste_glues_adjacent_tokens() {
        let mut table = MacroTable::new();
        let mut body = TokenString::new();
        body.push(ident("foo"));
        body.push(Token::new(TokenKind::Operator(OperatorKind::Binary), "##", area()));
        body.push(ident("bar"));
        table.define("CAT".into(), None, body, area()).unwrap();
        let def = table.get("CAT").unwrap().clone();
        let out = table.expand(&def, &[], &[]).unwrap();
        assert_eq!(out.tokens_of_interest().count(), 1);
        assert_eq!(out.tokens_of_interest().next().unwrap().spelling.as_str(), "foobar");
    }

    #[test]
    fn redefinition_with_different_body_is_an_error() {
        let mut table = MacroTable::new();
        let mut body1 = TokenString::new();
        body1.push(Token::new(TokenKind::Literal(LiteralKind::Int), "1", area()));
        table.define("X".into(), None, body1, area()).unwrap();
        let mut body2 = TokenString::new();
        body2.push(Token::new(TokenKind::Literal(LiteralKind::Int), "2", area()));
        assert!(table.define("X".into(), None, body2, area()).is_err());
    }

    #[test]
    fn identical_redefinition_is_accepted() {
        let mut table = MacroTable::new();
        let mut body1 = TokenString::new();
        body1.push(Token::new(TokenKind::Literal(LiteralKind::Int), "1", area()));
        table.define("X".into(), None, body1.clone(), area()).unwrap();
        assert_eq!(table.define("X".into(), None, body1, area()).unwrap(), true);
    }

    #[test]
    fn keyword_token_round_trips_through_body() {
        let mut table = MacroTable::new();
        let mut body = TokenString::new();
        body.push(Token::new(TokenKind::Keyword(KeywordClass::ScalarType), "float", area()));
        table.define("F".into(), None, body, area()).unwrap();
        let def = table.get("F").unwrap().clone();
        let out = table.expand(&def, &[], &[]).unwrap();
        assert_eq!(out.tokens_of_interest().next().unwrap().kind, TokenKind::Keyword(KeywordClass::ScalarType));
    }
}
