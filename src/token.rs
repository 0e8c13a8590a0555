//! Token, token kinds, and token strings (spec §3.2, §3.3).

use crate::source::SourceArea;
use smallvec::SmallVec;
use smol_str::SmolStr;
use std::fmt;

/// HLSL/Cg keyword categories, scanned from [`crate::keywords`]'s tables. Grouping
/// keywords by category (rather than one variant per spelling) keeps the parser's
/// first-set checks short, matching the category list in spec §3.2.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum KeywordClass {
    ScalarType,
    VectorType,
    MatrixType,
    Buffer,
    Sampler,
    UniformBuffer,
    InputModifier,
    InterpolationModifier,
    TypeModifier,
    StorageClass,
    ControlTransfer,
    ControlFlow,
    Struct,
    Typedef,
    Return,
    Discard,
    Technique,
    Cg,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum LiteralKind {
    Bool,
    Int,
    Float,
    String,
    Null,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OperatorKind {
    Assign,
    CompoundAssign,
    Binary,
    Unary,
    IncDec,
    Ternary,
    ScopeResolution,
    Dot,
}

/// The full closed set of token kinds (spec §3.2).
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum TokenKind {
    Ident,
    Keyword(KeywordClass),
    Literal(LiteralKind),
    Operator(OperatorKind),
    /// `(`, `)`, `{`, `}`, `[`, `]`, `,`, `;`, `:`
    Punctuation,
    /// `#` followed immediately by the directive name, e.g. `#define` scans as one
    /// `Directive` token whose spelling is `define`.
    Directive,
    Comment,
    Whitespace,
    Newline,
    /// A `\` immediately followed by a newline, kept as its own kind so the
    /// preprocessor-mode scanner can splice continuation lines (spec §4.2).
    LineContinuation,
    Eof,
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::LineContinuation
        )
    }
}

/// `(kind, spelling, source_area, optional_comment)` (spec §3.2).
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: SmolStr,
    pub area: SourceArea,
    /// A comment that immediately preceded this token on its own line, carried forward
    /// so the (out-of-scope) emitters can reproduce doc comments; also surfaced as an
    /// AST node's `optional_leading_comment` (spec §3.5).
    pub leading_comment: Option<SmolStr>,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<SmolStr>, area: SourceArea) -> Token {
        Token {
            kind,
            spelling: spelling.into(),
            area,
            leading_comment: None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// `(kind, spelling)` equality used by [`TokenString`]'s tokens-of-interest
    /// comparison (spec §3.3).
    fn interest_key(&self) -> (&TokenKind, &str) {
        (&self.kind, self.spelling.as_str())
    }
}

/// An ordered sequence of tokens with iteration that skips trivia, and equality defined
/// only over tokens-of-interest (spec §3.3).
#[derive(Clone, Debug, Default)]
pub struct TokenString {
    pub tokens: SmallVec<[Token; 8]>,
}

impl TokenString {
    pub fn new() -> TokenString {
        TokenString { tokens: SmallVec::new() }
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates only tokens that are not whitespace/newline/comment.
    pub fn tokens_of_interest(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.kind.is_trivia())
    }
}

impl PartialEq for TokenString {
    fn eq(&self, other: &Self) -> bool {
        self.tokens_of_interest()
            .map(Token::interest_key)
            .eq(other.tokens_of_interest().map(Token::interest_key))
    }
}
impl Eq for TokenString {}

impl fmt::Display for TokenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in self.tokens_of_interest() {
            write!(f, "{} ", t.spelling)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Origin, SourceArea, SourcePosition};

    fn dummy_area() -> SourceArea {
        SourceArea::point(SourcePosition::new(Origin(0), 1, 1))
    }

    #[test]
    fn token_string_equality_ignores_trivia() {
        let mut a = TokenString::new();
        a.push(Token::new(TokenKind::Ident, "x", dummy_area()));
        a.push(Token::new(TokenKind::Whitespace, " ", dummy_area()));
        a.push(Token::new(TokenKind::Punctuation, "+", dummy_area()));

        let mut b = TokenString::new();
        b.push(Token::new(TokenKind::Ident, "x", dummy_area()));
        b.push(Token::new(TokenKind::Punctuation, "+", dummy_area()));

        assert_eq!(a, b);
    }

    #[test]
    fn token_string_inequality_on_spelling() {
        let mut a = TokenString::new();
        a.push(Token::new(TokenKind::Ident, "x", dummy_area()));
        let mut b = TokenString::new();
        b.push(Token::new(TokenKind::Ident, "y", dummy_area()));
        assert_ne!(a, b);
    }
}
