//! `#if`/`#elif` constant-expression evaluation (spec §4.3), reusing [`crate::variant`]
//! for the arithmetic. By the time a token stream reaches this module, `defined(...)` has
//! already been resolved to a literal `0`/`1` and every macro has been expanded (see
//! `preprocessor::mod::evaluate_constant_expression`); any identifier still present here
//! is an undefined name and evaluates to `0`, matching the C-preprocessor convention the
//! original follows (DESIGN.md Open Question 3).

use crate::scanner::{literal_float_value, literal_int_value};
use crate::token::{OperatorKind, Token, TokenKind};
use crate::variant::{Variant, VariantError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConstExprError {
    #[error("unexpected end of constant expression")]
    UnexpectedEnd,
    #[error("unexpected token '{0}' in constant expression")]
    UnexpectedToken(String),
    #[error("unbalanced parentheses in constant expression")]
    UnbalancedParens,
    #[error(transparent)]
    Variant(#[from] VariantError),
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn is_spelling(&self, s: &str) -> bool {
        self.peek().map(|t| t.spelling.as_str() == s).unwrap_or(false)
    }

    fn parse(&mut self) -> Result<Variant, ConstExprError> {
        let v = self.ternary()?;
        if self.pos != self.tokens.len() {
            let tok = &self.tokens[self.pos];
            return Err(ConstExprError::UnexpectedToken(tok.spelling.to_string()));
        }
        Ok(v)
    }

    fn ternary(&mut self) -> Result<Variant, ConstExprError> {
        let cond = self.logical_or()?;
        if self.is_spelling("?") {
            self.bump();
            let then_v = self.ternary()?;
            if !self.is_spelling(":") {
                return Err(ConstExprError::UnexpectedToken(":".to_string()));
            }
            self.bump();
            let else_v = self.ternary()?;
            return Ok(if cond.to_bool() { then_v } else { else_v });
        }
        Ok(cond)
    }

    fn logical_or(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.logical_and()?;
        while self.is_spelling("||") {
            self.bump();
            let rhs = self.logical_and()?;
            v = v.logical_or(&rhs)?;
        }
        Ok(v)
    }

    fn logical_and(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.bit_or()?;
        while self.is_spelling("&&") {
            self.bump();
            let rhs = self.bit_or()?;
            v = v.logical_and(&rhs)?;
        }
        Ok(v)
    }

    fn bit_or(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.bit_xor()?;
        while self.is_spelling("|") {
            self.bump();
            let rhs = self.bit_xor()?;
            v = v.bit_or(&rhs)?;
        }
        Ok(v)
    }

    fn bit_xor(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.bit_and()?;
        while self.is_spelling("^") {
            self.bump();
            let rhs = self.bit_and()?;
            v = v.bit_xor(&rhs)?;
        }
        Ok(v)
    }

    fn bit_and(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.equality()?;
        while self.is_spelling("&") {
            self.bump();
            let rhs = self.equality()?;
            v = v.bit_and(&rhs)?;
        }
        Ok(v)
    }

    fn equality(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.relational()?;
        loop {
            if self.is_spelling("==") {
                self.bump();
                v = v.eq_op(&self.relational()?)?;
            } else if self.is_spelling("!=") {
                self.bump();
                v = v.ne_op(&self.relational()?)?;
            } else {
                break;
            }
        }
        Ok(v)
    }

    fn relational(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.shift()?;
        loop {
            if self.is_spelling("<") {
                self.bump();
                v = v.lt(&self.shift()?)?;
            } else if self.is_spelling("<=") {
                self.bump();
                v = v.le(&self.shift()?)?;
            } else if self.is_spelling(">") {
                self.bump();
                v = v.gt(&self.shift()?)?;
            } else if self.is_spelling(">=") {
                self.bump();
                v = v.ge(&self.shift()?)?;
            } else {
                break;
            }
        }
        Ok(v)
    }

    fn shift(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.additive()?;
        loop {
            if self.is_spelling("<<") {
                self.bump();
                v = v.shl(&self.additive()?)?;
            } else if self.is_spelling(">>") {
                self.bump();
                v = v.shr(&self.additive()?)?;
            } else {
                break;
            }
        }
        Ok(v)
    }

    fn additive(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.multiplicative()?;
        loop {
            if self.is_spelling("+") {
                self.bump();
                v = v.add(&self.multiplicative()?)?;
            } else if self.is_spelling("-") {
                self.bump();
                v = v.sub(&self.multiplicative()?)?;
            } else {
                break;
            }
        }
        Ok(v)
    }

    fn multiplicative(&mut self) -> Result<Variant, ConstExprError> {
        let mut v = self.unary()?;
        loop {
            if self.is_spelling("*") {
                self.bump();
                v = v.mul(&self.unary()?)?;
            } else if self.is_spelling("/") {
                self.bump();
                v = v.div(&self.unary()?)?;
            } else if self.is_spelling("%") {
                self.bump();
                v = v.rem(&self.unary()?)?;
            } else {
                break;
            }
        }
        Ok(v)
    }

    fn unary(&mut self) -> Result<Variant, ConstExprError> {
        if self.is_spelling("!") {
            self.bump();
            return Ok(self.unary()?.logical_not()?);
        }
        if self.is_spelling("~") {
            self.bump();
            return Ok(self.unary()?.bit_not()?);
        }
        if self.is_spelling("-") {
            self.bump();
            return Ok(self.unary()?.neg()?);
        }
        if self.is_spelling("+") {
            self.bump();
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Variant, ConstExprError> {
        let tok = self.peek().cloned().ok_or(ConstExprError::UnexpectedEnd)?;
        match &tok.kind {
            TokenKind::Punctuation if tok.spelling.as_str() == "(" => {
                self.bump();
                let v = self.ternary()?;
                if !self.is_spelling(")") {
                    return Err(ConstExprError::UnbalancedParens);
                }
                self.bump();
                Ok(v)
            }
            TokenKind::Literal(crate::token::LiteralKind::Int) => {
                self.bump();
                let i = literal_int_value(&tok.spelling).map_err(|_| ConstExprError::UnexpectedToken(tok.spelling.to_string()))?;
                Ok(Variant::Int(i))
            }
            TokenKind::Literal(crate::token::LiteralKind::Float) => {
                self.bump();
                let r = literal_float_value(&tok.spelling).map_err(|_| ConstExprError::UnexpectedToken(tok.spelling.to_string()))?;
                Ok(Variant::Real(r))
            }
            TokenKind::Literal(crate::token::LiteralKind::Bool) => {
                self.bump();
                Ok(Variant::Bool(tok.spelling.as_str() == "true"))
            }
            TokenKind::Ident => {
                // An identifier surviving to this point is an undefined macro/name: 0.
                self.bump();
                Ok(Variant::Int(0))
            }
            TokenKind::Operator(OperatorKind::Binary) if tok.spelling.as_str() == "##" => {
                Err(ConstExprError::UnexpectedToken(tok.spelling.to_string()))
            }
            _ => Err(ConstExprError::UnexpectedToken(tok.spelling.to_string())),
        }
    }
}

pub fn evaluate(tokens: &[Token]) -> Result<Variant, ConstExprError> {
    if tokens.is_empty() {
        return Err(ConstExprError::UnexpectedEnd);
    }
    ExprParser { tokens, pos: 0 }.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Origin, SourceArea, SourcePosition};
    use crate::token::{LiteralKind, Token, TokenKind};

    fn area() -> SourceArea {
        SourceArea::point(SourcePosition::new(Origin(0), 1, 1))
    }
    fn lit_int(s: &str) -> Token {
        Token::new(TokenKind::Literal(LiteralKind::Int), s, area())
    }
    fn punct(s: &str) -> Token {
        Token::new(TokenKind::Punctuation, s, area())
    }
    fn op(s: &str) -> Token {
        Token::new(TokenKind::Operator(OperatorKind::Binary), s, area())
    }

    #[test]
    fn evaluates_arithmetic_precedence() {
        // 1 + 2 * 3 == 7
        let toks = vec![lit_int("1"), op("+"), lit_int("2"), op("*"), lit_int("3")];
        assert_eq!(evaluate(&toks).unwrap(), Variant::Int(7));
    }

    #[test]
    fn evaluates_parenthesized_expression() {
        let toks = vec![punct("("), lit_int("1"), op("+"), lit_int("2"), punct(")"), op("*"), lit_int("3")];
        assert_eq!(evaluate(&toks).unwrap(), Variant::Int(9));
    }

    #[test]
    fn undefined_identifier_is_zero() {
        let toks = vec![Token::new(TokenKind::Ident, "FOO", area())];
        assert_eq!(evaluate(&toks).unwrap(), Variant::Int(0));
    }

    #[test]
    fn unbalanced_parens_is_an_error() {
        let toks = vec![punct("("), lit_int("1")];
        assert!(evaluate(&toks).is_err());
    }

    #[test]
    fn division_by_zero_propagates_as_error() {
        let toks = vec![lit_int("1"), Token::new(TokenKind::Operator(OperatorKind::Binary), "/", area()), lit_int("0")];
        assert!(matches!(evaluate(&toks), Err(ConstExprError::Variant(VariantError::DivisionByZero))));
    }
}
