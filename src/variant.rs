//! `Variant`: the polymorphic constant value used by `#if` evaluation and by the
//! analyzer's constant-expression sub-visitor (spec §3.7).

use std::fmt;

/// `Undefined | Bool | Int (wide signed) | Real (double) | Array of Variant`.
#[derive(Clone, Debug, PartialEq)]
pub enum Variant {
    Undefined,
    Bool(bool),
    Int(i64),
    Real(f64),
    Array(Vec<Variant>),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("operation not defined on undefined or array operands")]
    InvalidOperands,
}

type VResult = Result<Variant, VariantError>;

impl Variant {
    pub fn to_bool(&self) -> bool {
        match self {
            Variant::Undefined => false,
            Variant::Bool(b) => *b,
            Variant::Int(i) => *i != 0,
            Variant::Real(r) => *r != 0.0,
            Variant::Array(a) => !a.is_empty(),
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Variant::Undefined => 0,
            Variant::Bool(b) => *b as i64,
            Variant::Int(i) => *i,
            Variant::Real(r) => *r as i64,
            Variant::Array(_) => 0,
        }
    }

    pub fn to_real(&self) -> f64 {
        match self {
            Variant::Undefined => 0.0,
            Variant::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Variant::Int(i) => *i as f64,
            Variant::Real(r) => *r,
            Variant::Array(_) => 0.0,
        }
    }

    fn is_real(&self) -> bool {
        matches!(self, Variant::Real(_))
    }

    /// HLSL implicit promotion for a binary arithmetic/comparison pair: if either
    /// operand is `Real`, both are treated as `Real`; otherwise both as `Int`.
    fn promote(a: &Variant, b: &Variant) -> Result<(Promoted, Promoted), VariantError> {
        if matches!(a, Variant::Undefined | Variant::Array(_)) || matches!(b, Variant::Undefined | Variant::Array(_)) {
            return Err(VariantError::InvalidOperands);
        }
        if a.is_real() || b.is_real() {
            Ok((Promoted::Real(a.to_real()), Promoted::Real(b.to_real())))
        } else {
            Ok((Promoted::Int(a.to_int()), Promoted::Int(b.to_int())))
        }
    }

    pub fn add(&self, other: &Variant) -> VResult {
        match Self::promote(self, other)? {
            (Promoted::Real(a), Promoted::Real(b)) => Ok(Variant::Real(a + b)),
            (Promoted::Int(a), Promoted::Int(b)) => Ok(Variant::Int(a.wrapping_add(b))),
            _ => unreachable!(),
        }
    }

    pub fn sub(&self, other: &Variant) -> VResult {
        match Self::promote(self, other)? {
            (Promoted::Real(a), Promoted::Real(b)) => Ok(Variant::Real(a - b)),
            (Promoted::Int(a), Promoted::Int(b)) => Ok(Variant::Int(a.wrapping_sub(b))),
            _ => unreachable!(),
        }
    }

    pub fn mul(&self, other: &Variant) -> VResult {
        match Self::promote(self, other)? {
            (Promoted::Real(a), Promoted::Real(b)) => Ok(Variant::Real(a * b)),
            (Promoted::Int(a), Promoted::Int(b)) => Ok(Variant::Int(a.wrapping_mul(b))),
            _ => unreachable!(),
        }
    }

    pub fn div(&self, other: &Variant) -> VResult {
        match Self::promote(self, other)? {
            (Promoted::Real(a), Promoted::Real(b)) => Ok(Variant::Real(a / b)),
            (Promoted::Int(a), Promoted::Int(b)) => {
                if b == 0 {
                    Err(VariantError::DivisionByZero)
                } else {
                    Ok(Variant::Int(a.wrapping_div(b)))
                }
            }
            _ => unreachable!(),
        }
    }

    pub fn rem(&self, other: &Variant) -> VResult {
        match Self::promote(self, other)? {
            (Promoted::Real(a), Promoted::Real(b)) => Ok(Variant::Real(a % b)),
            (Promoted::Int(a), Promoted::Int(b)) => {
                if b == 0 {
                    Err(VariantError::ModuloByZero)
                } else {
                    Ok(Variant::Int(a.wrapping_rem(b)))
                }
            }
            _ => unreachable!(),
        }
    }

    fn int_binop(&self, other: &Variant, f: impl FnOnce(i64, i64) -> i64) -> VResult {
        if matches!(self, Variant::Undefined | Variant::Array(_)) || matches!(other, Variant::Undefined | Variant::Array(_)) {
            return Err(VariantError::InvalidOperands);
        }
        Ok(Variant::Int(f(self.to_int(), other.to_int())))
    }

    pub fn bit_and(&self, other: &Variant) -> VResult {
        self.int_binop(other, |a, b| a & b)
    }
    pub fn bit_or(&self, other: &Variant) -> VResult {
        self.int_binop(other, |a, b| a | b)
    }
    pub fn bit_xor(&self, other: &Variant) -> VResult {
        self.int_binop(other, |a, b| a ^ b)
    }
    pub fn shl(&self, other: &Variant) -> VResult {
        self.int_binop(other, |a, b| a.wrapping_shl(b as u32 & 63))
    }
    pub fn shr(&self, other: &Variant) -> VResult {
        self.int_binop(other, |a, b| a.wrapping_shr(b as u32 & 63))
    }

    pub fn logical_and(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(self.to_bool() && other.to_bool()))
    }
    pub fn logical_or(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(self.to_bool() || other.to_bool()))
    }
    pub fn logical_not(&self) -> VResult {
        Ok(Variant::Bool(!self.to_bool()))
    }
    pub fn bit_not(&self) -> VResult {
        if matches!(self, Variant::Undefined | Variant::Array(_)) {
            return Err(VariantError::InvalidOperands);
        }
        Ok(Variant::Int(!self.to_int()))
    }
    pub fn neg(&self) -> VResult {
        match self {
            Variant::Real(r) => Ok(Variant::Real(-r)),
            Variant::Undefined | Variant::Array(_) => Err(VariantError::InvalidOperands),
            _ => Ok(Variant::Int(-self.to_int())),
        }
    }

    fn cmp(&self, other: &Variant) -> Result<std::cmp::Ordering, VariantError> {
        match Self::promote(self, other)? {
            (Promoted::Real(a), Promoted::Real(b)) => a.partial_cmp(&b).ok_or(VariantError::InvalidOperands),
            (Promoted::Int(a), Promoted::Int(b)) => Ok(a.cmp(&b)),
            _ => unreachable!(),
        }
    }

    pub fn eq_op(&self, other: &Variant) -> VResult {
        if self.is_real() || other.is_real() || matches!(self, Variant::Int(_) | Variant::Bool(_)) {
            if let Ok(o) = self.cmp(other) {
                return Ok(Variant::Bool(o == std::cmp::Ordering::Equal));
            }
        }
        Ok(Variant::Bool(self == other))
    }
    pub fn ne_op(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(!self.eq_op(other)?.to_bool()))
    }
    pub fn lt(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(self.cmp(other)? == std::cmp::Ordering::Less))
    }
    pub fn le(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(self.cmp(other)? != std::cmp::Ordering::Greater))
    }
    pub fn gt(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(self.cmp(other)? == std::cmp::Ordering::Greater))
    }
    pub fn ge(&self, other: &Variant) -> VResult {
        Ok(Variant::Bool(self.cmp(other)? != std::cmp::Ordering::Less))
    }

    pub fn pre_increment(&self) -> VResult {
        self.add(&Variant::Int(1))
    }
    pub fn pre_decrement(&self) -> VResult {
        self.sub(&Variant::Int(1))
    }
}

enum Promoted {
    Int(i64),
    Real(f64),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Undefined => write!(f, "<undefined>"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Real(r) => write!(f, "{r}"),
            Variant::Array(a) => {
                write!(f, "{{")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_by_zero_is_an_error() {
        assert_eq!(Variant::Int(4).div(&Variant::Int(0)), Err(VariantError::DivisionByZero));
    }

    #[test]
    fn integer_modulo_by_zero_is_an_error() {
        assert_eq!(Variant::Int(4).rem(&Variant::Int(0)), Err(VariantError::ModuloByZero));
    }

    #[test]
    fn real_division_by_zero_is_infinity_not_an_error() {
        let r = Variant::Real(1.0).div(&Variant::Real(0.0)).unwrap();
        assert_eq!(r, Variant::Real(f64::INFINITY));
    }

    #[test]
    fn mixed_int_real_promotes_to_real() {
        let r = Variant::Int(1).add(&Variant::Real(0.5)).unwrap();
        assert_eq!(r, Variant::Real(1.5));
    }

    #[test]
    fn shift_amounts_are_masked() {
        let r = Variant::Int(1).shl(&Variant::Int(65)).unwrap();
        assert_eq!(r, Variant::Int(2));
    }

    #[test]
    fn comparisons_promote_like_arithmetic() {
        assert_eq!(Variant::Int(1).lt(&Variant::Real(1.5)).unwrap(), Variant::Bool(true));
    }
}
