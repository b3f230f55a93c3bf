//! Fixed-point decimal arithmetic
//!
//! Values are unsigned integers scaled by `UNIT` (10^18). Every operation is
//! checked: overflow, underflow and division by zero are hard failures,
//! never saturating. Products are formed in 256 bits before being narrowed,
//! so `x * y / z` only fails when the final quotient does not fit.
//!
//! Division truncates toward zero. Fee and proceeds computations downstream
//! rely on this rounding direction.

use primitive_types::U256;
use thiserror::Error;
use crate::constants::UNIT;

/// A fixed-point quantity (18 decimal places)
pub type Amount = u128;

/// Arithmetic failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Arithmetic underflow")]
    Underflow,
    #[error("Division by zero")]
    DivideByZero,
}

pub fn safe_add(x: Amount, y: Amount) -> Result<Amount, MathError> {
    x.checked_add(y).ok_or(MathError::Overflow)
}

pub fn safe_sub(x: Amount, y: Amount) -> Result<Amount, MathError> {
    x.checked_sub(y).ok_or(MathError::Underflow)
}

pub fn safe_mul(x: Amount, y: Amount) -> Result<Amount, MathError> {
    x.checked_mul(y).ok_or(MathError::Overflow)
}

pub fn safe_div(x: Amount, y: Amount) -> Result<Amount, MathError> {
    if y == 0 {
        return Err(MathError::DivideByZero);
    }
    Ok(x / y)
}

/// `x * y / UNIT`, truncated
pub fn multiply_decimal(x: Amount, y: Amount) -> Result<Amount, MathError> {
    mul_div(x, y, UNIT)
}

/// `x * UNIT / y`, truncated
pub fn divide_decimal(x: Amount, y: Amount) -> Result<Amount, MathError> {
    mul_div(x, UNIT, y)
}

/// `x * y / z` with a single truncation at the end
pub fn mul_div(x: Amount, y: Amount, z: Amount) -> Result<Amount, MathError> {
    if z == 0 {
        return Err(MathError::DivideByZero);
    }
    // Two u128 factors always fit in 256 bits.
    let product = U256::from(x) * U256::from(y);
    narrow(product / U256::from(z))
}

fn narrow(value: U256) -> Result<Amount, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.low_u128())
}
