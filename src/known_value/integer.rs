//! Known values of integer type.
//!
//! Concrete integer arithmetic wraps modulo 2^32, so operands are drawn
//! freely from `[0, i32::MAX]` and the complementary operand is computed
//! modulo 2^32. Abstract integers are evaluated exactly; for them the
//! operands are drawn so that no intermediate value leaves the 32-bit domain
//! and nothing relies on wraparound.

use super::{
    binary_random_operand_order, choose::Choices, exact_factor, uniform, KnownValue, Strategy,
};
use crate::ast::{BinaryOperator, Expression, Scalar};
use crate::error::{KnownValueError, Result};
use crate::literal;
use crate::settings::FuzzerSettings;
use crate::shader_job::ShaderJob;

const OVERFLOW_MODULUS: u64 = 1 << 32;

/// Upper bound of the freely drawn operand for concrete types.
const RANDOM_OPERAND_MAX: u32 = i32::MAX as u32;

pub(super) fn generate<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<KnownValue> {
    if !ty.is_integer() {
        return Err(KnownValueError::UnreachableType(ty));
    }
    let canonical = literal::write_magnitude(value, ty)?;
    if !settings.go_deeper(depth) {
        return Ok(KnownValue::plain(canonical));
    }

    let weights = &settings.known_value_weights;
    let weight = |strategy| weights.weight(strategy, depth);
    let mut choices = Choices::new();
    choices
        .add(Strategy::Plain, weight(Strategy::Plain), move |_| {
            literal::write_magnitude(value, ty)
        })
        .add(Strategy::Sum, weight(Strategy::Sum), move |settings| {
            sum(settings, shader_job, depth, value, ty)
        })
        .add(
            Strategy::Difference,
            weight(Strategy::Difference),
            move |settings| difference(settings, shader_job, depth, value, ty),
        )
        .add(Strategy::Product, weight(Strategy::Product), move |settings| {
            product(settings, shader_job, depth, value, ty)
        });
    if !ty.is_abstract() {
        // Deriving a known value from a uniform only works with concrete types.
        choices.add(
            Strategy::DerivedFromUniform,
            weight(Strategy::DerivedFromUniform),
            move |settings| uniform::derive_integer(settings, shader_job, depth, value, ty),
        );
    }

    let rewritten = choices
        .choose(settings)
        .ok_or(KnownValueError::NoStrategy(depth))??;
    Ok(KnownValue {
        canonical,
        rewritten,
    })
}

/// `r + (value - r)`, in a random order.
fn sum<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<Expression> {
    let max = if ty.is_abstract() {
        value
    } else {
        RANDOM_OPERAND_MAX
    };
    let random_value = settings.random_in_range(0..=max);
    let difference = value.wrapping_sub(random_value);

    let lhs = generate(settings, shader_job, depth + 1, random_value, ty)?;
    let rhs = generate(settings, shader_job, depth + 1, difference, ty)?;
    Ok(binary_random_operand_order(
        settings,
        BinaryOperator::Add,
        lhs.rewritten,
        rhs.rewritten,
    ))
}

/// `(value + r) - r`.
fn difference<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<Expression> {
    let (random_value, sum) = if ty.is_abstract() {
        let random_value = settings.random_in_range(0..=u32::MAX - value);
        let sum = value
            .checked_add(random_value)
            .ok_or(KnownValueError::Internal("abstract sum left the 32-bit domain"))?;
        (random_value, sum)
    } else {
        let random_value = settings.random_in_range(0..=RANDOM_OPERAND_MAX);
        (random_value, value.wrapping_add(random_value))
    };

    let subtrahend = generate(settings, shader_job, depth + 1, random_value, ty)?;
    let minuend = generate(settings, shader_job, depth + 1, sum, ty)?;
    Ok(Expression::binary(
        BinaryOperator::Subtract,
        minuend.rewritten,
        subtrahend.rewritten,
    ))
}

fn product<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<Expression> {
    if !ty.is_abstract() && settings.random_bool() {
        // This path will likely use overflow of the multiplication
        let divisor = settings.random_in_range(1..=RANDOM_OPERAND_MAX);
        match overflowing_quotient(value, divisor)? {
            Some(quotient) => {
                let lhs = generate(settings, shader_job, depth + 1, divisor, ty)?;
                let rhs = generate(settings, shader_job, depth + 1, quotient, ty)?;
                return Ok(binary_random_operand_order(
                    settings,
                    BinaryOperator::Multiply,
                    lhs.rewritten,
                    rhs.rewritten,
                ));
            }
            None => log::debug!("No wrapped multiple of {divisor} equals {value}, using a factor"),
        }
    }
    exact_factor(settings, shader_job, depth, value, ty, generate::<J>)
}

/// Finds `q` such that `divisor * q == value` modulo 2^32.
///
/// This is `(value + i * 2^32) / divisor` for the smallest `i >= 0` that makes
/// the division exact, reduced modulo 2^32. Such an `i` exists exactly when
/// `gcd(divisor, 2^32)` divides `value`; otherwise returns `None`.
fn overflowing_quotient(value: u32, divisor: u32) -> Result<Option<u32>> {
    if divisor == 0 {
        return Err(KnownValueError::Internal("zero divisor"));
    }
    let value = u64::from(value);
    let divisor = u64::from(divisor);

    // Solve `i * (2^32 mod divisor) == -value (mod divisor)`.
    let step = OVERFLOW_MODULUS % divisor;
    let target = (divisor - value % divisor) % divisor;
    let common = gcd(step, divisor);
    if target % common != 0 {
        return Ok(None);
    }
    let modulus = divisor / common;
    let i = (target / common) * inverse_mod(step / common, modulus) % modulus;

    // `i < divisor < 2^31`, so this cannot overflow
    let dividend = value + i * OVERFLOW_MODULUS;
    if dividend % divisor != 0 {
        return Err(KnownValueError::Internal(
            "wrapped multiple is not divisible by the divisor",
        ));
    }
    let quotient = (dividend / divisor) % OVERFLOW_MODULUS;
    u32::try_from(quotient)
        .map(Some)
        .map_err(|_| KnownValueError::Internal("quotient outside the 32-bit domain"))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// The inverse of `a` modulo `modulus`, for coprime arguments.
fn inverse_mod(a: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let (mut old_r, mut r) = (a as i128, modulus as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    old_s.rem_euclid(modulus as i128) as u64
}
