/*! Synthesis of expressions with a known value.

Both synthesizers work on unsigned magnitudes. Integers live in
`[0, 2^32)` and their arithmetic is modular; floats are whole numbers in
`[0, LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE]`, where every sum, difference
and product the synthesizer builds is computed exactly by `f32`.

At each level a [`Strategy`] is picked according to
[`KnownValueWeights`](crate::KnownValueWeights), sub-expressions for the
operands are synthesized one level deeper, and the recursion stops with a
plain literal once [`FuzzerSettings::go_deeper`] says so.
!*/

mod choose;
mod float;
mod integer;
mod uniform;

use crate::ast::{BinaryOperator, Expression, Scalar, Type, UnaryOperator};
use crate::error::{KnownValueError, Result};
use crate::literal;
use crate::settings::FuzzerSettings;
use crate::shader_job::ShaderJob;

/// The largest integer such that every integer from zero up to it is
/// exactly representable as an `f32`.
pub const LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE: u32 = 1 << 24;

/// A literal paired with an equivalent, possibly much larger, expression.
#[derive(Clone, Debug, PartialEq)]
pub struct KnownValue {
    /// A literal, or a negated literal, denoting the value.
    pub canonical: Expression,
    /// An expression that evaluates to the same value at runtime.
    pub rewritten: Expression,
}

impl KnownValue {
    fn plain(literal: Expression) -> Self {
        Self {
            canonical: literal.clone(),
            rewritten: literal,
        }
    }
}

/// The ways a known value can be rewritten at one level of the recursion.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Strategy {
    /// The literal itself.
    Plain,
    /// `a + b`.
    Sum,
    /// `a - b`.
    Difference,
    /// `a * b`, possibly plus a remainder.
    Product,
    /// A uniform-buffer value corrected by a known difference.
    DerivedFromUniform,
}

impl Strategy {
    pub const ALL: [Self; 5] = [
        Self::Plain,
        Self::Sum,
        Self::Difference,
        Self::Product,
        Self::DerivedFromUniform,
    ];
}

/// The smallest and largest logical values supported for an integer type.
const fn integer_range(ty: Scalar) -> (i64, i64) {
    match ty {
        Scalar::I32 => (i32::MIN as i64, i32::MAX as i64),
        Scalar::U32 => (0, u32::MAX as i64),
        _ => (-(u32::MAX as i64), u32::MAX as i64),
    }
}

/// Synthesizes an expression of integer type `ty` evaluating to `value`.
///
/// Negative values are synthesized as the negation of their magnitude.
pub fn generate_known_value_integer<J: ShaderJob + ?Sized>(
    depth: u32,
    value: i64,
    ty: Scalar,
    settings: &mut FuzzerSettings,
    shader_job: &J,
) -> Result<KnownValue> {
    if !ty.is_integer() {
        return Err(KnownValueError::UnsupportedType(ty.into()));
    }
    if value < 0 && ty == Scalar::U32 {
        return Err(KnownValueError::NegativeUnsigned(value));
    }
    let (min, max) = integer_range(ty);
    if value < min || value > max {
        return Err(KnownValueError::OutOfRange {
            value: value as f64,
            ty,
        });
    }

    if value >= 0 {
        let magnitude = u32::try_from(value)
            .map_err(|_| KnownValueError::Internal("magnitude outside the 32-bit domain"))?;
        return integer::generate(settings, shader_job, depth, magnitude, ty);
    }
    if ty == Scalar::I32 && value == i64::from(i32::MIN) {
        // `i32::MIN` is its own negation modulo 2^32
        return integer::generate(settings, shader_job, depth, 1 << 31, ty);
    }

    let magnitude = u32::try_from(-value)
        .map_err(|_| KnownValueError::Internal("magnitude outside the 32-bit domain"))?;
    let positive = integer::generate(settings, shader_job, depth, magnitude, ty)?;
    Ok(KnownValue {
        canonical: literal::write(value, ty)?,
        rewritten: Expression::unary(UnaryOperator::Negate, positive.rewritten),
    })
}

/// Synthesizes an expression of type `ty` that evaluates to the value of the
/// literal `known_value`.
///
/// Only scalars are supported. Floats must be whole numbers within
/// `[0, LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE]`.
pub fn generate_known_value_expression<J: ShaderJob + ?Sized>(
    depth: u32,
    known_value: &Expression,
    ty: &Type,
    settings: &mut FuzzerSettings,
    shader_job: &J,
) -> Result<KnownValue> {
    let scalar = ty
        .as_scalar()
        .ok_or_else(|| KnownValueError::UnsupportedType(ty.clone()))?;
    let value = literal::require_integral(literal::read(known_value)?)?;

    if scalar.is_integer() {
        let (min, max) = integer_range(scalar);
        if value < min as f64 || value > max as f64 {
            return Err(KnownValueError::OutOfRange { value, ty: scalar });
        }
        return generate_known_value_integer(depth, value as i64, scalar, settings, shader_job);
    }
    if scalar.is_float() {
        if !(0.0..=f64::from(LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE)).contains(&value) {
            return Err(KnownValueError::OutsidePreciseRange(value));
        }
        return float::generate(settings, shader_job, depth, value as u32, scalar);
    }
    Err(KnownValueError::UnsupportedType(ty.clone()))
}

fn binary_random_operand_order(
    settings: &mut FuzzerSettings,
    op: BinaryOperator,
    lhs: Expression,
    rhs: Expression,
) -> Expression {
    if settings.random_bool() {
        Expression::binary(op, rhs, lhs)
    } else {
        Expression::binary(op, lhs, rhs)
    }
}

/// `divisor * quotient`, plus `remainder` if there is one (and sometimes
/// when there is not), with the divisor drawn from `[1, max(1, value / 2)]`.
///
/// Used by both synthesizers; `synthesize` is the one recursed into.
fn exact_factor<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
    synthesize: fn(&mut FuzzerSettings, &J, u32, u32, Scalar) -> Result<KnownValue>,
) -> Result<Expression> {
    let divisor = settings.random_in_range(1..=(value / 2).max(1));
    let quotient = value / divisor;
    let remainder = value % divisor;

    let lhs = synthesize(settings, shader_job, depth + 1, divisor, ty)?;
    let rhs = synthesize(settings, shader_job, depth + 1, quotient, ty)?;
    let mut result = binary_random_operand_order(
        settings,
        BinaryOperator::Multiply,
        lhs.rewritten,
        rhs.rewritten,
    );
    if remainder != 0 || settings.random_bool() {
        let remainder = synthesize(settings, shader_job, depth + 1, remainder, ty)?;
        result = binary_random_operand_order(
            settings,
            BinaryOperator::Add,
            result,
            remainder.rewritten,
        );
    }
    Ok(result)
}
