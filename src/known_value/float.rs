//! Known values of float type.
//!
//! Values are whole numbers in `[0, LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE]`
//! and every operand is drawn so that it, and the result of combining it,
//! stays in that range. No operation ever rounds.

use super::{
    binary_random_operand_order, choose::Choices, exact_factor, uniform, KnownValue, Strategy,
    LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE,
};
use crate::ast::{BinaryOperator, Expression, Scalar};
use crate::error::{KnownValueError, Result};
use crate::literal;
use crate::settings::FuzzerSettings;
use crate::shader_job::ShaderJob;

pub(super) fn generate<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<KnownValue> {
    if !ty.is_float() {
        return Err(KnownValueError::UnreachableType(ty));
    }
    if value > LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE {
        return Err(KnownValueError::Internal(
            "float known value left the precise range",
        ));
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
            exact_factor(settings, shader_job, depth, value, ty, generate::<J>)
        });
    if !ty.is_abstract() {
        choices.add(
            Strategy::DerivedFromUniform,
            weight(Strategy::DerivedFromUniform),
            move |settings| uniform::derive_float(settings, shader_job, depth, value, ty),
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

fn sum<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<Expression> {
    let random_value = settings.random_in_range(0..=value);
    let difference = value - random_value;

    let lhs = generate(settings, shader_job, depth + 1, random_value, ty)?;
    let rhs = generate(settings, shader_job, depth + 1, difference, ty)?;
    Ok(binary_random_operand_order(
        settings,
        BinaryOperator::Add,
        lhs.rewritten,
        rhs.rewritten,
    ))
}

fn difference<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    value: u32,
    ty: Scalar,
) -> Result<Expression> {
    let random_value =
        settings.random_in_range(0..=LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE - value);
    let sum = value + random_value;
    if sum > LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE {
        return Err(KnownValueError::Internal("float sum left the precise range"));
    }

    let subtrahend = generate(settings, shader_job, depth + 1, random_value, ty)?;
    let minuend = generate(settings, shader_job, depth + 1, sum, ty)?;
    Ok(Expression::binary(
        BinaryOperator::Subtract,
        minuend.rewritten,
        subtrahend.rewritten,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Evaluator, Value};
    use crate::settings::KnownValueWeights;
    use crate::shader_job::NoUniforms;

    fn synthesize(strategy: Strategy, value: u32, seed: u64) -> KnownValue {
        let mut settings =
            FuzzerSettings::with_weights(seed, 3, KnownValueWeights::only(strategy));
        generate(&mut settings, &NoUniforms, 0, value, Scalar::F32).unwrap()
    }

    #[test]
    fn range_edges() {
        let ev = Evaluator::new();
        for strategy in [Strategy::Sum, Strategy::Difference, Strategy::Product] {
            for value in [0, 1, LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE] {
                for seed in 0..16 {
                    let known = synthesize(strategy, value, seed);
                    assert_eq!(
                        ev.evaluate(&known.rewritten),
                        Ok(Value::F32(value as f32)),
                        "{strategy:?} `{}`",
                        known.rewritten
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_values_outside_the_range() {
        let mut settings = FuzzerSettings::from_seed(0);
        let err = generate(
            &mut settings,
            &NoUniforms,
            0,
            LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE + 1,
            Scalar::F32,
        )
        .unwrap_err();
        assert!(err.is_internal());
        assert_eq!(
            generate(&mut settings, &NoUniforms, 0, 1, Scalar::I32),
            Err(KnownValueError::UnreachableType(Scalar::I32))
        );
    }

    #[test]
    fn abstract_floats_skip_uniforms() {
        let mut settings = FuzzerSettings::with_weights(
            0,
            3,
            KnownValueWeights::only(Strategy::DerivedFromUniform),
        );
        assert_eq!(
            generate(&mut settings, &NoUniforms, 0, 4, Scalar::AbstractFloat),
            Err(KnownValueError::NoStrategy(0))
        );
    }
}
