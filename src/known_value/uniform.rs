//! Known values derived from uniform-buffer scalars.
//!
//! The fuzzer knows what each uniform will hold when the shader runs, so a
//! uniform read, adjusted to the target type, is an expression with a known
//! value that no compiler can fold. The difference to the target is then
//! synthesized recursively and added or subtracted.

use std::cmp::Ordering;

use super::{
    binary_random_operand_order, float, integer, KnownValue, LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE,
};
use crate::ast::{BinaryOperator, Expression, Scalar};
use crate::error::{KnownValueError, Result};
use crate::eval::{Evaluator, Value};
use crate::literal;
use crate::settings::FuzzerSettings;
use crate::shader_job::{ShaderJob, UniformScalar};

/// An expression over a uniform together with its runtime value.
#[derive(Debug)]
struct Anchor {
    expression: Expression,
    value: u32,
}

pub(super) fn derive_integer<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    target: u32,
    ty: Scalar,
) -> Result<Expression> {
    let uniform = match shader_job.random_uniform_scalar_with_value(settings) {
        Some(uniform) => uniform,
        None => {
            log::debug!("No uniform scalars to derive {target} from");
            return literal::write_magnitude(target, ty);
        }
    };
    let anchor = integer_anchor(&uniform, uniform_value(&uniform)?, ty)?;
    combine(
        settings,
        shader_job,
        depth,
        anchor,
        target,
        ty,
        integer::generate::<J>,
    )
}

pub(super) fn derive_float<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    target: u32,
    ty: Scalar,
) -> Result<Expression> {
    let uniform = match shader_job.random_uniform_scalar_with_value(settings) {
        Some(uniform) => uniform,
        None => {
            log::debug!("No uniform scalars to derive {target} from");
            return literal::write_magnitude(target, ty);
        }
    };
    let anchor = float_anchor(&uniform, uniform_value(&uniform)?, ty)?;
    combine(
        settings,
        shader_job,
        depth,
        anchor,
        target,
        ty,
        float::generate::<J>,
    )
}

/// `anchor`, `anchor - synth(anchor - target)` or `synth(target - anchor) + anchor`.
fn combine<J: ShaderJob + ?Sized>(
    settings: &mut FuzzerSettings,
    shader_job: &J,
    depth: u32,
    anchor: Anchor,
    target: u32,
    ty: Scalar,
    synthesize: fn(&mut FuzzerSettings, &J, u32, u32, Scalar) -> Result<KnownValue>,
) -> Result<Expression> {
    Ok(match anchor.value.cmp(&target) {
        Ordering::Equal => anchor.expression,
        Ordering::Greater => {
            let difference =
                synthesize(settings, shader_job, depth + 1, anchor.value - target, ty)?;
            Expression::binary(
                BinaryOperator::Subtract,
                anchor.expression,
                difference.rewritten,
            )
        }
        Ordering::Less => {
            let difference =
                synthesize(settings, shader_job, depth + 1, target - anchor.value, ty)?;
            binary_random_operand_order(
                settings,
                BinaryOperator::Add,
                anchor.expression,
                difference.rewritten,
            )
        }
    })
}

/// The value the uniform holds at runtime.
fn uniform_value(uniform: &UniformScalar) -> Result<Value> {
    let unsupported =
        || KnownValueError::UnsupportedUniform(uniform.expression.to_string(), uniform.ty);
    let raw = literal::read(&uniform.value)?;
    match uniform.ty {
        Scalar::I32 => {
            let raw = literal::require_integral(raw).map_err(|_| unsupported())?;
            i32::try_from(raw as i64)
                .map(Value::I32)
                .map_err(|_| unsupported())
        }
        Scalar::U32 => {
            let raw = literal::require_integral(raw).map_err(|_| unsupported())?;
            u32::try_from(raw as i64)
                .map(Value::U32)
                .map_err(|_| unsupported())
        }
        // parsed the way the shader reads it, not rounded through `f64`
        Scalar::F32 => match Evaluator::new()
            .evaluate(&uniform.value)
            .and_then(|value| value.concretize(Scalar::F32))
        {
            Ok(value @ Value::F32(_)) => Ok(value),
            _ => Err(unsupported()),
        },
        Scalar::Bool => Err(unsupported()),
        // uniform buffers only hold concrete types
        Scalar::AbstractInt | Scalar::AbstractFloat => {
            Err(KnownValueError::UnreachableType(uniform.ty))
        }
    }
}

/// The value of `expression` once `uniform` is replaced by `value`.
fn evaluate(expression: &Expression, uniform: &UniformScalar, value: Value) -> Result<Value> {
    let mut evaluator = Evaluator::new();
    evaluator.bind(&uniform.expression, value);
    evaluator.evaluate(expression).map_err(|err| {
        log::error!("Anchor `{expression}` does not evaluate: {err}");
        KnownValueError::Internal("uniform anchor does not evaluate")
    })
}

/// Converts the uniform to `ty` if it is not already of that type.
///
/// Integer conversions reinterpret or truncate-and-clamp, so every result
/// lies in the 32-bit domain and needs no further reduction.
fn integer_anchor(uniform: &UniformScalar, source: Value, ty: Scalar) -> Result<Anchor> {
    if !matches!(ty, Scalar::I32 | Scalar::U32) {
        return Err(KnownValueError::UnreachableType(ty));
    }
    let expression = if source.scalar().is_float() || source.scalar() != ty {
        Expression::construct(ty, uniform.expression.clone())
    } else {
        uniform.expression.clone()
    };
    let value = evaluate(&expression, uniform, source)?
        .wrapped_bits()
        .ok_or(KnownValueError::Internal("integer anchor is not an integer"))?;
    Ok(Anchor { expression, value })
}

/// Brings the uniform to a whole `f32` in the precise range.
///
/// Fractional floats are truncated. Values outside the range are reduced
/// with `u32(abs(x)) % (LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE + 1)` before
/// being converted, so that the conversion to `f32` is always exact.
fn float_anchor(uniform: &UniformScalar, source: Value, ty: Scalar) -> Result<Anchor> {
    if ty != Scalar::F32 {
        return Err(KnownValueError::UnreachableType(ty));
    }
    let base = match source {
        Value::F32(v) if v.fract() != 0.0 => {
            Expression::call("trunc", vec![uniform.expression.clone()])
        }
        Value::F32(_) | Value::I32(_) | Value::U32(_) => uniform.expression.clone(),
        Value::AbstractInt(_) | Value::AbstractFloat(_) => {
            return Err(KnownValueError::UnreachableType(source.scalar()))
        }
    };

    let base_value = evaluate(&base, uniform, source)?.as_f64();
    if in_precise_range(base_value) {
        let expression = match source {
            Value::F32(_) => base,
            _ => Expression::construct(Scalar::F32, base),
        };
        return Ok(Anchor {
            expression,
            value: base_value as u32,
        });
    }

    log::debug!("Reducing uniform anchor `{base}` = {base_value} into the precise float range");
    let modulus = literal::write(
        i64::from(LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE) + 1,
        Scalar::U32,
    )?;
    let reduced = Expression::construct(
        Scalar::F32,
        Expression::binary(
            BinaryOperator::Modulo,
            Expression::construct(Scalar::U32, Expression::call("abs", vec![base])),
            modulus,
        ),
    );
    let value = evaluate(&reduced, uniform, source)?.as_f64();
    if !in_precise_range(value) {
        return Err(KnownValueError::Internal(
            "reduced float anchor left the precise range",
        ));
    }
    Ok(Anchor {
        expression: reduced,
        value: value as u32,
    })
}

/// Whether `value` can be used as a float anchor as it is.
///
/// `-0.0` compares equal to zero but is observable in a shader, so it is
/// reduced like any other negative value.
fn in_precise_range(value: f64) -> bool {
    !value.is_sign_negative() && value <= f64::from(LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(value: &str, ty: Scalar) -> UniformScalar {
        let value = match ty {
            Scalar::F32 => Expression::FloatLiteral(value.to_string()),
            _ => Expression::IntLiteral(value.to_string()),
        };
        UniformScalar {
            expression: Expression::member(Expression::Identifier("u".into()), "x"),
            value,
            ty,
        }
    }

    fn integer(value: &str, from: Scalar, to: Scalar) -> Anchor {
        let uniform = scalar(value, from);
        integer_anchor(&uniform, uniform_value(&uniform).unwrap(), to).unwrap()
    }

    fn float(value: &str, from: Scalar) -> Anchor {
        let uniform = scalar(value, from);
        float_anchor(&uniform, uniform_value(&uniform).unwrap(), Scalar::F32).unwrap()
    }

    #[test]
    fn matching_integer_is_used_as_is() {
        let anchor = integer("7i", Scalar::I32, Scalar::I32);
        assert_eq!(anchor.expression.to_string(), "u.x");
        assert_eq!(anchor.value, 7);
    }

    #[test]
    fn integer_conversions() {
        let anchor = integer("7i", Scalar::I32, Scalar::U32);
        assert_eq!(anchor.expression.to_string(), "u32(u.x)");
        assert_eq!(anchor.value, 7);

        let anchor = integer("-3.75f", Scalar::F32, Scalar::I32);
        assert_eq!(anchor.expression.to_string(), "i32(u.x)");
        assert_eq!(anchor.value, -3i32 as u32);

        let anchor = integer("-3.75f", Scalar::F32, Scalar::U32);
        assert_eq!(anchor.value, 0);

        let anchor = integer("1e20f", Scalar::F32, Scalar::U32);
        assert_eq!(anchor.value, 4294967040);
    }

    #[test]
    fn fractional_floats_are_truncated() {
        let anchor = float("12.5f", Scalar::F32);
        assert_eq!(anchor.expression.to_string(), "trunc(u.x)");
        assert_eq!(anchor.value, 12);

        let anchor = float("12f", Scalar::F32);
        assert_eq!(anchor.expression.to_string(), "u.x");
    }

    #[test]
    fn integers_convert_to_float() {
        let anchor = float("99u", Scalar::U32);
        assert_eq!(anchor.expression.to_string(), "f32(u.x)");
        assert_eq!(anchor.value, 99);
    }

    #[test]
    fn out_of_range_anchors_are_reduced() {
        let anchor = float("-5i", Scalar::I32);
        assert_eq!(
            anchor.expression.to_string(),
            "f32((u32(abs(u.x)) % 16777217u))"
        );
        assert_eq!(anchor.value, 5);

        let anchor = float("-2.5f", Scalar::F32);
        assert_eq!(
            anchor.expression.to_string(),
            "f32((u32(abs(trunc(u.x))) % 16777217u))"
        );
        assert_eq!(anchor.value, 2);

        let anchor = float("4000000000u", Scalar::U32);
        assert_eq!(anchor.value, 4000000000 % 16777217);

        let anchor = float("1e30f", Scalar::F32);
        assert_eq!(anchor.value, 4294967040 % 16777217);
    }

    #[test]
    fn negative_zero_is_reduced() {
        let anchor = float("-0.5f", Scalar::F32);
        assert_eq!(
            anchor.expression.to_string(),
            "f32((u32(abs(trunc(u.x))) % 16777217u))"
        );
        assert_eq!(anchor.value, 0);

        let uniform = scalar("-0.5f", Scalar::F32);
        let value = evaluate(&anchor.expression, &uniform, Value::F32(-0.5)).unwrap();
        assert_eq!(value, Value::F32(0.0));
        assert!(value.as_f64().is_sign_positive());

        let anchor = float("-0f", Scalar::F32);
        assert_eq!(
            anchor.expression.to_string(),
            "f32((u32(abs(u.x)) % 16777217u))"
        );
        assert_eq!(anchor.value, 0);
    }

    #[test]
    fn bool_uniforms_are_rejected() {
        let uniform = UniformScalar {
            expression: Expression::Identifier("flag".into()),
            value: Expression::IntLiteral("1".into()),
            ty: Scalar::Bool,
        };
        assert_eq!(
            uniform_value(&uniform),
            Err(KnownValueError::UnsupportedUniform(
                "flag".into(),
                Scalar::Bool
            ))
        );
    }
}
