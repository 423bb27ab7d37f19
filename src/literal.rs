//! Conversion between WGSL literal expressions and the numbers they denote.
//!
//! Integer literals carry an `i` or `u` suffix when concrete and none when
//! abstract. Float literals carry `f` (or `h`, which is only read) when
//! concrete; abstract floats are written with a `.0` fraction and no suffix,
//! since an unsuffixed integer-looking literal would be an abstract int.

use crate::ast::{Expression, Scalar, UnaryOperator};
use crate::error::{KnownValueError, Result};

/// The numeric value of a literal expression.
///
/// Also accepts a negated, parenthesized or converted literal, which is how
/// negative values and `i32::MIN` are spelled in WGSL.
pub fn read(expr: &Expression) -> Result<f64> {
    match *expr {
        Expression::IntLiteral(ref text) => parse_int(text),
        Expression::FloatLiteral(ref text) => parse_float(text),
        Expression::Unary {
            op: UnaryOperator::Negate,
            ref target,
        } => Ok(-read(target)?),
        Expression::Paren(ref inner) => read(inner),
        Expression::ValueConstructor { ty, ref args } if ty.is_integer() || ty.is_float() => {
            match args.as_slice() {
                [arg] => read(arg),
                _ => Err(KnownValueError::NotALiteral(expr.to_string())),
            }
        }
        _ => Err(KnownValueError::NotALiteral(expr.to_string())),
    }
}

fn parse_int(text: &str) -> Result<f64> {
    let malformed = || KnownValueError::MalformedLiteral(text.to_string());
    let body = text
        .strip_suffix('i')
        .or_else(|| text.strip_suffix('u'))
        .unwrap_or(text);
    let (negative, digits) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    }
    .map_err(|_| malformed())?;
    let value = magnitude as f64;
    Ok(if negative { -value } else { value })
}

fn parse_float(text: &str) -> Result<f64> {
    let malformed = || KnownValueError::MalformedLiteral(text.to_string());
    let body = text
        .strip_suffix('f')
        .or_else(|| text.strip_suffix('h'))
        .unwrap_or(text);
    if body.starts_with("0x") || body.starts_with("0X") {
        // hexadecimal floats are not produced by the fuzzer
        return Err(malformed());
    }
    match body.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(malformed()),
    }
}

/// Fails unless `value` is a whole number.
pub fn require_integral(value: f64) -> Result<f64> {
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value)
    } else {
        Err(KnownValueError::NonIntegral(value))
    }
}

/// A literal of type `ty` denoting `value`.
///
/// Negative values become a negation of a positive literal. `i32::MIN` has
/// no positive `i32` counterpart, so it is written as `i32(-2147483648)`:
/// the negated abstract literal alone would stay an abstract int.
pub fn write(value: i64, ty: Scalar) -> Result<Expression> {
    let out_of_range = || KnownValueError::OutOfRange {
        value: value as f64,
        ty,
    };
    match ty {
        Scalar::Bool => Err(KnownValueError::UnsupportedType(ty.into())),
        Scalar::I32 => match i32::try_from(value) {
            Ok(i32::MIN) => Ok(Expression::construct(
                Scalar::I32,
                Expression::unary(
                    UnaryOperator::Negate,
                    Expression::IntLiteral("2147483648".to_string()),
                ),
            )),
            Ok(_) => Ok(signed(value, |m| Expression::IntLiteral(format!("{m}i")))),
            Err(_) => Err(out_of_range()),
        },
        Scalar::U32 => {
            let value = u32::try_from(value).map_err(|_| out_of_range())?;
            Ok(Expression::IntLiteral(format!("{value}u")))
        }
        Scalar::AbstractInt => Ok(signed(value, |m| Expression::IntLiteral(m.to_string()))),
        Scalar::F32 => {
            if (value as f32) as i64 != value {
                return Err(out_of_range());
            }
            Ok(signed(value, |m| Expression::FloatLiteral(format!("{m}f"))))
        }
        Scalar::AbstractFloat => {
            if (value as f64) as i64 != value {
                return Err(out_of_range());
            }
            Ok(signed(value, |m| Expression::FloatLiteral(format!("{m}.0"))))
        }
    }
}

/// A literal for a magnitude in the synthesizers' unsigned domain.
///
/// For `i32` the magnitude is taken modulo 2<sup>32</sup>, so magnitudes
/// above `i32::MAX` are written as the negative value with the same bits.
pub(crate) fn write_magnitude(magnitude: u32, ty: Scalar) -> Result<Expression> {
    match ty {
        Scalar::I32 => write(i64::from(magnitude as i32), ty),
        _ => write(i64::from(magnitude), ty),
    }
}

fn signed(value: i64, literal: impl FnOnce(u64) -> Expression) -> Expression {
    let magnitude = literal(value.unsigned_abs());
    if value < 0 {
        Expression::unary(UnaryOperator::Negate, magnitude)
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(text: &str) -> Expression {
        Expression::IntLiteral(text.to_string())
    }

    fn float(text: &str) -> Expression {
        Expression::FloatLiteral(text.to_string())
    }

    #[test]
    fn read_strips_suffixes() {
        assert_eq!(read(&int("12i")), Ok(12.0));
        assert_eq!(read(&int("12u")), Ok(12.0));
        assert_eq!(read(&int("12")), Ok(12.0));
        assert_eq!(read(&int("0x1Fu")), Ok(31.0));
        assert_eq!(read(&float("2.5f")), Ok(2.5));
        assert_eq!(read(&float("3h")), Ok(3.0));
        assert_eq!(read(&float("1e3")), Ok(1000.0));
        assert_eq!(read(&float("7.0")), Ok(7.0));
    }

    #[test]
    fn read_negations() {
        let negated = Expression::unary(UnaryOperator::Negate, int("5i"));
        assert_eq!(read(&negated), Ok(-5.0));
        assert_eq!(read(&int("-5i")), Ok(-5.0));
        assert_eq!(read(&Expression::Paren(Box::new(float("1f")))), Ok(1.0));
        let min = Expression::construct(
            Scalar::I32,
            Expression::unary(UnaryOperator::Negate, int("2147483648")),
        );
        assert_eq!(read(&min), Ok(-2147483648.0));
        assert_eq!(
            read(&Expression::construct(Scalar::Bool, int("1"))),
            Err(KnownValueError::NotALiteral("bool(1)".into()))
        );
    }

    #[test]
    fn read_rejects_non_literals() {
        assert_eq!(
            read(&Expression::Identifier("x".into())),
            Err(KnownValueError::NotALiteral("x".into()))
        );
        assert_eq!(
            read(&int("12q")),
            Err(KnownValueError::MalformedLiteral("12q".into()))
        );
        assert_eq!(
            read(&float("0x1p4f")),
            Err(KnownValueError::MalformedLiteral("0x1p4f".into()))
        );
        assert!(read(&float("inf")).is_err());
    }

    #[test]
    fn integral_values() {
        assert_eq!(require_integral(4.0), Ok(4.0));
        assert_eq!(require_integral(-4.0), Ok(-4.0));
        assert_eq!(require_integral(4.5), Err(KnownValueError::NonIntegral(4.5)));
        assert!(require_integral(f64::NAN).is_err());
    }

    #[test]
    fn write_forms() {
        assert_eq!(write(7, Scalar::I32).unwrap().to_string(), "7i");
        assert_eq!(write(-7, Scalar::I32).unwrap().to_string(), "-7i");
        assert_eq!(
            write(i64::from(i32::MIN), Scalar::I32).unwrap().to_string(),
            "i32(-2147483648)"
        );
        assert_eq!(write(7, Scalar::U32).unwrap().to_string(), "7u");
        assert_eq!(write(-7, Scalar::AbstractInt).unwrap().to_string(), "-7");
        assert_eq!(write(7, Scalar::F32).unwrap().to_string(), "7f");
        assert_eq!(write(7, Scalar::AbstractFloat).unwrap().to_string(), "7.0");
    }

    #[test]
    fn write_rejects_unrepresentable() {
        assert!(write(-1, Scalar::U32).is_err());
        assert!(write(1 << 32, Scalar::U32).is_err());
        assert!(write(1 << 31, Scalar::I32).is_err());
        assert!(write((1 << 24) + 1, Scalar::F32).is_err());
        assert!(write(1, Scalar::Bool).is_err());
        assert!(write(1 << 24, Scalar::F32).is_ok());
    }

    #[test]
    fn write_magnitudes() {
        assert_eq!(
            write_magnitude(u32::MAX - 4, Scalar::I32).unwrap().to_string(),
            "-5i"
        );
        assert_eq!(
            write_magnitude(u32::MAX, Scalar::U32).unwrap().to_string(),
            "4294967295u"
        );
    }

    #[test]
    fn write_read_write() {
        let cases: &[(Scalar, &[i64])] = &[
            (Scalar::I32, &[0, 1, -1, 2147483647, -2147483648, -123456]),
            (Scalar::U32, &[0, 1, 4294967295, 65536]),
            (Scalar::AbstractInt, &[0, -9, 4294967296, -4294967296]),
            (Scalar::F32, &[0, 16777216, -16777216, 1024]),
            (Scalar::AbstractFloat, &[0, 9007199254740992, -3]),
        ];
        for &(ty, values) in cases {
            for &value in values {
                let written = write(value, ty).unwrap();
                let read_back = read(&written).unwrap();
                assert_eq!(read_back, value as f64, "{ty} {value}");
                assert_eq!(write(read_back as i64, ty).unwrap(), written);
            }
        }
    }
}
