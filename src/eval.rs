//! Evaluation of expressions under WGSL runtime semantics.
//!
//! Concrete integer arithmetic wraps modulo 2<sup>32</sup>, as it does when a
//! shader runs, rather than being rejected the way a constant evaluator
//! rejects overflow. Abstract integers are exact 64-bit values and overflow
//! is an error. When an abstract operand meets a concrete one it is first
//! converted to the concrete type.
//!
//! Uniform-buffer reads are bound by their WGSL text with [`Evaluator::bind`].

use crate::ast::{BinaryOperator, Expression, Scalar, UnaryOperator};
use crate::FastHashMap;

/// The largest `f32` that does not exceed `i32::MAX`.
const F32_BELOW_I32_MAX: f32 = 2147483520.0;
/// The largest `f32` that does not exceed `u32::MAX`.
const F32_BELOW_U32_MAX: f32 = 4294967040.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    I32(i32),
    U32(u32),
    AbstractInt(i64),
    F32(f32),
    AbstractFloat(f64),
}

impl Value {
    pub const fn scalar(self) -> Scalar {
        match self {
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::AbstractInt(_) => Scalar::AbstractInt,
            Self::F32(_) => Scalar::F32,
            Self::AbstractFloat(_) => Scalar::AbstractFloat,
        }
    }

    /// Converts an abstract value to `ty` the way WGSL does when the value
    /// meets an operand of that type. Concrete values must already be `ty`.
    pub fn concretize(self, ty: Scalar) -> Result<Self, EvalError> {
        let invalid = || EvalError::InvalidConversion {
            from: self.scalar(),
            to: ty,
        };
        if self.scalar() == ty {
            return Ok(self);
        }
        match (self, ty) {
            (Self::AbstractInt(v), Scalar::I32) => {
                i32::try_from(v).map(Self::I32).map_err(|_| invalid())
            }
            (Self::AbstractInt(v), Scalar::U32) => {
                u32::try_from(v).map(Self::U32).map_err(|_| invalid())
            }
            (Self::AbstractInt(v), Scalar::F32) => Ok(Self::F32(v as f32)),
            (Self::AbstractInt(v), Scalar::AbstractFloat) => Ok(Self::AbstractFloat(v as f64)),
            (Self::AbstractFloat(v), Scalar::F32) => Ok(Self::F32(v as f32)),
            _ => Err(invalid()),
        }
    }

    /// Bits of an integer value, taken modulo 2<sup>32</sup>.
    pub fn wrapped_bits(self) -> Option<u32> {
        match self {
            Self::I32(v) => Some(v as u32),
            Self::U32(v) => Some(v),
            Self::AbstractInt(v) => Some(v as u32),
            Self::F32(_) | Self::AbstractFloat(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::I32(v) => f64::from(v),
            Self::U32(v) => f64::from(v),
            Self::AbstractInt(v) => v as f64,
            Self::F32(v) => f64::from(v),
            Self::AbstractFloat(v) => v,
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Expression `{0}` is not bound to a value")]
    Unbound(String),
    #[error("Literal `{0}` is malformed")]
    MalformedLiteral(String),
    #[error("Boolean expressions are not evaluated")]
    Bool,
    #[error("Abstract integer {0} overflowed")]
    Overflow(&'static str),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Remainder by zero")]
    RemainderByZero,
    #[error("Cannot apply the unary op to the argument")]
    InvalidUnaryOpArg,
    #[error("Cannot apply the binary op to arguments of type `{0}` and `{1}`")]
    InvalidBinaryOpArgs(Scalar, Scalar),
    #[error("Cannot convert `{from}` to `{to}`")]
    InvalidConversion { from: Scalar, to: Scalar },
    #[error("Constructor `{0}` takes a single argument")]
    ConstructorArity(Scalar),
    #[error("Unknown function `{0}`")]
    UnknownFunction(String),
    #[error("Function `{0}` cannot be applied to that argument")]
    InvalidFunctionArg(String),
}

/// Converts `f32` to `i32`: truncates, then clamps to the `f32` values
/// inside the `i32` range.
pub fn f32_to_i32(value: f32) -> i32 {
    value.trunc().clamp(i32::MIN as f32, F32_BELOW_I32_MAX) as i32
}

/// Converts `f32` to `u32`: truncates, then clamps to the `f32` values
/// inside the `u32` range.
pub fn f32_to_u32(value: f32) -> u32 {
    value.trunc().clamp(0.0, F32_BELOW_U32_MAX) as u32
}

#[derive(Debug, Default)]
pub struct Evaluator {
    bindings: FastHashMap<String, Value>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every occurrence of `expr` evaluate to `value`.
    pub fn bind(&mut self, expr: &Expression, value: Value) {
        self.bindings.insert(expr.to_string(), value);
    }

    pub fn evaluate(&self, expr: &Expression) -> Result<Value, EvalError> {
        match *expr {
            Expression::BoolLiteral(_) => Err(EvalError::Bool),
            Expression::IntLiteral(ref text) => int_literal(text),
            Expression::FloatLiteral(ref text) => float_literal(text),
            Expression::Identifier(_)
            | Expression::MemberLookup { .. }
            | Expression::IndexLookup { .. } => {
                let key = expr.to_string();
                self.bindings
                    .get(&key)
                    .copied()
                    .ok_or(EvalError::Unbound(key))
            }
            Expression::Unary { op, ref target } => unary_op(op, self.evaluate(target)?),
            Expression::Binary {
                op,
                ref lhs,
                ref rhs,
            } => binary_op(op, self.evaluate(lhs)?, self.evaluate(rhs)?),
            Expression::FunctionCall {
                ref callee,
                ref args,
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                call(callee, &args)
            }
            Expression::ValueConstructor { ty, ref args } => match args.as_slice() {
                [] => zero_value(ty),
                [arg] => convert(self.evaluate(arg)?, ty),
                _ => Err(EvalError::ConstructorArity(ty)),
            },
            Expression::Paren(ref inner) => self.evaluate(inner),
        }
    }
}

fn int_literal(text: &str) -> Result<Value, EvalError> {
    let malformed = || EvalError::MalformedLiteral(text.to_string());
    let (body, ty) = match text.strip_suffix('i') {
        Some(body) => (body, Scalar::I32),
        None => match text.strip_suffix('u') {
            Some(body) => (body, Scalar::U32),
            None => (text, Scalar::AbstractInt),
        },
    };
    let magnitude = match body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => body.parse::<i64>(),
    }
    .map_err(|_| malformed())?;
    match ty {
        Scalar::I32 => i32::try_from(magnitude).map(Value::I32),
        Scalar::U32 => u32::try_from(magnitude).map(Value::U32),
        _ => Ok(Value::AbstractInt(magnitude)),
    }
    .map_err(|_| malformed())
}

fn float_literal(text: &str) -> Result<Value, EvalError> {
    let malformed = || EvalError::MalformedLiteral(text.to_string());
    if let Some(body) = text.strip_suffix('f') {
        return body.parse::<f32>().map(Value::F32).map_err(|_| malformed());
    }
    if text.ends_with('h') {
        // f16 is not modelled
        return Err(malformed());
    }
    text.parse::<f64>()
        .map(Value::AbstractFloat)
        .map_err(|_| malformed())
}

fn zero_value(ty: Scalar) -> Result<Value, EvalError> {
    Ok(match ty {
        Scalar::I32 => Value::I32(0),
        Scalar::U32 => Value::U32(0),
        Scalar::F32 => Value::F32(0.0),
        Scalar::AbstractInt => Value::AbstractInt(0),
        Scalar::AbstractFloat => Value::AbstractFloat(0.0),
        Scalar::Bool => return Err(EvalError::Bool),
    })
}

fn unary_op(op: UnaryOperator, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOperator::Negate => match value {
            Value::I32(v) => Ok(Value::I32(v.wrapping_neg())),
            Value::AbstractInt(v) => v
                .checked_neg()
                .map(Value::AbstractInt)
                .ok_or(EvalError::Overflow("negation")),
            Value::F32(v) => Ok(Value::F32(-v)),
            Value::AbstractFloat(v) => Ok(Value::AbstractFloat(-v)),
            Value::U32(_) => Err(EvalError::InvalidUnaryOpArg),
        },
    }
}

/// Brings two operands to a common type, concretizing an abstract side.
fn unify(left: Value, right: Value) -> Result<(Value, Value), EvalError> {
    let (lt, rt) = (left.scalar(), right.scalar());
    if lt == rt {
        return Ok((left, right));
    }
    let invalid = || EvalError::InvalidBinaryOpArgs(lt, rt);
    match (lt.is_abstract(), rt.is_abstract()) {
        (true, false) => Ok((left.concretize(rt).map_err(|_| invalid())?, right)),
        (false, true) => Ok((left, right.concretize(lt).map_err(|_| invalid())?)),
        // an abstract int meeting an abstract float
        (true, true) => Ok((
            left.concretize(Scalar::AbstractFloat)
                .map_err(|_| invalid())?,
            right
                .concretize(Scalar::AbstractFloat)
                .map_err(|_| invalid())?,
        )),
        (false, false) => Err(invalid()),
    }
}

fn binary_op(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOperator as Bo;

    Ok(match unify(left, right)? {
        (Value::I32(a), Value::I32(b)) => Value::I32(match op {
            Bo::Add => a.wrapping_add(b),
            Bo::Subtract => a.wrapping_sub(b),
            Bo::Multiply => a.wrapping_mul(b),
            Bo::Divide if b == 0 => return Err(EvalError::DivisionByZero),
            Bo::Divide => a.wrapping_div(b),
            Bo::Modulo if b == 0 => return Err(EvalError::RemainderByZero),
            Bo::Modulo => a.wrapping_rem(b),
        }),
        (Value::U32(a), Value::U32(b)) => Value::U32(match op {
            Bo::Add => a.wrapping_add(b),
            Bo::Subtract => a.wrapping_sub(b),
            Bo::Multiply => a.wrapping_mul(b),
            Bo::Divide => a.checked_div(b).ok_or(EvalError::DivisionByZero)?,
            Bo::Modulo => a.checked_rem(b).ok_or(EvalError::RemainderByZero)?,
        }),
        (Value::AbstractInt(a), Value::AbstractInt(b)) => Value::AbstractInt(match op {
            Bo::Add => a.checked_add(b).ok_or(EvalError::Overflow("addition"))?,
            Bo::Subtract => a.checked_sub(b).ok_or(EvalError::Overflow("subtraction"))?,
            Bo::Multiply => a
                .checked_mul(b)
                .ok_or(EvalError::Overflow("multiplication"))?,
            Bo::Divide => a.checked_div(b).ok_or(if b == 0 {
                EvalError::DivisionByZero
            } else {
                EvalError::Overflow("division")
            })?,
            Bo::Modulo => a.checked_rem(b).ok_or(if b == 0 {
                EvalError::RemainderByZero
            } else {
                EvalError::Overflow("remainder")
            })?,
        }),
        (Value::F32(a), Value::F32(b)) => Value::F32(match op {
            Bo::Add => a + b,
            Bo::Subtract => a - b,
            Bo::Multiply => a * b,
            Bo::Divide => a / b,
            Bo::Modulo => a - b * (a / b).trunc(),
        }),
        (Value::AbstractFloat(a), Value::AbstractFloat(b)) => Value::AbstractFloat(match op {
            Bo::Add => a + b,
            Bo::Subtract => a - b,
            Bo::Multiply => a * b,
            Bo::Divide => a / b,
            Bo::Modulo => a - b * (a / b).trunc(),
        }),
        (left, right) => return Err(EvalError::InvalidBinaryOpArgs(left.scalar(), right.scalar())),
    })
}

fn convert(value: Value, ty: Scalar) -> Result<Value, EvalError> {
    let invalid = || EvalError::InvalidConversion {
        from: value.scalar(),
        to: ty,
    };
    Ok(match (value, ty) {
        (Value::I32(v), Scalar::I32) => Value::I32(v),
        (Value::U32(v), Scalar::I32) => Value::I32(v as i32),
        (Value::F32(v), Scalar::I32) => Value::I32(f32_to_i32(v)),
        (Value::AbstractFloat(v), Scalar::I32) => Value::I32(f32_to_i32(v as f32)),
        (Value::I32(v), Scalar::U32) => Value::U32(v as u32),
        (Value::U32(v), Scalar::U32) => Value::U32(v),
        (Value::F32(v), Scalar::U32) => Value::U32(f32_to_u32(v)),
        (Value::AbstractFloat(v), Scalar::U32) => Value::U32(f32_to_u32(v as f32)),
        (Value::I32(v), Scalar::F32) => Value::F32(v as f32),
        (Value::U32(v), Scalar::F32) => Value::F32(v as f32),
        (Value::F32(v), Scalar::F32) => Value::F32(v),
        (Value::AbstractFloat(v), Scalar::F32) => Value::F32(v as f32),
        (Value::AbstractInt(_), Scalar::I32 | Scalar::U32 | Scalar::F32) => {
            return value.concretize(ty)
        }
        _ => return Err(invalid()),
    })
}

fn call(callee: &str, args: &[Value]) -> Result<Value, EvalError> {
    let invalid = || EvalError::InvalidFunctionArg(callee.to_string());
    let arg = match *args {
        [arg] => arg,
        _ => return Err(invalid()),
    };
    match callee {
        "trunc" => match arg {
            Value::F32(v) => Ok(Value::F32(v.trunc())),
            Value::AbstractFloat(v) => Ok(Value::AbstractFloat(v.trunc())),
            _ => Err(invalid()),
        },
        "abs" => Ok(match arg {
            Value::I32(v) => Value::I32(v.wrapping_abs()),
            Value::U32(v) => Value::U32(v),
            Value::AbstractInt(v) => {
                Value::AbstractInt(v.checked_abs().ok_or(EvalError::Overflow("abs"))?)
            }
            Value::F32(v) => Value::F32(v.abs()),
            Value::AbstractFloat(v) => Value::AbstractFloat(v.abs()),
        }),
        _ => Err(EvalError::UnknownFunction(callee.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(text: &str) -> Expression {
        Expression::IntLiteral(text.to_string())
    }

    #[test]
    fn concrete_integers_wrap() {
        let ev = Evaluator::new();
        let sum = Expression::binary(BinaryOperator::Add, int("4294967295u"), int("2u"));
        assert_eq!(ev.evaluate(&sum), Ok(Value::U32(1)));

        let product = Expression::binary(BinaryOperator::Multiply, int("65536i"), int("65536i"));
        assert_eq!(ev.evaluate(&product), Ok(Value::I32(0)));

        let negated = Expression::unary(
            UnaryOperator::Negate,
            Expression::unary(UnaryOperator::Negate, int("2147483647i")),
        );
        assert_eq!(ev.evaluate(&negated), Ok(Value::I32(i32::MAX)));
    }

    #[test]
    fn abstract_operands_concretize() {
        let ev = Evaluator::new();
        let min = Expression::unary(UnaryOperator::Negate, int("2147483648"));
        let expr = Expression::binary(BinaryOperator::Add, min, int("1i"));
        assert_eq!(ev.evaluate(&expr), Ok(Value::I32(i32::MIN + 1)));

        let big = Expression::binary(BinaryOperator::Add, int("4294967296"), int("1u"));
        assert_eq!(
            ev.evaluate(&big),
            Err(EvalError::InvalidBinaryOpArgs(
                Scalar::AbstractInt,
                Scalar::U32
            ))
        );
    }

    #[test]
    fn abstract_integers_overflow() {
        let ev = Evaluator::new();
        let expr = Expression::binary(
            BinaryOperator::Multiply,
            int("9223372036854775807"),
            int("2"),
        );
        assert_eq!(
            ev.evaluate(&expr),
            Err(EvalError::Overflow("multiplication"))
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(f32_to_i32(-3.9), -3);
        assert_eq!(f32_to_i32(1e20), 2147483520);
        assert_eq!(f32_to_i32(-1e20), i32::MIN);
        assert_eq!(f32_to_u32(-2.0), 0);
        assert_eq!(f32_to_u32(1e20), 4294967040);

        let ev = Evaluator::new();
        let reinterpret = Expression::construct(
            Scalar::U32,
            Expression::unary(UnaryOperator::Negate, int("1i")),
        );
        assert_eq!(ev.evaluate(&reinterpret), Ok(Value::U32(u32::MAX)));
        let widen = Expression::construct(Scalar::F32, int("3u"));
        assert_eq!(ev.evaluate(&widen), Ok(Value::F32(3.0)));
    }

    #[test]
    fn builtins_and_bindings() {
        let uniform = Expression::member(Expression::Identifier("u".into()), "x");
        let mut ev = Evaluator::new();
        assert_eq!(
            ev.evaluate(&uniform),
            Err(EvalError::Unbound("u.x".into()))
        );
        ev.bind(&uniform, Value::F32(-2.75));
        let expr = Expression::call("abs", vec![Expression::call("trunc", vec![uniform])]);
        assert_eq!(ev.evaluate(&expr), Ok(Value::F32(2.0)));

        let min_abs = Expression::call(
            "abs",
            vec![Expression::unary(UnaryOperator::Negate, int("2147483648"))],
        );
        assert_eq!(
            ev.evaluate(&min_abs),
            Ok(Value::AbstractInt(2147483648))
        );
        assert_eq!(
            ev.evaluate(&Expression::call("sqrt", vec![int("4")])),
            Err(EvalError::UnknownFunction("sqrt".into()))
        );
    }
}
