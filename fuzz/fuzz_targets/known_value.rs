#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wgsl_fuzz::eval::{Evaluator, Value};
use wgsl_fuzz::{
    generate_known_value_expression, generate_known_value_integer, Expression, FuzzerSettings,
    KnownValueWeights, Scalar, Type, UniformScalar, UniformValues,
    LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE,
};

#[derive(Arbitrary, Debug)]
struct Input {
    seed: u64,
    max_depth: u8,
    value: i64,
    ty: Scalar,
    float_value: u32,
    uniform_i32: Option<i32>,
    uniform_u32: Option<u32>,
    uniform_f32: Option<f32>,
}

fn uniform(member: &str, value: Expression, ty: Scalar) -> UniformScalar {
    UniformScalar {
        expression: Expression::member(Expression::Identifier("u".to_string()), member),
        value,
        ty,
    }
}

fuzz_target!(|input: Input| {
    let mut uniforms = UniformValues::new();
    if let Some(v) = input.uniform_i32 {
        uniforms.push(uniform("a", Expression::IntLiteral(format!("{v}i")), Scalar::I32));
    }
    if let Some(v) = input.uniform_u32 {
        uniforms.push(uniform("b", Expression::IntLiteral(format!("{v}u")), Scalar::U32));
    }
    if let Some(v) = input.uniform_f32.filter(|v| v.is_finite()) {
        uniforms.push(uniform("c", Expression::FloatLiteral(format!("{v:?}f")), Scalar::F32));
    }
    let mut evaluator = Evaluator::new();
    for scalar in uniforms.scalars() {
        let value = evaluator.evaluate(&scalar.value).unwrap();
        evaluator.bind(&scalar.expression, value);
    }

    let max_depth = u32::from(input.max_depth % 8);
    let mut settings =
        FuzzerSettings::with_weights(input.seed, max_depth, KnownValueWeights::default());

    // out-of-range values and non-integer types are rejected, which is fine
    match generate_known_value_integer(0, input.value, input.ty, &mut settings, &uniforms) {
        Ok(known) => {
            let result = evaluator.evaluate(&known.rewritten).unwrap();
            assert_eq!(result.scalar(), input.ty);
            match input.ty {
                Scalar::AbstractInt => assert_eq!(result, Value::AbstractInt(input.value)),
                _ => assert_eq!(result.wrapped_bits(), Some(input.value as u32)),
            }
        }
        Err(err) => assert!(!err.is_internal(), "{err}"),
    }

    let float_value = input.float_value % (LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE + 1);
    let literal = Expression::FloatLiteral(format!("{float_value}f"));
    let known = generate_known_value_expression(
        0,
        &literal,
        &Type::from(Scalar::F32),
        &mut settings,
        &uniforms,
    )
    .unwrap();
    let result = evaluator.evaluate(&known.rewritten).unwrap();
    assert_eq!(result, Value::F32(float_value as f32));
    assert!(result.as_f64().is_sign_positive());
});
