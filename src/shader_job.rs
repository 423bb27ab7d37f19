//! Access to uniform-buffer values known at mutation time.

use crate::ast::{Expression, Scalar};
use crate::settings::FuzzerSettings;

/// A uniform-buffer scalar whose runtime contents the fuzzer knows.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformScalar {
    /// Expression reading the scalar, such as `uniforms.count`.
    pub expression: Expression,
    /// Literal holding the value the buffer will contain.
    pub value: Expression,
    pub ty: Scalar,
}

/// The shader being mutated, as far as known value synthesis needs it.
pub trait ShaderJob {
    /// Picks one of the job's uniform scalars uniformly at random.
    ///
    /// Returns `None` if the job has no uniform scalars.
    fn random_uniform_scalar_with_value(
        &self,
        settings: &mut FuzzerSettings,
    ) -> Option<UniformScalar>;
}

/// A shader job with no uniform buffers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoUniforms;

impl ShaderJob for NoUniforms {
    fn random_uniform_scalar_with_value(&self, _: &mut FuzzerSettings) -> Option<UniformScalar> {
        None
    }
}

/// Uniform scalars listed explicitly.
#[derive(Clone, Debug, Default)]
pub struct UniformValues {
    scalars: Vec<UniformScalar>,
}

impl UniformValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `receiver.member` as holding `value`.
    pub fn add(
        &mut self,
        receiver: &str,
        member: &str,
        value: Expression,
        ty: Scalar,
    ) -> &mut Self {
        self.scalars.push(UniformScalar {
            expression: Expression::member(Expression::Identifier(receiver.to_string()), member),
            value,
            ty,
        });
        self
    }

    pub fn push(&mut self, scalar: UniformScalar) {
        self.scalars.push(scalar);
    }

    pub fn scalars(&self) -> &[UniformScalar] {
        &self.scalars
    }
}

impl ShaderJob for UniformValues {
    fn random_uniform_scalar_with_value(
        &self,
        settings: &mut FuzzerSettings,
    ) -> Option<UniformScalar> {
        if self.scalars.is_empty() {
            return None;
        }
        let bound = u32::try_from(self.scalars.len()).unwrap_or(u32::MAX);
        let index = settings.random_int(bound) as usize;
        self.scalars.get(index).cloned()
    }
}
