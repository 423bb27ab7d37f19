/*! Value-preserving expression synthesis for WGSL fuzzing.

The central operation of the crate is producing a [`KnownValue`]: given a
value fixed at shader-authoring time and its scalar [`Type`], build an
arbitrarily deep expression that evaluates to that same value at runtime.
A fuzzer splices the rewritten expression into a shader in place of the
original literal; if the compiler under test then produces a different
result, it has miscompiled one of the two.

Integer synthesis works modulo 2<sup>32</sup> and deliberately lets operands
overflow, relying on WGSL's defined wraparound for concrete integer arithmetic.
Float synthesis stays inside the range of integers that `f32` represents
exactly, so that no intermediate result is ever rounded.

Randomness and strategy weights come from [`FuzzerSettings`]; values read from
uniform buffers come from a [`ShaderJob`]. The [`eval`] module evaluates the
produced trees under WGSL semantics, which is how tests and the fuzz target
check the invariant.

!*/

#![allow(clippy::new_without_default, clippy::match_like_matches_macro)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_qualifications,
    clippy::pattern_type_mismatch
)]
#![deny(clippy::panic)]

use std::{collections::HashMap, hash::BuildHasherDefault};

pub mod ast;
mod error;
pub mod eval;
pub mod known_value;
pub mod literal;
pub mod settings;
pub mod shader_job;

pub use crate::ast::{BinaryOperator, Expression, Scalar, Type, UnaryOperator, VectorSize};
pub use crate::error::{KnownValueError, Result};
pub use crate::known_value::{
    generate_known_value_expression, generate_known_value_integer, KnownValue, Strategy,
    LARGEST_INTEGER_IN_PRECISE_FLOAT_RANGE,
};
pub use crate::settings::{DepthWeight, FuzzerSettings, KnownValueWeights, SettingsDescriptor};
pub use crate::shader_job::{NoUniforms, ShaderJob, UniformScalar, UniformValues};

/// Hash map that is faster but not resilient to DoS attacks.
pub type FastHashMap<K, T> = HashMap<K, T, BuildHasherDefault<fxhash::FxHasher>>;
