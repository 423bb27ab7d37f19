//! Fuzzer configuration consumed by the synthesizers.

use std::ops::RangeInclusive;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::known_value::Strategy;

pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// A weight that depends on recursion depth.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum DepthWeight {
    Constant(u32),
    /// `initial` at the root, `step` less at each level, never below zero.
    Decaying { initial: u32, step: u32 },
    /// `initial` at the root, `step` more at each level.
    Growing { initial: u32, step: u32 },
    /// Explicit weight per depth. The last entry applies to all deeper levels;
    /// an empty table disables the strategy.
    PerDepth(Vec<u32>),
}

impl DepthWeight {
    pub fn at(&self, depth: u32) -> u32 {
        match *self {
            Self::Constant(weight) => weight,
            Self::Decaying { initial, step } => initial.saturating_sub(step.saturating_mul(depth)),
            Self::Growing { initial, step } => initial.saturating_add(step.saturating_mul(depth)),
            Self::PerDepth(ref table) => {
                let index = depth as usize;
                table
                    .get(index)
                    .or_else(|| table.last())
                    .copied()
                    .unwrap_or(0)
            }
        }
    }
}

/// Per-depth weights for each known value rewrite strategy.
///
/// A zero weight removes the strategy from consideration at that depth.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct KnownValueWeights {
    pub plain_known_value: DepthWeight,
    pub sum_of_known_values: DepthWeight,
    pub difference_of_known_values: DepthWeight,
    pub product_of_known_values: DepthWeight,
    pub known_value_derived_from_uniform: DepthWeight,
}

impl Default for KnownValueWeights {
    fn default() -> Self {
        Self {
            plain_known_value: DepthWeight::Growing {
                initial: 1,
                step: 2,
            },
            sum_of_known_values: DepthWeight::Decaying {
                initial: 6,
                step: 1,
            },
            difference_of_known_values: DepthWeight::Decaying {
                initial: 6,
                step: 1,
            },
            product_of_known_values: DepthWeight::Decaying {
                initial: 6,
                step: 1,
            },
            known_value_derived_from_uniform: DepthWeight::Constant(3),
        }
    }
}

impl KnownValueWeights {
    /// A table that gives every weight to `strategy`.
    ///
    /// Plain literals still terminate the recursion at the depth limit.
    pub fn only(strategy: Strategy) -> Self {
        let pick = |candidate| DepthWeight::Constant(u32::from(candidate == strategy));
        Self {
            plain_known_value: pick(Strategy::Plain),
            sum_of_known_values: pick(Strategy::Sum),
            difference_of_known_values: pick(Strategy::Difference),
            product_of_known_values: pick(Strategy::Product),
            known_value_derived_from_uniform: pick(Strategy::DerivedFromUniform),
        }
    }

    pub fn weight(&self, strategy: Strategy, depth: u32) -> u32 {
        let weight = match strategy {
            Strategy::Plain => &self.plain_known_value,
            Strategy::Sum => &self.sum_of_known_values,
            Strategy::Difference => &self.difference_of_known_values,
            Strategy::Product => &self.product_of_known_values,
            Strategy::DerivedFromUniform => &self.known_value_derived_from_uniform,
        };
        weight.at(depth)
    }
}

/// Serializable description of a fuzzing run's settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct SettingsDescriptor {
    pub seed: u64,
    pub max_depth: u32,
    pub known_value_weights: KnownValueWeights,
}

impl Default for SettingsDescriptor {
    fn default() -> Self {
        Self {
            seed: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            known_value_weights: KnownValueWeights::default(),
        }
    }
}

/// Settings shared by every synthesis call of a fuzzing run.
///
/// Owns the run's random source. Synthesizers borrow it mutably through the
/// whole recursion, so the order of draws, and hence the output for a given
/// seed, is reproducible.
#[derive(Debug)]
pub struct FuzzerSettings {
    pub max_depth: u32,
    pub known_value_weights: KnownValueWeights,
    rng: StdRng,
}

impl FuzzerSettings {
    pub fn new(desc: SettingsDescriptor) -> Self {
        log::debug!(
            "Fuzzer settings: seed {}, max depth {}",
            desc.seed,
            desc.max_depth
        );
        Self {
            max_depth: desc.max_depth,
            known_value_weights: desc.known_value_weights,
            rng: StdRng::seed_from_u64(desc.seed),
        }
    }

    /// Default weights and depth, seeded with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(SettingsDescriptor {
            seed,
            ..Default::default()
        })
    }

    pub fn with_weights(seed: u64, max_depth: u32, known_value_weights: KnownValueWeights) -> Self {
        Self::new(SettingsDescriptor {
            seed,
            max_depth,
            known_value_weights,
        })
    }

    /// Uniform draw from `[0, bound)`. A zero bound yields zero.
    pub fn random_int(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }

    /// Uniform draw from `[0, bound)`. A zero bound yields zero.
    pub fn random_u64(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }

    pub fn random_in_range(&mut self, range: RangeInclusive<u32>) -> u32 {
        if range.is_empty() {
            return *range.start();
        }
        self.rng.gen_range(range)
    }

    pub fn random_bool(&mut self) -> bool {
        self.rng.gen()
    }

    /// Whether synthesis at `depth` may still compose sub-expressions.
    pub fn go_deeper(&self, depth: u32) -> bool {
        depth < self.max_depth
    }
}

impl From<SettingsDescriptor> for FuzzerSettings {
    fn from(desc: SettingsDescriptor) -> Self {
        Self::new(desc)
    }
}
