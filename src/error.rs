use crate::ast::{Scalar, Type};

pub type Result<T, E = KnownValueError> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum KnownValueError {
    #[error("Known values of type `{0}` are not yet supported")]
    UnsupportedType(Type),
    #[error("Cannot get a numeric value from `{0}`")]
    NotALiteral(String),
    #[error("Literal `{0}` is not a valid number")]
    MalformedLiteral(String),
    #[error("Only integer-valued literals are supported in known value expressions, got {0}")]
    NonIntegral(f64),
    #[error("Value {value} cannot be represented as `{ty}`")]
    OutOfRange { value: f64, ty: Scalar },
    #[error("Known values are currently only supported within a limited range, got {0}")]
    OutsidePreciseRange(f64),
    #[error("Negative known value {0} requested for unsigned type")]
    NegativeUnsigned(i64),
    #[error("No rewrite strategy has a positive weight at depth {0}")]
    NoStrategy(u32),
    #[error("Uniform scalar `{0}` of type `{1}` cannot anchor a known value")]
    UnsupportedUniform(String, Scalar),
    #[error("Type `{0}` should not reach this point")]
    UnreachableType(Scalar),
    #[error("Internal known value synthesis error: {0}")]
    Internal(&'static str),
}

impl KnownValueError {
    /// Whether this error reveals a defect in the synthesizer rather than an
    /// input the caller should not have offered.
    ///
    /// Fuzzers skip the mutation opportunity on any other error, but should
    /// stop the run on these.
    pub const fn is_internal(&self) -> bool {
        match *self {
            Self::Internal(_) | Self::UnreachableType(_) => true,
            _ => false,
        }
    }
}
