//! Expression and type trees for the parts of WGSL the synthesizer touches.
//!
//! Expressions are owned trees: every node owns its children, and cloning an
//! expression is a deep copy. The synthesizer only ever builds fresh
//! [`Expression::IntLiteral`], [`Expression::FloatLiteral`], [`Expression::Unary`],
//! [`Expression::Binary`], [`Expression::FunctionCall`] and
//! [`Expression::ValueConstructor`] nodes; the remaining variants exist so that
//! uniform-buffer references handed in by a [`ShaderJob`] can be represented.
//!
//! [`ShaderJob`]: crate::ShaderJob

use std::fmt;

/// A scalar type, including WGSL's abstract numeric types.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Scalar {
    Bool,
    I32,
    U32,
    /// The type of an unsuffixed integer literal, before concretization.
    AbstractInt,
    F32,
    /// The type of an unsuffixed float literal, before concretization.
    AbstractFloat,
}

impl Scalar {
    pub const fn is_integer(self) -> bool {
        match self {
            Self::I32 | Self::U32 | Self::AbstractInt => true,
            _ => false,
        }
    }

    pub const fn is_float(self) -> bool {
        match self {
            Self::F32 | Self::AbstractFloat => true,
            _ => false,
        }
    }

    pub const fn is_abstract(self) -> bool {
        match self {
            Self::AbstractInt | Self::AbstractFloat => true,
            _ => false,
        }
    }

    /// The WGSL keyword naming this type, if it can be written in source.
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Bool => Some("bool"),
            Self::I32 => Some("i32"),
            Self::U32 => Some("u32"),
            Self::F32 => Some("f32"),
            Self::AbstractInt | Self::AbstractFloat => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (*self, self.keyword()) {
            (_, Some(keyword)) => f.write_str(keyword),
            (Self::AbstractInt, None) => f.write_str("{AbstractInt}"),
            (_, None) => f.write_str("{AbstractFloat}"),
        }
    }
}

/// Number of components in a vector, or of columns/rows in a matrix.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum VectorSize {
    Bi = 2,
    Tri = 3,
    Quad = 4,
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Type {
    Scalar(Scalar),
    Vector {
        size: VectorSize,
        scalar: Scalar,
    },
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        scalar: Scalar,
    },
}

impl Type {
    pub const fn as_scalar(&self) -> Option<Scalar> {
        match *self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

impl From<Scalar> for Type {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl fmt::Display for Type {
    /// Formats the type as it is written in wgsl.
    ///
    /// For example `vec3<f32>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Vector { size, scalar } => write!(f, "vec{}<{scalar}>", size as u8),
            Self::Matrix {
                columns,
                rows,
                scalar,
            } => write!(f, "mat{}x{}<{scalar}>", columns as u8, rows as u8),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum UnaryOperator {
    Negate,
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum Expression {
    BoolLiteral(bool),
    /// An integer literal in source form, including any `i`/`u` suffix.
    IntLiteral(String),
    /// A float literal in source form, including any `f`/`h` suffix.
    FloatLiteral(String),
    Identifier(String),
    /// A struct member access, like `uniforms.count`.
    MemberLookup {
        receiver: Box<Expression>,
        member: String,
    },
    IndexLookup {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        target: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// A call to a built-in or user function, like `trunc(x)`.
    FunctionCall {
        callee: String,
        args: Vec<Expression>,
    },
    /// A scalar value constructor or conversion: `f32(x)`.
    ValueConstructor {
        ty: Scalar,
        args: Vec<Expression>,
    },
    Paren(Box<Expression>),
}

impl Expression {
    pub fn unary(op: UnaryOperator, target: Expression) -> Self {
        Self::Unary {
            op,
            target: Box::new(target),
        }
    }

    pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(callee: &str, args: Vec<Expression>) -> Self {
        Self::FunctionCall {
            callee: callee.to_string(),
            args,
        }
    }

    pub fn construct(ty: Scalar, arg: Expression) -> Self {
        Self::ValueConstructor {
            ty,
            args: vec![arg],
        }
    }

    pub fn member(receiver: Expression, member: &str) -> Self {
        Self::MemberLookup {
            receiver: Box::new(receiver),
            member: member.to_string(),
        }
    }

    /// Number of nested [`Binary`](Expression::Binary) nodes on the longest
    /// path from this node to a leaf.
    pub fn binary_depth(&self) -> u32 {
        match *self {
            Self::BoolLiteral(_)
            | Self::IntLiteral(_)
            | Self::FloatLiteral(_)
            | Self::Identifier(_) => 0,
            Self::MemberLookup { ref receiver, .. } => receiver.binary_depth(),
            Self::IndexLookup {
                ref target,
                ref index,
            } => target.binary_depth().max(index.binary_depth()),
            Self::Unary { ref target, .. } => target.binary_depth(),
            Self::Binary {
                ref lhs, ref rhs, ..
            } => 1 + lhs.binary_depth().max(rhs.binary_depth()),
            Self::FunctionCall { ref args, .. } | Self::ValueConstructor { ref args, .. } => args
                .iter()
                .map(Expression::binary_depth)
                .max()
                .unwrap_or(0),
            Self::Paren(ref inner) => inner.binary_depth(),
        }
    }
}

impl fmt::Display for Expression {
    /// Writes the expression as WGSL source.
    ///
    /// Binary operations are always parenthesized, so the text reads back
    /// with the same association as the tree regardless of precedence.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BoolLiteral(value) => write!(f, "{value}"),
            Self::IntLiteral(ref text) | Self::FloatLiteral(ref text) => f.write_str(text),
            Self::Identifier(ref name) => f.write_str(name),
            Self::MemberLookup {
                ref receiver,
                ref member,
            } => write!(f, "{receiver}.{member}"),
            Self::IndexLookup {
                ref target,
                ref index,
            } => write!(f, "{target}[{index}]"),
            Self::Unary {
                op: UnaryOperator::Negate,
                ref target,
            } => match **target {
                // `--x` would lex as a decrement
                Self::Unary { .. } => write!(f, "-({target})"),
                _ => write!(f, "-{target}"),
            },
            Self::Binary {
                op,
                ref lhs,
                ref rhs,
            } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::FunctionCall {
                ref callee,
                ref args,
            } => {
                write!(f, "{callee}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::ValueConstructor { ty, ref args } => {
                write!(f, "{ty}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::Paren(ref inner) => write!(f, "({inner})"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
    for (index, arg) in args.iter().enumerate() {
        if index != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parenthesizes_binaries() {
        let expr = Expression::binary(
            BinaryOperator::Multiply,
            Expression::binary(
                BinaryOperator::Add,
                Expression::IntLiteral("1u".into()),
                Expression::IntLiteral("2u".into()),
            ),
            Expression::construct(
                Scalar::U32,
                Expression::member(Expression::Identifier("uniforms".into()), "count"),
            ),
        );
        assert_eq!(expr.to_string(), "((1u + 2u) * u32(uniforms.count))");
        assert_eq!(expr.binary_depth(), 2);
    }

    #[test]
    fn display_double_negation() {
        let expr = Expression::unary(
            UnaryOperator::Negate,
            Expression::unary(UnaryOperator::Negate, Expression::IntLiteral("5i".into())),
        );
        assert_eq!(expr.to_string(), "-(-5i)");
    }

    #[test]
    fn type_to_wgsl() {
        assert_eq!(Type::Scalar(Scalar::F32).to_string(), "f32");
        assert_eq!(
            Type::Vector {
                size: VectorSize::Tri,
                scalar: Scalar::I32,
            }
            .to_string(),
            "vec3<i32>"
        );
        assert_eq!(
            Type::Matrix {
                columns: VectorSize::Bi,
                rows: VectorSize::Quad,
                scalar: Scalar::F32,
            }
            .to_string(),
            "mat2x4<f32>"
        );
        assert_eq!(Scalar::AbstractInt.to_string(), "{AbstractInt}");
    }
}
