//! Error types for the rationalization pass.
//!
//! Every error is an internal invariant violation: the method reached the pass
//! in a shape earlier phases should never produce. The pass stops at the first
//! one and leaves the method half rewritten.

use derive_more::{Display, From};
use sprig_ir::{NodeRef, Oper, VarType};

pub type RationalizeResult<T> = Result<T, RationalizeError>;

#[derive(Clone, Display, Debug, From, PartialEq)]
#[display("{kind}")]
pub struct RationalizeError {
    #[from]
    kind: Box<RationalizeErrorKind>,
}

impl<E> From<E> for RationalizeError
where
    RationalizeErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        RationalizeError {
            kind: Box::new(RationalizeErrorKind::from(error)),
        }
    }
}

impl RationalizeError {
    pub fn kind(&self) -> &RationalizeErrorKind {
        &self.kind
    }

    pub fn unexpected_assign_target(node: NodeRef, target: Oper) -> Self {
        RationalizeErrorKind::UnexpectedAssignTarget { node, target }.into()
    }

    pub fn malformed_simd(node: NodeRef, message: impl std::fmt::Display) -> Self {
        RationalizeErrorKind::MalformedSimd {
            node,
            message: message.to_string(),
        }
        .into()
    }

    pub fn sanity(msg: impl std::fmt::Display) -> Self {
        RationalizeErrorKind::Sanity(msg.to_string()).into()
    }

    pub fn range(msg: impl std::fmt::Display) -> Self {
        RationalizeErrorKind::Range(msg.to_string()).into()
    }
}

#[derive(Clone, Display, Debug, PartialEq)]
pub enum RationalizeErrorKind {
    #[display("Method is already in linear form")]
    AlreadyLinear,

    #[display("Unexpected assignment target `{target}` in {node}")]
    UnexpectedAssignTarget { node: NodeRef, target: Oper },

    #[display("Unsupported qmark shape in {_0}")]
    UnexpectedQmark(NodeRef),

    #[display("Call replacing intrinsic {node} returns {actual}, expected {expected}")]
    IntrinsicTypeMismatch {
        node: NodeRef,
        expected: VarType,
        actual: VarType,
    },

    #[display("Malformed SIMD node {node}: {message}")]
    MalformedSimd { node: NodeRef, message: String },

    #[display("Block node {node} of type {ty} cannot initialize a struct")]
    InvalidBlock { node: NodeRef, ty: VarType },

    #[display("HIR sanity check failed: {_0}")]
    Sanity(String),

    #[display("Range check failed: {_0}")]
    Range(String),
}

impl std::error::Error for RationalizeError {}

#[cfg(test)]
mod tests {
    use sprig_ir::EntityRef;

    use super::*;

    #[test]
    fn kinds_convert_into_errors() {
        let err: RationalizeError = RationalizeErrorKind::UnexpectedQmark(NodeRef::new(4)).into();
        assert_eq!(err.to_string(), "Unsupported qmark shape in n4");
        assert_eq!(err.kind(), &RationalizeErrorKind::UnexpectedQmark(NodeRef::new(4)));
    }

    #[test]
    fn constructors_format_node_and_operator() {
        let err = RationalizeError::unexpected_assign_target(NodeRef::new(7), Oper::CnsInt);
        assert_eq!(
            err.to_string(),
            "Unexpected assignment target `cns_int` in n7"
        );
    }
}
