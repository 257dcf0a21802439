use std::fmt;

use thiserror::Error;

use crate::mesh::NodeId;
use crate::topology::{Shape, ShapeType};

/// Errors related to the topology store and kernel queries.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("wire is not closed")]
    WireNotClosed,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Machine-readable classification of an association failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Incompatible shape types and no group containment rule applies.
    TypeMismatch,
    /// Differing sub-shape counts between type-compatible shapes.
    StructuralMismatch,
    /// A two-edge face could not be disambiguated.
    Ambiguous,
    /// A group could not be reduced to a connected wire or shell.
    DisconnectedInput,
    /// A required counterpart could not be located.
    NotFound,
    /// The map would need to rebind a key to a conflicting value.
    InvalidBinding,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TypeMismatch => "type-mismatch",
            Self::StructuralMismatch => "structural-mismatch",
            Self::Ambiguous => "ambiguous",
            Self::DisconnectedInput => "disconnected-input",
            Self::NotFound => "not-found",
            Self::InvalidBinding => "invalid-binding",
        };
        f.write_str(name)
    }
}

/// Errors returned by the association engine and the node matcher.
#[derive(Debug, Error)]
pub enum AssociationError {
    #[error("incompatible shape types: {first:?} vs {second:?}")]
    TypeMismatch { first: ShapeType, second: ShapeType },

    #[error("structural mismatch ({reason}) between {first:?} and {second:?}")]
    StructuralMismatch {
        reason: &'static str,
        first: Shape,
        second: Shape,
    },

    #[error("cannot disambiguate two-edge association of {first:?} and {second:?}")]
    Ambiguous { first: Shape, second: Shape },

    #[error("disconnected input ({reason}) at {shape:?}")]
    DisconnectedInput { reason: &'static str, shape: Shape },

    #[error("not found ({reason}) for {shape:?}")]
    NotFound { reason: &'static str, shape: Shape },

    #[error("{key:?} is already bound to {bound:?}, cannot bind it to {requested:?}")]
    InvalidBinding {
        key: Shape,
        bound: Shape,
        requested: Shape,
    },

    #[error("node {node:?} is already matched to {bound:?}, cannot match it to {requested:?}")]
    NodeConflict {
        node: NodeId,
        bound: NodeId,
        requested: NodeId,
    },

    #[error("face meshes differ ({reason})")]
    MeshMismatch { reason: &'static str },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("association of {first:?} with {second:?} failed")]
    Context {
        first: Shape,
        second: Shape,
        #[source]
        source: Box<AssociationError>,
    },
}

impl AssociationError {
    /// Wraps the error with the shape pair whose association failed.
    #[must_use]
    pub fn within(self, first: Shape, second: Shape) -> Self {
        Self::Context {
            first,
            second,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping [`AssociationError::Context`] layers.
    #[must_use]
    pub fn leaf(&self) -> &Self {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the failure kind of the leaf cause.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self.leaf() {
            Self::TypeMismatch { .. } => FailureKind::TypeMismatch,
            Self::StructuralMismatch { .. } | Self::MeshMismatch { .. } => {
                FailureKind::StructuralMismatch
            }
            Self::Ambiguous { .. } => FailureKind::Ambiguous,
            Self::DisconnectedInput { .. } => FailureKind::DisconnectedInput,
            Self::NotFound { .. } | Self::Topology(_) | Self::Context { .. } => {
                FailureKind::NotFound
            }
            Self::InvalidBinding { .. } | Self::NodeConflict { .. } => FailureKind::InvalidBinding,
        }
    }

    /// Returns the short reason string of the leaf cause, if it carries one.
    #[must_use]
    pub fn reason(&self) -> Option<&'static str> {
        match self.leaf() {
            Self::StructuralMismatch { reason, .. }
            | Self::MeshMismatch { reason, .. }
            | Self::DisconnectedInput { reason, .. }
            | Self::NotFound { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Convenience type alias for results using [`AssociationError`].
pub type Result<T> = std::result::Result<T, AssociationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{EdgeId, FaceId};

    #[test]
    fn kind_reports_leaf_cause_through_context() {
        let leaf = AssociationError::StructuralMismatch {
            reason: "outer-wire-edge-count",
            first: Shape::Face(FaceId::default()),
            second: Shape::Face(FaceId::default()),
        };
        let wrapped = leaf
            .within(Shape::Edge(EdgeId::default()), Shape::Edge(EdgeId::default()))
            .within(Shape::Face(FaceId::default()), Shape::Face(FaceId::default()));

        assert_eq!(wrapped.kind(), FailureKind::StructuralMismatch);
        assert_eq!(wrapped.reason(), Some("outer-wire-edge-count"));
        assert!(std::error::Error::source(&wrapped).is_some());
    }

    #[test]
    fn topology_errors_count_as_not_found() {
        let err: AssociationError = TopologyError::EntityNotFound("edge".into()).into();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(err.reason(), None);
    }
}
