pub mod association;
pub mod creation;
pub mod error;
pub mod graph;
pub mod math;
pub mod mesh;
pub mod topology;

pub use association::{Associate, AssociationMap, AssociationParams};
pub use error::{AssociationError, FailureKind, Result, TopologyError};
pub use graph::ShapeGraph;
pub use mesh::{FaceMesh, MatchNodes, NodeMap};
pub use topology::{Shape, ShapeType, TopologyStore};
