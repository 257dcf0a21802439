use crate::error::TopologyError;
use crate::math::Point3;
use crate::topology::{EdgeData, OrientedEdge, TopologyStore, VertexData, WireData, WireId};

/// Creates a polyline wire from a sequence of 3D points.
///
/// A single point with `close` set yields one closed edge, the
/// topology of a full circle.
pub struct MakeWire {
    points: Vec<Point3>,
    close: bool,
}

impl MakeWire {
    /// Creates a new `MakeWire` operation.
    #[must_use]
    pub fn new(points: Vec<Point3>, close: bool) -> Self {
        Self { points, close }
    }

    /// Executes the operation, creating vertices, edges and the wire.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if there are too few points
    /// to form an edge.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<WireId, TopologyError> {
        let min_points = if self.close { 1 } else { 2 };
        if self.points.len() < min_points {
            return Err(TopologyError::InvalidTopology(format!(
                "wire needs at least {min_points} point(s), got {}",
                self.points.len()
            )));
        }

        let vertices: Vec<_> = self
            .points
            .iter()
            .map(|&p| store.add_vertex(VertexData::new(p)))
            .collect();

        let n = vertices.len();
        let edge_count = if self.close { n } else { n - 1 };
        let mut edges = Vec::with_capacity(edge_count);
        for i in 0..edge_count {
            let edge = store.add_edge(EdgeData::new(vertices[i], vertices[(i + 1) % n]))?;
            edges.push(OrientedEdge::new(edge, true));
        }

        store.add_wire(WireData {
            edges,
            is_closed: self.close,
        })
    }
}
