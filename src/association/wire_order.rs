use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::topology::{FaceId, OrientedEdge, Shape, VertexId};

/// The boundary edges of one wire of a face, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedWire {
    pub edges: Vec<OrientedEdge>,
    /// Whether this is the face's outer wire.
    pub outer: bool,
}

impl OrderedWire {
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Reverses the traversal direction, keeping the first vertex in place.
    pub fn reverse(&mut self) {
        self.edges.reverse();
        for oe in &mut self.edges {
            *oe = oe.reversed();
        }
    }

    /// Start vertices of the edges, in traversal order.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is missing from the graph.
    pub fn vertices<G: ShapeGraph>(&self, graph: &G) -> Result<Vec<VertexId>> {
        let mut vertices = Vec::with_capacity(self.edges.len());
        for oe in &self.edges {
            vertices.push(graph.first_vertex(*oe)?);
        }
        Ok(vertices)
    }

    /// Rotates the wire so that its first edge leaves `start`. Returns
    /// `false`, leaving the wire as is, if `start` is not on it.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is missing from the graph.
    pub fn rotate_to<G: ShapeGraph>(&mut self, graph: &G, start: VertexId) -> Result<bool> {
        let Some(offset) = self.vertices(graph)?.iter().position(|&v| v == start) else {
            return Ok(false);
        };
        self.edges.rotate_left(offset);
        Ok(true)
    }
}

/// Orders the boundary wires of `face` for alignment with another face.
///
/// The wire holding `start` comes first, rotated so that its first edge
/// leaves `start` in the face's own boundary direction. The other wires
/// follow in stored order, outer wire first.
///
/// # Errors
///
/// Returns [`AssociationError::NotFound`] if `start` is not on the
/// boundary of the face.
pub fn ordered_edges<G: ShapeGraph>(
    graph: &G,
    face: FaceId,
    start: VertexId,
) -> Result<Vec<OrderedWire>> {
    let mut anchored = None;
    let mut others = Vec::new();
    for (index, wire) in graph.face_wires(face)?.into_iter().enumerate() {
        let mut wire = OrderedWire {
            edges: graph.wire_edges(wire)?,
            outer: index == 0,
        };
        if anchored.is_none() && wire.rotate_to(graph, start)? {
            anchored = Some(wire);
        } else {
            others.push(wire);
        }
    }
    let anchored = anchored.ok_or(AssociationError::NotFound {
        reason: "start-vertex-not-on-boundary",
        shape: Shape::Vertex(start),
    })?;
    others.insert(0, anchored);
    Ok(others)
}
