use tracing::debug;

use super::{AssociationMap, Context, Operand};
use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::math::{Point3, TOLERANCE};
use crate::topology::{EdgeId, Shape, VertexId};

/// Similarity transform taking the bounding box of one vertex set onto
/// the bounding box of another: translation of the centers plus a uniform
/// scale by the ratio of the box diagonals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Frame {
    center1: Point3,
    center2: Point3,
    scale: f64,
}

impl Frame {
    pub(crate) fn between<G: ShapeGraph>(
        graph1: &G,
        shapes1: &[Shape],
        graph2: &G,
        shapes2: &[Shape],
    ) -> Result<Self> {
        let (Some(box1), Some(box2)) = (graph1.bounding_box(shapes1)?, graph2.bounding_box(shapes2)?)
        else {
            return Err(AssociationError::NotFound {
                reason: "vertices",
                shape: shapes1
                    .first()
                    .copied()
                    .unwrap_or(Shape::Vertex(VertexId::default())),
            });
        };
        let (extent1, extent2) = (box1.square_extent(), box2.square_extent());
        let scale = if extent1 > TOLERANCE {
            (extent2 / extent1).sqrt()
        } else {
            1.0
        };
        Ok(Self {
            center1: box1.center(),
            center2: box2.center(),
            scale,
        })
    }

    /// Maps a point of the first set into the frame of the second.
    pub(crate) fn map(&self, p: Point3) -> Point3 {
        self.center2 + (p - self.center1) * self.scale
    }
}

impl<G: ShapeGraph> Context<'_, G> {
    /// Binds the two ends of a representative edge of `op1` to the nearest
    /// vertices of `op2` after aligning their bounding boxes, then restarts
    /// the association from those pairs.
    pub(super) fn associate_by_proximity(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let vertices1 = op1.vertices(self.graph1)?;
        let vertices2 = op2.vertices(self.graph2)?;
        if vertices1.len() != vertices2.len() {
            return Err(AssociationError::StructuralMismatch {
                reason: "vertex-count",
                first: op1.anchor(),
                second: op2.anchor(),
            });
        }

        if let ([v1], [v2]) = (vertices1.as_slice(), vertices2.as_slice()) {
            debug!("single vertex pair bound by proximity");
            self.bind(map, *v1, *v2, bidirectional)?;
            return self.finish_by_proximity(op1, op2, map, bidirectional);
        }

        let edge = self.representative_edge(op1)?;
        let (a, b) = self.graph1.edge_vertices(edge)?;
        if a == b {
            return Err(AssociationError::NotFound {
                reason: "only-closed-edges",
                shape: op1.anchor(),
            });
        }

        let frame = Frame::between(
            self.graph1,
            &op1.members(self.graph1)?,
            self.graph2,
            &op2.members(self.graph2)?,
        )?;
        let first = self.nearest(&frame, a, &vertices2, None)?;
        let second = self.nearest(&frame, b, &vertices2, Some(first))?;
        debug!(?edge, "edge ends bound by proximity");
        self.bind(map, a, first, bidirectional)?;
        self.bind(map, b, second, bidirectional)?;
        self.finish_by_proximity(op1, op2, map, bidirectional)
    }

    fn finish_by_proximity(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        if let (Operand::Shape(Shape::Edge(e1)), Operand::Shape(Shape::Edge(e2))) = (op1, op2) {
            return self.bind(map, *e1, *e2, bidirectional);
        }
        self.associate(op1, op2, map)
    }

    /// The first non-closed outer edge of the operand's faces, or its first
    /// non-closed edge when it has no faces.
    fn representative_edge(&self, op1: &Operand) -> Result<EdgeId> {
        if let Operand::Shape(Shape::Edge(edge)) = op1 {
            return Ok(*edge);
        }
        let faces = op1.faces(self.graph1)?;
        let candidates: Vec<EdgeId> = if faces.is_empty() {
            op1.edges(self.graph1)?
        } else {
            let mut edges = Vec::new();
            for face in faces {
                edges.extend(self.graph1.outer_edges(face)?.into_iter().map(|oe| oe.edge));
            }
            edges
        };
        if candidates.is_empty() {
            return Err(AssociationError::NotFound {
                reason: "edge",
                shape: op1.anchor(),
            });
        }
        for edge in candidates {
            if !self.graph1.is_closed_edge(edge)? {
                return Ok(edge);
            }
        }
        Err(AssociationError::NotFound {
            reason: "only-closed-edges",
            shape: op1.anchor(),
        })
    }

    fn nearest(
        &self,
        frame: &Frame,
        vertex: VertexId,
        candidates: &[VertexId],
        excluded: Option<VertexId>,
    ) -> Result<VertexId> {
        let target = frame.map(self.graph1.vertex_point(vertex)?);
        let mut best: Option<(f64, VertexId)> = None;
        for &candidate in candidates {
            if Some(candidate) == excluded {
                continue;
            }
            let distance = (self.graph2.vertex_point(candidate)? - target).norm_squared();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, candidate));
            }
        }
        best.map(|(_, v)| v).ok_or(AssociationError::NotFound {
            reason: "nearest-vertex",
            shape: Shape::Vertex(vertex),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::association::Associate;
    use crate::creation::{MakeFace, MakeWire};
    use crate::error::FailureKind;
    use crate::topology::{FaceId, ShapeType, TopologyStore};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn polygon(store: &mut TopologyStore, points: Vec<Point3>) -> FaceId {
        let wire = MakeWire::new(points, true).execute(store).unwrap();
        MakeFace::new(wire, vec![]).execute(store).unwrap()
    }

    fn vertices(store: &TopologyStore, shape: Shape) -> Vec<VertexId> {
        store
            .sub_shapes(shape, ShapeType::Vertex)
            .unwrap()
            .into_iter()
            .filter_map(Shape::as_vertex)
            .collect()
    }

    // ── Frame ──────────────────────────────────────────────────

    #[test]
    fn frame_translates_and_scales() {
        let mut store = TopologyStore::new();
        let small = polygon(&mut store, vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]);
        let large = polygon(&mut store, vec![p(10.0, 0.0, 0.0), p(12.0, 0.0, 0.0), p(12.0, 2.0, 0.0)]);
        let frame =
            Frame::between(&store, &[Shape::Face(small)], &store, &[Shape::Face(large)]).unwrap();
        assert_relative_eq!(frame.map(p(1.0, 1.0, 0.0)), p(12.0, 2.0, 0.0));
        assert_relative_eq!(frame.map(p(0.5, 0.5, 0.0)), p(11.0, 1.0, 0.0));
    }

    #[test]
    fn degenerate_box_keeps_unit_scale() {
        let mut store = TopologyStore::new();
        let a = store.add_vertex(crate::topology::VertexData::new(p(1.0, 2.0, 3.0)));
        let b = store.add_vertex(crate::topology::VertexData::new(p(4.0, 2.0, 3.0)));
        let frame =
            Frame::between(&store, &[Shape::Vertex(a)], &store, &[Shape::Vertex(b)]).unwrap();
        assert_relative_eq!(frame.map(p(2.0, 2.0, 3.0)), p(5.0, 2.0, 3.0));
    }

    // ── Association ────────────────────────────────────────────

    #[test]
    fn rotated_copy_is_matched_by_nearest_corners() {
        let mut store = TopologyStore::new();
        let a = polygon(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 1.0, 0.0), p(0.0, 1.0, 0.0)],
        );
        // same rectangle, translated, with its wire starting at another corner
        let b = polygon(
            &mut store,
            vec![p(12.0, 1.0, 0.0), p(10.0, 1.0, 0.0), p(10.0, 0.0, 0.0), p(12.0, 0.0, 0.0)],
        );
        let mut map = AssociationMap::new();
        Associate::new(Shape::Face(a), Shape::Face(b))
            .execute(&store, &store, &mut map)
            .unwrap();

        for v in vertices(&store, Shape::Face(a)) {
            let Some(Shape::Vertex(image)) = map.get(Shape::Vertex(v)) else {
                panic!("vertex {v:?} unbound");
            };
            let offset = store.vertex_point(image).unwrap() - store.vertex_point(v).unwrap();
            assert_relative_eq!(offset, crate::math::Vector3::new(10.0, 0.0, 0.0));
        }
        assert_eq!(map.len(), 4 + 4 + 1);
    }

    #[test]
    fn single_vertex_wires_bind_directly() {
        let mut store = TopologyStore::new();
        let a = polygon(&mut store, vec![p(0.0, 0.0, 0.0)]);
        let b = polygon(&mut store, vec![p(5.0, 0.0, 0.0)]);
        let outer_a = store.face(a).unwrap().outer_wire;
        let outer_b = store.face(b).unwrap().outer_wire;
        let mut map = AssociationMap::new();
        Associate::new(Shape::Wire(outer_a), Shape::Wire(outer_b))
            .execute(&store, &store, &mut map)
            .unwrap();
        // one vertex each: bound directly, then the wire walk finishes the job
        assert_eq!(map.get(Shape::Wire(outer_a)), Some(Shape::Wire(outer_b)));
    }

    #[test]
    fn vertex_count_mismatch_is_reported() {
        let mut store = TopologyStore::new();
        let a = polygon(&mut store, vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)]);
        let b = polygon(
            &mut store,
            vec![p(5.0, 0.0, 0.0), p(6.0, 0.0, 0.0), p(6.0, 1.0, 0.0), p(5.0, 1.0, 0.0)],
        );
        let ctx = Context {
            graph1: &store,
            graph2: &store,
            params: crate::association::AssociationParams::default(),
            same_graph: true,
        };
        let mut map = AssociationMap::new();
        let err = ctx
            .associate_by_proximity(
                &Operand::Shape(Shape::Face(a)),
                &Operand::Shape(Shape::Face(b)),
                &mut map,
                true,
            )
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::StructuralMismatch);
        assert!(map.is_empty());
    }
}
