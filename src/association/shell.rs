use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use super::{AssociationMap, Context, Operand};
use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::topology::{EdgeId, FaceId, OrientedEdge, Shape, ShapeType, VertexId};

/// A face reached by the walk, with the edge it was entered through,
/// oriented as in the face it was reached from.
type Entry = (FaceId, OrientedEdge);

impl<G: ShapeGraph> Context<'_, G> {
    /// Associates two connected face sets by walking them in lock step from
    /// an edge whose ends are both bound.
    ///
    /// Each step aligns a face pair from the edge it was entered through,
    /// binds the boundary edges, and queues the neighbours across every
    /// newly bound edge. Adjacency is restricted to the operands' faces.
    pub(super) fn associate_shell(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let faces1 = op1.faces(self.graph1)?;
        let set1: BTreeSet<FaceId> = faces1.iter().copied().collect();
        let set2: BTreeSet<FaceId> = op2.faces(self.graph2)?.into_iter().collect();

        let (start1, start2) = self.shell_seed(op1, op2, &set1, &set2, map)?;
        let mut queue = VecDeque::from([(start1, start2)]);
        let mut bound_edges = BTreeSet::new();

        while let Some(((face1, entry1), (face2, entry2))) = queue.pop_front() {
            if map.is_bound(Shape::Face(face1)) {
                continue;
            }
            let v1 = [self.graph1.first_vertex(entry1)?, self.graph1.last_vertex(entry1)?];
            let v2 = [self.graph2.first_vertex(entry2)?, self.graph2.last_vertex(entry2)?];
            let mut alignment = self
                .align_faces(face1, v1, face2, v2, map)
                .map_err(|err| err.within(Shape::Face(face1), Shape::Face(face2)))?;
            self.bind(map, face1, face2, bidirectional)?;

            if alignment.anchor_count == 2
                && (entry1.edge == alignment.edges1[0].edge)
                    != (entry2.edge == alignment.edges2[0].edge)
            {
                alignment.reverse_second();
            }

            for (&oe1, &oe2) in alignment.edges1.iter().zip(&alignment.edges2) {
                if !bound_edges.insert(oe1.edge) {
                    continue;
                }
                self.bind(map, oe1.edge, oe2.edge, bidirectional)?;
                let a = self.graph1.first_vertex(oe1)?;
                let b = self.graph2.first_vertex(oe2)?;
                self.bind(map, a, b, bidirectional)?;

                let next1 = next_face_within(self.graph1, oe1.edge, face1, &set1)?;
                let next2 = next_face_within(self.graph2, oe2.edge, face2, &set2)?;
                match (next1, next2) {
                    (Some(n1), Some(n2)) => queue.push_back(((n1, oe1), (n2, oe2))),
                    (None, None) => {}
                    _ => {
                        return Err(AssociationError::NotFound {
                            reason: "counterpart-face",
                            shape: Shape::Edge(oe1.edge),
                        })
                    }
                }
            }
        }

        if let Operand::Shape(shape1) = op1 {
            if let Some(&face) = faces1.iter().find(|&&f| !map.is_bound(Shape::Face(f))) {
                return Err(AssociationError::DisconnectedInput {
                    reason: "unreached-faces",
                    shape: Shape::Face(face),
                });
            }
            debug!(?shape1, faces = faces1.len(), "shell walk complete");
        }
        self.bind_operands(map, op1, op2, bidirectional)
    }

    /// The starting face pairs: an edge of `op1` with two distinct bound
    /// ends, its counterpart in `op2`, and faces containing them oriented
    /// so that the edges run the same way.
    fn shell_seed(
        &self,
        op1: &Operand,
        op2: &Operand,
        set1: &BTreeSet<FaceId>,
        set2: &BTreeSet<FaceId>,
        map: &AssociationMap,
    ) -> Result<(Entry, Entry)> {
        let image = |v: VertexId| map.get(Shape::Vertex(v)).and_then(Shape::as_vertex);
        let mut seed = None;
        for edge in op1.edges(self.graph1)? {
            let (a, b) = self.graph1.edge_vertices(edge)?;
            if a == b {
                continue;
            }
            if let (Some(x), Some(y)) = (image(a), image(b)) {
                seed = Some((edge, x, y));
                break;
            }
        }
        let Some((edge1, x, y)) = seed else {
            return Err(AssociationError::NotFound {
                reason: "two-bound-vertices",
                shape: op1.anchor(),
            });
        };

        let edges2: BTreeSet<EdgeId> = op2.edges(self.graph2)?.into_iter().collect();
        let edge2 = self
            .graph2
            .edges_by_vertices(x, y)?
            .into_iter()
            .find(|e| edges2.contains(e));
        let Some(edge2) = edge2 else {
            return Err(AssociationError::NotFound {
                reason: "counterpart-edge",
                shape: Shape::Edge(edge1),
            });
        };

        let faces1 = faces_of_edge_within(self.graph1, edge1, set1)?;
        let faces2 = faces_of_edge_within(self.graph2, edge2, set2)?;
        let (Some(&face1), Some(&first2)) = (faces1.first(), faces2.first()) else {
            return Err(AssociationError::NotFound {
                reason: "face-of-seed-edge",
                shape: Shape::Edge(edge1),
            });
        };

        let oe1 = oriented_in(self.graph1, face1, edge1)?;
        let mut oe2 = oriented_in(self.graph2, first2, edge2)?;
        let mut face2 = first2;
        let start1 = self.graph1.first_vertex(oe1)?;
        if image(start1) != Some(self.graph2.first_vertex(oe2)?) {
            oe2 = oe2.reversed();
            if let Some(&other) = faces2.get(1) {
                face2 = other;
            }
        }
        Ok(((face1, oe1), (face2, oe2)))
    }
}

/// Faces of `faces` bounded by `edge`, in graph order.
fn faces_of_edge_within<G: ShapeGraph>(
    graph: &G,
    edge: EdgeId,
    faces: &BTreeSet<FaceId>,
) -> Result<Vec<FaceId>> {
    Ok(graph
        .ancestors(Shape::Edge(edge), ShapeType::Face)?
        .into_iter()
        .filter_map(Shape::as_face)
        .filter(|f| faces.contains(f))
        .collect())
}

/// The face of `faces` across `edge` from `face`.
fn next_face_within<G: ShapeGraph>(
    graph: &G,
    edge: EdgeId,
    face: FaceId,
    faces: &BTreeSet<FaceId>,
) -> Result<Option<FaceId>> {
    Ok(faces_of_edge_within(graph, edge, faces)?
        .into_iter()
        .find(|&f| f != face))
}

/// `edge` with the orientation it has in the boundary of `face`.
fn oriented_in<G: ShapeGraph>(graph: &G, face: FaceId, edge: EdgeId) -> Result<OrientedEdge> {
    for wire in graph.face_wires(face)? {
        if let Some(oe) = graph.wire_edges(wire)?.into_iter().find(|oe| oe.edge == edge) {
            return Ok(oe);
        }
    }
    Err(AssociationError::NotFound {
        reason: "edge-not-on-face",
        shape: Shape::Edge(edge),
    })
}
