use std::collections::BTreeSet;

use tracing::{debug, instrument};

use super::matching::{match_elements, NodePairs};
use super::{link_index, ElementId, FaceMesh, NodeId, NodeMap, NodePosition};
use crate::association::AssociationMap;
use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::topology::{EdgeId, FaceId, Shape, ShapeType, VertexId};

/// Matches the mesh nodes of two associated faces.
///
/// The faces and their boundary must already be associated in the map.
/// One boundary edge anchors the match: the node on its start vertex and
/// the next node along it are paired with their counterparts, and the
/// pairing is then spread over all elements.
pub struct MatchNodes {
    face1: FaceId,
    face2: FaceId,
}

/// The boundary edge chosen to anchor the match, with its counterpart.
struct Anchor {
    edge1: EdgeId,
    edge2: EdgeId,
    seam: bool,
}

impl MatchNodes {
    #[must_use]
    pub fn new(face1: FaceId, face2: FaceId) -> Self {
        Self { face1, face2 }
    }

    /// Executes the match.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::NotFound`] if the faces or a boundary
    /// edge are not associated, [`AssociationError::MeshMismatch`] if the
    /// meshes differ in size or structure, and
    /// [`AssociationError::NodeConflict`] if a node would be matched twice.
    /// Errors are wrapped in the face pair.
    #[instrument(skip_all, fields(face1 = ?self.face1, face2 = ?self.face2))]
    pub fn execute<G: ShapeGraph>(
        &self,
        graph1: &G,
        mesh1: &FaceMesh,
        graph2: &G,
        mesh2: &FaceMesh,
        map: &AssociationMap,
    ) -> Result<NodeMap> {
        self.run(graph1, mesh1, graph2, mesh2, map)
            .map_err(|err| err.within(Shape::Face(self.face1), Shape::Face(self.face2)))
    }

    fn run<G: ShapeGraph>(
        &self,
        graph1: &G,
        mesh1: &FaceMesh,
        graph2: &G,
        mesh2: &FaceMesh,
        map: &AssociationMap,
    ) -> Result<NodeMap> {
        if map.get(Shape::Face(self.face1)) != Some(Shape::Face(self.face2)) {
            return Err(AssociationError::NotFound {
                reason: "face-association",
                shape: Shape::Face(self.face1),
            });
        }
        if mesh1.node_count() == 0 || mesh1.element_count() == 0 {
            return Err(AssociationError::MeshMismatch { reason: "empty-mesh" });
        }
        if mesh1.node_count() != mesh2.node_count() {
            return Err(AssociationError::MeshMismatch { reason: "node-count" });
        }
        if mesh1.element_count() != mesh2.element_count() {
            return Err(AssociationError::MeshMismatch { reason: "element-count" });
        }
        if graph1.has_seam(self.face1)? != graph2.has_seam(self.face2)? {
            return Err(AssociationError::MeshMismatch { reason: "seam" });
        }

        let anchor = self.anchor_edge(graph1, mesh1, graph2, map)?;
        let (v1, far1) = graph1.edge_vertices(anchor.edge1)?;
        let v2 = map
            .get(Shape::Vertex(v1))
            .and_then(Shape::as_vertex)
            .ok_or(AssociationError::NotFound {
                reason: "vertex-association",
                shape: Shape::Vertex(v1),
            })?;
        let (start2, end2) = graph2.edge_vertices(anchor.edge2)?;
        let same_direction = v2 == start2;
        if !same_direction && v2 != end2 {
            return Err(AssociationError::NotFound {
                reason: "vertex-not-on-edge",
                shape: Shape::Vertex(v2),
            });
        }
        let far2 = if same_direction { end2 } else { start2 };

        let vertex1 = vertex_node(mesh1, v1)?;
        let vertex2 = vertex_node(mesh2, v2)?;
        let along1 = mesh1.edge_nodes(anchor.edge1);
        let mut along2 = mesh2.edge_nodes(anchor.edge2);
        if along1.len() != along2.len() {
            return Err(AssociationError::MeshMismatch { reason: "edge-node-count" });
        }
        if !same_direction {
            along2.reverse();
        }
        let (next1, next2) = match (along1.first(), along2.first()) {
            (Some(&a), Some(&b)) => (a, b),
            _ => {
                debug!(edge = ?anchor.edge1, "single-segment edge, anchoring on its far vertex");
                (vertex_node(mesh1, far1)?, vertex_node(mesh2, far2)?)
            }
        };

        let elements1: BTreeSet<ElementId> = mesh1.elements().map(|(id, _)| id).collect();
        let elements2: BTreeSet<ElementId> = mesh2.elements().map(|(id, _)| id).collect();
        let start = if anchor.seam {
            debug!(edge = ?anchor.edge1, "anchoring on the seam");
            Some((
                seam_side(mesh1, (vertex1, next1), anchor.edge1)?,
                seam_side(mesh2, (vertex2, next2), anchor.edge2)?,
            ))
        } else {
            None
        };

        let mut pairs = NodePairs::default();
        match_elements(
            &mut pairs,
            mesh1,
            &elements1,
            mesh2,
            &elements2,
            (vertex1, vertex2),
            (next1, next2),
            start,
        )?;

        if anchor.seam {
            for (&a, &b) in along1.iter().zip(&along2) {
                pairs.bind(a, b)?;
            }
            if let (Some(a), Some(b)) = (mesh1.vertex_node(far1), mesh2.vertex_node(far2)) {
                pairs.bind(a, b)?;
            }
        }

        let nodes = pairs.into_map();
        debug!(matched = nodes.len(), total = mesh1.node_count(), "nodes matched");
        Ok(nodes)
    }

    /// Picks the boundary edge to anchor on: a regular edge if there is one,
    /// else a seam. Degenerate edges, closed and without edge nodes, are
    /// never chosen.
    fn anchor_edge<G: ShapeGraph>(
        &self,
        graph1: &G,
        mesh1: &FaceMesh,
        graph2: &G,
        map: &AssociationMap,
    ) -> Result<Anchor> {
        let edges2: BTreeSet<Shape> = graph2
            .sub_shapes(Shape::Face(self.face2), ShapeType::Edge)?
            .into_iter()
            .collect();
        let mut seam = None;
        let mut seen = BTreeSet::new();
        for oe in graph1.outer_edges(self.face1)? {
            let edge1 = oe.edge;
            if !seen.insert(edge1) {
                continue;
            }
            let Some(Shape::Edge(edge2)) = map
                .get(Shape::Edge(edge1))
                .filter(|image| edges2.contains(image))
            else {
                return Err(AssociationError::NotFound {
                    reason: "edge-association",
                    shape: Shape::Edge(edge1),
                });
            };
            let along = mesh1.edge_nodes(edge1);
            if graph1.is_closed_edge(edge1)? && along.is_empty() {
                continue;
            }
            if !along.iter().all(|&node| mesh1.is_used(node)) {
                continue;
            }
            if graph1.is_seam(self.face1, edge1)? {
                seam.get_or_insert(Anchor {
                    edge1,
                    edge2,
                    seam: true,
                });
            } else {
                return Ok(Anchor {
                    edge1,
                    edge2,
                    seam: false,
                });
            }
        }
        seam.ok_or(AssociationError::NotFound {
            reason: "anchor-edge",
            shape: Shape::Face(self.face1),
        })
    }
}

fn vertex_node(mesh: &FaceMesh, vertex: VertexId) -> Result<NodeId> {
    mesh.vertex_node(vertex).ok_or(AssociationError::NotFound {
        reason: "vertex-node",
        shape: Shape::Vertex(vertex),
    })
}

/// Of the two elements sharing a seam link, the one whose first node off
/// the seam has the smaller `u + v`.
fn seam_side(mesh: &FaceMesh, link: (NodeId, NodeId), seam: EdgeId) -> Result<ElementId> {
    let mut best: Option<(f64, ElementId)> = None;
    for element in mesh.elements_with_link(link.0, link.1) {
        let nodes = mesh.element(element)?;
        if link_index(nodes, link.0, link.1).is_none() {
            continue;
        }
        let mut off_seam = None;
        for &node in nodes {
            let data = mesh.node(node)?;
            let on_seam = match data.position {
                NodePosition::Edge { edge, .. } => edge == seam,
                NodePosition::Vertex(_) => true,
                NodePosition::Face => false,
            };
            if !on_seam {
                off_seam = Some(data.uv.x + data.uv.y);
                break;
            }
        }
        let Some(key) = off_seam else { continue };
        if best.is_none_or(|(k, _)| key < k) {
            best = Some((key, element));
        }
    }
    best.map(|(_, element)| element)
        .ok_or(AssociationError::MeshMismatch { reason: "seam-elements" })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::association::Associate;
    use crate::creation::{MakeFace, MakeWire};
    use crate::error::FailureKind;
    use crate::math::{Point2, Point3};
    use crate::mesh::MeshNode;
    use crate::topology::TopologyStore;

    fn square(store: &mut TopologyStore, x: f64) -> FaceId {
        let wire = MakeWire::new(
            vec![
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 1.0, 0.0, 0.0),
                Point3::new(x + 1.0, 1.0, 0.0),
                Point3::new(x, 1.0, 0.0),
            ],
            true,
        )
        .execute(store)
        .unwrap();
        MakeFace::new(wire, vec![]).execute(store).unwrap()
    }

    /// A structured `n` x `n` quad mesh of a square face, with nodes placed
    /// on the face's vertices and edges.
    fn grid_mesh(store: &TopologyStore, face: FaceId, n: usize) -> FaceMesh {
        let outer = store.outer_edges(face).unwrap();
        let corners: Vec<VertexId> =
            outer.iter().map(|oe| store.first_vertex(*oe).unwrap()).collect();
        let edges: Vec<EdgeId> = outer.iter().map(|oe| oe.edge).collect();
        let mut mesh = FaceMesh::new();
        let mut ids = vec![vec![NodeId::default(); n + 1]; n + 1];
        #[allow(clippy::cast_precision_loss)]
        let t = |k: usize| k as f64 / n as f64;
        for j in 0..=n {
            for i in 0..=n {
                let uv = Point2::new(t(i), t(j));
                let node = match (i, j) {
                    (0, 0) => MeshNode::on_vertex(corners[0], uv),
                    (i, 0) if i == n => MeshNode::on_vertex(corners[1], uv),
                    (i, j) if i == n && j == n => MeshNode::on_vertex(corners[2], uv),
                    (0, j) if j == n => MeshNode::on_vertex(corners[3], uv),
                    (i, 0) => MeshNode::on_edge(edges[0], t(i), uv),
                    (i, j) if i == n => MeshNode::on_edge(edges[1], t(j), uv),
                    (i, j) if j == n => MeshNode::on_edge(edges[2], 1.0 - t(i), uv),
                    (0, j) => MeshNode::on_edge(edges[3], 1.0 - t(j), uv),
                    _ => MeshNode::inside(uv),
                };
                ids[j][i] = mesh.add_node(node);
            }
        }
        for j in 0..n {
            for i in 0..n {
                mesh.add_element(vec![ids[j][i], ids[j][i + 1], ids[j + 1][i + 1], ids[j + 1][i]])
                    .unwrap();
            }
        }
        mesh
    }

    fn associated_squares() -> (TopologyStore, FaceId, FaceId, AssociationMap) {
        let mut store = TopologyStore::new();
        let a = square(&mut store, 0.0);
        let b = square(&mut store, 5.0);
        let mut map = AssociationMap::new();
        Associate::new(Shape::Face(a), Shape::Face(b))
            .execute(&store, &store, &mut map)
            .unwrap();
        (store, a, b, map)
    }

    #[test]
    fn structured_meshes_match_by_parameters() {
        let (store, a, b, map) = associated_squares();
        let mesh1 = grid_mesh(&store, a, 3);
        let mesh2 = grid_mesh(&store, b, 3);
        let nodes = MatchNodes::new(a, b)
            .execute(&store, &mesh1, &store, &mesh2, &map)
            .unwrap();
        assert_eq!(nodes.len(), mesh1.node_count());
        for (n1, n2) in &nodes {
            assert_eq!(mesh1.node(*n1).unwrap().uv, mesh2.node(*n2).unwrap().uv);
        }
    }

    #[test]
    fn single_segment_edges_anchor_on_far_vertex() {
        let (store, a, b, map) = associated_squares();
        let mesh1 = grid_mesh(&store, a, 1);
        let mesh2 = grid_mesh(&store, b, 1);
        let nodes = MatchNodes::new(a, b)
            .execute(&store, &mesh1, &store, &mesh2, &map)
            .unwrap();
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn unassociated_faces_are_rejected() {
        let mut store = TopologyStore::new();
        let a = square(&mut store, 0.0);
        let b = square(&mut store, 5.0);
        let mesh1 = grid_mesh(&store, a, 2);
        let mesh2 = grid_mesh(&store, b, 2);
        let err = MatchNodes::new(a, b)
            .execute(&store, &mesh1, &store, &mesh2, &AssociationMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(err.reason(), Some("face-association"));
    }

    #[test]
    fn differing_mesh_sizes_are_rejected() {
        let (store, a, b, map) = associated_squares();
        let mesh1 = grid_mesh(&store, a, 2);
        let mesh2 = grid_mesh(&store, b, 3);
        let err = MatchNodes::new(a, b)
            .execute(&store, &mesh1, &store, &mesh2, &map)
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::StructuralMismatch);
        assert_eq!(err.reason(), Some("node-count"));
    }
}
