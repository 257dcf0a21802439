//! Per-face meshes and node matching between associated faces.

mod matching;
mod node_match;

pub use matching::{find_matching_nodes, NodeMap};
pub use node_match::MatchNodes;

use slotmap::{SecondaryMap, SlotMap};

use crate::error::TopologyError;
use crate::math::Point2;
use crate::topology::{EdgeId, VertexId};

slotmap::new_key_type! {
    /// Unique identifier for a node of a [`FaceMesh`].
    pub struct NodeId;
    /// Unique identifier for an element of a [`FaceMesh`].
    pub struct ElementId;
}

/// Where a mesh node lies on the face's topology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodePosition {
    /// On a vertex.
    Vertex(VertexId),
    /// Inside an edge, at parameter `u` along it.
    Edge { edge: EdgeId, u: f64 },
    /// Inside the face.
    Face,
}

/// A mesh node with its surface parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshNode {
    pub position: NodePosition,
    pub uv: Point2,
}

impl MeshNode {
    #[must_use]
    pub fn on_vertex(vertex: VertexId, uv: Point2) -> Self {
        Self {
            position: NodePosition::Vertex(vertex),
            uv,
        }
    }

    #[must_use]
    pub fn on_edge(edge: EdgeId, u: f64, uv: Point2) -> Self {
        Self {
            position: NodePosition::Edge { edge, u },
            uv,
        }
    }

    #[must_use]
    pub fn inside(uv: Point2) -> Self {
        Self {
            position: NodePosition::Face,
            uv,
        }
    }
}

/// The mesh of one face: nodes and polygonal elements given as node cycles.
///
/// Consecutive nodes of an element, including the last and the first,
/// form its links.
#[derive(Debug, Clone, Default)]
pub struct FaceMesh {
    nodes: SlotMap<NodeId, MeshNode>,
    elements: SlotMap<ElementId, Vec<NodeId>>,
    node_elements: SecondaryMap<NodeId, Vec<ElementId>>,
}

impl FaceMesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: MeshNode) -> NodeId {
        let id = self.nodes.insert(node);
        self.node_elements.insert(id, Vec::new());
        id
    }

    /// Inserts an element and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a node is missing, repeated, or if the element
    /// has fewer than three nodes.
    pub fn add_element(&mut self, nodes: Vec<NodeId>) -> Result<ElementId, TopologyError> {
        if nodes.len() < 3 {
            return Err(TopologyError::InvalidTopology(format!(
                "element needs at least 3 nodes, got {}",
                nodes.len()
            )));
        }
        for (i, &node) in nodes.iter().enumerate() {
            self.node(node)?;
            if nodes[..i].contains(&node) {
                return Err(TopologyError::InvalidTopology(
                    "element repeats a node".into(),
                ));
            }
        }
        let id = self.elements.insert(nodes.clone());
        for node in nodes {
            if let Some(elements) = self.node_elements.get_mut(node) {
                elements.push(id);
            }
        }
        Ok(id)
    }

    /// Returns the node, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not in the mesh.
    pub fn node(&self, id: NodeId) -> Result<&MeshNode, TopologyError> {
        self.nodes
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("mesh node".into()))
    }

    /// Returns the node cycle of an element, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not in the mesh.
    pub fn element(&self, id: ElementId) -> Result<&[NodeId], TopologyError> {
        self.elements
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| TopologyError::EntityNotFound("mesh element".into()))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &MeshNode)> {
        self.nodes.iter()
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &[NodeId])> {
        self.elements.iter().map(|(id, nodes)| (id, nodes.as_slice()))
    }

    /// Elements using `node`.
    #[must_use]
    pub fn elements_of(&self, node: NodeId) -> &[ElementId] {
        self.node_elements
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_used(&self, node: NodeId) -> bool {
        !self.elements_of(node).is_empty()
    }

    /// The node placed on `vertex`, if any.
    #[must_use]
    pub fn vertex_node(&self, vertex: VertexId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.position == NodePosition::Vertex(vertex))
            .map(|(id, _)| id)
    }

    /// Nodes inside `edge`, sorted by their parameter along it.
    #[must_use]
    pub fn edge_nodes(&self, edge: EdgeId) -> Vec<NodeId> {
        let mut on_edge: Vec<(f64, NodeId)> = self
            .nodes
            .iter()
            .filter_map(|(id, node)| match node.position {
                NodePosition::Edge { edge: e, u } if e == edge => Some((u, id)),
                _ => None,
            })
            .collect();
        on_edge.sort_by(|a, b| a.0.total_cmp(&b.0));
        on_edge.into_iter().map(|(_, id)| id).collect()
    }

    /// Elements in which `a` and `b` are consecutive.
    #[must_use]
    pub fn elements_with_link(&self, a: NodeId, b: NodeId) -> Vec<ElementId> {
        self.elements_of(a)
            .iter()
            .copied()
            .filter(|&element| {
                self.elements
                    .get(element)
                    .is_some_and(|nodes| link_index(nodes, a, b).is_some())
            })
            .collect()
    }
}

/// Position of `a` in the cycle `nodes`, and whether `b` follows it
/// (`true`) or precedes it (`false`). `None` unless the two are consecutive.
pub(crate) fn link_index(nodes: &[NodeId], a: NodeId, b: NodeId) -> Option<(usize, bool)> {
    let n = nodes.len();
    let i = nodes.iter().position(|&node| node == a)?;
    if nodes[(i + 1) % n] == b {
        Some((i, true))
    } else if nodes[(i + n - 1) % n] == b {
        Some((i, false))
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn uv(u: f64, v: f64) -> Point2 {
        Point2::new(u, v)
    }

    fn two_triangles() -> (FaceMesh, [NodeId; 4], [ElementId; 2]) {
        let mut mesh = FaceMesh::new();
        let n = [
            mesh.add_node(MeshNode::inside(uv(0.0, 0.0))),
            mesh.add_node(MeshNode::inside(uv(1.0, 0.0))),
            mesh.add_node(MeshNode::inside(uv(1.0, 1.0))),
            mesh.add_node(MeshNode::inside(uv(0.0, 1.0))),
        ];
        let lower = mesh.add_element(vec![n[0], n[1], n[2]]).unwrap();
        let upper = mesh.add_element(vec![n[0], n[2], n[3]]).unwrap();
        (mesh, n, [lower, upper])
    }

    #[test]
    fn shared_link_has_two_elements() {
        let (mesh, n, e) = two_triangles();
        assert_eq!(mesh.elements_with_link(n[0], n[2]), vec![e[0], e[1]]);
        assert_eq!(mesh.elements_with_link(n[2], n[0]).len(), 2);
        assert_eq!(mesh.elements_with_link(n[1], n[2]), vec![e[0]]);
        assert!(mesh.elements_with_link(n[1], n[3]).is_empty());
    }

    #[test]
    fn link_index_reports_direction() {
        let (mesh, n, e) = two_triangles();
        let nodes = mesh.element(e[0]).unwrap();
        assert_eq!(link_index(nodes, n[0], n[1]), Some((0, true)));
        assert_eq!(link_index(nodes, n[0], n[2]), Some((0, false)));
        assert_eq!(link_index(nodes, n[0], n[3]), None);
    }

    #[test]
    fn edge_nodes_sorted_by_parameter() {
        let mut mesh = FaceMesh::new();
        let edge = EdgeId::default();
        let late = mesh.add_node(MeshNode::on_edge(edge, 0.75, uv(0.75, 0.0)));
        let early = mesh.add_node(MeshNode::on_edge(edge, 0.25, uv(0.25, 0.0)));
        mesh.add_node(MeshNode::inside(uv(0.5, 0.5)));
        assert_eq!(mesh.edge_nodes(edge), vec![early, late]);
    }

    #[test]
    fn unused_nodes_are_detected() {
        let (mut mesh, n, _) = two_triangles();
        let loose = mesh.add_node(MeshNode::inside(uv(2.0, 2.0)));
        assert!(mesh.is_used(n[1]));
        assert!(!mesh.is_used(loose));
        assert_eq!(mesh.node_count(), 5);
        assert_eq!(mesh.element_count(), 2);
    }

    #[test]
    fn invalid_elements_rejected() {
        let (mut mesh, n, _) = two_triangles();
        assert!(mesh.add_element(vec![n[0], n[1]]).is_err());
        assert!(mesh.add_element(vec![n[0], n[1], n[0]]).is_err());
        assert!(mesh.add_element(vec![n[0], n[1], NodeId::default()]).is_err());
    }
}
