//! Read-only adjacency view over a B-Rep shape.
//!
//! [`ShapeGraph`] is the seam between the association engine and the kernel
//! that owns the shapes. [`TopologyStore`] implements it directly.

use std::collections::{BTreeSet, VecDeque};

use crate::error::TopologyError;
use crate::math::Point3;
use crate::topology::{
    EdgeId, FaceId, GroupId, OrientedEdge, Shape, ShapeType, TopologyStore, VertexId, WireId,
};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Returns the smallest box enclosing all points, or `None` for no points.
    pub fn from_points<I: IntoIterator<Item = Point3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in points {
            aabb.min = aabb.min.inf(&p);
            aabb.max = aabb.max.sup(&p);
        }
        Some(aabb)
    }

    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Squared length of the box diagonal.
    #[must_use]
    pub fn square_extent(&self) -> f64 {
        (self.max - self.min).norm_squared()
    }
}

/// Topological queries the association engine needs from the kernel.
///
/// Enumerations are deterministic: the same graph always reports
/// sub-shapes and ancestors in the same order.
pub trait ShapeGraph {
    /// Unique sub-shapes of `ty` in depth-first exploration order.
    ///
    /// The shape itself is included when it has type `ty`. Group members
    /// are explored as children of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    fn sub_shapes(&self, shape: Shape, ty: ShapeType) -> Result<Vec<Shape>, TopologyError>;

    /// Unique ancestors of `ty` anywhere in the graph, nearest first.
    /// Groups are never reported as ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    fn ancestors(&self, shape: Shape, ty: ShapeType) -> Result<Vec<Shape>, TopologyError>;

    /// Natural `(start, end)` vertices of an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn edge_vertices(&self, edge: EdgeId) -> Result<(VertexId, VertexId), TopologyError>;

    /// Boundary wires of a face, outer wire first.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing.
    fn face_wires(&self, face: FaceId) -> Result<Vec<WireId>, TopologyError>;

    /// Oriented edges of a wire in traversal order.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire is missing.
    fn wire_edges(&self, wire: WireId) -> Result<Vec<OrientedEdge>, TopologyError>;

    /// Position of a vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is missing.
    fn vertex_point(&self, vertex: VertexId) -> Result<Point3, TopologyError>;

    /// Members of a group, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is missing.
    fn group_members(&self, group: GroupId) -> Result<Vec<Shape>, TopologyError>;

    /// Groups listing `shape` as a member.
    ///
    /// # Errors
    ///
    /// Returns an error if `shape` is missing.
    fn groups_containing(&self, shape: Shape) -> Result<Vec<GroupId>, TopologyError>;

    // ── Derived queries ─────────────────────────────────────

    /// Number of unique sub-shapes of `ty`.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    fn count(&self, shape: Shape, ty: ShapeType) -> Result<usize, TopologyError> {
        Ok(self.sub_shapes(shape, ty)?.len())
    }

    /// Bounding box of the vertices of `shapes`, `None` if they have none.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    fn bounding_box(&self, shapes: &[Shape]) -> Result<Option<Aabb>, TopologyError> {
        let mut points = Vec::new();
        for &shape in shapes {
            for vertex in self.sub_shapes(shape, ShapeType::Vertex)? {
                if let Shape::Vertex(vertex) = vertex {
                    points.push(self.vertex_point(vertex)?);
                }
            }
        }
        Ok(Aabb::from_points(points))
    }

    /// Returns `true` if both ends of the edge are the same vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn is_closed_edge(&self, edge: EdgeId) -> Result<bool, TopologyError> {
        let (start, end) = self.edge_vertices(edge)?;
        Ok(start == end)
    }

    /// The vertex at the other end of `edge`, `None` for a closed edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn next_vertex(&self, edge: EdgeId, vertex: VertexId) -> Result<Option<VertexId>, TopologyError> {
        let (start, end) = self.edge_vertices(edge)?;
        if start == end {
            return Ok(None);
        }
        Ok(Some(if vertex == start { end } else { start }))
    }

    /// First vertex of an edge as traversed in a wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn first_vertex(&self, oe: OrientedEdge) -> Result<VertexId, TopologyError> {
        let (start, end) = self.edge_vertices(oe.edge)?;
        Ok(if oe.forward { start } else { end })
    }

    /// Last vertex of an edge as traversed in a wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn last_vertex(&self, oe: OrientedEdge) -> Result<VertexId, TopologyError> {
        self.first_vertex(oe.reversed())
    }

    /// Oriented edges of the outer wire of a face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or its outer wire is missing.
    fn outer_edges(&self, face: FaceId) -> Result<Vec<OrientedEdge>, TopologyError> {
        let wires = self.face_wires(face)?;
        let outer = wires
            .first()
            .ok_or_else(|| TopologyError::InvalidTopology("face without wires".into()))?;
        self.wire_edges(*outer)
    }

    /// Returns `true` if `edge` occurs more than once in the wires of `face`.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its wires is missing.
    fn is_seam(&self, face: FaceId, edge: EdgeId) -> Result<bool, TopologyError> {
        let mut occurrences = 0;
        for wire in self.face_wires(face)? {
            occurrences += self
                .wire_edges(wire)?
                .iter()
                .filter(|oe| oe.edge == edge)
                .count();
        }
        Ok(occurrences > 1)
    }

    /// Returns `true` if `face` has a seam edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its wires is missing.
    fn has_seam(&self, face: FaceId) -> Result<bool, TopologyError> {
        for edge in self.sub_shapes(Shape::Face(face), ShapeType::Edge)? {
            if let Shape::Edge(edge) = edge {
                if self.is_seam(face, edge)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Returns `true` if exactly one of `faces` is bounded by `edge`.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn is_boundary_edge(&self, edge: EdgeId, faces: &BTreeSet<FaceId>) -> Result<bool, TopologyError> {
        let near = self
            .ancestors(Shape::Edge(edge), ShapeType::Face)?
            .into_iter()
            .filter_map(Shape::as_face)
            .filter(|f| faces.contains(f))
            .count();
        Ok(near == 1)
    }

    /// Edges joining `a` and `b`, in either direction.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    fn edges_by_vertices(&self, a: VertexId, b: VertexId) -> Result<Vec<EdgeId>, TopologyError> {
        let mut edges = Vec::new();
        for candidate in self.ancestors(Shape::Vertex(a), ShapeType::Edge)? {
            if let Shape::Edge(edge) = candidate {
                let (start, end) = self.edge_vertices(edge)?;
                if (start == a && end == b) || (start == b && end == a) {
                    edges.push(edge);
                }
            }
        }
        Ok(edges)
    }

    /// A face bounded by `edge` other than `face`.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing.
    fn next_face(&self, edge: EdgeId, face: Option<FaceId>) -> Result<Option<FaceId>, TopologyError> {
        Ok(self
            .ancestors(Shape::Edge(edge), ShapeType::Face)?
            .into_iter()
            .filter_map(Shape::as_face)
            .find(|&f| Some(f) != face))
    }
}

impl TopologyStore {
    /// Direct children of a shape in exploration order.
    fn children(&self, shape: Shape) -> Result<Vec<Shape>, TopologyError> {
        Ok(match shape {
            Shape::Vertex(_) => Vec::new(),
            Shape::Edge(id) => {
                let edge = self.edge(id)?;
                vec![Shape::Vertex(edge.start), Shape::Vertex(edge.end)]
            }
            Shape::Wire(id) => self
                .wire(id)?
                .edges
                .iter()
                .map(|oe| Shape::Edge(oe.edge))
                .collect(),
            Shape::Face(id) => self.face(id)?.wires().map(Shape::Wire).collect(),
            Shape::Shell(id) => self.shell(id)?.faces.iter().copied().map(Shape::Face).collect(),
            Shape::Solid(id) => self.solid(id)?.shells().map(Shape::Shell).collect(),
            Shape::Group(id) => self.group(id)?.members.clone(),
        })
    }

    /// Direct parents of a shape, groups excluded.
    fn parents(&self, shape: Shape) -> Vec<Shape> {
        match shape {
            Shape::Vertex(id) => self.edges_of_vertex(id).iter().copied().map(Shape::Edge).collect(),
            Shape::Edge(id) => self.wires_of_edge(id).iter().copied().map(Shape::Wire).collect(),
            Shape::Wire(id) => self.faces_of_wire(id).iter().copied().map(Shape::Face).collect(),
            Shape::Face(id) => self.shells_of_face(id).iter().copied().map(Shape::Shell).collect(),
            Shape::Shell(id) => self.solids_of_shell(id).iter().copied().map(Shape::Solid).collect(),
            Shape::Solid(_) | Shape::Group(_) => Vec::new(),
        }
    }

    fn explore(
        &self,
        shape: Shape,
        ty: ShapeType,
        seen: &mut BTreeSet<Shape>,
        out: &mut Vec<Shape>,
    ) -> Result<(), TopologyError> {
        if shape.shape_type() == ty {
            if seen.insert(shape) {
                out.push(shape);
            }
            return Ok(());
        }
        for child in self.children(shape)? {
            self.explore(child, ty, seen, out)?;
        }
        Ok(())
    }
}

impl ShapeGraph for TopologyStore {
    fn sub_shapes(&self, shape: Shape, ty: ShapeType) -> Result<Vec<Shape>, TopologyError> {
        self.check(shape)?;
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        self.explore(shape, ty, &mut seen, &mut out)?;
        Ok(out)
    }

    fn ancestors(&self, shape: Shape, ty: ShapeType) -> Result<Vec<Shape>, TopologyError> {
        self.check(shape)?;
        let mut seen = BTreeSet::from([shape]);
        let mut out = Vec::new();
        let mut queue = VecDeque::from([shape]);
        while let Some(current) = queue.pop_front() {
            for parent in self.parents(current) {
                if parent.shape_type() > ty || !seen.insert(parent) {
                    continue;
                }
                if parent.shape_type() == ty {
                    out.push(parent);
                } else {
                    queue.push_back(parent);
                }
            }
        }
        Ok(out)
    }

    fn edge_vertices(&self, edge: EdgeId) -> Result<(VertexId, VertexId), TopologyError> {
        let data = self.edge(edge)?;
        Ok((data.start, data.end))
    }

    fn face_wires(&self, face: FaceId) -> Result<Vec<WireId>, TopologyError> {
        Ok(self.face(face)?.wires().collect())
    }

    fn wire_edges(&self, wire: WireId) -> Result<Vec<OrientedEdge>, TopologyError> {
        Ok(self.wire(wire)?.edges.clone())
    }

    fn vertex_point(&self, vertex: VertexId) -> Result<Point3, TopologyError> {
        Ok(self.vertex(vertex)?.point)
    }

    fn group_members(&self, group: GroupId) -> Result<Vec<Shape>, TopologyError> {
        Ok(self.group(group)?.members.clone())
    }

    fn groups_containing(&self, shape: Shape) -> Result<Vec<GroupId>, TopologyError> {
        self.check(shape)?;
        Ok(self.groups_of(shape).to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::creation::{MakeFace, MakeGroup, MakeWire};
    use crate::topology::{EdgeData, VertexData, WireData};
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn square(store: &mut TopologyStore, z: f64) -> FaceId {
        let wire = MakeWire::new(
            vec![p(0.0, 0.0, z), p(1.0, 0.0, z), p(1.0, 1.0, z), p(0.0, 1.0, z)],
            true,
        )
        .execute(store)
        .unwrap();
        MakeFace::new(wire, vec![]).execute(store).unwrap()
    }

    fn two_squares_sharing_an_edge(store: &mut TopologyStore) -> (FaceId, FaceId, EdgeId) {
        let a = square(store, 0.0);
        let shared = store.outer_edges(a).unwrap()[1].edge;
        let (s, e) = store.edge_vertices(shared).unwrap();
        let d = store.add_vertex(VertexData::new(p(2.0, 0.0, 0.0)));
        let c = store.add_vertex(VertexData::new(p(2.0, 1.0, 0.0)));
        let mut edges = vec![OrientedEdge::new(shared, false)];
        for (from, to) in [(s, d), (d, c), (c, e)] {
            let edge = store.add_edge(EdgeData::new(from, to)).unwrap();
            edges.push(OrientedEdge::new(edge, true));
        }
        let wire = store
            .add_wire(WireData {
                edges,
                is_closed: true,
            })
            .unwrap();
        let b = MakeFace::new(wire, vec![]).execute(store).unwrap();
        (a, b, shared)
    }

    // ── Exploration ────────────────────────────────────────────

    #[test]
    fn sub_shapes_are_unique_and_include_self() {
        let mut store = TopologyStore::new();
        let face = square(&mut store, 0.0);
        assert_eq!(store.count(Shape::Face(face), ShapeType::Vertex).unwrap(), 4);
        assert_eq!(store.count(Shape::Face(face), ShapeType::Edge).unwrap(), 4);
        assert_eq!(
            store.sub_shapes(Shape::Face(face), ShapeType::Face).unwrap(),
            vec![Shape::Face(face)]
        );
    }

    #[test]
    fn vertices_follow_wire_order() {
        let mut store = TopologyStore::new();
        let face = square(&mut store, 0.0);
        let vertices = store.sub_shapes(Shape::Face(face), ShapeType::Vertex).unwrap();
        let first = store.outer_edges(face).unwrap()[0];
        assert_eq!(vertices[0], Shape::Vertex(store.first_vertex(first).unwrap()));
    }

    #[test]
    fn group_members_are_explored() {
        let mut store = TopologyStore::new();
        let a = square(&mut store, 0.0);
        let b = square(&mut store, 1.0);
        let group = MakeGroup::new(vec![Shape::Face(a), Shape::Face(b)])
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.count(Shape::Group(group), ShapeType::Edge).unwrap(), 8);
        assert_eq!(store.groups_containing(Shape::Face(a)).unwrap(), vec![group]);
    }

    // ── Ancestry ───────────────────────────────────────────────

    #[test]
    fn shared_edge_has_two_faces() {
        let mut store = TopologyStore::new();
        let (a, b, shared) = two_squares_sharing_an_edge(&mut store);
        let faces = store.ancestors(Shape::Edge(shared), ShapeType::Face).unwrap();
        assert_eq!(faces, vec![Shape::Face(a), Shape::Face(b)]);
        assert_eq!(store.next_face(shared, Some(a)).unwrap(), Some(b));
        assert_eq!(store.next_face(shared, Some(b)).unwrap(), Some(a));

        let both = BTreeSet::from([a, b]);
        assert!(!store.is_boundary_edge(shared, &both).unwrap());
        assert!(store.is_boundary_edge(shared, &BTreeSet::from([a])).unwrap());
    }

    #[test]
    fn edges_by_vertices_ignore_direction() {
        let mut store = TopologyStore::new();
        let face = square(&mut store, 0.0);
        let oe = store.outer_edges(face).unwrap()[2];
        let (s, e) = store.edge_vertices(oe.edge).unwrap();
        assert_eq!(store.edges_by_vertices(e, s).unwrap(), vec![oe.edge]);
        assert_eq!(store.next_vertex(oe.edge, s).unwrap(), Some(e));
    }

    #[test]
    fn closed_edge_has_no_next_vertex() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(1.0, 0.0, 0.0)], true)
            .execute(&mut store)
            .unwrap();
        let edge = store.wire_edges(wire).unwrap()[0].edge;
        let (v, _) = store.edge_vertices(edge).unwrap();
        assert!(store.is_closed_edge(edge).unwrap());
        assert_eq!(store.next_vertex(edge, v).unwrap(), None);
    }

    // ── Bounding boxes ─────────────────────────────────────────

    #[test]
    fn bounding_box_spans_vertices() {
        let mut store = TopologyStore::new();
        let face = square(&mut store, 2.0);
        let aabb = store.bounding_box(&[Shape::Face(face)]).unwrap().unwrap();
        assert_relative_eq!(aabb.center(), p(0.5, 0.5, 2.0));
        assert_relative_eq!(aabb.square_extent(), 2.0);
    }
}
