use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::wire_order::ordered_edges;
use super::{AssociationMap, Context, Operand};
use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::topology::{EdgeId, FaceId, Shape, ShapeType, VertexId};

/// Unbound edges incident to each vertex.
type Incidence = BTreeMap<VertexId, Vec<EdgeId>>;

impl<G: ShapeGraph> Context<'_, G> {
    /// Associates two groups of same-typed members when some vertex of the
    /// first is already bound.
    ///
    /// Face members are walked as a shell. Edge members are walked through
    /// the faces they bound, if any, and otherwise along the edge graph.
    /// Members left unbound are associated as a smaller group.
    pub(super) fn associate_group_seeded(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let members1 = op1.members(self.graph1)?;
        let members2 = op2.members(self.graph2)?;
        if members1.len() != members2.len() {
            return Err(AssociationError::StructuralMismatch {
                reason: "group-member-count",
                first: op1.anchor(),
                second: op2.anchor(),
            });
        }
        match (members1.as_slice(), members2.as_slice()) {
            ([], []) => return self.bind_operands(map, op1, op2, bidirectional),
            ([m1], [m2]) => {
                self.associate(&Operand::Shape(*m1), &Operand::Shape(*m2), map)?;
                return self.bind_operands(map, op1, op2, bidirectional);
            }
            _ => {}
        }

        let ty1 = member_type(&members1, op1)?;
        let ty2 = member_type(&members2, op2)?;
        if ty1 != ty2 {
            return Err(AssociationError::TypeMismatch {
                first: ty1,
                second: ty2,
            });
        }

        let (faces1, faces2) = match ty1 {
            ShapeType::Face => (op1.faces(self.graph1)?, op2.faces(self.graph2)?),
            ShapeType::Edge => {
                if self.has_bound_edge(op1, map)? {
                    (
                        bounded_faces(self.graph1, &op1.edges(self.graph1)?)?,
                        bounded_faces(self.graph2, &op2.edges(self.graph2)?)?,
                    )
                } else {
                    (Vec::new(), Vec::new())
                }
            }
            ShapeType::Wire => (Vec::new(), Vec::new()),
            _ => {
                return Err(AssociationError::StructuralMismatch {
                    reason: "unsupported-member-type",
                    first: op1.anchor(),
                    second: op2.anchor(),
                })
            }
        };
        if faces1.len() != faces2.len() {
            return Err(AssociationError::StructuralMismatch {
                reason: "group-face-count",
                first: op1.anchor(),
                second: op2.anchor(),
            });
        }

        if faces1.is_empty() {
            self.walk_edges(op1, op2, map, bidirectional)?;
            return self.bind_operands(map, op1, op2, bidirectional);
        }

        debug!(faces = faces1.len(), "group walked through its faces");
        match (faces1.as_slice(), faces2.as_slice()) {
            ([f1], [f2]) => {
                self.associate(&Operand::Shape(Shape::Face(*f1)), &Operand::Shape(Shape::Face(*f2)), map)?;
            }
            _ => self.associate(&Operand::Shell(faces1), &Operand::Shell(faces2), map)?,
        }

        let unbound1: Vec<Shape> = members1.iter().copied().filter(|m| !map.is_bound(*m)).collect();
        if !unbound1.is_empty() {
            if unbound1.len() == members1.len() {
                return Err(AssociationError::DisconnectedInput {
                    reason: "no-member-bound",
                    shape: op1.anchor(),
                });
            }
            let images: BTreeSet<Shape> = members1.iter().filter_map(|m| map.get(*m)).collect();
            let unbound2: Vec<Shape> = members2.into_iter().filter(|m| !images.contains(m)).collect();
            debug!(left = unbound1.len(), "associating remaining group members");
            self.associate(&Operand::Group(unbound1), &Operand::Group(unbound2), map)?;
        }
        self.bind_operands(map, op1, op2, bidirectional)
    }

    fn has_bound_edge(&self, op1: &Operand, map: &AssociationMap) -> Result<bool> {
        for edge in op1.edges(self.graph1)? {
            let (a, b) = self.graph1.edge_vertices(edge)?;
            if map.is_bound(Shape::Vertex(a)) && map.is_bound(Shape::Vertex(b)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Associates the edges of two operands by walking outward from bound
    /// vertices. At each vertex the unbound incident edges must agree in
    /// number; with two of them, a bound far end picks the pairing.
    pub(super) fn walk_edges(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let edges1 = op1.edges(self.graph1)?;
        let edges2 = op2.edges(self.graph2)?;
        if edges1.len() != edges2.len() {
            return Err(AssociationError::StructuralMismatch {
                reason: "edge-count",
                first: op1.anchor(),
                second: op2.anchor(),
            });
        }
        let mut incidence1 = incidence(self.graph1, &edges1)?;
        let mut incidence2 = incidence(self.graph2, &edges2)?;
        let mut current: Option<(VertexId, VertexId)> = None;
        loop {
            let (v1, v2) = match current {
                Some(pair) => pair,
                None => {
                    if incidence1.values().all(Vec::is_empty) {
                        return Ok(());
                    }
                    let mut start = None;
                    for (&v, edges) in &incidence1 {
                        if let (false, Some(img)) = (edges.is_empty(), image(map, v)) {
                            start = Some((v, img));
                            break;
                        }
                    }
                    start.ok_or(AssociationError::DisconnectedInput {
                        reason: "no-bound-vertex",
                        shape: op1.anchor(),
                    })?
                }
            };

            let free1 = incidence1.get(&v1).cloned().unwrap_or_default();
            let free2 = incidence2.get(&v2).cloned().unwrap_or_default();
            if free1.len() != free2.len() {
                return Err(AssociationError::StructuralMismatch {
                    reason: "vertex-degree",
                    first: Shape::Vertex(v1),
                    second: Shape::Vertex(v2),
                });
            }
            let (e1, e2) = match (free1.as_slice(), free2.as_slice()) {
                ([], []) => {
                    current = None;
                    continue;
                }
                ([e1], [e2]) => (*e1, *e2),
                ([a1, b1], [a2, b2]) => {
                    let mut pairing = None;
                    for e1 in [*a1, *b1] {
                        let Some(far) = image(map, far_end(self.graph1, e1, v1)?) else {
                            continue;
                        };
                        for e2 in [*a2, *b2] {
                            if far_end(self.graph2, e2, v2)? == far {
                                pairing = Some((e1, e2));
                                break;
                            }
                        }
                        if pairing.is_some() {
                            break;
                        }
                    }
                    pairing.ok_or(AssociationError::Ambiguous {
                        first: Shape::Vertex(v1),
                        second: Shape::Vertex(v2),
                    })?
                }
                _ => {
                    return Err(AssociationError::StructuralMismatch {
                        reason: "branching",
                        first: Shape::Vertex(v1),
                        second: Shape::Vertex(v2),
                    })
                }
            };

            let n1 = far_end(self.graph1, e1, v1)?;
            let n2 = far_end(self.graph2, e2, v2)?;
            self.bind(map, e1, e2, bidirectional)?;
            self.bind(map, n1, n2, bidirectional)?;
            detach(&mut incidence1, e1, [v1, n1]);
            detach(&mut incidence2, e2, [v2, n2]);
            current = Some((n1, n2));
        }
    }

    /// Associates two groups of one graph without known vertex pairs.
    ///
    /// Vertices are paired through the edges joining the groups directly,
    /// as between the caps of a single-layer prism. Returns `false` when no
    /// such edge anchors them.
    pub(super) fn associate_group_unseeded(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<bool> {
        if !self.propagation_enabled() {
            return Ok(false);
        }

        self.propagate_group_vertices(op1, op2, map, bidirectional)?;
        let members1 = op1.members(self.graph1)?;
        if members1.iter().all(|m| map.is_bound(*m)) {
            debug!("group associated across the prism wall");
            self.bind_operands(map, op1, op2, bidirectional)?;
            return Ok(true);
        }
        if self.has_initial(op1, map)? {
            self.associate_group_seeded(op1, op2, map, bidirectional)?;
            return Ok(true);
        }

        if let Some(pairs) = self.seed_across_prism(op1, op2)? {
            debug!("group anchored by a boundary edge");
            for (v1, v2) in pairs {
                self.bind(map, v1, v2, bidirectional)?;
            }
            self.associate_group_seeded(op1, op2, map, bidirectional)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Binds each vertex of `op1` to the vertex of `op2` at the other end
    /// of an edge joining them, and binds the group edges opposite each
    /// other in the quadrangles along those edges. Stops quietly at the
    /// first vertex or face that does not fit that pattern.
    fn propagate_group_vertices(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let graph = self.graph1;
        let vertices2: BTreeSet<VertexId> = op2.vertices(graph)?.into_iter().collect();
        let edges1: BTreeSet<EdgeId> = op1.edges(graph)?.into_iter().collect();
        let edges2: BTreeSet<EdgeId> = op2.edges(graph)?.into_iter().collect();
        let mut walls = BTreeSet::new();

        for v1 in op1.vertices(graph)? {
            if map.is_bound(Shape::Vertex(v1)) {
                continue;
            }
            let Some((rising, v2)) = self.rising_edge(v1, &edges1, &vertices2)? else {
                debug!(?v1, "no edge joins the groups");
                return Ok(());
            };
            self.bind(map, v1, v2, bidirectional)?;

            for face in graph.ancestors(Shape::Edge(rising), ShapeType::Face)? {
                let Shape::Face(face) = face else { continue };
                if !walls.insert(face) {
                    continue;
                }
                let wires = ordered_edges(graph, face, v1)?;
                let Some(outer) = wires.first().filter(|w| w.len() == 4) else {
                    debug!(?face, "wall face is not a quadrangle");
                    return Ok(());
                };
                let (low, high) = if outer.edges[0].edge == rising {
                    (outer.edges[3], outer.edges[1])
                } else {
                    (outer.edges[0], outer.edges[2])
                };
                if !edges1.contains(&low.edge) || !edges2.contains(&high.edge) {
                    debug!(?face, "wall face does not join group edges");
                    return Ok(());
                }
                self.bind(map, low.edge, high.edge, bidirectional)?;
            }
        }
        Ok(())
    }

    /// An edge outside the first group leading from `v1` to a vertex of
    /// the second group.
    fn rising_edge(
        &self,
        v1: VertexId,
        edges1: &BTreeSet<EdgeId>,
        vertices2: &BTreeSet<VertexId>,
    ) -> Result<Option<(EdgeId, VertexId)>> {
        for edge in self.graph1.ancestors(Shape::Vertex(v1), ShapeType::Edge)? {
            let Shape::Edge(edge) = edge else { continue };
            if edges1.contains(&edge) {
                continue;
            }
            if let Some(v2) = self.graph1.next_vertex(edge, v1)? {
                if vertices2.contains(&v2) {
                    return Ok(Some((edge, v2)));
                }
            }
        }
        Ok(None)
    }

    /// Two vertex pairs from the ends of a boundary edge of a face group,
    /// each joined to the second group by an edge outside the first.
    fn seed_across_prism(
        &self,
        op1: &Operand,
        op2: &Operand,
    ) -> Result<Option<[(VertexId, VertexId); 2]>> {
        let graph = self.graph1;
        let faces1: BTreeSet<FaceId> = op1.faces(graph)?.into_iter().collect();
        if faces1.is_empty() {
            return Ok(None);
        }
        let edges1 = op1.edges(graph)?;
        let mut boundary = None;
        for &edge in &edges1 {
            if graph.is_boundary_edge(edge, &faces1)? {
                boundary = Some(edge);
                break;
            }
        }
        let Some(boundary) = boundary else {
            return Ok(None);
        };
        let (a, b) = graph.edge_vertices(boundary)?;
        if a == b {
            return Ok(None);
        }

        let edge_set: BTreeSet<EdgeId> = edges1.into_iter().collect();
        let vertices2: BTreeSet<VertexId> = op2.vertices(graph)?.into_iter().collect();
        let (Some((_, a2)), Some((_, b2))) = (
            self.rising_edge(a, &edge_set, &vertices2)?,
            self.rising_edge(b, &edge_set, &vertices2)?,
        ) else {
            return Ok(None);
        };
        Ok(Some([(a, a2), (b, b2)]))
    }
}

/// The common type of the members, or a mismatch if they differ.
fn member_type(members: &[Shape], op: &Operand) -> Result<ShapeType> {
    let mut types = members.iter().map(|m| m.shape_type());
    let Some(first) = types.next() else {
        return Ok(ShapeType::Group);
    };
    if types.any(|ty| ty != first) {
        return Err(AssociationError::StructuralMismatch {
            reason: "mixed-member-types",
            first: op.anchor(),
            second: op.anchor(),
        });
    }
    Ok(first)
}

/// Faces bounded by the given edges: those holding two or more of them,
/// those bounded by a single edge, and those whose vertices all lie on
/// the edges.
fn bounded_faces<G: ShapeGraph>(graph: &G, edges: &[EdgeId]) -> Result<Vec<FaceId>> {
    let edge_set: BTreeSet<EdgeId> = edges.iter().copied().collect();
    let mut vertex_set = BTreeSet::new();
    for &edge in edges {
        let (a, b) = graph.edge_vertices(edge)?;
        vertex_set.extend([a, b]);
    }

    let mut faces = Vec::new();
    let mut seen = BTreeSet::new();
    for &edge in edges {
        let mut previous = None;
        for _ in 0..2 {
            let Some(face) = graph.next_face(edge, previous)? else {
                break;
            };
            previous = Some(face);
            if seen.contains(&face) {
                continue;
            }
            let face_edges = graph.sub_shapes(Shape::Face(face), ShapeType::Edge)?;
            let in_group = face_edges
                .iter()
                .filter(|e| e.as_edge().is_some_and(|e| edge_set.contains(&e)))
                .count();
            let enclosed = graph
                .sub_shapes(Shape::Face(face), ShapeType::Vertex)?
                .into_iter()
                .filter_map(Shape::as_vertex)
                .all(|v| vertex_set.contains(&v));
            if in_group > 1 || face_edges.len() == 1 || enclosed {
                seen.insert(face);
                faces.push(face);
            }
        }
    }
    Ok(faces)
}

fn incidence<G: ShapeGraph>(graph: &G, edges: &[EdgeId]) -> Result<Incidence> {
    let mut incidence = Incidence::new();
    for &edge in edges {
        let (a, b) = graph.edge_vertices(edge)?;
        incidence.entry(a).or_default().push(edge);
        if b != a {
            incidence.entry(b).or_default().push(edge);
        }
    }
    Ok(incidence)
}

fn detach(incidence: &mut Incidence, edge: EdgeId, ends: [VertexId; 2]) {
    for v in ends {
        if let Some(edges) = incidence.get_mut(&v) {
            edges.retain(|&e| e != edge);
        }
    }
}

fn image(map: &AssociationMap, v: VertexId) -> Option<VertexId> {
    map.get(Shape::Vertex(v)).and_then(Shape::as_vertex)
}

/// The end of `edge` away from `from`; `from` itself for closed edges.
fn far_end<G: ShapeGraph>(graph: &G, edge: EdgeId, from: VertexId) -> Result<VertexId> {
    Ok(graph.next_vertex(edge, from)?.unwrap_or(from))
}
