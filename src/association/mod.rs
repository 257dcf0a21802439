//! Sub-shape association between two topologically equivalent shapes.
//!
//! [`Associate`] is the single entry point. It dispatches on shape type and
//! recursively fills an [`AssociationMap`] with vertex, edge, face, shell
//! and group correspondences. Strategies, in order of preference:
//! known vertex pairs already in the map, propagation across quadrangles
//! (both shapes in the same graph), and finally geometric proximity.

mod face;
mod group;
mod map;
mod params;
mod propagation;
mod proximity;
mod shell;
mod wire_order;

pub use face::{find_face_association, FaceAlignment};
pub use map::{AssociationMap, Direction};
pub use params::AssociationParams;
pub use propagation::{find_propagation, Propagation};
pub use wire_order::{ordered_edges, OrderedWire};

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::topology::{EdgeId, FaceId, OrientedEdge, Shape, ShapeType, VertexId};

/// Computes the correspondence between the sub-shapes of two shapes.
///
/// The map may be pre-seeded with known pairs (typically vertices, see
/// [`AssociationMap::with_vertex_pairs`]). Bindings made before a failure
/// stay in the map.
pub struct Associate {
    first: Shape,
    second: Shape,
    params: AssociationParams,
}

impl Associate {
    /// Creates a new `Associate` operation with default parameters.
    #[must_use]
    pub fn new(first: Shape, second: Shape) -> Self {
        Self {
            first,
            second,
            params: AssociationParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: AssociationParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the association. `first` is looked up in `graph1` and
    /// `second` in `graph2`; pass the same graph twice to associate two
    /// shapes of one model, which also enables propagation.
    ///
    /// # Errors
    ///
    /// Returns an [`AssociationError::Context`] naming the two shapes and
    /// wrapping the failure that stopped the association.
    #[instrument(skip_all, fields(first = ?self.first, second = ?self.second))]
    pub fn execute<G: ShapeGraph>(
        &self,
        graph1: &G,
        graph2: &G,
        map: &mut AssociationMap,
    ) -> Result<()> {
        let ctx = Context {
            graph1,
            graph2,
            params: self.params,
            same_graph: std::ptr::eq(graph1, graph2),
        };
        ctx.run(self.first, self.second, map)
            .map_err(|err| err.within(self.first, self.second))
    }
}

/// One side of an association: a kernel shape, or a collection assembled
/// on the fly from group members. Assembled operands are never bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    Shape(Shape),
    /// Faces assembled into a shell.
    Shell(Vec<FaceId>),
    /// Members left over from a partial group association.
    Group(Vec<Shape>),
}

impl Operand {
    fn kind(&self) -> ShapeType {
        match self {
            Self::Shape(shape) => shape.shape_type(),
            Self::Shell(_) => ShapeType::Shell,
            Self::Group(_) => ShapeType::Group,
        }
    }

    /// A shape identifying this operand in error reports.
    fn anchor(&self) -> Shape {
        match self {
            Self::Shape(shape) => *shape,
            Self::Shell(faces) => faces.first().map_or(Shape::Group(Default::default()), |&f| {
                Shape::Face(f)
            }),
            Self::Group(members) => members
                .first()
                .copied()
                .unwrap_or(Shape::Group(Default::default())),
        }
    }

    fn sub_shapes<G: ShapeGraph>(&self, graph: &G, ty: ShapeType) -> Result<Vec<Shape>> {
        let roots: Vec<Shape> = match self {
            Self::Shape(shape) => return Ok(graph.sub_shapes(*shape, ty)?),
            Self::Shell(faces) => faces.iter().copied().map(Shape::Face).collect(),
            Self::Group(members) => members.clone(),
        };
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for root in roots {
            for sub in graph.sub_shapes(root, ty)? {
                if seen.insert(sub) {
                    out.push(sub);
                }
            }
        }
        Ok(out)
    }

    fn vertices<G: ShapeGraph>(&self, graph: &G) -> Result<Vec<VertexId>> {
        Ok(self
            .sub_shapes(graph, ShapeType::Vertex)?
            .into_iter()
            .filter_map(Shape::as_vertex)
            .collect())
    }

    fn edges<G: ShapeGraph>(&self, graph: &G) -> Result<Vec<EdgeId>> {
        Ok(self
            .sub_shapes(graph, ShapeType::Edge)?
            .into_iter()
            .filter_map(Shape::as_edge)
            .collect())
    }

    fn faces<G: ShapeGraph>(&self, graph: &G) -> Result<Vec<FaceId>> {
        Ok(self
            .sub_shapes(graph, ShapeType::Face)?
            .into_iter()
            .filter_map(Shape::as_face)
            .collect())
    }

    /// Members of a group-like operand.
    fn members<G: ShapeGraph>(&self, graph: &G) -> Result<Vec<Shape>> {
        Ok(match self {
            Self::Shape(Shape::Group(group)) => graph.group_members(*group)?,
            Self::Shape(Shape::Wire(_)) => self.sub_shapes(graph, ShapeType::Edge)?,
            Self::Shape(shape) => vec![*shape],
            Self::Shell(faces) => faces.iter().copied().map(Shape::Face).collect(),
            Self::Group(members) => members.clone(),
        })
    }
}

/// State shared by every step of one association run.
pub(crate) struct Context<'g, G> {
    graph1: &'g G,
    graph2: &'g G,
    params: AssociationParams,
    same_graph: bool,
}

impl<G: ShapeGraph> Context<'_, G> {
    fn run(&self, first: Shape, second: Shape, map: &mut AssociationMap) -> Result<()> {
        let (op1, op2) = self.resolve(Operand::Shape(first), Operand::Shape(second))?;
        let count1 = op1.vertices(self.graph1)?.len();
        let count2 = op2.vertices(self.graph2)?.len();
        if count1 != count2 {
            return Err(AssociationError::StructuralMismatch {
                reason: "vertex-count",
                first: op1.anchor(),
                second: op2.anchor(),
            });
        }
        self.dispatch(&op1, &op2, map)
    }

    fn propagation_enabled(&self) -> bool {
        self.params.use_propagation && self.same_graph
    }

    fn bind(
        &self,
        map: &mut AssociationMap,
        a: impl Into<Shape>,
        b: impl Into<Shape>,
        bidirectional: bool,
    ) -> Result<()> {
        map.bind(a.into(), b.into(), bidirectional).map(|_| ())
    }

    /// Binds the operands themselves when both are kernel shapes of one type.
    fn bind_operands(
        &self,
        map: &mut AssociationMap,
        op1: &Operand,
        op2: &Operand,
        bidirectional: bool,
    ) -> Result<()> {
        if let (Operand::Shape(a), Operand::Shape(b)) = (op1, op2) {
            if a.shape_type() == b.shape_type() {
                self.bind(map, *a, *b, bidirectional)?;
            }
        }
        Ok(())
    }

    /// Associates two operands, resolving group/member type differences first.
    pub(crate) fn associate(
        &self,
        op1: &Operand,
        op2: &Operand,
        map: &mut AssociationMap,
    ) -> Result<()> {
        let (op1, op2) = self.resolve(op1.clone(), op2.clone())?;
        self.dispatch(&op1, &op2, map)
    }

    /// Makes the operand kinds compatible, or fails with a type mismatch.
    ///
    /// Shells and solids are compatible with each other. A group faced with
    /// a plain shape is replaced by a similar group containing that shape on
    /// the other side, or by its only member.
    fn resolve(&self, op1: Operand, op2: Operand) -> Result<(Operand, Operand)> {
        let (kind1, kind2) = (op1.kind(), op2.kind());
        let solid_like = |kind| matches!(kind, ShapeType::Shell | ShapeType::Solid);
        if kind1 == kind2 || (solid_like(kind1) && solid_like(kind2)) {
            return Ok((op1, op2));
        }

        if kind1 == ShapeType::Group {
            if let Operand::Shape(shape2) = op2 {
                if let Some(group2) = self.similar_group(&op1, self.graph1, shape2, self.graph2)? {
                    debug!(?group2, "matched group containing the second shape");
                    return Ok((op1, Operand::Shape(Shape::Group(group2))));
                }
            }
            let members = op1.members(self.graph1)?;
            if let [member] = members.as_slice() {
                return self.resolve(Operand::Shape(*member), op2);
            }
        } else if kind2 == ShapeType::Group {
            if let Operand::Shape(shape1) = op1 {
                if let Some(group1) = self.similar_group(&op2, self.graph2, shape1, self.graph1)? {
                    debug!(?group1, "matched group containing the first shape");
                    return Ok((Operand::Shape(Shape::Group(group1)), op2));
                }
            }
            let members = op2.members(self.graph2)?;
            if let [member] = members.as_slice() {
                return self.resolve(op1, Operand::Shape(*member));
            }
        }

        Err(AssociationError::TypeMismatch {
            first: kind1,
            second: kind2,
        })
    }

    /// A group of `other_graph` containing `shape` whose sub-shape counts
    /// equal those of `group`.
    fn similar_group(
        &self,
        group: &Operand,
        graph: &G,
        shape: Shape,
        other_graph: &G,
    ) -> Result<Option<crate::topology::GroupId>> {
        'candidates: for candidate in other_graph.groups_containing(shape)? {
            let candidate_op = Operand::Shape(Shape::Group(candidate));
            for ty in &ShapeType::ALL[..ShapeType::ALL.len() - 1] {
                if group.sub_shapes(graph, *ty)?.len()
                    != candidate_op.sub_shapes(other_graph, *ty)?.len()
                {
                    continue 'candidates;
                }
            }
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    fn has_initial(&self, op1: &Operand, map: &AssociationMap) -> Result<bool> {
        Ok(op1
            .vertices(self.graph1)?
            .into_iter()
            .any(|v| map.is_bound(Shape::Vertex(v))))
    }

    fn dispatch(&self, op1: &Operand, op2: &Operand, map: &mut AssociationMap) -> Result<()> {
        let bidirectional =
            self.params.bidirectional && !(self.same_graph && op1 == op2);
        let seeded = self.has_initial(op1, map)?;

        let handled = match (op1, op2) {
            (Operand::Shape(Shape::Vertex(v1)), Operand::Shape(Shape::Vertex(v2))) => {
                self.bind(map, *v1, *v2, bidirectional)?;
                true
            }
            (Operand::Shape(Shape::Edge(e1)), Operand::Shape(Shape::Edge(e2))) => {
                if seeded {
                    self.associate_edge_seeded(*e1, *e2, map, bidirectional)?;
                    true
                } else {
                    self.associate_edge_unseeded(*e1, *e2, map, bidirectional)?
                }
            }
            (Operand::Shape(Shape::Face(f1)), Operand::Shape(Shape::Face(f2))) => {
                if seeded {
                    self.associate_face_seeded(*f1, *f2, map, bidirectional)?;
                    true
                } else {
                    self.associate_face_unseeded(*f1, *f2, map, bidirectional)?
                }
            }
            (Operand::Shape(Shape::Wire(_)), Operand::Shape(Shape::Wire(_))) => {
                if seeded {
                    self.walk_edges(op1, op2, map, bidirectional)?;
                    self.bind_operands(map, op1, op2, bidirectional)?;
                }
                seeded
            }
            _ => match op1.kind() {
                ShapeType::Shell | ShapeType::Solid => {
                    if seeded {
                        self.associate_shell(op1, op2, map, bidirectional)?;
                    }
                    seeded
                }
                ShapeType::Group => {
                    if seeded {
                        self.associate_group_seeded(op1, op2, map, bidirectional)?;
                        true
                    } else {
                        self.associate_group_unseeded(op1, op2, map, bidirectional)?
                    }
                }
                _ => {
                    return Err(AssociationError::TypeMismatch {
                        first: op1.kind(),
                        second: op2.kind(),
                    })
                }
            },
        };

        if handled {
            return Ok(());
        }
        if !self.params.use_proximity {
            return Err(AssociationError::NotFound {
                reason: "no-structural-anchor",
                shape: op1.anchor(),
            });
        }
        self.associate_by_proximity(op1, op2, map, bidirectional)
    }

    // ── Edges ──────────────────────────────────────────────────

    /// One end of `e1` is bound: bind the opposite ends, then the edges.
    fn associate_edge_seeded(
        &self,
        e1: EdgeId,
        e2: EdgeId,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let (a1, b1) = self.graph1.edge_vertices(e1)?;
        let (a2, b2) = self.graph2.edge_vertices(e2)?;
        let (bound, image) = [a1, b1]
            .into_iter()
            .find_map(|v| map.get(Shape::Vertex(v)).map(|image| (v, image)))
            .ok_or(AssociationError::NotFound {
                reason: "bound-edge-vertex",
                shape: Shape::Edge(e1),
            })?;
        let other1 = if bound == a1 { b1 } else { a1 };
        let other2 = if image == Shape::Vertex(a2) {
            b2
        } else if image == Shape::Vertex(b2) {
            a2
        } else {
            return Err(AssociationError::StructuralMismatch {
                reason: "edge-endpoint-mismatch",
                first: Shape::Edge(e1),
                second: Shape::Edge(e2),
            });
        };
        self.bind(map, other1, other2, bidirectional)?;
        self.bind(map, e1, e2, bidirectional)
    }

    /// No end of `e1` is bound: try propagation, then the closed-edge rule.
    fn associate_edge_unseeded(
        &self,
        e1: EdgeId,
        e2: EdgeId,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<bool> {
        let (a1, b1) = self.graph1.edge_vertices(e1)?;
        if self.propagation_enabled() {
            if let Some(found) = find_propagation(self.graph1, OrientedEdge::new(e1, true), e2)? {
                debug!(steps = found.steps, "edge associated by propagation");
                let a2 = self.graph2.first_vertex(found.edge)?;
                let b2 = self.graph2.last_vertex(found.edge)?;
                self.bind(map, a1, a2, bidirectional)?;
                self.bind(map, b1, b2, bidirectional)?;
                self.bind(map, e1, e2, bidirectional)?;
                return Ok(true);
            }
        }
        if self.graph1.is_closed_edge(e1)? && self.graph2.is_closed_edge(e2)? {
            debug!("closed edges associated directly");
            let (a2, _) = self.graph2.edge_vertices(e2)?;
            self.bind(map, e1, e2, bidirectional)?;
            self.bind(map, a1, a2, bidirectional)?;
            return Ok(true);
        }
        Ok(false)
    }
}
