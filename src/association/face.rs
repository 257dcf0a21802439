use tracing::debug;

use super::propagation::{find_propagation, Propagation};
use super::proximity::Frame;
use super::wire_order::{ordered_edges, OrderedWire};
use super::{AssociationMap, Context};
use crate::error::{AssociationError, Result};
use crate::graph::ShapeGraph;
use crate::topology::{FaceId, OrientedEdge, Shape, ShapeType, VertexId};

/// Edge-by-edge alignment of the boundaries of two faces.
///
/// `edges1[i]` corresponds to `edges2[i]`. Both lists hold the wire of the
/// anchor vertices first, then the remaining wires in the first face's
/// stored order, each paired with its counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceAlignment {
    pub edges1: Vec<OrientedEdge>,
    pub edges2: Vec<OrientedEdge>,
    /// Number of edges of the anchored wire.
    pub anchor_count: usize,
    /// Whether the second face's wires run against its stored boundary direction.
    pub reversed: bool,
    wire_counts: Vec<usize>,
}

impl FaceAlignment {
    /// Edge counts per wire, anchored wire first.
    #[must_use]
    pub fn wire_counts(&self) -> &[usize] {
        &self.wire_counts
    }

    /// Flips the traversal direction of every wire of the second face.
    pub fn reverse_second(&mut self) {
        let mut start = 0;
        for &count in &self.wire_counts {
            let mut wire = OrderedWire {
                edges: self.edges2[start..start + count].to_vec(),
                outer: false,
            };
            wire.reverse();
            self.edges2[start..start + count].copy_from_slice(&wire.edges);
            start += count;
        }
        self.reversed = !self.reversed;
    }
}

/// What may pair up the wires the anchor vertices do not lie on.
#[derive(Clone, Copy)]
pub(super) struct WireHints<'m> {
    /// Vertex bindings made so far.
    pub(super) map: Option<&'m AssociationMap>,
    /// Whether nearest positions in the normalized frame may decide.
    pub(super) proximity: bool,
}

/// Aligns the boundaries of two faces given two corresponding vertex pairs.
///
/// `v1[0]`/`v2[0]` may lie on any wire, and `v1[1]`/`v2[1]` must be
/// adjacent to them along that wire. For faces bounded by a single closed
/// edge, pass the same vertex twice. The other wires are paired by the
/// nearest vertex once both faces are brought into a common frame.
///
/// # Errors
///
/// Returns [`AssociationError::StructuralMismatch`] if the wire counts or
/// per-wire edge counts differ, [`AssociationError::NotFound`] if the
/// given vertices are not positioned as required, and
/// [`AssociationError::Ambiguous`] if the remaining wires cannot be paired.
pub fn find_face_association<G: ShapeGraph>(
    graph1: &G,
    face1: FaceId,
    v1: [VertexId; 2],
    graph2: &G,
    face2: FaceId,
    v2: [VertexId; 2],
) -> Result<FaceAlignment> {
    let hints = WireHints {
        map: None,
        proximity: true,
    };
    align_boundaries(graph1, face1, v1, graph2, face2, v2, hints)
}

pub(super) fn align_boundaries<G: ShapeGraph>(
    graph1: &G,
    face1: FaceId,
    v1: [VertexId; 2],
    graph2: &G,
    face2: FaceId,
    v2: [VertexId; 2],
    hints: WireHints<'_>,
) -> Result<FaceAlignment> {
    let wires1 = ordered_edges(graph1, face1, v1[0])?;
    let mut wires2 = ordered_edges(graph2, face2, v2[0])?;
    let mismatch = |reason| AssociationError::StructuralMismatch {
        reason,
        first: Shape::Face(face1),
        second: Shape::Face(face2),
    };

    if wires1.len() != wires2.len() {
        return Err(mismatch("wire-count"));
    }
    let (Some(anchor1), Some(anchor2)) = (wires1.first(), wires2.first()) else {
        return Err(mismatch("wire-count"));
    };
    if anchor1.outer != anchor2.outer {
        return Err(mismatch("wire-kind"));
    }
    if anchor1.len() != anchor2.len() {
        return Err(mismatch(edge_count_reason(anchor1)));
    }

    let reversed = second_vertex_wraps(graph1, anchor1, v1[1])?
        != second_vertex_wraps(graph2, anchor2, v2[1])?;
    if reversed {
        for wire in &mut wires2 {
            wire.reverse();
        }
    }
    let others2 = wires2.split_off(1);
    let pairing = WirePairing {
        graph1,
        face1,
        graph2,
        face2,
        hints,
    };
    wires2.extend(pairing.pair(&wires1[1..], others2)?);

    Ok(FaceAlignment {
        anchor_count: anchor1.len(),
        wire_counts: wires1.iter().map(OrderedWire::len).collect(),
        edges1: wires1.into_iter().flat_map(|w| w.edges).collect(),
        edges2: wires2.into_iter().flat_map(|w| w.edges).collect(),
        reversed,
    })
}

fn edge_count_reason(wire: &OrderedWire) -> &'static str {
    if wire.outer {
        "outer-wire-edge-count"
    } else {
        "inner-wire-edge-count"
    }
}

/// `false` if `second` ends the first edge of the wire, `true` if it starts
/// the last one, i.e. it is reached by walking the wire backwards.
fn second_vertex_wraps<G: ShapeGraph>(
    graph: &G,
    wire: &OrderedWire,
    second: VertexId,
) -> Result<bool> {
    let (Some(&first), Some(&last)) = (wire.edges.first(), wire.edges.last()) else {
        return Err(AssociationError::NotFound {
            reason: "wire-edges",
            shape: Shape::Vertex(second),
        });
    };
    if graph.last_vertex(first)? == second {
        Ok(false)
    } else if graph.first_vertex(last)? == second {
        Ok(true)
    } else {
        Err(AssociationError::NotFound {
            reason: "second-vertex-not-adjacent",
            shape: Shape::Vertex(second),
        })
    }
}

/// Pairs the wires left over once the anchored wires are aligned.
struct WirePairing<'a, 'm, G> {
    graph1: &'a G,
    face1: FaceId,
    graph2: &'a G,
    face2: FaceId,
    hints: WireHints<'m>,
}

impl<G: ShapeGraph> WirePairing<'_, '_, G> {
    /// Finds, for each wire of `wires1`, the wire of `wires2` holding the
    /// counterpart of its first vertex, rotated to start there.
    fn pair(&self, wires1: &[OrderedWire], mut wires2: Vec<OrderedWire>) -> Result<Vec<OrderedWire>> {
        let mut frame = None;
        let mut paired = Vec::with_capacity(wires1.len());
        for wire1 in wires1 {
            let Some(&first) = wire1.edges.first() else {
                return Err(self.mismatch("wire-edges"));
            };
            let start1 = self.graph1.first_vertex(first)?;
            let start2 = self.counterpart(start1, &wires2, &mut frame)?;

            let mut found = None;
            for (index, wire2) in wires2.iter_mut().enumerate() {
                if wire2.rotate_to(self.graph2, start2)? {
                    found = Some(index);
                    break;
                }
            }
            let Some(index) = found else {
                return Err(self.ambiguous());
            };
            let wire2 = wires2.remove(index);
            if wire1.outer != wire2.outer {
                return Err(self.mismatch("wire-kind"));
            }
            if wire1.len() != wire2.len() {
                return Err(self.mismatch(edge_count_reason(wire1)));
            }
            paired.push(wire2);
        }
        Ok(paired)
    }

    /// The vertex of `wires2` corresponding to `start1`: its binding if it
    /// has one there, the only vertex of a last single-vertex wire, or the
    /// nearest vertex in the normalized frame.
    fn counterpart(
        &self,
        start1: VertexId,
        wires2: &[OrderedWire],
        cache: &mut Option<Frame>,
    ) -> Result<VertexId> {
        let mut candidates = Vec::new();
        for wire in wires2 {
            candidates.extend(wire.vertices(self.graph2)?);
        }

        let bound = self
            .hints
            .map
            .and_then(|map| map.get(Shape::Vertex(start1)))
            .and_then(Shape::as_vertex);
        if let Some(bound) = bound.filter(|v| candidates.contains(v)) {
            return Ok(bound);
        }
        if let [only] = wires2 {
            let vertices = only.vertices(self.graph2)?;
            if let Some(&v) = vertices.first().filter(|v| vertices.iter().all(|w| w == *v)) {
                return Ok(v);
            }
        }
        if !self.hints.proximity {
            return Err(self.ambiguous());
        }

        let frame = if let Some(frame) = *cache {
            frame
        } else {
            let frame = Frame::between(
                self.graph1,
                &[Shape::Face(self.face1)],
                self.graph2,
                &[Shape::Face(self.face2)],
            )?;
            *cache = Some(frame);
            frame
        };
        let target = frame.map(self.graph1.vertex_point(start1)?);
        let mut nearest: Option<(f64, VertexId)> = None;
        for v in candidates {
            let distance = (self.graph2.vertex_point(v)? - target).norm_squared();
            if nearest.is_none_or(|(d, _)| distance < d) {
                nearest = Some((distance, v));
            }
        }
        debug!(?start1, "wire paired by proximity");
        nearest.map(|(_, v)| v).ok_or_else(|| self.ambiguous())
    }

    fn mismatch(&self, reason: &'static str) -> AssociationError {
        AssociationError::StructuralMismatch {
            reason,
            first: Shape::Face(self.face1),
            second: Shape::Face(self.face2),
        }
    }

    fn ambiguous(&self) -> AssociationError {
        AssociationError::Ambiguous {
            first: Shape::Face(self.face1),
            second: Shape::Face(self.face2),
        }
    }
}

impl<G: ShapeGraph> Context<'_, G> {
    /// Binds aligned edges and their first vertices.
    pub(super) fn bind_alignment(
        &self,
        map: &mut AssociationMap,
        alignment: &FaceAlignment,
        bidirectional: bool,
    ) -> Result<()> {
        for (oe1, oe2) in alignment.edges1.iter().zip(&alignment.edges2) {
            self.bind(map, oe1.edge, oe2.edge, bidirectional)?;
            let a = self.graph1.first_vertex(*oe1)?;
            let b = self.graph2.first_vertex(*oe2)?;
            self.bind(map, a, b, bidirectional)?;
        }
        Ok(())
    }

    /// Aligns two faces from corresponding vertex pairs, pairing the
    /// remaining wires through the map and, if allowed, by proximity.
    pub(super) fn align_faces(
        &self,
        face1: FaceId,
        v1: [VertexId; 2],
        face2: FaceId,
        v2: [VertexId; 2],
        map: &AssociationMap,
    ) -> Result<FaceAlignment> {
        let hints = WireHints {
            map: Some(map),
            proximity: self.params.use_proximity,
        };
        align_boundaries(self.graph1, face1, v1, self.graph2, face2, v2, hints)
    }

    pub(super) fn associate_face_seeded(
        &self,
        face1: FaceId,
        face2: FaceId,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<()> {
        let (v1, v2) = self.face_anchor(face1, face2, map)?;
        let mut alignment = self.align_faces(face1, v1, face2, v2, map)?;
        if alignment.anchor_count == 2 {
            self.break_two_edge_tie(face1, face2, &mut alignment, map)?;
        }
        self.bind_alignment(map, &alignment, bidirectional)?;
        self.bind(map, face1, face2, bidirectional)
    }

    /// Two corresponding vertex pairs of the faces, found from the map.
    ///
    /// Prefers an edge of `face1` with both ends bound. With a single bound
    /// vertex, the second pair is guessed by proximity; faces bounded by one
    /// edge repeat the single pair.
    fn face_anchor(
        &self,
        face1: FaceId,
        face2: FaceId,
        map: &AssociationMap,
    ) -> Result<([VertexId; 2], [VertexId; 2])> {
        let image = |v: VertexId| map.get(Shape::Vertex(v)).and_then(Shape::as_vertex);
        let mut single = None;
        let mut edge_count = 0;
        for edge in self.graph1.sub_shapes(Shape::Face(face1), ShapeType::Edge)? {
            let Shape::Edge(edge) = edge else { continue };
            edge_count += 1;
            let (a, b) = self.graph1.edge_vertices(edge)?;
            match (image(a), image(b)) {
                (Some(x), Some(y)) if a != b => return Ok(([a, b], [x, y])),
                (Some(x), _) => {
                    single.get_or_insert((a, x));
                }
                (None, Some(y)) => {
                    single.get_or_insert((b, y));
                }
                (None, None) => {}
            }
        }

        let Some((a, x)) = single else {
            return Err(AssociationError::NotFound {
                reason: "bound-vertex",
                shape: Shape::Face(face1),
            });
        };
        if edge_count <= 1 {
            return Ok(([a, a], [x, x]));
        }
        if !self.params.use_proximity {
            return Err(AssociationError::NotFound {
                reason: "two-bound-vertices",
                shape: Shape::Face(face1),
            });
        }

        debug!(?face1, "second anchor vertex guessed by proximity");
        let wires1 = ordered_edges(self.graph1, face1, a)?;
        let wires2 = ordered_edges(self.graph2, face2, x)?;
        let (Some(&leaving1), Some(&leaving2), Some(&entering2)) = (
            wires1.first().and_then(|w| w.edges.first()),
            wires2.first().and_then(|w| w.edges.first()),
            wires2.first().and_then(|w| w.edges.last()),
        ) else {
            return Err(AssociationError::NotFound {
                reason: "wire-edges",
                shape: Shape::Face(face1),
            });
        };
        let b = self.graph1.last_vertex(leaving1)?;
        let frame = Frame::between(
            self.graph1,
            &[Shape::Face(face1)],
            self.graph2,
            &[Shape::Face(face2)],
        )?;
        let target = frame.map(self.graph1.vertex_point(b)?);
        let forward = self.graph2.last_vertex(leaving2)?;
        let backward = self.graph2.first_vertex(entering2)?;
        let y = if (self.graph2.vertex_point(backward)? - target).norm()
            < (self.graph2.vertex_point(forward)? - target).norm()
        {
            backward
        } else {
            forward
        };
        Ok(([a, b], [x, y]))
    }

    /// Decides the direction of a two-edge alignment, which the vertex
    /// pairs alone cannot determine.
    ///
    /// Propagation from the first edge of `face1` decides when it reaches
    /// either edge of `face2`; otherwise an existing edge binding decides.
    fn break_two_edge_tie(
        &self,
        face1: FaceId,
        face2: FaceId,
        alignment: &mut FaceAlignment,
        map: &AssociationMap,
    ) -> Result<()> {
        let seed = alignment.edges1[0];
        let (kept, swapped) = (alignment.edges2[0].edge, alignment.edges2[1].edge);
        if kept == swapped {
            return Ok(());
        }
        if self.propagation_enabled() {
            if find_propagation(self.graph1, seed, swapped)?.is_some() {
                debug!(?face1, "two-edge alignment reversed by propagation");
                alignment.reverse_second();
                return Ok(());
            }
            if find_propagation(self.graph1, seed, kept)?.is_some() {
                return Ok(());
            }
        }
        match map.get(Shape::Edge(seed.edge)) {
            Some(Shape::Edge(bound)) if bound == kept => Ok(()),
            Some(Shape::Edge(bound)) if bound == swapped => {
                alignment.reverse_second();
                Ok(())
            }
            _ => Err(AssociationError::Ambiguous {
                first: Shape::Face(face1),
                second: Shape::Face(face2),
            }),
        }
    }

    /// Associates two faces of one graph without known vertex pairs, using
    /// the edge of `face2` closest to the first edge of `face1` by
    /// propagation. Returns `false` when propagation cannot anchor them.
    pub(super) fn associate_face_unseeded(
        &self,
        face1: FaceId,
        face2: FaceId,
        map: &mut AssociationMap,
        bidirectional: bool,
    ) -> Result<bool> {
        if !self.propagation_enabled() {
            return Ok(false);
        }
        let Some(&seed) = self.graph1.outer_edges(face1)?.first() else {
            return Ok(false);
        };

        let mut best: Option<Propagation> = None;
        for edge in self.graph2.sub_shapes(Shape::Face(face2), ShapeType::Edge)? {
            let Shape::Edge(edge) = edge else { continue };
            if let Some(found) = find_propagation(self.graph1, seed, edge)? {
                if best.is_none_or(|b| found.steps < b.steps) {
                    best = Some(found);
                }
            }
        }
        let Some(best) = best else {
            return Ok(false);
        };
        debug!(steps = best.steps, "face anchored by propagation");

        let v1 = [self.graph1.first_vertex(seed)?, self.graph1.last_vertex(seed)?];
        let v2 = [
            self.graph2.first_vertex(best.edge)?,
            self.graph2.last_vertex(best.edge)?,
        ];
        let mut alignment = self.align_faces(face1, v1, face2, v2, map)?;
        if alignment.anchor_count == 2
            && (seed.edge == alignment.edges1[0].edge)
                != (best.edge.edge == alignment.edges2[0].edge)
        {
            alignment.reverse_second();
        }
        self.bind_alignment(map, &alignment, bidirectional)?;
        self.bind(map, face1, face2, bidirectional)?;
        Ok(true)
    }
}
