use std::collections::BTreeSet;

use crate::error::Result;
use crate::graph::ShapeGraph;
use crate::topology::{EdgeId, OrientedEdge, Shape, ShapeType};

/// An edge reached by propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    /// Number of quadrangles crossed; 0 when the target is the seed itself.
    pub steps: usize,
    /// The target edge, oriented co-directionally with the seed.
    pub edge: OrientedEdge,
}

/// Searches for `target` by repeatedly jumping from an edge to the opposite
/// edge of every 4-edge wire that contains it.
///
/// The search is breadth-first, so the returned step count is minimal.
/// Each jumped-to edge is oriented so that it runs the same way as `from`
/// across the quadrangle. Returns `None` when `target` is unreachable.
///
/// # Errors
///
/// Returns an error if a visited edge or wire is missing from the graph.
pub fn find_propagation<G: ShapeGraph>(
    graph: &G,
    from: OrientedEdge,
    target: EdgeId,
) -> Result<Option<Propagation>> {
    if from.edge == target {
        return Ok(Some(Propagation {
            steps: 0,
            edge: from,
        }));
    }

    let mut visited = BTreeSet::from([from.edge]);
    let mut frontier = vec![from];
    let mut steps = 0;

    while !frontier.is_empty() {
        steps += 1;
        let mut next = Vec::new();
        for current in frontier {
            for wire in graph.ancestors(Shape::Edge(current.edge), ShapeType::Wire)? {
                let Shape::Wire(wire) = wire else { continue };
                let edges = graph.wire_edges(wire)?;
                if edges.len() != 4 {
                    continue;
                }
                let Some(found) = edges.iter().position(|oe| oe.edge == current.edge) else {
                    continue;
                };
                let opposite = edges[(found + 2) % 4];
                if !visited.insert(opposite.edge) {
                    continue;
                }
                let forward = if opposite.forward == edges[found].forward {
                    !current.forward
                } else {
                    current.forward
                };
                let reached = OrientedEdge::new(opposite.edge, forward);
                if reached.edge == target {
                    return Ok(Some(Propagation {
                        steps,
                        edge: reached,
                    }));
                }
                next.push(reached);
            }
        }
        frontier = next;
    }
    Ok(None)
}
