use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use super::{link_index, ElementId, FaceMesh, NodeId};
use crate::error::{AssociationError, Result};

/// Node correspondence from one face mesh to another.
pub type NodeMap = BTreeMap<NodeId, NodeId>;

/// An injective node correspondence under construction.
#[derive(Debug, Default)]
pub(crate) struct NodePairs {
    forward: NodeMap,
    backward: NodeMap,
}

impl NodePairs {
    /// Records `a ↔ b`. Repeating a known pair is a no-op.
    pub(crate) fn bind(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        if let Some(&bound) = self.forward.get(&a) {
            if bound == b {
                return Ok(());
            }
            return Err(AssociationError::NodeConflict {
                node: a,
                bound,
                requested: b,
            });
        }
        if let Some(&bound) = self.backward.get(&b) {
            return Err(AssociationError::NodeConflict {
                node: b,
                bound,
                requested: a,
            });
        }
        self.forward.insert(a, b);
        self.backward.insert(b, a);
        Ok(())
    }

    pub(crate) fn into_map(self) -> NodeMap {
        self.forward
    }
}

/// Matches the nodes of two congruent element sets, given two anchor pairs
/// forming a link (consecutive nodes) on each side.
///
/// Starting from the elements holding the anchor links, matched element
/// pairs are walked cyclically in step, each in its own direction, and
/// every shared link leads on to the next element pair. `start` forces the
/// first element pair when the anchor link is shared by two elements.
///
/// # Errors
///
/// Returns [`AssociationError::MeshMismatch`] if the element sets are not
/// congruent around the walk, and [`AssociationError::NodeConflict`] if a
/// node would be matched twice.
pub fn find_matching_nodes(
    mesh1: &FaceMesh,
    elements1: &BTreeSet<ElementId>,
    mesh2: &FaceMesh,
    elements2: &BTreeSet<ElementId>,
    first: (NodeId, NodeId),
    second: (NodeId, NodeId),
    start: Option<(ElementId, ElementId)>,
) -> Result<NodeMap> {
    let mut pairs = NodePairs::default();
    match_elements(
        &mut pairs, mesh1, elements1, mesh2, elements2, first, second, start,
    )?;
    Ok(pairs.into_map())
}

type Link = (NodeId, NodeId);

fn mismatch(reason: &'static str) -> AssociationError {
    AssociationError::MeshMismatch { reason }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn match_elements(
    pairs: &mut NodePairs,
    mesh1: &FaceMesh,
    elements1: &BTreeSet<ElementId>,
    mesh2: &FaceMesh,
    elements2: &BTreeSet<ElementId>,
    first: (NodeId, NodeId),
    second: (NodeId, NodeId),
    start: Option<(ElementId, ElementId)>,
) -> Result<()> {
    pairs.bind(first.0, first.1)?;
    pairs.bind(second.0, second.1)?;
    let link1 = (first.0, second.0);
    let link2 = (first.1, second.1);

    let (start1, start2) = match start {
        Some(pair) => pair,
        None => {
            let e1 = linked_within(mesh1, elements1, link1, None);
            let e2 = linked_within(mesh2, elements2, link2, None);
            let (Some(e1), Some(e2)) = (e1, e2) else {
                return Err(mismatch("anchor-link"));
            };
            (e1, e2)
        }
    };

    let mut visited1 = BTreeSet::from([start1]);
    let mut visited2 = BTreeSet::from([start2]);
    let mut queue: VecDeque<(ElementId, ElementId, Link, Link)> =
        VecDeque::from([(start1, start2, link1, link2)]);

    while let Some((e1, e2, (a1, b1), (a2, b2))) = queue.pop_front() {
        let nodes1 = mesh1.element(e1)?;
        let nodes2 = mesh2.element(e2)?;
        if nodes1.len() != nodes2.len() {
            return Err(mismatch("element-size"));
        }
        let (Some((i1, forward1)), Some((i2, forward2))) =
            (link_index(nodes1, a1, b1), link_index(nodes2, a2, b2))
        else {
            return Err(mismatch("link-not-in-element"));
        };

        let n = nodes1.len();
        let walk = |nodes: &[NodeId], i: usize, forward: bool, k: usize| {
            if forward {
                nodes[(i + k) % n]
            } else {
                nodes[(i + n - k % n) % n]
            }
        };
        for k in 0..n {
            pairs.bind(walk(nodes1, i1, forward1, k), walk(nodes2, i2, forward2, k))?;
        }

        for k in 0..n {
            let side1 = (walk(nodes1, i1, forward1, k), walk(nodes1, i1, forward1, k + 1));
            let side2 = (walk(nodes2, i2, forward2, k), walk(nodes2, i2, forward2, k + 1));
            let next1 = linked_within(mesh1, elements1, side1, Some(e1));
            let next2 = linked_within(mesh2, elements2, side2, Some(e2));
            match (next1, next2) {
                (Some(o1), Some(o2)) => {
                    if visited1.insert(o1) {
                        visited2.insert(o2);
                        queue.push_back((o1, o2, side1, side2));
                    }
                }
                (None, None) => {}
                _ => return Err(mismatch("link-neighbour")),
            }
        }
    }

    debug!(
        elements = visited1.len(),
        nodes = pairs.forward.len(),
        "element walk complete"
    );
    Ok(())
}

/// An element of `elements` holding `link`, other than `except`.
fn linked_within(
    mesh: &FaceMesh,
    elements: &BTreeSet<ElementId>,
    link: Link,
    except: Option<ElementId>,
) -> Option<ElementId> {
    mesh.elements_with_link(link.0, link.1)
        .into_iter()
        .find(|e| Some(*e) != except && elements.contains(e))
}
