use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{AssociationError, Result};
use crate::topology::{Shape, VertexId};

/// Lookup direction in an [`AssociationMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the first shape's side to the second's.
    Forward,
    /// From the second shape's side back to the first's.
    Backward,
}

/// Correspondence table between sub-shapes of two shapes.
///
/// Keys of each direction live in their own table, so the two sides may
/// come from different graphs whose ids overlap. A key is never rebound to
/// a different value: such an attempt fails with
/// [`AssociationError::InvalidBinding`] and leaves the map unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationMap {
    forward: BTreeMap<Shape, Shape>,
    backward: BTreeMap<Shape, Shape>,
}

impl AssociationMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map pre-seeded with known vertex pairs, bound both ways.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::InvalidBinding`] if the pairs contradict
    /// each other.
    pub fn with_vertex_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (VertexId, VertexId)>,
    {
        let mut map = Self::new();
        for (a, b) in pairs {
            map.bind(Shape::Vertex(a), Shape::Vertex(b), true)?;
        }
        Ok(map)
    }

    /// Binds `a` to `b`, and `b` back to `a` when `bidirectional`.
    ///
    /// Returns `true` if anything new was recorded. Rebinding a key to the
    /// value it already has is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AssociationError::TypeMismatch`] if the shapes differ in type
    /// and [`AssociationError::InvalidBinding`] if either key is already
    /// bound to something else.
    pub fn bind(&mut self, a: Shape, b: Shape, bidirectional: bool) -> Result<bool> {
        if a.shape_type() != b.shape_type() {
            return Err(AssociationError::TypeMismatch {
                first: a.shape_type(),
                second: b.shape_type(),
            });
        }
        check_free(&self.forward, a, b)?;
        if bidirectional {
            check_free(&self.backward, b, a)?;
        }

        let mut added = self.forward.insert(a, b).is_none();
        if bidirectional {
            added |= self.backward.insert(b, a).is_none();
        }
        if added {
            trace!(?a, ?b, bidirectional, "bound");
        }
        Ok(added)
    }

    /// The shape bound to `key` in the forward direction.
    #[must_use]
    pub fn get(&self, key: Shape) -> Option<Shape> {
        self.forward.get(&key).copied()
    }

    /// The shape bound to `key` in the given direction.
    #[must_use]
    pub fn get_in(&self, direction: Direction, key: Shape) -> Option<Shape> {
        self.table(direction).get(&key).copied()
    }

    #[must_use]
    pub fn is_bound(&self, key: Shape) -> bool {
        self.forward.contains_key(&key)
    }

    #[must_use]
    pub fn is_bound_in(&self, direction: Direction, key: Shape) -> bool {
        self.table(direction).contains_key(&key)
    }

    /// Number of forward bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }

    /// Forward bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Shape, Shape)> + '_ {
        self.iter_in(Direction::Forward)
    }

    /// Bindings of one direction in key order.
    pub fn iter_in(&self, direction: Direction) -> impl Iterator<Item = (Shape, Shape)> + '_ {
        self.table(direction).iter().map(|(&k, &v)| (k, v))
    }

    fn table(&self, direction: Direction) -> &BTreeMap<Shape, Shape> {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }
}

fn check_free(table: &BTreeMap<Shape, Shape>, key: Shape, requested: Shape) -> Result<()> {
    match table.get(&key) {
        Some(&bound) if bound != requested => Err(AssociationError::InvalidBinding {
            key,
            bound,
            requested,
        }),
        _ => Ok(()),
    }
}
