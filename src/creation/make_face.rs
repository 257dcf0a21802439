use crate::error::TopologyError;
use crate::topology::{FaceData, FaceId, TopologyStore, WireId};

/// Creates a face from an outer wire and optional hole wires.
pub struct MakeFace {
    outer_wire: WireId,
    inner_wires: Vec<WireId>,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer_wire: WireId, inner_wires: Vec<WireId>) -> Self {
        Self {
            outer_wire,
            inner_wires,
        }
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::WireNotClosed`] if a boundary wire is open.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId, TopologyError> {
        for wire in std::iter::once(self.outer_wire).chain(self.inner_wires.iter().copied()) {
            if !store.wire(wire)?.is_closed {
                return Err(TopologyError::WireNotClosed);
            }
        }
        store.add_face(FaceData {
            outer_wire: self.outer_wire,
            inner_wires: self.inner_wires.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::creation::MakeWire;
    use crate::math::Point3;

    #[test]
    fn open_wire_rejected() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            false,
        )
        .execute(&mut store)
        .unwrap();
        assert!(matches!(
            MakeFace::new(wire, vec![]).execute(&mut store),
            Err(TopologyError::WireNotClosed)
        ));
    }

    #[test]
    fn face_with_hole_lists_outer_wire_first() {
        let mut store = TopologyStore::new();
        let square = |s: f64| {
            vec![
                Point3::new(-s, -s, 0.0),
                Point3::new(s, -s, 0.0),
                Point3::new(s, s, 0.0),
                Point3::new(-s, s, 0.0),
            ]
        };
        let outer = MakeWire::new(square(2.0), true).execute(&mut store).unwrap();
        let hole = MakeWire::new(square(1.0), true).execute(&mut store).unwrap();
        let face = MakeFace::new(outer, vec![hole]).execute(&mut store).unwrap();
        let wires: Vec<_> = store.face(face).unwrap().wires().collect();
        assert_eq!(wires, vec![outer, hole]);
    }
}
