use crate::error::TopologyError;
use crate::math::{Vector3, TOLERANCE};
use crate::topology::{
    EdgeData, EdgeId, FaceData, FaceId, OrientedEdge, ShellData, SolidId, TopologyStore,
    VertexData, VertexId, WireData,
};

use super::MakeSolid;

/// Extrudes a face along a direction vector into a layered prism.
///
/// The base face becomes the bottom cap. Each layer adds one ring of
/// quadrangular side faces sharing their horizontal and vertical edges,
/// so the side wall is a structured quad grid.
pub struct Extrude {
    face: FaceId,
    direction: Vector3,
    layers: usize,
}

/// Topology produced by [`Extrude`].
#[derive(Debug, Clone)]
pub struct Prism {
    pub solid: SolidId,
    /// The base face, reused as the bottom cap.
    pub bottom: FaceId,
    pub top: FaceId,
    /// Side faces, `sides[layer][i]` above base edge `i`.
    pub sides: Vec<Vec<FaceId>>,
    /// Ring edges, `rings[level][i]` running from vertex `i` to `i + 1` of that level.
    /// Level 0 is the base wire, the last level bounds the top cap.
    pub rings: Vec<Vec<OrientedEdge>>,
    /// Vertical edges, `verticals[layer][i]` rising from vertex `i` of that layer.
    pub verticals: Vec<Vec<EdgeId>>,
}

impl Extrude {
    /// Creates a new single-layer `Extrude` operation.
    #[must_use]
    pub fn new(face: FaceId, direction: Vector3) -> Self {
        Self {
            face,
            direction,
            layers: 1,
        }
    }

    /// Splits the extrusion into `layers` equal layers.
    #[must_use]
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Executes the extrusion, creating the solid in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if the direction is zero-length,
    /// the layer count is zero or the face has inner wires.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<Prism, TopologyError> {
        if self.direction.norm() < TOLERANCE {
            return Err(TopologyError::InvalidTopology(
                "extrude direction must be non-zero".into(),
            ));
        }
        if self.layers == 0 {
            return Err(TopologyError::InvalidTopology(
                "extrusion needs at least one layer".into(),
            ));
        }
        let face = store.face(self.face)?;
        if !face.inner_wires.is_empty() {
            return Err(TopologyError::InvalidTopology(
                "extrusion of faces with holes is not supported".into(),
            ));
        }
        let base_ring = store.wire(face.outer_wire)?.edges.clone();

        // Vertex i of the base is where ring edge i starts.
        let mut base = Vec::with_capacity(base_ring.len());
        let mut base_points = Vec::with_capacity(base_ring.len());
        for oe in &base_ring {
            let edge = store.edge(oe.edge)?;
            let vertex = if oe.forward { edge.start } else { edge.end };
            base_points.push(store.vertex(vertex)?.point);
            base.push(vertex);
        }
        let mut levels: Vec<Vec<VertexId>> = vec![base];

        let n = base_ring.len();
        let mut rings = vec![base_ring];
        let mut verticals = Vec::with_capacity(self.layers);
        #[allow(clippy::cast_precision_loss)]
        let step = self.direction / self.layers as f64;

        for layer in 1..=self.layers {
            #[allow(clippy::cast_precision_loss)]
            let offset = step * layer as f64;
            let below = &levels[layer - 1];
            let level: Vec<VertexId> = base_points
                .iter()
                .map(|p| store.add_vertex(VertexData::new(*p + offset)))
                .collect();

            let mut rising = Vec::with_capacity(n);
            for i in 0..n {
                rising.push(store.add_edge(EdgeData::new(below[i], level[i]))?);
            }
            let mut ring = Vec::with_capacity(n);
            for i in 0..n {
                let edge = store.add_edge(EdgeData::new(level[i], level[(i + 1) % n]))?;
                ring.push(OrientedEdge::new(edge, true));
            }

            verticals.push(rising);
            rings.push(ring);
            levels.push(level);
        }

        let mut sides = Vec::with_capacity(self.layers);
        for layer in 0..self.layers {
            let mut row = Vec::with_capacity(n);
            for i in 0..n {
                let j = (i + 1) % n;
                let edges = vec![
                    rings[layer][i].reversed(),
                    OrientedEdge::new(verticals[layer][i], true),
                    rings[layer + 1][i],
                    OrientedEdge::new(verticals[layer][j], false),
                ];
                row.push(planar_face(store, edges)?);
            }
            sides.push(row);
        }

        let top_edges = rings[self.layers]
            .iter()
            .rev()
            .map(|oe| oe.reversed())
            .collect();
        let top = planar_face(store, top_edges)?;

        let mut all_faces = Vec::with_capacity(n * self.layers + 2);
        all_faces.push(self.face);
        all_faces.push(top);
        all_faces.extend(sides.iter().flatten().copied());

        let shell = store.add_shell(ShellData {
            faces: all_faces,
            is_closed: true,
        })?;
        let solid = MakeSolid::new(shell, vec![]).execute(store)?;

        Ok(Prism {
            solid,
            bottom: self.face,
            top,
            sides,
            rings,
            verticals,
        })
    }
}

/// Creates a face bounded by one closed loop of existing edges.
fn planar_face(store: &mut TopologyStore, edges: Vec<OrientedEdge>) -> Result<FaceId, TopologyError> {
    let outer_wire = store.add_wire(WireData {
        edges,
        is_closed: true,
    })?;
    store.add_face(FaceData {
        outer_wire,
        inner_wires: vec![],
    })
}
