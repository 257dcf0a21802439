pub mod edge;
pub mod face;
pub mod group;
pub mod shape;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use edge::{EdgeData, EdgeId};
pub use face::{FaceData, FaceId};
pub use group::{GroupData, GroupId};
pub use shape::{Shape, ShapeType};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use std::collections::BTreeMap;

use crate::error::TopologyError;
use slotmap::{Key, SecondaryMap, SlotMap};

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed IDs (generational indices),
/// avoiding self-referential structures. Entities are immutable once
/// inserted; the store keeps reverse (child → parent) indices up to date
/// on every insertion so ancestor queries never scan the arena.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
    groups: SlotMap<GroupId, GroupData>,

    vertex_edges: SecondaryMap<VertexId, Vec<EdgeId>>,
    edge_wires: SecondaryMap<EdgeId, Vec<WireId>>,
    wire_faces: SecondaryMap<WireId, Vec<FaceId>>,
    face_shells: SecondaryMap<FaceId, Vec<ShellId>>,
    shell_solids: SecondaryMap<ShellId, Vec<SolidId>>,
    shape_groups: BTreeMap<Shape, Vec<GroupId>>,
}

/// Records `parent` under `child`, keeping the parent list free of duplicates.
fn link<K: Key, P: Copy + PartialEq>(index: &mut SecondaryMap<K, Vec<P>>, child: K, parent: P) {
    if let Some(entry) = index.entry(child) {
        let parents = entry.or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex operations ---

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, data: VertexData) -> VertexId {
        self.vertices.insert(data)
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Edges bounded by a vertex, in insertion order.
    #[must_use]
    pub fn edges_of_vertex(&self, id: VertexId) -> &[EdgeId] {
        self.vertex_edges.get(id).map_or(&[], Vec::as_slice)
    }

    // --- Edge operations ---

    /// Inserts an edge and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if either end vertex is not in the store.
    pub fn add_edge(&mut self, data: EdgeData) -> Result<EdgeId, TopologyError> {
        self.vertex(data.start)?;
        self.vertex(data.end)?;
        let id = self.edges.insert(data);
        link(&mut self.vertex_edges, data.start, id);
        link(&mut self.vertex_edges, data.end, id);
        Ok(id)
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    /// Wires that traverse an edge, in insertion order.
    #[must_use]
    pub fn wires_of_edge(&self, id: EdgeId) -> &[WireId] {
        self.edge_wires.get(id).map_or(&[], Vec::as_slice)
    }

    // --- Wire operations ---

    /// Inserts a wire and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is not in the store.
    pub fn add_wire(&mut self, data: WireData) -> Result<WireId, TopologyError> {
        for oe in &data.edges {
            self.edge(oe.edge)?;
        }
        let edges: Vec<EdgeId> = data.edges.iter().map(|oe| oe.edge).collect();
        let id = self.wires.insert(data);
        for edge in edges {
            link(&mut self.edge_wires, edge, id);
        }
        Ok(id)
    }

    /// Returns a reference to the wire data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn wire(&self, id: WireId) -> Result<&WireData, TopologyError> {
        self.wires
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("wire".into()))
    }

    /// Faces bounded by a wire.
    #[must_use]
    pub fn faces_of_wire(&self, id: WireId) -> &[FaceId] {
        self.wire_faces.get(id).map_or(&[], Vec::as_slice)
    }

    // --- Face operations ---

    /// Inserts a face and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a boundary wire is not in the store.
    pub fn add_face(&mut self, data: FaceData) -> Result<FaceId, TopologyError> {
        let wires: Vec<WireId> = data.wires().collect();
        for &wire in &wires {
            self.wire(wire)?;
        }
        let id = self.faces.insert(data);
        for wire in wires {
            link(&mut self.wire_faces, wire, id);
        }
        Ok(id)
    }

    /// Returns a reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, TopologyError> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))
    }

    /// Shells containing a face.
    #[must_use]
    pub fn shells_of_face(&self, id: FaceId) -> &[ShellId] {
        self.face_shells.get(id).map_or(&[], Vec::as_slice)
    }

    // --- Shell operations ---

    /// Inserts a shell and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a face is not in the store.
    pub fn add_shell(&mut self, data: ShellData) -> Result<ShellId, TopologyError> {
        for &face in &data.faces {
            self.face(face)?;
        }
        let faces = data.faces.clone();
        let id = self.shells.insert(data);
        for face in faces {
            link(&mut self.face_shells, face, id);
        }
        Ok(id)
    }

    /// Returns a reference to the shell data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn shell(&self, id: ShellId) -> Result<&ShellData, TopologyError> {
        self.shells
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("shell".into()))
    }

    /// Solids bounded by a shell.
    #[must_use]
    pub fn solids_of_shell(&self, id: ShellId) -> &[SolidId] {
        self.shell_solids.get(id).map_or(&[], Vec::as_slice)
    }

    // --- Solid operations ---

    /// Inserts a solid and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a shell is not in the store.
    pub fn add_solid(&mut self, data: SolidData) -> Result<SolidId, TopologyError> {
        let shells: Vec<ShellId> = data.shells().collect();
        for &shell in &shells {
            self.shell(shell)?;
        }
        let id = self.solids.insert(data);
        for shell in shells {
            link(&mut self.shell_solids, shell, id);
        }
        Ok(id)
    }

    /// Returns a reference to the solid data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn solid(&self, id: SolidId) -> Result<&SolidData, TopologyError> {
        self.solids
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("solid".into()))
    }

    // --- Group operations ---

    /// Inserts a group and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a member is not in the store.
    pub fn add_group(&mut self, data: GroupData) -> Result<GroupId, TopologyError> {
        for &member in &data.members {
            self.check(member)?;
        }
        let members = data.members.clone();
        let id = self.groups.insert(data);
        for member in members {
            let groups = self.shape_groups.entry(member).or_default();
            if !groups.contains(&id) {
                groups.push(id);
            }
        }
        Ok(id)
    }

    /// Returns a reference to the group data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn group(&self, id: GroupId) -> Result<&GroupData, TopologyError> {
        self.groups
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("group".into()))
    }

    /// Groups listing `shape` as a member.
    #[must_use]
    pub fn groups_of(&self, shape: Shape) -> &[GroupId] {
        self.shape_groups.get(&shape).map_or(&[], Vec::as_slice)
    }

    /// Verifies that `shape` refers to a live entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn check(&self, shape: Shape) -> Result<(), TopologyError> {
        match shape {
            Shape::Vertex(id) => self.vertex(id).map(|_| ()),
            Shape::Edge(id) => self.edge(id).map(|_| ()),
            Shape::Wire(id) => self.wire(id).map(|_| ()),
            Shape::Face(id) => self.face(id).map(|_| ()),
            Shape::Shell(id) => self.shell(id).map(|_| ()),
            Shape::Solid(id) => self.solid(id).map(|_| ()),
            Shape::Group(id) => self.group(id).map(|_| ()),
        }
    }
}
