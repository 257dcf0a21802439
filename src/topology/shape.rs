use super::{EdgeId, FaceId, GroupId, ShellId, SolidId, VertexId, WireId};

/// The kind of a [`Shape`], ordered from the lowest to the highest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeType {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    /// A compound group of arbitrary members.
    Group,
}

impl ShapeType {
    /// All shape types, lowest level first.
    pub const ALL: [ShapeType; 7] = [
        ShapeType::Vertex,
        ShapeType::Edge,
        ShapeType::Wire,
        ShapeType::Face,
        ShapeType::Shell,
        ShapeType::Solid,
        ShapeType::Group,
    ];
}

/// A handle to any entity of the topology store.
///
/// The ordering is total and stable for a given store, so ordered
/// collections of shapes iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    Vertex(VertexId),
    Edge(EdgeId),
    Wire(WireId),
    Face(FaceId),
    Shell(ShellId),
    Solid(SolidId),
    Group(GroupId),
}

impl Shape {
    /// Returns the type of this shape.
    #[must_use]
    pub fn shape_type(self) -> ShapeType {
        match self {
            Self::Vertex(_) => ShapeType::Vertex,
            Self::Edge(_) => ShapeType::Edge,
            Self::Wire(_) => ShapeType::Wire,
            Self::Face(_) => ShapeType::Face,
            Self::Shell(_) => ShapeType::Shell,
            Self::Solid(_) => ShapeType::Solid,
            Self::Group(_) => ShapeType::Group,
        }
    }

    #[must_use]
    pub fn as_vertex(self) -> Option<VertexId> {
        match self {
            Self::Vertex(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_edge(self) -> Option<EdgeId> {
        match self {
            Self::Edge(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_face(self) -> Option<FaceId> {
        match self {
            Self::Face(id) => Some(id),
            _ => None,
        }
    }
}

macro_rules! impl_from_id {
    ($($id:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$id> for Shape {
                fn from(id: $id) -> Self {
                    Self::$variant(id)
                }
            }
        )*
    };
}

impl_from_id! {
    VertexId => Vertex,
    EdgeId => Edge,
    WireId => Wire,
    FaceId => Face,
    ShellId => Shell,
    SolidId => Solid,
    GroupId => Group,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_type_matches_variant() {
        assert_eq!(Shape::from(EdgeId::default()).shape_type(), ShapeType::Edge);
        assert_eq!(Shape::from(GroupId::default()).shape_type(), ShapeType::Group);
        assert_eq!(Shape::Face(FaceId::default()).as_face(), Some(FaceId::default()));
        assert_eq!(Shape::Face(FaceId::default()).as_edge(), None);
    }

    #[test]
    fn shape_types_are_ordered_by_level() {
        assert!(ShapeType::Vertex < ShapeType::Edge);
        assert!(ShapeType::Face < ShapeType::Shell);
        assert_eq!(ShapeType::ALL.last(), Some(&ShapeType::Group));
    }
}
