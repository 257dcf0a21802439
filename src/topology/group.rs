use super::shape::Shape;

slotmap::new_key_type! {
    /// Unique identifier for a group in the topology store.
    pub struct GroupId;
}

/// An unordered collection of same-typed shapes, such as the faces of a
/// prism cap or the edges of a profile. Members need not be connected.
#[derive(Debug, Clone, Default)]
pub struct GroupData {
    /// Member shapes, in insertion order.
    pub members: Vec<Shape>,
}
