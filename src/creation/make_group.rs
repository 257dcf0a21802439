use crate::error::TopologyError;
use crate::topology::{GroupData, GroupId, Shape, TopologyStore};

/// Creates a group of same-typed shapes.
pub struct MakeGroup {
    members: Vec<Shape>,
}

impl MakeGroup {
    /// Creates a new `MakeGroup` operation.
    #[must_use]
    pub fn new(members: Vec<Shape>) -> Self {
        Self { members }
    }

    /// Executes the operation, creating the group in the topology store.
    ///
    /// Repeated members are kept once.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if members have different
    /// types, or an error if a member is missing.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<GroupId, TopologyError> {
        if let Some(first) = self.members.first() {
            if self
                .members
                .iter()
                .any(|m| m.shape_type() != first.shape_type())
            {
                return Err(TopologyError::InvalidTopology(
                    "group members must share one shape type".into(),
                ));
            }
        }
        let mut members = Vec::with_capacity(self.members.len());
        for &member in &self.members {
            if !members.contains(&member) {
                members.push(member);
            }
        }
        store.add_group(GroupData { members })
    }
}
