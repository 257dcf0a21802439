use crate::error::TopologyError;
use crate::topology::{ShellId, SolidData, SolidId, TopologyStore};

/// Creates a solid from shells.
pub struct MakeSolid {
    outer_shell: ShellId,
    inner_shells: Vec<ShellId>,
}

impl MakeSolid {
    /// Creates a new `MakeSolid` operation.
    #[must_use]
    pub fn new(outer_shell: ShellId, inner_shells: Vec<ShellId>) -> Self {
        Self {
            outer_shell,
            inner_shells,
        }
    }

    /// Executes the operation, creating the solid in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] if a shell is open, or an
    /// error if a shell is missing.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId, TopologyError> {
        for shell in std::iter::once(self.outer_shell).chain(self.inner_shells.iter().copied()) {
            if !store.shell(shell)?.is_closed {
                return Err(TopologyError::InvalidTopology(
                    "solid shells must be closed".into(),
                ));
            }
        }
        store.add_solid(SolidData {
            outer_shell: self.outer_shell,
            inner_shells: self.inner_shells.clone(),
        })
    }
}
