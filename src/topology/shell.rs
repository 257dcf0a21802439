use super::face::FaceId;

slotmap::new_key_type! {
    /// Unique identifier for a shell in the topology store.
    pub struct ShellId;
}

/// A connected set of faces sharing edges.
///
/// Closed shells bound a solid; open shells are plain surface patches.
#[derive(Debug, Clone)]
pub struct ShellData {
    /// The faces that make up this shell.
    pub faces: Vec<FaceId>,
    /// Whether every edge of the shell is shared by exactly two of its faces.
    pub is_closed: bool,
}

impl ShellData {
    /// Creates an open shell from faces.
    #[must_use]
    pub fn open(faces: Vec<FaceId>) -> Self {
        Self {
            faces,
            is_closed: false,
        }
    }
}
