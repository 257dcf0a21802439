/// Parameters controlling which association strategies may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationParams {
    /// Bind every pair in both directions. Ignored when a shape is
    /// associated with itself, which is always bound forward only.
    pub bidirectional: bool,
    /// Allow searches across opposite edges of quadrangles. Propagation
    /// only runs when both shapes live in the same graph.
    pub use_propagation: bool,
    /// Allow the bounding-box proximity fallback.
    pub use_proximity: bool,
}

impl Default for AssociationParams {
    fn default() -> Self {
        Self {
            bidirectional: true,
            use_propagation: true,
            use_proximity: true,
        }
    }
}
