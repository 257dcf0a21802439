//! Builders for kernel shapes.

mod extrude;
mod make_face;
mod make_group;
mod make_solid;
mod make_wire;

pub use extrude::{Extrude, Prism};
pub use make_face::MakeFace;
pub use make_group::MakeGroup;
pub use make_solid::MakeSolid;
pub use make_wire::MakeWire;
