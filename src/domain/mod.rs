pub mod assets;
pub mod geometry;
pub mod role;

pub use assets::*;
pub use geometry::*;
pub use role::*;
