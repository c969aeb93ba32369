pub mod bounds;
pub mod error;
pub mod geometry;
pub mod ids;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use error::*;
pub use geometry::*;
pub use ids::*;
