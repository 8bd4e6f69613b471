//! Write-time inference rules.
//!
//! Everything here is synchronous and operates on borrowed tables; the writer
//! calls these while it holds the store's write lock.

pub mod connectivity;
pub mod spatial;
pub mod status;

pub use connectivity::{BushingLinks, ConnectivityResolver, LineEndpoints};
pub use spatial::{NodePlacement, RegionAttributes, RegionResolver};
pub use status::{PropagationCount, StatusPropagator};
