//! Distribution network model whose topology is inferred from geometry.
//!
//! Source rows carry coordinates and a few free-text tags but no foreign keys.
//! On every write the resolvers work out which region an asset lies in, which
//! substation feeds it and what it connects to, and the synchronizer copies a
//! whole source dataset in the order those inferences depend on.

pub mod api;
pub mod config;
pub mod domain;
pub mod network;
pub mod resolve;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod upload;
pub mod writer;

pub use network::Network;
pub use sync::{SyncOptions, Synchronizer};
