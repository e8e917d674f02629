/// Ledger Mock Server Library
///
/// This crate provides both a standalone binary and library components
/// for simulating a cluster that hosts the record list program. Tests spawn
/// it in-process on an ephemeral port.

pub mod cluster;
pub mod handlers;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use cluster::{ClusterError, MockCluster};
pub use server::{create_router, run_server, spawn};
pub use types::*;
