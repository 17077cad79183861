//! Orchestration backend boundary and the in-memory backend.

mod cluster;
mod memory;
mod types;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use cluster::*;
pub use memory::*;
pub use types::*;
