//! Workload manifest rendering and persistence.

mod workload;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use workload::*;
