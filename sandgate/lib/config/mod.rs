//! Configuration types and defaults.

mod defaults;
mod environments;
mod gateway;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use environments::*;
pub use gateway::*;
