//! Sandbox creation, readiness, and deletion.

mod controller;
mod locks;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use controller::*;
pub use locks::*;
