//! Idle-policy evaluation hook and its periodic driver.

mod idle;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use idle::*;
