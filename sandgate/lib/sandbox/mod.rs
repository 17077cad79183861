//! The sandbox spec type, normalization, and quantity parsing.

mod spec;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod quantity;

pub use spec::*;
