//! Tool sessions: cached JSON-RPC connections into sandbox instances.

mod cache;
mod executor;
mod mcp;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use cache::*;
pub use executor::*;
pub use mcp::*;
