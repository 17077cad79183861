//! REST API server and the activation routes.

mod data;
mod handlers;
mod routes;
mod state;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use data::*;
pub use routes::*;
pub use state::*;
