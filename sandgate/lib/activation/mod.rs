//! Activation: turning a named-sandbox request into a proxied exchange
//! with a live instance.

mod proxy;
mod queue;
mod resolver;
mod router;
mod tracker;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use proxy::*;
pub use queue::*;
pub use resolver::*;
pub use router::*;
pub use tracker::*;
