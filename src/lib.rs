//! In-memory unit registry service.
//!
//! Units are attached, detached, queried and listed through a small numeric
//! command protocol served over a TCP control channel. Id allocation happens
//! under the registry lock, and the service only tears down once every unit
//! has been detached.

mod config;
mod control;
mod dispatcher;
mod errors;
pub mod metrics;
mod node;
mod registry;
pub mod utils;

pub use config::*;
pub use control::*;
pub use dispatcher::*;
pub use errors::*;
pub use node::*;
pub use registry::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
