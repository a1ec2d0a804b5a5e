//! Command dispatch and drain coordination.
#[allow(clippy::module_inception)]
mod dispatcher;
mod drain;

pub use dispatcher::*;
pub use drain::*;
