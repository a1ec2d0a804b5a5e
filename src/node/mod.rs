mod builder;
#[allow(clippy::module_inception)]
mod node;

pub use builder::*;
pub use node::*;
