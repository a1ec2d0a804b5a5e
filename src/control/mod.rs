//! Control channel: the external request surface of the registry.
//!
//! Requests and responses are bincode-encoded and carried in length-prefixed
//! frames over TCP. One connection may carry any number of request/response
//! exchanges; each request gets exactly one response, in order.
mod client;
mod frame;
mod protocol;
mod server;

pub use client::*;
pub use frame::*;
pub use protocol::*;
pub(crate) use server::*;
