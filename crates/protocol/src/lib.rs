//! Wire formats shared between the embedding page and the embedded application.
//!
//! Nothing in this crate performs I/O: it turns typed options into query
//! strings and message payloads, and resolves overlapping zoom inputs.

pub mod address;
pub mod event;
pub mod filter;
pub mod params;
pub mod zoom;

pub use address::*;
pub use event::*;
pub use filter::*;
pub use params::*;
pub use zoom::*;
