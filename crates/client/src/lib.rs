//! Client for embedding the remote application in an iframe, or for talking
//! to the page that embeds the current one.
//!
//! Validation happens synchronously when an operation is called; the returned
//! [`Pending`] future only carries the asynchronous part.

mod client;
mod embed;
pub mod fetch;
pub mod options;
mod server;

pub use client::{Client, Environment, Pending};
pub use fetch::{Gateway, HttpClient, HttpRequest, HttpResponse, Method};
pub use options::*;
