//! Single-threaded messaging runtime for talking to an embedded application
//! across windows.
//!
//! Everything here is `Rc`-based and meant for the browser's event loop. The
//! browser itself sits behind `platform::Platform`.

pub mod abort;
pub mod counterpart;
pub mod error;
pub mod event_bus;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod platform;
pub mod request;
pub mod session;
pub mod trace;

pub use abort::*;
pub use counterpart::*;
pub use error::*;
pub use event_bus::*;
pub use platform::*;
pub use request::*;
pub use session::*;
pub use trace::*;
