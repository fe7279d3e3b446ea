//! l2net switch drivers
//!
//! Raw-socket and managed-session implementations of [`SwitchDriver`],
//! the payload templates they share and the factory that picks one.
//!
//! [`SwitchDriver`]: l2net_core::SwitchDriver

pub mod classify;
pub mod factory;
pub mod raw_socket;
pub mod session;
pub mod templates;

pub use factory::{DriverConstructor, DriverFactory};
pub use raw_socket::RawSocketDriver;
pub use session::SessionDriver;
