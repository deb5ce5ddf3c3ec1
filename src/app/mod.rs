//! Application layer: the port traits the engine is written against and
//! the request codec the control surface speaks.
//!
//! Nothing here touches a pin or a socket.  Concrete sinks and notifiers
//! live in [`crate::adapters`].

pub mod commands;
pub mod ports;
