//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly by `main`; this module only
//! covers the optional TLS termination in front of the router.

pub mod tls;
