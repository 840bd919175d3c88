//! Test doubles shared by unit tests inside the crate.
//!
//! Only compiled for `cargo test`; integration tests under `tests/` carry
//! their own support module and drive the public in-memory store instead.

pub mod clock;
pub mod notifications;
