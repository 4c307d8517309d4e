//! Core library for the rust_mca emulator.
//!
//! This library contains the traits, data structures, acquisition engine and
//! TCP server that make a simulated multichannel analyzer (MCA) look like a
//! network-addressable LSRM device. It is used by the `rust_mca` binary and
//! by the integration tests.

pub mod acquisition;
pub mod config;
pub mod core;
pub mod error;
pub mod nuclide;
pub mod physics;
pub mod protocol;
pub mod registry;
pub mod server;
