//! Custom error types for the application.
//!
//! This module defines the primary error type, `McaError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of errors that can occur,
//! from configuration and I/O issues to numeric-engine faults.
//!
//! ## Error Hierarchy
//!
//! - **`Prepare`**: the numeric engine rejected its initial configuration.
//!   This is fatal: it surfaces at engine construction and no device is
//!   registered. The numeric code is kept so the vendor error table can be
//!   consulted (see [`prepare_error_message`]).
//! - **`CalcStep`**: a calculation step failed during background production.
//!   Engine-fatal but process-survivable: the engine's background task logs
//!   it and terminates, the device stays registered.
//! - **`Protocol`**: malformed JSON or a missing required argument on one
//!   request. Connection-local and recoverable; the server answers with a
//!   `result:false` envelope and keeps reading.
//! - **`Config`** / **`Nuclide`** / **`Io`**: startup-time problems reading
//!   the vendor configuration file or parsing the nuclide designation.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, McaError>;

#[derive(Error, Debug)]
pub enum McaError {
    #[error("Prepare error #{code}: {}", prepare_error_message(*code))]
    Prepare { code: i32 },

    #[error("Error #{code} in spectrum emulation")]
    CalcStep { code: i32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid nuclide: {0}")]
    Nuclide(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Human-readable message for a numeric-engine prepare error code.
///
/// The codes mirror the vendor calculation library's prepare diagnostics.
pub fn prepare_error_message(code: i32) -> &'static str {
    match code {
        1 => "unknown nuclide: no decay data for the requested (Z, A, M)",
        2 => "invalid atomic number Z",
        3 => "invalid mass number A for the requested Z",
        4 => "invalid metastable index M",
        5 => "analyzer channel count must be positive",
        _ => "unspecified prepare failure",
    }
}
