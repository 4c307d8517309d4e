//! Startup configuration read from the vendor calculation input file.
//!
//! The numeric engine's input deck (`tccfcalc.in`) is a fixed key/value
//! format; the emulator only needs the analyzer channel count from it.

use crate::error::{AppResult, McaError};
use std::path::Path;

/// Key carrying the analyzer channel count in `tccfcalc.in`.
const CHANNELS_KEY: &str = "AN_N_ch";

/// Read the analyzer channel count from `tccfcalc.in`.
pub fn read_channels(path: impl AsRef<Path>) -> AppResult<usize> {
    let text = std::fs::read_to_string(path.as_ref())?;
    for line in text.lines() {
        if !line.trim_start().starts_with(CHANNELS_KEY) {
            continue;
        }
        let value = line
            .split_once('=')
            .map(|(_, v)| v.trim())
            .ok_or_else(|| McaError::Config(format!("malformed {CHANNELS_KEY} line: {line:?}")))?;
        return value
            .parse()
            .map_err(|_| McaError::Config(format!("invalid {CHANNELS_KEY} value: {value:?}")));
    }
    Err(McaError::Config(format!(
        "there is no analyzer ({CHANNELS_KEY}) in {}",
        path.as_ref().display()
    )))
}
