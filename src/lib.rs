//! Diagnostics for a serial port wired to a Tube serial link.
//!
//! The binary lists ports, checks a received test stream byte by byte, echoes or drains incoming
//! bytes, and sends keystrokes. Each subcommand owns one [`port::Session`] for its whole run and
//! closes it on every return path. All failures surface as [`Error`] and are turned into a
//! non-zero exit status by the binary, never deeper down.
//!
//! Only the byte size of the port is configured (8 data bits). The remaining line settings come
//! from the port library's defaults plus the `--baud` argument, so both ends of the link must be
//! set up to match before testing.

#![deny(clippy::dbg_macro, missing_debug_implementations, unused)]

pub mod cli;
pub mod console;
pub mod display;
pub mod echo;
pub mod enumerate;
mod error;
pub mod monitor;
pub mod port;
pub mod send;
#[cfg(test)]
mod testing;

pub use crate::error::{Error, OsError, Result};
