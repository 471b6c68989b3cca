//! Print incoming bytes one at a time, optionally sending each one straight back.

use std::io::{self, Write};
use std::time::Duration;

use log::{debug, info};

use crate::console::Console;
use crate::display::ByteValue;
use crate::port::Line;
use crate::{Error, Result};

/// How long a single-byte read blocks before the keyboard is checked again.
pub const KEY_CHECK_PERIOD: Duration = Duration::from_millis(100);

/// A running total is printed each time this many more bytes have arrived.
pub const BYTES_PER_TOTAL: u64 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Write every received byte back and flush it before the next read.
    Echo,
    /// Only print.
    Drain,
}

/// Runs until any key is pressed and returns the number of bytes received.
pub fn run<L, K, W>(line: &mut L, mode: Mode, console: &mut K, out: &mut W) -> Result<u64>
where
    L: Line,
    K: Console,
    W: Write,
{
    line.set_timeout(KEY_CHECK_PERIOD).map_err(|e| Error::Io {
        op: "read",
        source: e.into(),
    })?;
    info!("{:?} loop started", mode);

    let mut total = 0u64;
    let mut byte = [0u8; 1];
    loop {
        if let Some(key) = console.poll_key()? {
            debug!("stopped by {:?}", key);
            writeln!(out, "{} byte(s) received", total)?;
            return Ok(total);
        }

        match line.read(&mut byte) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(Error::io("read")(e)),
        }

        writeln!(out, "{}", ByteValue(byte[0]))?;
        if mode == Mode::Echo {
            line.write_all(&byte).map_err(Error::io("write"))?;
            line.flush().map_err(Error::io("flush"))?;
        }

        total += 1;
        if total % BYTES_PER_TOTAL == 0 {
            writeln!(out, "{} byte(s) so far", total)?;
        }
    }
}
