//! Opening and preparing a serial port for a diagnostic session.
//!
//! Only the byte size is touched here. Parity, stop bits and flow control stay at the values the
//! port library applies on open, and the baud rate is whatever the caller asks for. Both ends of
//! the link have to agree on those before any of the subcommands can produce meaningful output.

use std::io::{Read, Write};
use std::time::Duration;

use cfg_if::cfg_if;
use log::{debug, info, warn};
use serialport::{ClearBuffer, DataBits, SerialPort};

use crate::error::OsError;
use crate::{Error, Result};

/// The subset of [`SerialPort`] the subcommands drive.
///
/// Loops are written against this trait rather than `Box<dyn SerialPort>` so they can run over an
/// in-memory line in tests.
pub trait Line: Read + Write {
    /// Sets the number of data bits per character.
    fn set_data_bits(&mut self, data_bits: DataBits) -> serialport::Result<()>;

    /// Returns the number of data bits per character currently in effect.
    fn data_bits(&self) -> serialport::Result<DataBits>;

    /// Discards data buffered by the driver.
    fn clear(&self, buffer_to_clear: ClearBuffer) -> serialport::Result<()>;

    /// Returns the number of bytes that can be read without blocking.
    fn bytes_to_read(&self) -> serialport::Result<u32>;

    /// Sets how long a read may block before failing with [`std::io::ErrorKind::TimedOut`].
    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()>;
}

impl Line for Box<dyn SerialPort> {
    fn set_data_bits(&mut self, data_bits: DataBits) -> serialport::Result<()> {
        (**self).set_data_bits(data_bits)
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        (**self).data_bits()
    }

    fn clear(&self, buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
        (**self).clear(buffer_to_clear)
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        (**self).bytes_to_read()
    }

    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        (**self).set_timeout(timeout)
    }
}

/// Baud rate used when none is given on the command line.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Initial read timeout. The loops set their own before they start reading.
const OPEN_TIMEOUT: Duration = Duration::from_secs(1);

cfg_if! {
    if #[cfg(windows)] {
        /// Maps a short port name to the device path handed to the OS.
        ///
        /// `COM3` and `3` both become `\\.\COM3`; paths already in device namespace are kept.
        pub fn device_path(name: &str) -> String {
            if name.starts_with(r"\\.\") {
                name.to_owned()
            } else if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                format!(r"\\.\COM{}", name)
            } else {
                format!(r"\\.\{}", name)
            }
        }
    } else {
        /// Maps a short port name to the device path handed to the OS.
        ///
        /// `0` becomes `/dev/ttyS0`, `ttyUSB0` becomes `/dev/ttyUSB0` and absolute paths are kept.
        pub fn device_path(name: &str) -> String {
            if name.starts_with('/') {
                name.to_owned()
            } else if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                format!("/dev/ttyS{}", name)
            } else {
                format!("/dev/{}", name)
            }
        }
    }
}

fn data_bits_count(data_bits: DataBits) -> u8 {
    match data_bits {
        DataBits::Five => 5,
        DataBits::Six => 6,
        DataBits::Seven => 7,
        DataBits::Eight => 8,
    }
}

/// An open port with 8-bit framing and clean buffers.
///
/// The port is closed when the session is dropped, which happens on every return path of the
/// subcommand that owns it, including error propagation.
#[derive(Debug)]
pub struct Session<L: Line> {
    line: L,
    path: String,
}

impl Session<Box<dyn SerialPort>> {
    /// Opens the port called `name` at `baud_rate` and prepares it with [`Session::prepare`].
    pub fn open<W: Write>(name: &str, baud_rate: u32, out: &mut W) -> Result<Self> {
        let path = device_path(name);
        let line = serialport::new(&path, baud_rate)
            .timeout(OPEN_TIMEOUT)
            .open()
            .map_err(|source| Error::Open {
                path: path.clone(),
                source: OsError::capture(source),
            })?;
        info!("opened {} at {} baud", path, baud_rate);
        Session::prepare(line, path, out)
    }
}

impl<L: Line> Session<L> {
    /// Requests 8 data bits and purges both directions.
    ///
    /// Failing to read or change the framing is fatal. A failed purge is reported on `out` and
    /// the session carries on.
    pub fn prepare<W: Write>(mut line: L, path: String, out: &mut W) -> Result<Self> {
        let previous = line
            .data_bits()
            .map_err(Error::configure("get data bits"))?;
        debug!("{}: {} data bits before configuration", path, data_bits_count(previous));

        line.set_data_bits(DataBits::Eight)
            .map_err(Error::configure("set data bits"))?;
        match line
            .data_bits()
            .map_err(Error::configure("get data bits"))?
        {
            DataBits::Eight => {}
            other => return Err(Error::Framing(data_bits_count(other))),
        }

        if let Err(e) = line.clear(ClearBuffer::All) {
            warn!("{}: purge failed: {}", path, e);
            writeln!(out, "purge failed: {}", e)?;
        }

        Ok(Session { line, path })
    }

    /// The device path this session was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn line(&self) -> &L {
        &self.line
    }

    pub fn line_mut(&mut self) -> &mut L {
        &mut self.line
    }
}

impl<L: Line> Drop for Session<L> {
    fn drop(&mut self) {
        // The handle is released either way.
        if let Err(e) = self.line.flush() {
            warn!("{}: flush on close failed: {}", self.path, e);
        }
        info!("closing {}", self.path);
    }
}
