use std::fmt;
use std::io;

use serialport::ErrorKind;

/// Errors that end a subcommand.
///
/// Every variant is fatal: the dispatcher prints it prefixed with `FATAL: ` and exits with a
/// non-zero status. Advisory conditions (a failed purge, stream mismatches) are never turned into
/// an `Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The port could not be opened.
    #[error("Failed to open ``{path}'': {source}")]
    Open {
        path: String,
        #[source]
        source: OsError,
    },

    /// Querying or setting the line configuration failed.
    #[error("{op} failed: {source}")]
    Configure {
        op: &'static str,
        #[source]
        source: OsError,
    },

    /// The port reported framing other than 8 data bits after it was requested.
    #[error("port reports {0} data bits after requesting 8")]
    Framing(u8),

    /// A read, write, flush or wait on the port failed.
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The host could not enumerate serial ports.
    #[error("serial port enumeration failed: {0}")]
    Enumerate(#[source] OsError),

    /// Enumeration succeeded but found nothing.
    #[error("No serial ports found")]
    NoPorts,

    /// A single-byte write moved some other number of bytes.
    #[error("wrote {0} bytes, expected 1")]
    ShortWrite(usize),

    /// Writing the human-readable report failed.
    #[error("writing output failed: {0}")]
    Output(#[from] io::Error),

    /// Reading from or configuring the controlling terminal failed.
    #[error("console: {0}")]
    Console(#[source] io::Error),
}

impl Error {
    pub(crate) fn io(op: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Io { op, source }
    }

    pub(crate) fn configure(op: &'static str) -> impl FnOnce(serialport::Error) -> Error {
        move |source| Error::Configure {
            op,
            source: OsError::capture(source),
        }
    }
}

/// A port library error together with the OS error code behind it, when there is one.
///
/// `serialport::Error` keeps only a description, so the code is read back from the thread's last
/// OS error straight after the failing call.
#[derive(Debug)]
pub struct OsError {
    source: serialport::Error,
    code: Option<i32>,
}

impl OsError {
    pub(crate) fn new(source: serialport::Error, code: Option<i32>) -> Self {
        OsError { source, code }
    }

    /// Must run before anything else touches the OS on this thread.
    pub(crate) fn capture(source: serialport::Error) -> Self {
        let code = match source.kind() {
            ErrorKind::Io(_) | ErrorKind::NoDevice => io::Error::last_os_error()
                .raw_os_error()
                .filter(|&code| code != 0),
            _ => None,
        };
        OsError::new(source, code)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source.description)?;
        if let Some(code) = self.code {
            write!(f, " (os error {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for OsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A specialized `Result` type for port diagnostics.
pub type Result<T> = std::result::Result<T, Error>;
