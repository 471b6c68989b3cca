use std::io;
use std::time::Duration;

use log::trace;

use crate::port::Line;
use crate::{Error, Result};

/// Outcome of issuing or waiting on a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Poll {
    /// The read finished and filled this many bytes of the buffer.
    Ready(usize),
    /// Nothing has arrived yet; the read is still outstanding.
    Pending,
}

/// A read that can be started without blocking and completed with a bounded wait.
pub trait OverlappedRead {
    /// Starts a read into `buf`. Completes straight away if the driver already holds data.
    fn issue(&mut self, buf: &mut [u8]) -> Result<Poll>;

    /// Waits up to `timeout` for the outstanding read to complete into `buf`.
    fn wait(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Poll>;
}

/// [`OverlappedRead`] over a [`Line`].
///
/// Issuing checks the driver's input queue. Waiting is a read with the port timeout set to the
/// wait period, so no read is ever left in flight between calls and the port can be closed at
/// any point the caller regains control.
#[derive(Debug)]
pub struct LineReader<'a, L: Line> {
    line: &'a mut L,
    timeout: Option<Duration>,
}

impl<'a, L: Line> LineReader<'a, L> {
    pub fn new(line: &'a mut L) -> Self {
        LineReader {
            line,
            timeout: None,
        }
    }

    fn read(&mut self, buf: &mut [u8], op: &'static str) -> Result<Poll> {
        match self.line.read(buf) {
            Ok(n) => Ok(Poll::Ready(n)),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Poll::Pending),
            Err(e) => Err(Error::io(op)(e)),
        }
    }
}

impl<L: Line> OverlappedRead for LineReader<'_, L> {
    fn issue(&mut self, buf: &mut [u8]) -> Result<Poll> {
        let available = self.line.bytes_to_read().map_err(|e| Error::Io {
            op: "read",
            source: e.into(),
        })?;
        if available == 0 {
            trace!("read pending");
            return Ok(Poll::Pending);
        }
        self.read(buf, "read")
    }

    fn wait(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Poll> {
        if self.timeout != Some(timeout) {
            self.line.set_timeout(timeout).map_err(|e| Error::Io {
                op: "wait",
                source: e.into(),
            })?;
            self.timeout = Some(timeout);
        }
        self.read(buf, "wait")
    }
}
