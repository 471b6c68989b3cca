//! In-memory stand-ins for the port, the terminal and the clock.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits};

use crate::console::{Console, Key};
use crate::monitor::Clock;
use crate::port::Line;
use crate::Result;

/// One step of scripted port input.
#[derive(Clone, Debug)]
pub(crate) enum Incoming {
    Data(Vec<u8>),
    Timeout,
}

#[derive(Debug)]
pub(crate) struct MockLine {
    pub incoming: VecDeque<Incoming>,
    pub sent: Vec<u8>,
    /// Length of `sent` at each flush.
    pub flushed_at: Vec<usize>,
    pub data_bits: DataBits,
    pub timeout: Duration,
    pub purged: Cell<bool>,
    pub fail_purge: bool,
    pub fail_set_data_bits: bool,
    pub ignore_set_data_bits: bool,
    pub short_write: bool,
}

impl Default for MockLine {
    fn default() -> Self {
        MockLine {
            incoming: VecDeque::new(),
            sent: Vec::new(),
            flushed_at: Vec::new(),
            data_bits: DataBits::Seven,
            timeout: Duration::ZERO,
            purged: Cell::new(false),
            fail_purge: false,
            fail_set_data_bits: false,
            ignore_set_data_bits: false,
            short_write: false,
        }
    }
}

impl MockLine {
    pub fn with_incoming<I: IntoIterator<Item = Incoming>>(incoming: I) -> Self {
        MockLine {
            incoming: incoming.into_iter().collect(),
            ..MockLine::default()
        }
    }
}

impl Read for MockLine {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.incoming.pop_front() {
            Some(Incoming::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.incoming.push_front(Incoming::Data(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Incoming::Timeout) | None => Err(io::ErrorKind::TimedOut.into()),
        }
    }
}

impl Write for MockLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.short_write {
            return Ok(0);
        }
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed_at.push(self.sent.len());
        Ok(())
    }
}

impl Line for MockLine {
    fn set_data_bits(&mut self, data_bits: DataBits) -> serialport::Result<()> {
        if self.fail_set_data_bits {
            return Err(serialport::Error::new(
                serialport::ErrorKind::InvalidInput,
                "byte size rejected",
            ));
        }
        if !self.ignore_set_data_bits {
            self.data_bits = data_bits;
        }
        Ok(())
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        Ok(self.data_bits)
    }

    fn clear(&self, _buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
        if self.fail_purge {
            return Err(serialport::Error::new(
                serialport::ErrorKind::Io(io::ErrorKind::Other),
                "purge rejected",
            ));
        }
        self.purged.set(true);
        Ok(())
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        Ok(match self.incoming.front() {
            Some(Incoming::Data(bytes)) => bytes.len() as u32,
            _ => 0,
        })
    }

    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.timeout = timeout;
        Ok(())
    }
}

/// A terminal that replays keystrokes.
///
/// `None` entries make a poll come back empty. Once the script runs out every poll and read
/// yields Escape, which ends all of the loops.
#[derive(Debug, Default)]
pub(crate) struct MockConsole {
    pub keys: VecDeque<Option<Key>>,
}

impl MockConsole {
    pub fn new<I: IntoIterator<Item = Option<Key>>>(keys: I) -> Self {
        MockConsole {
            keys: keys.into_iter().collect(),
        }
    }

    /// `polls` empty polls, then Escape.
    pub fn idle(polls: usize) -> Self {
        MockConsole::new(std::iter::repeat(None).take(polls))
    }
}

impl Console for MockConsole {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        Ok(self.keys.pop_front().unwrap_or(Some(Key::Escape)))
    }

    fn read_key(&mut self) -> Result<Key> {
        loop {
            match self.keys.pop_front() {
                Some(Some(key)) => return Ok(key),
                Some(None) => continue,
                None => return Ok(Key::Escape),
            }
        }
    }
}

/// A clock that moves forward by `step` every time it is read.
#[derive(Debug)]
pub(crate) struct FakeClock {
    start: Instant,
    step: Duration,
    reads: Cell<u32>,
}

impl FakeClock {
    pub fn new(step: Duration) -> Self {
        FakeClock {
            start: Instant::now(),
            step,
            reads: Cell::new(0),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let reads = self.reads.get() + 1;
        self.reads.set(reads);
        self.start + self.step * reads
    }
}
