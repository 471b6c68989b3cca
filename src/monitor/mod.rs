//! The receive monitor: reads a continuous stream and checks every byte of it.
//!
//! Reads go through an [`OverlappedRead`] driven as a two-state machine. When idle a read is
//! issued; if nothing is buffered yet the read becomes pending and is waited on for at most
//! [`WAIT_PERIOD`] at a time, printing how long it has been outstanding after each timeout. The
//! keyboard is polled after every wait and every processed batch, so `s` (summary) and `q` (quit)
//! are noticed within one wait period.

mod policy;
mod reader;

use std::io::Write;
use std::time::{Duration, Instant};

use log::{debug, info};

pub use self::policy::{Checker, Counters, Policy, Summary, Verdict};
pub use self::reader::{LineReader, OverlappedRead, Poll};

use crate::console::{Console, Key};
use crate::Result;

/// Size of each read request.
pub const READ_SIZE: usize = 1000;

/// Longest single wait on an outstanding read.
pub const WAIT_PERIOD: Duration = Duration::from_secs(1);

/// The sequential policy prints a running total each time this many more bytes have arrived.
pub const BYTES_PER_REPORT: u64 = 65536;

/// The repeated policy prints the summary each time this many more errors have been seen.
///
/// The check runs once per received batch, so a batch that crosses several multiples still prints
/// a single summary.
pub const ERRORS_PER_REPORT: u64 = 256;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadState {
    Idle,
    Pending { issued: Instant },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Request {
    Summary,
    Quit,
}

fn request_for(key: Key) -> Option<Request> {
    match key {
        Key::Byte(b's' | b'S' | b' ') => Some(Request::Summary),
        Key::Byte(b'q' | b'Q') | Key::Escape => Some(Request::Quit),
        Key::Byte(_) => None,
    }
}

/// State owned by one invocation of the receive monitor.
#[derive(Debug)]
pub struct Monitor<R, C> {
    reader: R,
    clock: C,
    checker: Checker,
    counters: Counters,
    total: u64,
}

impl<R: OverlappedRead, C: Clock> Monitor<R, C> {
    pub fn new(reader: R, clock: C, policy: Policy) -> Self {
        Monitor {
            reader,
            clock,
            checker: Checker::new(policy),
            counters: Counters::default(),
            total: 0,
        }
    }

    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Bytes processed so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Runs until the console asks to quit. Every I/O failure other than a wait timing out ends
    /// the run with an error.
    pub fn run<K: Console, W: Write>(&mut self, console: &mut K, out: &mut W) -> Result<()> {
        info!("receiving with {} policy", self.checker.policy());
        let mut buf = [0u8; READ_SIZE];
        let mut state = ReadState::Idle;

        loop {
            if state == ReadState::Idle {
                match self.reader.issue(&mut buf)? {
                    Poll::Ready(n) => self.process(&buf[..n], out)?,
                    Poll::Pending => {
                        state = ReadState::Pending {
                            issued: self.clock.now(),
                        }
                    }
                }
            }

            if let ReadState::Pending { issued } = state {
                match self.reader.wait(&mut buf, WAIT_PERIOD)? {
                    Poll::Ready(n) => {
                        state = ReadState::Idle;
                        self.process(&buf[..n], out)?;
                    }
                    Poll::Pending => {
                        let waited = self.clock.now().saturating_duration_since(issued);
                        writeln!(out, "Waiting for input: {:.3} secs", waited.as_secs_f64())?;
                    }
                }
            }

            match console.poll_key()?.and_then(request_for) {
                Some(Request::Summary) => write!(out, "{}", self.counters.summary())?,
                Some(Request::Quit) => {
                    if let ReadState::Pending { .. } = state {
                        debug!("quitting with no data outstanding");
                    }
                    write!(out, "{}", self.counters.summary())?;
                    return Ok(());
                }
                None => {}
            }
        }
    }

    fn process<W: Write>(&mut self, bytes: &[u8], out: &mut W) -> Result<()> {
        let errors_before = self.counters.total_errors();
        for &byte in bytes {
            let verdict = self.checker.check(byte);
            self.counters.record(byte, verdict);
            if let Verdict::Mismatch { expected, next } = verdict {
                writeln!(
                    out,
                    "Expected 0x{:02x}, got 0x{:02x} (will expect 0x{:02x} next)",
                    expected, byte, next
                )?;
            }
        }

        let total_before = self.total;
        self.total += bytes.len() as u64;

        match self.checker.policy() {
            Policy::Sequential => {
                if total_before / BYTES_PER_REPORT != self.total / BYTES_PER_REPORT {
                    writeln!(
                        out,
                        "Read {} bytes total. {} error(s)",
                        self.total,
                        self.counters.total_errors()
                    )?;
                }
            }
            Policy::Repeated => {
                let errors = self.counters.total_errors();
                if errors_before / ERRORS_PER_REPORT != errors / ERRORS_PER_REPORT {
                    write!(out, "{}", self.counters.summary())?;
                }
            }
        }
        Ok(())
    }
}
