//! Keystrokes from the controlling terminal.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::{debug, warn};

use crate::{Error, Result};

/// A keystroke as the subcommands see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// A key that maps to a single byte.
    Byte(u8),
    Escape,
}

/// Source of keystrokes.
pub trait Console {
    /// Returns a pending keystroke without blocking.
    fn poll_key(&mut self) -> Result<Option<Key>>;

    /// Blocks until a keystroke arrives.
    fn read_key(&mut self) -> Result<Key>;
}

/// Translates a terminal key event.
///
/// ASCII characters map to themselves and Ctrl+letter to the matching control code. Enter, Tab
/// and Backspace give CR, HT and BS. Key releases and keys without a byte value are dropped.
pub fn key_from_event(event: KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    match event.code {
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Enter => Some(Key::Byte(b'\r')),
        KeyCode::Tab => Some(Key::Byte(b'\t')),
        KeyCode::Backspace => Some(Key::Byte(0x08)),
        KeyCode::Char(c) if c.is_ascii() => {
            let byte = c as u8;
            if event.modifiers.contains(KeyModifiers::CONTROL) && byte.is_ascii_alphabetic() {
                Some(Key::Byte(byte.to_ascii_uppercase() & 0x1f))
            } else {
                Some(Key::Byte(byte))
            }
        }
        _ => None,
    }
}

/// The process's terminal, read through crossterm in raw mode.
///
/// Only obtainable through [`with_terminal`], which owns the raw-mode switch.
#[derive(Debug)]
pub struct TerminalConsole {
    _raw: (),
}

impl Console for TerminalConsole {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        while event::poll(Duration::ZERO).map_err(Error::Console)? {
            if let Event::Key(key) = event::read().map_err(Error::Console)? {
                if let Some(key) = key_from_event(key) {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }

    fn read_key(&mut self) -> Result<Key> {
        loop {
            if let Event::Key(key) = event::read().map_err(Error::Console)? {
                if let Some(key) = key_from_event(key) {
                    return Ok(key);
                }
            }
        }
    }
}

/// Runs `f` with the terminal in raw mode, restoring it however `f` returns.
pub fn with_terminal<T, F>(f: F) -> Result<T>
where
    F: FnOnce(&mut TerminalConsole) -> Result<T>,
{
    terminal::enable_raw_mode().map_err(Error::Console)?;
    debug!("terminal in raw mode");
    let _restore = scopeguard::guard((), |()| {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("could not restore terminal mode: {}", e);
        }
    });
    f(&mut TerminalConsole { _raw: () })
}

/// Writer that turns `\n` into `\r\n`.
///
/// Raw mode switches off output post-processing on Unix, so reports written while a
/// [`TerminalConsole`] is live go through this.
#[derive(Debug)]
pub struct RawOutput<W> {
    inner: W,
}

impl<W: Write> RawOutput<W> {
    pub fn new(inner: W) -> Self {
        RawOutput { inner }
    }
}

impl<W: Write> Write for RawOutput<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            match chunk.split_last() {
                Some((b'\n', line)) => {
                    self.inner.write_all(line)?;
                    self.inner.write_all(b"\r\n")?;
                }
                _ => self.inner.write_all(chunk)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
