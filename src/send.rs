//! Send keystrokes as raw bytes.

use std::io::Write;

use log::info;

use crate::console::{Console, Key};
use crate::display::ByteValue;
use crate::port::Line;
use crate::{Error, Result};

/// Sends one byte per keystroke until Escape, returning the number of bytes sent.
///
/// Each byte is flushed through to the port before the next keystroke is read.
pub fn run<L, K, W>(line: &mut L, console: &mut K, out: &mut W) -> Result<u64>
where
    L: Line,
    K: Console,
    W: Write,
{
    writeln!(out, "Press Escape to stop.")?;
    let mut sent = 0u64;
    loop {
        let byte = match console.read_key()? {
            Key::Escape => {
                info!("sent {} byte(s)", sent);
                return Ok(sent);
            }
            Key::Byte(byte) => byte,
        };

        writeln!(out, "{}", ByteValue(byte))?;
        let written = line.write(&[byte]).map_err(Error::io("write"))?;
        if written != 1 {
            return Err(Error::ShortWrite(written));
        }
        line.flush().map_err(Error::io("flush"))?;
        sent += 1;
    }
}
