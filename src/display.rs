use std::fmt;

/// Formats a byte as `DDD (0xHH)`, followed by ` ('c')` when it is printable ASCII.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteValue(pub u8);

impl fmt::Display for ByteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03} (0x{:02x})", self.0, self.0)?;
        if (0x20..=0x7e).contains(&self.0) {
            write!(f, " ('{}')", self.0 as char)?;
        }
        Ok(())
    }
}
