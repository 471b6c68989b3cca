use std::fmt;

/// How each received byte is judged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ArgEnum)]
pub enum Policy {
    /// The sender counts 0, 1, 2, ... wrapping at 256. A byte other than the expected one is an
    /// error, and the count resynchronises on it.
    #[default]
    Sequential,
    /// A byte equal to the one just before it is an error; anything else is a good transfer.
    Repeated,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Sequential => f.write_str("sequential"),
            Policy::Repeated => f.write_str("repeated"),
        }
    }
}

/// The verdict on one received byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Transfer,
    /// Sequential policy only: `expected` was due, and `next` is due now.
    Mismatch { expected: u8, next: u8 },
    /// Repeated policy only: the byte equals its predecessor.
    Repeat,
}

impl Verdict {
    pub fn is_error(self) -> bool {
        !matches!(self, Verdict::Transfer)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Sequential { next_expected: u8 },
    Repeated { last: Option<u8> },
}

/// Carries the expected-value state for one run of the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checker {
    state: State,
}

impl Checker {
    pub fn new(policy: Policy) -> Self {
        let state = match policy {
            Policy::Sequential => State::Sequential { next_expected: 0 },
            Policy::Repeated => State::Repeated { last: None },
        };
        Checker { state }
    }

    pub fn policy(&self) -> Policy {
        match self.state {
            State::Sequential { .. } => Policy::Sequential,
            State::Repeated { .. } => Policy::Repeated,
        }
    }

    /// The byte the sequential policy expects next; `None` under the repeated policy.
    pub fn next_expected(&self) -> Option<u8> {
        match self.state {
            State::Sequential { next_expected } => Some(next_expected),
            State::Repeated { .. } => None,
        }
    }

    pub fn check(&mut self, byte: u8) -> Verdict {
        match &mut self.state {
            State::Sequential { next_expected } => {
                if byte == *next_expected {
                    *next_expected = next_expected.wrapping_add(1);
                    Verdict::Transfer
                } else {
                    let expected = *next_expected;
                    *next_expected = byte.wrapping_add(1);
                    Verdict::Mismatch {
                        expected,
                        next: *next_expected,
                    }
                }
            }
            State::Repeated { last } => {
                let verdict = if *last == Some(byte) {
                    Verdict::Repeat
                } else {
                    Verdict::Transfer
                };
                *last = Some(byte);
                verdict
            }
        }
    }
}

/// Per-value transfer and error counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counters {
    transfers: [u64; 256],
    errors: [u64; 256],
}

impl Default for Counters {
    fn default() -> Self {
        Counters {
            transfers: [0; 256],
            errors: [0; 256],
        }
    }
}

impl Counters {
    pub fn record(&mut self, byte: u8, verdict: Verdict) {
        if verdict.is_error() {
            self.errors[usize::from(byte)] += 1;
        } else {
            self.transfers[usize::from(byte)] += 1;
        }
    }

    pub fn transfers(&self, byte: u8) -> u64 {
        self.transfers[usize::from(byte)]
    }

    pub fn errors(&self, byte: u8) -> u64 {
        self.errors[usize::from(byte)]
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.iter().sum()
    }

    pub fn total(&self) -> u64 {
        self.transfers.iter().sum::<u64>() + self.total_errors()
    }

    /// Lists the values with at least one error as `0xVV: errors/transfers`.
    pub fn summary(&self) -> Summary<'_> {
        Summary(self)
    }
}

#[derive(Debug)]
pub struct Summary<'a>(&'a Counters);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counters = self.0;
        writeln!(
            f,
            "Summary: {} bytes, {} error(s)",
            counters.total(),
            counters.total_errors()
        )?;
        for byte in 0..=u8::MAX {
            let errors = counters.errors(byte);
            if errors != 0 {
                writeln!(f, "  0x{:02x}: {}/{}", byte, errors, counters.transfers(byte))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn run(policy: Policy, bytes: &[u8]) -> (Checker, Counters) {
        let mut checker = Checker::new(policy);
        let mut counters = Counters::default();
        for &byte in bytes {
            counters.record(byte, checker.check(byte));
        }
        (checker, counters)
    }

    #[quickcheck]
    fn sequential_stream_without_gaps_has_no_errors(len: u16) -> bool {
        let bytes: Vec<u8> = (0..usize::from(len)).map(|i| i as u8).collect();
        let (checker, counters) = run(Policy::Sequential, &bytes);
        counters.total_errors() == 0
            && checker.next_expected() == Some((usize::from(len) % 256) as u8)
    }

    #[quickcheck]
    fn repeated_policy_counts_every_byte_once(bytes: Vec<u8>) -> bool {
        let (_, counters) = run(Policy::Repeated, &bytes);
        counters.total() == bytes.len() as u64
    }

    #[quickcheck]
    fn repeated_policy_flags_exactly_the_duplicates(bytes: Vec<u8>) -> bool {
        let mut checker = Checker::new(Policy::Repeated);
        let mut previous = None;
        bytes.iter().all(|&byte| {
            let verdict = checker.check(byte);
            let expected = if previous == Some(byte) {
                Verdict::Repeat
            } else {
                Verdict::Transfer
            };
            previous = Some(byte);
            verdict == expected
        })
    }

    #[test]
    fn sequential_mismatch_resynchronises_on_received_byte() {
        let mut checker = Checker::new(Policy::Sequential);
        assert_eq!(checker.check(0), Verdict::Transfer);
        assert_eq!(
            checker.check(5),
            Verdict::Mismatch {
                expected: 1,
                next: 6
            }
        );
        assert_eq!(checker.check(6), Verdict::Transfer);
        assert_eq!(
            checker.check(0xff),
            Verdict::Mismatch {
                expected: 7,
                next: 0
            }
        );
        assert_eq!(checker.check(0), Verdict::Transfer);
    }

    #[test]
    fn repeated_policy_first_byte_is_a_transfer() {
        let (_, counters) = run(Policy::Repeated, &[7, 7, 7, 8]);
        assert_eq!(counters.transfers(7), 1);
        assert_eq!(counters.errors(7), 2);
        assert_eq!(counters.transfers(8), 1);
        assert_eq!(counters.errors(8), 0);
    }

    #[test]
    fn summary_lists_only_values_with_errors() {
        let (_, counters) = run(Policy::Repeated, &[1, 1, 2, 3, 3, 3, 1]);
        assert_eq!(
            counters.summary().to_string(),
            "Summary: 7 bytes, 3 error(s)\n  0x01: 1/2\n  0x03: 2/1\n"
        );
    }

    #[test]
    fn summary_of_clean_run_has_no_entries() {
        let (_, counters) = run(Policy::Sequential, &[0, 1, 2]);
        assert_eq!(counters.summary().to_string(), "Summary: 3 bytes, 0 error(s)\n");
    }
}
