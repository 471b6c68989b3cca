//! Command-line parsing and subcommand dispatch.

use std::ffi::OsString;
use std::io::{self, Write};

use clap::{Args, ErrorKind, Parser, Subcommand};
use log::debug;

use crate::console::{with_terminal, RawOutput};
use crate::echo::{self, Mode};
use crate::enumerate;
use crate::monitor::{LineReader, Monitor, Policy, SystemClock};
use crate::port::{Session, DEFAULT_BAUD_RATE};
use crate::send;
use crate::Result;

/// Printed when no subcommand, or an incomplete one, is given.
pub const SYNTAX: &str = "\
syntax:
  tube_serial_test list - list serial port names
  tube_serial_test recv PORTNAME [--policy sequential|repeated] - receive Acorn->PC data over PORTNAME
  tube_serial_test echo PORTNAME - print bytes received over PORTNAME and send them back
  tube_serial_test drain PORTNAME - print bytes received over PORTNAME
  tube_serial_test send PORTNAME - send keystrokes over PORTNAME until Escape
  Subcommands taking PORTNAME accept --baud RATE (default 115200). Data bits are set to 8;
  parity, stop bits and flow control are none/1/none and must match the other end.
";

const SUBCOMMANDS: &[&str] = &["list", "recv", "echo", "drain", "send", "help"];

/// Options clap answers by itself when they come first.
const LEADING_FLAGS: &[&str] = &["-h", "--help", "-V", "--version"];

#[derive(Debug, Parser)]
#[clap(name = "tube_serial_test", version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List serial port names
    List,
    /// Receive a test stream and check every byte
    Recv(RecvArgs),
    /// Print received bytes and send each one back
    Echo(PortArgs),
    /// Print received bytes
    Drain(PortArgs),
    /// Send keystrokes as bytes until Escape
    Send(PortArgs),
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct PortArgs {
    /// Port name, e.g. COM3 or ttyUSB0
    pub port: String,
    #[clap(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct RecvArgs {
    #[clap(flatten)]
    pub port: PortArgs,
    /// How received bytes are checked
    #[clap(short, long, arg_enum, default_value_t = Policy::Sequential)]
    pub policy: Policy,
}

/// What the process should do for a given command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Run(Command),
    /// Print [`SYNTAX`] and exit successfully.
    Syntax,
    /// The first argument is not a subcommand.
    Unrecognised(String),
}

/// Interprets a full argument list, program name included.
///
/// Subcommand names are case-insensitive. Errors are the ones clap reports itself, including
/// `--help` and `--version`.
pub fn parse<I, T>(args: I) -> std::result::Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let subcommand = match args.get(1) {
        Some(arg) => arg.to_string_lossy().into_owned(),
        None => return Ok(Invocation::Syntax),
    };
    if !LEADING_FLAGS.contains(&subcommand.as_str()) {
        let lowered = subcommand.to_ascii_lowercase();
        if !SUBCOMMANDS.contains(&lowered.as_str()) {
            return Ok(Invocation::Unrecognised(subcommand));
        }
        args[1] = lowered.into();
    }

    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Invocation::Run(cli.command)),
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::UnknownArgument
                    | ErrorKind::MissingSubcommand
            ) =>
        {
            debug!("incomplete command line: {}", e);
            Ok(Invocation::Syntax)
        }
        Err(e) => Err(e),
    }
}

/// Writes the single `FATAL: ` line for an error that ends the process.
///
/// The error's structure is only logged at debug level, so the default log filter leaves this as
/// the one line on stderr.
pub fn report_fatal<E, W>(error: &E, err: &mut W) -> io::Result<()>
where
    E: std::error::Error,
    W: Write,
{
    debug!("fatal: {:?}", error);
    writeln!(err, "FATAL: {}", error)
}

/// Runs a subcommand to completion. The port, if one was opened, is closed before this returns.
pub fn execute(command: Command) -> Result<()> {
    let stdout = io::stdout();
    match command {
        Command::List => enumerate::list(&enumerate::available_ports()?, &mut stdout.lock()),
        Command::Recv(args) => {
            let mut session = Session::open(&args.port.port, args.port.baud, &mut stdout.lock())?;
            writeln!(
                stdout.lock(),
                "Receiving on {} ({} policy). s: summary, q: quit",
                session.path(),
                args.policy
            )?;
            with_terminal(|console| {
                let reader = LineReader::new(session.line_mut());
                Monitor::new(reader, SystemClock, args.policy)
                    .run(console, &mut RawOutput::new(stdout.lock()))
            })
        }
        Command::Echo(args) => echo_or_drain(args, Mode::Echo),
        Command::Drain(args) => echo_or_drain(args, Mode::Drain),
        Command::Send(args) => {
            let mut session = Session::open(&args.port, args.baud, &mut stdout.lock())?;
            with_terminal(|console| {
                send::run(
                    session.line_mut(),
                    console,
                    &mut RawOutput::new(stdout.lock()),
                )
            })
            .map(drop)
        }
    }
}

fn echo_or_drain(args: PortArgs, mode: Mode) -> Result<()> {
    let stdout = io::stdout();
    let mut session = Session::open(&args.port, args.baud, &mut stdout.lock())?;
    writeln!(stdout.lock(), "Press any key to stop.")?;
    with_terminal(|console| {
        echo::run(
            session.line_mut(),
            mode,
            console,
            &mut RawOutput::new(stdout.lock()),
        )
    })
    .map(drop)
}
