use std::io;
use std::process;

use env_logger::Env;

use tube_serial_test::cli::{self, Invocation, SYNTAX};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let code = match cli::parse(std::env::args_os()) {
        Ok(Invocation::Syntax) => {
            print!("{}", SYNTAX);
            0
        }
        Ok(Invocation::Unrecognised(name)) => {
            eprintln!("FATAL: unrecognised subcommand: {}", name);
            1
        }
        Ok(Invocation::Run(command)) => match cli::execute(command) {
            Ok(()) => 0,
            Err(e) => {
                // Nothing more can be reported if stderr itself is gone.
                let _ = cli::report_fatal(&e, &mut io::stderr().lock());
                1
            }
        },
        Err(e) => e.exit(),
    };
    process::exit(code);
}
