#![deny(missing_docs)]

//! Entry point for the `seqsubmit` command-line client.
use seqsubmit::{cli, logging};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), cli::CliError> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let invocation = cli::parse_args(std::env::args().skip(1).collect())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::run(invocation, &mut out)
}
