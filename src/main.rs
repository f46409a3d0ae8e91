use clap::Parser;
use gethttp::RetrieverBuilder;
use gethttp::telemetry::setup_tracing;
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

/// Retrieve a file from a server and write it to stdout.
#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// name or address of the server
    pub server: String,
    /// full path of the resource to retrieve
    pub path: String,
    /// give up when connecting or waiting for data takes longer than SECS
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
    /// log level (v: info, vv: debug, vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn main() -> ExitCode {
    let commandline = CommandLine::parse();

    setup_tracing(commandline.verbose);

    let mut builder = RetrieverBuilder::new();
    if let Some(secs) = commandline.timeout {
        let timeout = Duration::from_secs(secs);
        builder = builder.read_timeout(timeout).connect_timeout(timeout);
    }

    let mut retriever = match builder.build() {
        Ok(retriever) => retriever,
        Err(err) => {
            error!("cannot create reactor: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Errors are reported where they are detected; only the status is left.
    match retriever.retrieve(&commandline.server, &commandline.path, io::stdout()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(err.exit_code() as u8),
    }
}
