//! codesync CLI entry point.

use clap::Parser;
use codesync::cli::commands;
use codesync::cli::{Cli, Commands};
use codesync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet, cli.debug);

    // Run the command and handle errors
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_structured_json());
            } else if let Some(hint) = e.hint() {
                eprintln!("Error: {e}\n  Hint: {hint}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool, debug: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        match verbose {
            0 | 1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,hyper=info,reqwest=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Start(args) => commands::start::execute(args, config, cli.json),

        Commands::History {
            file,
            limit,
            changelog_dir,
        } => commands::history::execute(file, *limit, changelog_dir.as_deref(), config, cli.json),

        Commands::Status {
            changelog_dir,
            pid_file,
        } => commands::status::execute(changelog_dir.as_deref(), pid_file.as_deref(), config, cli.json),

        Commands::Version => commands::version::execute(cli.json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
