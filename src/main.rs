use std::path::PathBuf;
use std::process::ExitCode;

use allconfig::{print_error, run, should_use_colors, Config, OutputContext, OutputMode};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "allconfig")]
#[command(
    version,
    about = "Flatten an include-based printer config into the config the firmware actually sees"
)]
struct Cli {
    /// Root printer config file (e.g. printer.cfg)
    config: PathBuf,

    /// Write the flattened config here (overrides [allconfig] output)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Check only (no writing), exit 1 if the output file is stale
    #[arg(short, long)]
    check: bool,

    /// Show changes to the output file in diff format
    #[arg(short, long)]
    diff: bool,

    /// Output only the changed file name
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show debug logging and up-to-date files
    #[arg(short, long)]
    verbose: bool,

    /// Print the flattened config to stdout instead of writing it
    #[arg(long, conflicts_with_all = ["json", "check", "diff"])]
    stdout: bool,

    /// Print section provenance as JSON instead of writing
    #[arg(long, conflicts_with_all = ["check", "diff"])]
    json: bool,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let output_mode = if cli.stdout {
        OutputMode::Stdout
    } else if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else if cli.diff {
        OutputMode::Diff
    } else {
        OutputMode::Normal
    };

    let ctx = OutputContext::new(
        output_mode,
        should_use_colors(cli.color, cli.no_color),
        cli.verbose,
    );

    let config = Config {
        check_only: cli.check,
        output_mode,
        output: cli.output,
    };

    match run(&cli.config, &config, &ctx) {
        Ok(result) => {
            if result.failed_handlers > 0 {
                print_error("could not write the flattened config", &ctx);
            }
            if result.has_problems(config.check_only) {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            print_error(&e.to_string(), &ctx);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "allconfig=debug"
    } else if quiet {
        "allconfig=error"
    } else {
        "allconfig=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
