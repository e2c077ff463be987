//! Soba command-line host
//!
//! Registers class manifests with a runtime and builds instances from them.

mod commands;
mod manifest;
mod output;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use commands::{check, new};
use output::{resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "soba")]
#[command(about = "Soba class manifests: check and instantiate", long_about = None)]
#[command(version)]
struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    /// Runtime options file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parentless manifest classes do not inherit inheritable:1
    #[arg(long, global = true)]
    no_base: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register manifests and print every class
    Check {
        /// Manifest files, registered in order
        #[arg(required = true)]
        manifests: Vec<PathBuf>,
    },

    /// Register a manifest and instantiate one of its classes
    New {
        /// Manifest file
        manifest: PathBuf,
        /// Class to instantiate (name:version)
        class: String,
        /// Number of instances
        #[arg(short, long, default_value_t = 1)]
        count: usize,
        /// Initial value as key=value (repeatable)
        #[arg(long)]
        set: Vec<String>,
    },
}

fn setup_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("soba_engine=debug,soba_cli=debug,info"),
        _ => EnvFilter::new("soba_engine=trace,soba_cli=trace,debug"),
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut out = StyledOutput::new(resolve_color_choice(Some(cli.color.as_str())));
    if let Err(e) = run(cli, &mut out) {
        out.report_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let runtime = commands::runtime(cli.config.as_deref())?;
    let implicit_base = !cli.no_base;

    match cli.command {
        Commands::Check { manifests } => check::execute(
            &runtime,
            check::CheckArgs {
                manifests,
                implicit_base,
            },
            out,
        ),

        Commands::New {
            manifest,
            class,
            count,
            set,
        } => new::execute(
            &runtime,
            new::NewArgs {
                manifest,
                class,
                count,
                set,
                implicit_base,
            },
            out,
        ),
    }
}
