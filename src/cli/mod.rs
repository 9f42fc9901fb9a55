//! Command line interface for fit-rs

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

mod dump;
mod extract;
mod palette;

pub use palette::AnsiPalette;

/// Command line arguments for fit-rs
#[derive(Parser, Debug)]
#[command(name = "fit-rs")]
#[command(
    version,
    about = "Inspect and unpack Flattened Image Tree (FIT) firmware images",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every node and property of a FIT blob
    Dump(DumpArgs),
    /// Unpack a firmware package and extract the images of its FIT blob
    Extract(ExtractArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    /// Color when stdout is a terminal
    Auto,
    Always,
    Never,
}

/// Arguments for dumping a blob
#[derive(ClapArgs, Debug)]
pub struct DumpArgs {
    /// FIT blob to print
    pub fit: PathBuf,

    /// When to color the output
    #[arg(long, value_enum, default_value = "auto")]
    pub color: ColorChoice,
}

/// Arguments for extracting images
#[derive(ClapArgs, Debug)]
pub struct ExtractArgs {
    /// Self-extracting firmware package (or the FIT blob itself with --raw)
    pub archive: PathBuf,

    /// Directory the package is unpacked into
    #[arg(long, default_value = "extracted")]
    pub staging: PathBuf,

    /// Directory the images are written to
    #[arg(short, long, default_value = "firmware")]
    pub output: PathBuf,

    /// Location of the FIT blob inside the unpacked package
    #[arg(long, default_value = "payload/firmimgFIT.d9")]
    pub fit_path: PathBuf,

    /// Archive tool, run as `<unpacker> x -y -o<staging> <archive>`
    #[arg(long, default_value = "7z")]
    pub unpacker: String,

    /// The input is a FIT blob: skip unpacking
    #[arg(long)]
    pub raw: bool,
}

/// Run the parsed command line.
pub fn run_cli(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Dump(dump) => dump::run(dump),
        Commands::Extract(extract) => extract::run(extract),
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default level.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
