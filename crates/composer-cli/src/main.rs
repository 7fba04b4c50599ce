#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process;

use clap::Parser;
use composer_engine::ComposeOptions;

#[derive(Debug, Parser)]
#[command(
    name = "composer",
    about = "Compose a charm from an ordered chain of layers and interfaces"
)]
#[command(version)]
struct Cli {
    /// Log verbosity
    #[arg(short = 'l', long, default_value = "info")]
    log_level: log::LevelFilter,

    /// Proceed despite local modifications found in the output
    #[arg(short, long)]
    force: bool,

    /// Destination base; omitting it regenerates the charm in place
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Series directory under the output base
    #[arg(short, long, default_value = "trusty")]
    series: String,

    /// Name of the produced charm; defaults to the charm's basename
    #[arg(short, long)]
    name: Option<String>,

    /// Path or reference to the top layer
    #[arg(default_value = ".")]
    charm: String,
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .init();

    let name = cli
        .name
        .clone()
        .unwrap_or_else(|| composer_engine::compose::default_name(&cli.charm));
    let options = ComposeOptions {
        charm: cli.charm,
        output_dir: cli.output_dir,
        series: cli.series,
        name: cli.name,
        force: cli.force,
    };

    match composer_engine::compose(&options) {
        Ok(result) => {
            eprintln!(
                "    Composed `{name}` ({} files) at {}",
                result.files,
                result.target_dir.display()
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(e.exit_code());
        }
    }
}
