use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gbtiles::utils::cli::endpoint::{endpoint, EndpointArgs};
use gbtiles::utils::cli::serve::{serve, ServeArgs};
use gbtiles::utils::cli::sticks::{sticks, SticksArgs};
use gbtiles::utils::cli::tile::{tile, TileArgs};

#[derive(Clone, Debug, PartialEq, Subcommand)]
#[command(version)]
enum SubCommands {
    #[command(name = "serve", version)]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },
    #[command(name = "tile", version)]
    Tile {
        #[command(flatten)]
        args: TileArgs,
    },
    #[command(name = "sticks", version)]
    Sticks {
        #[command(flatten)]
        args: SticksArgs,
    },
    #[command(name = "endpoint", version)]
    Endpoint {
        #[command(flatten)]
        args: EndpointArgs,
    },
}

#[derive(Debug, Parser)]
#[command(
    name = "gbtiles",
    about = "Genome browser tile data from bigBed and bigWig files.",
    long_about = None,
    version,
)]
struct Cli {
    #[command(subcommand)]
    command: SubCommands,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        SubCommands::Serve { args } => serve(args),
        SubCommands::Tile { args } => tile(args),
        SubCommands::Sticks { args } => sticks(args),
        SubCommands::Endpoint { args } => endpoint(args),
    }
}

#[test]
fn verify_cli_bin() {
    use clap::CommandFactory;
    Cli::command().debug_assert()
}
