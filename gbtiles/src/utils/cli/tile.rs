use std::error::Error;
use std::io::{self, BufWriter, Write};

use clap::Parser;

use crate::utils::cli::ConfigArgs;

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(
    name = "tile",
    about = "Computes the tiles of a request spec and prints them as JSON.",
    long_about = None,
)]
pub struct TileArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// The request spec, eg. `GRCh38:13:gene=N4N5`.
    pub spec: String,

    /// If set, the JSON is indented.
    #[arg(long)]
    #[arg(default_value_t = false)]
    pub pretty: bool,
}

pub fn tile(args: TileArgs) -> Result<(), Box<dyn Error>> {
    let context = args.config.load()?;
    let tiles = context.bulk_data(&args.spec);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &tiles)?;
    } else {
        serde_json::to_writer(&mut out, &tiles)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
