use std::error::Error;
use std::io;

use clap::Parser;
use itertools::Itertools;
use tracing::warn;

use crate::utils::cli::ConfigArgs;

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(
    name = "sticks",
    about = "Lists the sticks of every genome under the data path.",
    long_about = None,
)]
pub struct SticksArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// If set, checks each stick's size against its genome's contigs file.
    #[arg(long)]
    #[arg(default_value_t = false)]
    pub verify: bool,
}

pub fn sticks(args: SticksArgs) -> Result<(), Box<dyn Error>> {
    let context = args.config.load()?;

    let mut mismatches = 0;
    for stick in context
        .universe
        .sticks()
        .iter()
        .sorted_by(|a, b| a.stick_name.cmp(&b.stick_name))
    {
        println!(
            "{}\t{}\t{}\t{}",
            stick.stick_name,
            stick.size,
            stick.seq_hash.as_deref().unwrap_or("-"),
            stick.aliases.iter().join(",")
        );
        if !args.verify {
            continue;
        }
        match context.sources.contig.chrom_length(stick) {
            Some(length) if length == stick.size => {}
            Some(length) => {
                warn!(
                    "{} is {} bp but {} bp in {}",
                    stick.stick_name,
                    stick.size,
                    length,
                    context.sources.contig.path(stick).display()
                );
                mismatches += 1;
            }
            None => {
                warn!("{} is missing from its contigs file", stick.stick_name);
                mismatches += 1;
            }
        }
    }

    if mismatches > 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} sticks did not match their contigs file", mismatches),
        )
        .into());
    }
    Ok(())
}
