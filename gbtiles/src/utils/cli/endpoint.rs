use std::error::Error;
use std::io;

use clap::Parser;

use crate::router::Focus;
use crate::utils::cli::ConfigArgs;

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(
    name = "endpoint",
    about = "Shows which endpoint serves a track at a pane.",
    long_about = None,
)]
pub struct EndpointArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Track id, as sent on the wire.
    pub track: String,

    /// Stick name, eg. `GRCh38:13`.
    pub stick: String,

    /// Scale letter and tile index, eg. `N4`.
    pub pane: String,

    /// The focus object, eg. `gene:ENSG00000139618`.
    #[arg(long)]
    pub focus: Option<String>,
}

pub fn endpoint(args: EndpointArgs) -> Result<(), Box<dyn Error>> {
    let context = args.config.load()?;

    let track = context.router.track_name(&args.track).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Unknown track {}", args.track),
        )
    })?;
    let stick = context.universe.get(&args.stick).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Unknown stick {}", args.stick),
        )
    })?;
    let scale = args.pane.chars().next().unwrap_or('N');
    let focus = args.focus.as_deref().and_then(Focus::parse);

    match context
        .router
        .resolve(track, &stick.genome_id, focus.as_ref(), scale)
    {
        Some(resolved) => {
            println!("endpoint: {}", resolved.name);
            println!("code: {}", resolved.code);
            println!("handler: {:?}", resolved.spec.handler);
            if let Some(kind) = resolved.spec.kind {
                println!("type: {}", kind.flag());
            }
            if let Some(direction) = resolved.spec.direction {
                println!("direction: {:?}", direction);
            }
            println!("seq: {}", resolved.spec.seq);
            println!("names: {}", resolved.spec.names);
            println!("bytecode: {}", resolved.bytecode);
        }
        None => println!("No endpoint for {} at {}", track, args.pane),
    }
    Ok(())
}
