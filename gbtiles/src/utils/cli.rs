use std::error::Error;
use std::path::PathBuf;

use clap::Args;

use crate::config::AppContext;

pub mod endpoint;
pub mod serve;
pub mod sticks;
pub mod tile;

#[derive(Clone, Debug, PartialEq, Args)]
pub struct ConfigArgs {
    /// The server configuration file.
    #[arg(short = 'c', long)]
    #[arg(default_value = "gbtiles.toml")]
    pub config: PathBuf,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<AppContext, Box<dyn Error>> {
        Ok(AppContext::load(&self.config)?)
    }
}
