//! hcp CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// hcp - hosted control plane manifest renderer
#[derive(Parser, Debug)]
#[command(name = "hcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the control plane manifests into a directory
    Render(commands::render::RenderArgs),
}

impl Cli {
    /// Run the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Render(args) => commands::render::run(args),
        }
    }
}
