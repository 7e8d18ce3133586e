//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::config::ConfigArgs;
use super::commands::serve::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "rag-pipeline")]
#[command(about = "Per-user retrieval-augmented chat over uploaded documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file merged over the defaults
    #[arg(short, long, global = true, env = "RAG_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load the model and serve the HTTP API
    Serve(ServeArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

impl Cli {
    /// The requested command, with `serve` standing in when none was given
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Serve(ServeArgs::default()))
    }
}
