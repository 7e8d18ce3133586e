//! RAG pipeline entry point.

use clap::Parser;

use rag_pipeline::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_file = cli.config.as_deref();

    let result = match cli.command_or_default() {
        Commands::Serve(args) => rag_pipeline::cli::commands::serve::execute(args, config_file).await,
        Commands::Config(args) => {
            rag_pipeline::cli::commands::config::execute(&args, config_file, cli.json)
        }
    };

    if let Err(err) = result {
        rag_pipeline::cli::handle_error(err, cli.json);
    }
}
