//! Seedcast CLI - Command-line interface
//!
//! Provides command-line access to the Seedcast server and seeding pipeline.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "seedcast")]
#[command(about = "A video upload and seeding server", version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await?;

    Ok(())
}
