mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wayfinder", version, about = "Wayfinder — natural-language intent routing for site navigation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the planning HTTP server
    Serve {
        /// Path to the site configuration YAML file
        #[arg(long, default_value = "site.yaml")]
        config: PathBuf,
        /// Address to bind the HTTP server to
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
    },
    /// Load and validate a site configuration file without starting the server
    ValidateConfig {
        /// Path to the site configuration YAML file
        #[arg(long, default_value = "site.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, addr } => commands::serve::run(commands::serve::ServeOpts { config, addr }).await,
        Commands::ValidateConfig { config } => commands::validate_config::run(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
