use clap::{Parser, Subcommand};
use sitegauge::lens::utils::OutputFormat;
use sitegauge::{AppConfig, AppContext};
use tracing::Level;

mod commands;

use commands::tracking_code::TrackingCodeCommandArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.sitegauge/sitegauge.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table (default), markdown, json, json-pretty
    #[clap(long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the database is reachable, compatible and migrated.
    CheckDb,

    /// Compact the embedded SQLite database.
    Vacuum,

    /// Print the tracking code for a website.
    TrackingCode(TrackingCodeCommandArgs),

    /// Show the resolved configuration.
    Config,
}

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if cli.debug {
        let level = if config.log_query {
            Level::DEBUG
        } else {
            Level::INFO
        };
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(level)
            .init();
    }

    let ctx = AppContext::new(config);

    let code = match cli.command {
        Commands::CheckDb => commands::check_db::run(&ctx),
        Commands::Vacuum => commands::vacuum::run(&ctx, cli.format),
        Commands::TrackingCode(args) => commands::tracking_code::run(&ctx, args, cli.format),
        Commands::Config => commands::config::run(&ctx, cli.config, cli.format),
    };

    std::process::exit(code);
}
