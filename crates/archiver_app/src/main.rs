mod config;
mod context;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use archiver_logging::{archiver_error, archiver_info, LogDestination};
use clap::{Parser, Subcommand};

use crate::config::{AppConfig, Secrets, SinkKind};
use crate::context::AppContext;

#[derive(Parser)]
#[command(name = "slack-archiver", version)]
#[command(about = "Archive every channel of a Slack workspace to a file, bucket or Firestore", long_about = None)]
struct Cli {
    /// TOML config file (default: built-in defaults)
    #[arg(long, short, global = true, value_name = "PATH", env = "SLACK_ARCHIVER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every channel's history once and persist it (the default).
    Run {
        /// Destination, overriding the config file.
        #[arg(long, value_enum)]
        sink: Option<SinkKind>,

        /// Output file for the file sink, overriding the config file.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Serve an HTTP trigger that runs the archive and returns it as JSON.
    Serve {
        /// Bind address (default from config or 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,

        /// Port (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        sink: None,
        output: None,
    });

    let config = match load_config(cli.config.as_deref(), &command) {
        Ok(config) => config,
        Err(err) => {
            archiver_logging::initialize(LogDestination::Terminal, log::LevelFilter::Info);
            archiver_error!("configuration error: {:#}", err);
            std::process::exit(1);
        }
    };
    init_logging(&config);

    let result = match command {
        Commands::Run { .. } => run_once(config).await,
        Commands::Serve { bind, port } => run_server(config, bind, port).await,
    };
    if let Err(err) = result {
        archiver_error!("{:#}", err);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>, command: &Commands) -> Result<AppConfig> {
    let mut config = AppConfig::load(path)?;
    if let Commands::Run { sink, output } = command {
        if let Some(sink) = sink {
            config.sink = *sink;
        }
        if let Some(output) = output {
            config.file.output_path = output.clone();
        }
    }
    Ok(config)
}

fn init_logging(config: &AppConfig) {
    let destination = match &config.log.file {
        Some(path) => LogDestination::TerminalAndFile(path.clone()),
        None => LogDestination::Terminal,
    };
    archiver_logging::initialize(destination, archiver_logging::parse_level(&config.log.level));
}

async fn run_once(config: AppConfig) -> Result<()> {
    let secrets = Secrets::from_env(config.sink)?;
    let ctx = AppContext::new(config, secrets)?;
    let report = ctx.archive(false).await?;
    if report.messages > 0 {
        archiver_info!(
            "Fetched messages from all channels ({} channel(s), {} message(s)).",
            report.channels,
            report.messages
        );
    } else {
        archiver_info!("No messages retrieved.");
    }
    Ok(())
}

async fn run_server(config: AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);
    let secrets = Secrets::from_env(config.sink)?;
    let ctx = AppContext::new(config, secrets)?;
    server::serve(Arc::new(ctx), &bind, port).await
}
