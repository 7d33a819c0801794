use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ada_gateway::api::{ApiServer, ApiState};
use ada_gateway::{Assistant, AudioBuffer, Config};

/// Ada - Voice command gateway for the Ada home assistant
#[derive(Parser)]
#[command(name = "ada", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/ada/config.toml)
    #[arg(short, long, env = "ADA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the voice command API (default)
    Serve,
    /// Classify a transcription and run its action
    Classify {
        /// Text as it would come out of transcription
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,ada_gateway=info",
        1 => "info,ada_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let assistant = Assistant::from_config(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, assistant).await,
        Command::Classify { text } => classify(&assistant, &text).await,
    }
}

async fn serve(config: Config, assistant: Assistant) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "starting ada gateway"
    );

    let buffer = AudioBuffer::spawn(config.audio.max_buffer_bytes);
    let server = ApiServer::new(
        ApiState::new(assistant, buffer),
        config.server.host,
        config.server.port,
    );

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

async fn classify(assistant: &Assistant, text: &str) -> anyhow::Result<()> {
    let outcome = assistant.handle_text(text).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
