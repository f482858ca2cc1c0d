//! notifylink CLI
//!
//! Command-line interface for the notifications socket:
//! - Listen and print events as JSON lines
//! - Show the derived WebSocket URL
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use notifylink::client::token_provider;
use notifylink::config::generate_default_config;
use notifylink::{
    derive_ws_url, telemetry, Config, Event, NotificationClient, NotificationStore, StaticToken,
    TokenProvider,
};

const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "notifylink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time notifications over an authenticated WebSocket")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect and print every event as a JSON line
    Listen {
        /// REST API base URL (overrides config)
        #[arg(long)]
        base_url: Option<String>,
        /// Notifications endpoint path (overrides config)
        #[arg(long)]
        ws_path: Option<String>,
        /// Access token (overrides the [auth] section)
        #[arg(long)]
        token: Option<String>,
    },

    /// Print the WebSocket URL derived from an API base URL
    Url {
        base_url: String,
        #[arg(long, default_value = notifylink::connection::DEFAULT_WS_PATH)]
        ws_path: String,
    },

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Listen {
            base_url,
            ws_path,
            token,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(base_url) = base_url {
                config.connection.base_url = base_url;
            }
            if let Some(ws_path) = ws_path {
                config.connection.ws_path = ws_path;
            }
            config.validate()?;

            // Ignore failure: a subscriber may already be installed
            let _ = telemetry::init_logging(&config.logging);

            let tokens: Arc<dyn TokenProvider> = match token {
                Some(token) => Arc::new(StaticToken::new(&token)),
                None => token_provider(&config.auth),
            };
            if tokens.access_token().await.is_none() {
                bail!("No access token available; pass --token or configure [auth]");
            }
            listen(NotificationClient::new(config, tokens)).await
        }

        Commands::Url { base_url, ws_path } => {
            println!("{}", derive_ws_url(&base_url, &ws_path)?);
            Ok(())
        }

        Commands::InitConfig { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load_with_env(path)?),
        None => Ok(Config::load_default()),
    }
}

async fn listen(client: NotificationClient) -> anyhow::Result<()> {
    let feed = client.attach_feed(NotificationStore::new());
    let mut events = client.dispatcher().stream();

    client.start().await?;

    tracing::info!("notifylink v{} listening, Ctrl-C to stop", env!("CARGO_PKG_VERSION"));

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                client.disconnect();
                // Let the socket task finish the close handshake
                let _ = tokio::time::timeout(CLOSE_GRACE, async {
                    while let Ok(event) = events.recv().await {
                        if matches!(event, Event::Disconnected { .. }) {
                            break;
                        }
                    }
                })
                .await;
                break Ok(());
            }
            received = events.recv() => match received {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if let Event::ReconnectFailed { attempts } = event {
                        break Err(anyhow::anyhow!(
                            "Gave up after {} reconnect attempts",
                            attempts
                        ));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event output fell behind, events skipped");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    let store = feed.detach();
    tracing::info!(
        notifications = store.len(),
        unread = store.unread_count(),
        "Stopped listening"
    );
    outcome
}
