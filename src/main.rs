//! # webkit-remote-tail
//!
//! Attaches to the first debuggable tab of a running browser and logs every
//! event it emits until interrupted.
//!
//! ## Usage
//! `webkit-remote-tail [config.toml]`
//!
//! ## Environment variables
//! - `WEBKIT_REMOTE_HOST`: debug server host (default: localhost)
//! - `WEBKIT_REMOTE_PORT`: debug server port (default: 9292)
//! - `WEBKIT_REMOTE_LOG_LEVEL`: log level when `RUST_LOG` is unset (default: info)

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use webkit_remote::discovery::{HttpTabLister, TabLister};
use webkit_remote::events::EventKind;
use webkit_remote::rpc::IoContext;
use webkit_remote::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => ClientConfig::from_env()?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("webkit-remote-tail v{}", webkit_remote::VERSION);

    let lister = HttpTabLister::from_config(&config);
    let tabs = lister.tabs().await?;
    let tab = tabs
        .iter()
        .find(|tab| tab.debug_url.is_some())
        .context("no debuggable tab found")?;
    info!("Attaching to {} ({})", tab.title, tab.url);

    let io = IoContext::current()?;
    let mut client = Client::connect_tab(tab, &io, config).await?;
    client.set_console_events(true).await?;
    client.set_page_events(true).await?;

    let closer = client.closer();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, closing connection");
            closer.close();
        }
    });

    loop {
        match client.next_event().await {
            Ok(event) => match &event.kind {
                EventKind::ConsoleMessage(message) => {
                    info!(level = message.level.as_str(), "console: {}", message.text)
                }
                EventKind::Generic => info!(name = %event.name, "{}", event.params),
                _ => info!(name = %event.name, "{:?}", event.kind),
            },
            Err(webkit_remote::Error::ConnectionClosed) => break,
            Err(e) => {
                error!("Event stream failed: {}", e);
                break;
            }
        }
    }

    if !client.is_closed() {
        warn!("Closing connection after stream error");
    }
    client.close();
    info!("Shutdown complete");
    Ok(())
}
