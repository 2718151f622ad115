use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crewrelay::banner::{BannerInfo, print_banner};
use crewrelay::capture::CaptureSource;
use crewrelay::capture::webhook_site::WebhookSite;
use crewrelay::channel::Channel;
use crewrelay::channel::console::ConsoleChannel;
use crewrelay::channel::discord::DiscordChannel;
use crewrelay::config::{ConfigError, DISCORD_CHANNEL_ID, Settings};
use crewrelay::relay::{Relay, RelayConfig};
use crewrelay::tasks::http::CrewApi;

const INBOUND_BUFFER: usize = 64;

#[derive(Parser)]
#[command(
    name = "crewrelay",
    version,
    about = "Relays chat commands to a crew and posts the results back."
)]
struct Cli {
    /// Read commands from stdin instead of Discord
    #[arg(long, default_value_t = false)]
    console: bool,

    /// Seconds between capture endpoint polls
    #[arg(long, default_value_t = 60)]
    poll_interval: u64,

    /// Seconds before a "still working" notice is sent
    #[arg(long, default_value_t = 60)]
    stale_after: u64,

    /// Seconds before a pending task is given up on
    #[arg(long, default_value_t = 1800)]
    context_ttl: u64,

    /// Log filter (overrides RUST_LOG), e.g. `crewrelay=debug`
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let settings = Settings::from_env()?;

    let channel: Arc<dyn Channel> = if cli.console {
        Arc::new(ConsoleChannel::new())
    } else {
        let channel_id = settings
            .discord_channel_id
            .clone()
            .ok_or(ConfigError::Missing(DISCORD_CHANNEL_ID))?;
        Arc::new(DiscordChannel::new(
            settings.discord_token.clone(),
            channel_id,
        ))
    };
    let capture = Arc::new(WebhookSite::new(
        settings.capture_base_url.clone(),
        settings.webhook_token.clone(),
    ));
    let tasks = Arc::new(CrewApi::new(settings.task_api_url.clone()));

    let config = RelayConfig {
        poll_interval: Duration::from_secs(cli.poll_interval.max(1)),
        stale_after: Duration::from_secs(cli.stale_after),
        context_ttl: Duration::from_secs(cli.context_ttl),
        ..RelayConfig::default()
    };

    print_banner(&BannerInfo {
        channel: channel.name(),
        capture: &settings.capture_base_url,
        task_api: &settings.task_api_url,
        poll_interval: config.poll_interval,
        context_ttl: config.context_ttl,
    });
    info!(?settings, webhook = %capture.webhook_url(), "starting relay");

    let relay = Relay::new(channel.clone(), tasks, capture, config);
    let shutdown = CancellationToken::new();

    let poller = {
        let relay = relay.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { relay.run_poller(shutdown).await })
    };

    let (tx, mut rx) = mpsc::channel(INBOUND_BUFFER);
    let listener = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.listen(tx).await })
    };

    let channel_closed = loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else {
                    warn!(channel = channel.name(), "chat channel closed");
                    break true;
                };
                let relay = relay.clone();
                tokio::spawn(async move {
                    relay.handle_message(&message).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break false;
            }
        }
    };

    shutdown.cancel();
    let listener_result = join_listener(listener, channel_closed).await;
    let poller_result = poller.await;

    info!(
        pending = relay.pending_count().await,
        "relay stopped; pending tasks are dropped"
    );
    listener_result?;
    poller_result.context("poller panicked")?;
    Ok(())
}

/// Collect the listener's outcome. A listener that ended on its own is
/// awaited so its error reaches the exit status; otherwise it is aborted.
async fn join_listener(
    listener: JoinHandle<anyhow::Result<()>>,
    finished: bool,
) -> anyhow::Result<()> {
    if !finished {
        listener.abort();
        return Ok(());
    }
    listener
        .await
        .context("chat listener panicked")?
        .context("chat listener failed")
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "crewrelay=info".into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_listener_is_an_error() {
        let listener = tokio::spawn(async { Err::<(), _>(anyhow::anyhow!("gateway refused")) });
        let err = join_listener(listener, true).await.unwrap_err();
        assert_eq!(err.to_string(), "chat listener failed");
        assert!(format!("{err:#}").contains("gateway refused"));
    }

    #[tokio::test]
    async fn panicked_listener_is_an_error() {
        let listener = tokio::spawn(async {
            if true {
                panic!("boom");
            }
            Ok::<(), anyhow::Error>(())
        });
        let err = join_listener(listener, true).await.unwrap_err();
        assert_eq!(err.to_string(), "chat listener panicked");
    }

    #[tokio::test]
    async fn clean_listener_exit_is_ok() {
        let listener = tokio::spawn(async { Ok::<(), anyhow::Error>(()) });
        assert!(join_listener(listener, true).await.is_ok());
    }

    #[tokio::test]
    async fn running_listener_is_aborted() {
        let listener = tokio::spawn(std::future::pending::<anyhow::Result<()>>());
        assert!(join_listener(listener, false).await.is_ok());
    }
}
