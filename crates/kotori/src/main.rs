//! Bot entry point: connect both gateway channels, greet, then dispatch
//! events until the connection drops or the process is interrupted.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kotori_onebot::model::event::PrivateMessageEvent;
use kotori_onebot::{ApiClient, Dispatcher, EventHandler};
use kotori_transport::WsChannel;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Gateway base URL; `/api` and `/event` are appended to it.
    #[arg(long, default_value = "ws://localhost:3020")]
    url: String,

    /// Cap on concurrently running event handlers.
    #[arg(long, default_value_t = 32)]
    max_concurrency: usize,
}

/// Echoes private messages back to their sender.
struct EchoHandler;

#[async_trait::async_trait]
impl EventHandler for EchoHandler {
    async fn on_private_message(&self, api: ApiClient, event: PrivateMessageEvent) {
        info!(user_id = event.user_id, message = %event.message, "private message");
        if let Err(error) = api
            .send_private_msg(event.user_id, &event.message, false)
            .await
        {
            warn!(user_id = event.user_id, %error, "failed to echo message");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let base = args.url.trim_end_matches('/');
    let api_url = format!("{base}/api");
    let event_url = format!("{base}/event");

    let api_channel = WsChannel::connect(&api_url)
        .await
        .with_context(|| format!("connecting api channel at {api_url}"))?;
    let event_channel = WsChannel::connect(&event_url)
        .await
        .with_context(|| format!("connecting event channel at {event_url}"))?;
    info!(url = %base, "connected to gateway");

    let api = ApiClient::new(api_channel);
    match api.get_login_info().await {
        Ok(login) => info!(user_id = login.user_id, nickname = %login.nickname, "logged in"),
        Err(error) => warn!(%error, "could not fetch login info"),
    }

    let dispatcher =
        Dispatcher::with_max_concurrency(api, Arc::new(EchoHandler), args.max_concurrency);
    tokio::select! {
        transport_error = dispatcher.run(event_channel) => {
            error!(error = %transport_error, "event channel failed");
            Err(transport_error.into())
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}
