//! Kennel chat binary.
//!
//! # Usage
//!
//! ```bash
//! # Open the conversation list
//! kennel-chat --api-url https://api.example.com --token "$TOKEN"
//!
//! # Jump straight into a conversation
//! KENNEL_TOKEN=... kennel-chat --api-url http://localhost:8000 --thread alice_bob
//! ```
//!
//! Type a line to send it. `/open <thread>`, `/new <user> [greeting]`,
//! `/threads` and `/quit` are commands. Logs go to stderr so they do not
//! interleave with the conversation.

use std::{io, sync::Arc, time::Duration};

use clap::Parser;
use kennel_app::{Bridge, Runtime, ThreadView};
use kennel_cli::LineDriver;
use kennel_client::{ChatClient, ClientConfig, MessagesApi, SystemEnv, rest::RestClient, transport::WsTransport};
use kennel_proto::{AuthToken, ThreadId};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Kennel realtime chat client
#[derive(Parser, Debug)]
#[command(name = "kennel-chat")]
#[command(about = "Terminal chat client for the Kennel marketplace")]
#[command(version)]
struct Args {
    /// Base URL of the REST API; the realtime endpoint is derived from it
    #[arg(long, env = "KENNEL_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Bearer token of the signed-in user
    #[arg(long, env = "KENNEL_TOKEN", hide_env_values = true)]
    token: String,

    /// Conversation to open on start
    #[arg(long)]
    thread: Option<String>,

    /// Seconds allowed for the realtime handshake
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let token = AuthToken::new(args.token);
    let api = RestClient::new(&args.api_url, token.clone())?;
    let me = api.me().await?;
    tracing::info!(user = %me.id, "signed in");

    let transport = WsTransport::with_connect_timeout(Duration::from_secs(args.connect_timeout));
    let client = ChatClient::spawn(transport, SystemEnv, ClientConfig::new(&args.api_url, token))?;

    let mut runtime = Runtime::new(
        LineDriver::stdio(),
        ThreadView::new(me.id),
        Bridge::new(client),
        Arc::new(api),
        SystemEnv,
    );
    if let Some(thread) = args.thread {
        runtime = runtime.with_initial_thread(ThreadId::new(thread));
    }

    let view = runtime.run().await?;
    tracing::info!(messages = view.messages().len(), "session ended");
    Ok(())
}
