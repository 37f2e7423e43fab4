//! Murmur tail: follow a chat server's live event stream.
//!
//! Bootstraps a session over the REST API, optionally prints the newest
//! page of one channel, then prints every stream event until interrupted.
//! The resume cursor and read markers are saved to a state file, so the
//! next run picks up where this one stopped.
//!
//! # Usage
//!
//! ```bash
//! MURMUR_TOKEN=... murmur-tail \
//!     --gateway https://chat.example/ \
//!     --api https://chat.example/api/ \
//!     --user u-42 --channel general
//! ```

mod render;

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use murmur_app::{Session, StoreSink, ViewConfig};
use murmur_client::{
    ConnectionStatus, EventStreamClient, HttpConnector, HttpRest, StreamConfig, StreamHandler,
    SystemEnv,
};
use murmur_core::Environment;
use murmur_proto::{AuthorId, ChannelId, GatewayEvent, Timestamp};
use murmur_store::{
    DEFAULT_MESSAGE_BOUND, FilePersistence, SharedStore, StoreConfig, SyncStore, lock,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Seconds between state file saves.
const SAVE_INTERVAL_TICKS: u32 = 30;

/// Follow a Murmur chat server from the terminal
#[derive(Parser, Debug)]
#[command(name = "murmur-tail")]
#[command(about = "Print a Murmur server's live event stream")]
#[command(version)]
struct Args {
    /// Gateway base URL; the stream is served at `{gateway}/gateway`
    #[arg(long, env = "MURMUR_GATEWAY")]
    gateway: Url,

    /// REST API base URL
    #[arg(long, env = "MURMUR_API")]
    api: Url,

    /// Session token
    #[arg(long, env = "MURMUR_TOKEN", hide_env_values = true)]
    token: String,

    /// Author id of the signed-in user
    #[arg(long, env = "MURMUR_USER")]
    user: String,

    /// Only show this channel, and print its newest page first
    #[arg(short, long)]
    channel: Option<String>,

    /// File holding the resume cursor and read markers
    #[arg(long, default_value = "murmur-state.json")]
    state: PathBuf,

    /// Messages cached per channel
    #[arg(long, default_value_t = DEFAULT_MESSAGE_BOUND)]
    message_bound: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Prints events, then hands them to the store.
struct TailHandler<E> {
    sink: StoreSink<E>,
    store: SharedStore,
    channel: Option<ChannelId>,
}

impl<E: Environment> StreamHandler for TailHandler<E> {
    fn on_event(&mut self, event: GatewayEvent, ts: Option<Timestamp>) {
        let shown = self
            .channel
            .as_ref()
            .is_none_or(|filter| render::event_channel(&event) == Some(filter));
        if shown {
            // Render first: a deleted channel still has its name
            if let Some(line) = render::event_line(&lock(&self.store), &event, ts) {
                emit(&line);
            }
        }
        self.sink.on_event(event, ts);
    }

    fn on_connected(&mut self) {
        self.sink.on_connected();
    }

    fn on_status(&mut self, status: &ConnectionStatus) {
        if let ConnectionStatus::Retrying { attempt, delay } = status {
            tracing::info!(attempt, ?delay, "reconnecting");
        }
        self.sink.on_status(status);
    }
}

fn emit(line: &str) {
    if let Err(e) = writeln!(io::stdout().lock(), "{line}") {
        tracing::warn!(error = %e, "stdout write failed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let env = SystemEnv::new();
    let store = SyncStore::new(StoreConfig::with_message_bound(args.message_bound)).into_shared();
    let rest = HttpRest::new(args.api, args.token.clone());
    let persistence = FilePersistence::new(args.state);
    let mut session = Session::new(store.clone(), rest, persistence, env, ViewConfig::default());

    session.bootstrap(&AuthorId::new(args.user)).await?;

    let channel = args.channel.map(ChannelId::new);
    if let Some(channel) = &channel {
        session.open_channel(channel).await?;
        let store = lock(&store);
        for record in store.messages(channel) {
            emit(&render::message_line(&store, &record.message));
        }
        drop(store);
        session.mark_seen(channel);
    }

    let cursor = lock(&store).cursor();
    let config = StreamConfig::new(args.gateway, args.token).with_cursor(cursor);
    let handler = TailHandler { sink: session.stream_handler(), store: store.clone(), channel };
    let handle = EventStreamClient::new(config, HttpConnector::new(), env).spawn(handler);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut ticks = 0u32;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            },
            _ = ticker.tick() => {
                session.tick();
                ticks += 1;
                if ticks % SAVE_INTERVAL_TICKS == 0 {
                    if let Err(e) = session.save() {
                        tracing::warn!(error = %e, "saving state failed");
                    }
                }
            },
        }
    }

    tracing::info!("shutting down");
    handle.close();
    handle.join().await;
    session.save()?;
    Ok(())
}
