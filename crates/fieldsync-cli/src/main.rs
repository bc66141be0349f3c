//! Fieldsync terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Follow the pickup dashboard
//! fieldsync --server api.example.com --token $TOKEN pickups
//!
//! # Join a chat room; each line typed is sent as a message
//! fieldsync --server api.example.com --token $TOKEN chat --room 42 --user-id 7
//! ```

mod driver;
mod render;
mod system_env;

use clap::{Parser, Subcommand};
use driver::{InputMode, TokioDriver};
use fieldsync_app::Runtime;
use fieldsync_client::{
    ChatConfig, ChatRoom, PickupConfig, PickupFeed, SyncConfig, rest::RestClient,
};
use fieldsync_proto::UserId;
use system_env::SystemEnv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Fieldsync terminal client
#[derive(Parser, Debug)]
#[command(name = "fieldsync")]
#[command(about = "Live pickup dashboard and worker chat over WebSocket with REST fallback")]
#[command(version)]
struct Args {
    /// API server, with or without scheme
    #[arg(short, long, env = "FIELDSYNC_SERVER")]
    server: String,

    /// Bearer token. Without one the live channel stays off and only polling runs
    #[arg(short, long, env = "FIELDSYNC_TOKEN")]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow pending, available and completed pickups
    Pickups,

    /// Join a chat room
    Chat {
        /// Room id
        #[arg(short, long)]
        room: String,

        /// Local user id. Inferred from history when omitted
        #[arg(short, long)]
        user_id: Option<UserId>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Rendered views go to stdout; logs stay on stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!(server = %args.server, "fieldsync starting");
    if args.token.is_none() {
        tracing::warn!("no token provided, live updates disabled");
    }

    let env = SystemEnv::new();
    let rest = RestClient::new(&args.server, args.token.clone())?;
    let sync = SyncConfig::new(args.server, args.token);
    let mut driver = TokioDriver::new(env.clone(), rest);

    match args.command {
        Command::Pickups => {
            driver.read_input(InputMode::Watch);
            let feed = PickupFeed::new(env, PickupConfig::new(sync))?;
            Runtime::new(driver, feed).run().await?;
        },
        Command::Chat { room, user_id } => {
            driver.read_input(InputMode::Chat);
            let mut config = ChatConfig::new(sync, Some(room));
            config.local_user_id = user_id;
            let room = ChatRoom::new(env, config)?;
            Runtime::new(driver, room).run().await?;
        },
    }

    tracing::info!("fieldsync stopped");
    Ok(())
}
