//! Mines API Server Binary

use clap::Parser;
use mines::{
    api::ApiServer,
    config::{ConfigLoader, EntropyProviderKind, StorageBackend},
    games::DisclosurePolicy,
    EngineFactory,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mines")]
#[command(about = "Provably fair Mines game server", long_about = None)]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Database directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Keep games in memory only
    #[arg(long)]
    in_memory: bool,

    /// Seed disclosure: immediate or on_finish
    #[arg(long)]
    disclosure: Option<String>,

    /// Use a fixed server seed instead of the public provider
    #[arg(long)]
    static_seed: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.data_dir {
        config.storage.data_directory = dir;
    }
    if args.in_memory {
        config.storage.backend = StorageBackend::Memory;
    }
    if let Some(policy) = args.disclosure {
        config.game.disclosure = match policy.as_str() {
            "immediate" => DisclosurePolicy::Immediate,
            "on_finish" | "on-finish" => DisclosurePolicy::OnFinish,
            other => return Err(format!("Unknown disclosure policy '{}'", other).into()),
        };
    }
    if let Some(seed) = args.static_seed {
        config.entropy.provider = EntropyProviderKind::Static;
        config.entropy.static_seed = Some(seed);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mines={},tower_http=info", config.monitoring.log_level.as_str()).into()
            }),
        )
        .init();

    info!("Starting Mines server v{}", env!("CARGO_PKG_VERSION"));

    let (engine, metrics) = EngineFactory::create_engine(&config)?;
    ApiServer::new(config.server.clone(), engine, metrics).run().await
}
