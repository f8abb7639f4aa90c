use clap::{Parser, Subcommand};
use dotenv::dotenv;

use std::path::PathBuf;
use std::sync::Arc;

use stockline_rs::config::{Settings, QUOTE_TIMEOUT};
use stockline_rs::error::StocklineError;
use stockline_rs::market::{LiveQuotes, OfflineCache, PriceResolver, YahooQuotes};
use stockline_rs::repl::ChatSession;
use stockline_rs::router::Router;
use stockline_rs::server;
use stockline_rs::tools::{stock, ToolRegistry};
use stockline_rs::transport::{InProcessTransport, StdioTransport, Transport};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Dispatch tools in-process instead of spawning the stdio server
        #[arg(long)]
        in_process: bool,

        /// Path to the offline price data file
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Skip live lookups and answer from the offline cache only
        #[arg(long)]
        offline: bool,
    },
    /// Route and execute a single prompt, then exit
    Ask {
        /// The prompt to route
        #[arg(short, long)]
        prompt: String,

        /// Dispatch tools in-process instead of spawning the stdio server
        #[arg(long)]
        in_process: bool,

        /// Path to the offline price data file
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Skip live lookups and answer from the offline cache only
        #[arg(long)]
        offline: bool,
    },
    /// Run the stdio tool server (what `chat` spawns under the hood)
    Serve {
        /// Path to the offline price data file
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Skip live lookups and answer from the offline cache only
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Chat {
            in_process,
            data_file,
            offline,
        } => {
            let settings = apply_overrides(Settings::from_env(), in_process, data_file, offline);
            let router = Router::from_settings(&settings, stock::descriptors())?;
            let transport = build_transport(&settings).await?;
            ChatSession::new(router, transport).run().await?;
        }
        Commands::Ask {
            prompt,
            in_process,
            data_file,
            offline,
        } => {
            let settings = apply_overrides(Settings::from_env(), in_process, data_file, offline);
            let router = Router::from_settings(&settings, stock::descriptors())?;
            let transport = build_transport(&settings).await?;
            ChatSession::new(router, transport).ask(&prompt).await?;
        }
        Commands::Serve { data_file, offline } => {
            let settings = apply_overrides(Settings::from_env(), false, data_file, offline);
            let registry = build_registry(&settings).await?;
            server::run(registry).await?;
        }
    }

    Ok(())
}

fn apply_overrides(
    mut settings: Settings,
    in_process: bool,
    data_file: Option<PathBuf>,
    offline: bool,
) -> Settings {
    if in_process {
        settings.in_process = true;
    }
    if let Some(path) = data_file {
        settings.data_file = path;
    }
    if offline {
        settings.offline = true;
    }
    settings
}

/// Loads the cache, picks the live source, and registers the stock tools.
async fn build_registry(settings: &Settings) -> Result<ToolRegistry, StocklineError> {
    let cache = OfflineCache::load(&settings.data_file)?;

    let live: Option<Arc<dyn LiveQuotes>> = if settings.offline {
        log::info!("offline mode: live lookups disabled");
        None
    } else {
        let quotes = YahooQuotes::new(QUOTE_TIMEOUT).map_err(|err| {
            StocklineError::config(format!("cannot build the quote client: {}", err))
        })?;
        Some(Arc::new(quotes))
    };

    let resolver = Arc::new(PriceResolver::new(live, cache));
    let registry = ToolRegistry::new();
    stock::register_stock_tools(&registry, resolver).await;
    Ok(registry)
}

/// In-process dispatch or a spawned `serve` child, per the settings.
async fn build_transport(settings: &Settings) -> Result<Box<dyn Transport>, StocklineError> {
    if settings.in_process {
        log::info!("using the in-process transport");
        let registry = build_registry(settings).await?;
        return Ok(Box::new(InProcessTransport::new(registry)));
    }

    let exe = std::env::current_exe()?;
    let mut args = vec![
        "serve".to_string(),
        "--data-file".to_string(),
        settings.data_file.display().to_string(),
    ];
    if settings.offline {
        args.push("--offline".to_string());
    }
    let transport = StdioTransport::spawn(&exe, &args).await?;
    Ok(Box::new(transport))
}
