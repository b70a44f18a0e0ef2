use std::sync::Arc;

use clap::{Parser, Subcommand};

use assetshell::assets::DirAssetStore;
use assetshell::config::{AppState, Config};
use assetshell::logger::{self, LogBuffer};
use assetshell::routing::{AssetRouter, RouteRequest};
use assetshell::server;

#[derive(Parser)]
#[command(name = "assetshell")]
#[command(about = "Serve a web bundle under a virtual domain", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path, without extension
    #[arg(short, long, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server (default)
    Serve,

    /// Show how a URL resolves against the bundle
    Resolve {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cfg),
        Commands::Resolve { url } => resolve(&cfg, &url),
        Commands::Config => {
            print!("{}", cfg.to_toml()?);
            Ok(())
        }
    }
}

fn serve(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_buffer = LogBuffer::new(cfg.logging.buffer_capacity, cfg.logging.detailed);
    logger::init(&cfg.logging, &log_buffer)?;
    logger::install_panic_hook();

    let addr = cfg.get_socket_addr()?;
    let listener = server::bind_listener(addr)?;
    let state = Arc::new(AppState::new(cfg, log_buffer)?);

    logger::log_server_start(&addr, &state.config);
    server::run(listener, state, server::shutdown_signal()).await;
    Ok(())
}

fn resolve(cfg: &Config, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", resolve_report(cfg, url)?);
    Ok(())
}

/// What `resolve` prints: result class, then asset details for intercepted URLs
fn resolve_report(cfg: &Config, url: &str) -> Result<String, Box<dyn std::error::Error>> {
    let request = RouteRequest::parse(url).ok_or_else(|| format!("Invalid URL: {url}"))?;
    let store = DirAssetStore::new(&cfg.shell.asset_root)?;
    let router = AssetRouter::new(
        cfg.shell.virtual_domain.clone(),
        cfg.shell.asset_base.clone(),
        Arc::new(store),
    );

    let result = router.resolve(&request);
    let mut report = format!("result: {}\n", result.class());
    if let Some(response) = result.into_response() {
        let status = response.status_code();
        let body = response.body.into_bytes()?;
        report.push_str(&format!("asset:  {}\n", response.asset_path));
        report.push_str(&format!("status: {status}\n"));
        report.push_str(&format!(
            "type:   {}; charset={}\n",
            response.mime_type, response.encoding
        ));
        report.push_str(&format!("bytes:  {}\n", body.len()));
    }
    Ok(report)
}
