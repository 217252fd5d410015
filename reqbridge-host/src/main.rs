//! reqbridge host - runs the adaptation layer over the local filesystem and
//! exposes its state through a read-only HTTP API.

mod host;
mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use reqbridge::activate::{Host, activate};
use reqbridge::io::config::{DEFAULT_CONFIG_PATH, load_config};
use reqbridge::io::local_fs::LocalFs;
use reqbridge::logging;
use reqbridge::watch::ConfigWatchers;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::host::{HostWorkspace, LiveExecutor, TerminalPrompt};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "reqbridge-host")]
#[command(about = "Host the request bridge over the local filesystem")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3002")]
    port: u16,

    /// Project directory relative paths resolve against
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (defaults to .reqbridge/config.toml in the project)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra workspace root, searched before configured roots (repeatable)
    #[arg(long = "root")]
    roots: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    let config_path = project_dir.join(
        args.config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
    );
    let config = load_config(&config_path)?;
    logging::init(&config.log_level);
    info!(
        project_dir = %project_dir.display(),
        config = %config_path.display(),
        "starting reqbridge-host"
    );

    let watchers = ConfigWatchers::new(config);
    let host = Host {
        fs: Arc::new(LocalFs),
        workspace: Arc::new(HostWorkspace::new(
            project_dir.clone(),
            args.roots,
            watchers.clone(),
        )),
        prompt: Arc::new(TerminalPrompt::default()),
        executor: Arc::new(LiveExecutor::new(watchers.clone())),
    };
    let activation = activate(host, watchers).await;
    let state = AppState::new(project_dir, config_path, activation);

    sse::start_config_watcher(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state.clone());

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.activation.dispose();
    info!("shut down");
    Ok(())
}
