use std::sync::Arc;

use clap::Parser;
use sqlgate_scheduler::Scheduler;
use sqlgate_server::cli::Cli;
use sqlgate_server::http::{self, AppState};
use sqlgate_server::config_loader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("sqlgate: {e}");
        std::process::exit(2);
    }

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let configs = config_loader::load_configs(&cli)?;

    let mut registry = if configs.is_empty() {
        sqlgate_engine::DbRegistry {
            databases: Default::default(),
            pending_tasks: Vec::new(),
        }
    } else {
        sqlgate_engine::build_registry(configs)?
    };

    let pending_tasks = std::mem::take(&mut registry.pending_tasks);
    let registry = Arc::new(registry);

    let scheduler = Scheduler::start(pending_tasks).await?;

    let state = Arc::new(AppState {
        registry: registry.clone(),
    });
    let app = http::build_router(state, cli.serve_dir.clone());

    let addr = format!("{}:{}", cli.bind_host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("shutting down, draining scheduler");
    scheduler.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
