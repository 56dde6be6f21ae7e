//! Todolist - Main entry point.
//!
//! By default this binary serves the HTTP API and runs the interactive menu
//! side by side over the same task list. Subcommands select a single
//! front-end.
//!
//! # Configuration
//!
//! See [`todolist::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # HTTP API on :8080 plus the menu on this terminal
//! cargo run --bin todolist
//!
//! # HTTP API only, on another port and file
//! PORT=3000 TODO_FILE=/tmp/tasks.json cargo run --bin todolist -- serve
//! ```

use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use todolist::config::Config;
use todolist::console::{Console, MenuExit};
use todolist::routes::{create_router, AppState};
use todolist::store::TaskStore;

/// How long to wait for blocked stdin reads and in-flight work at exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Todolist - single-user task list manager.
#[derive(Parser, Debug)]
#[command(name = "todolist")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TODO_FILE        Task list file (default: tasks.json)
    PORT             HTTP server port (default: 8080)
    TODO_INDEX_FILE  Page served at / (default: index.html)
    RUST_LOG         Log level filter (default: info)

Without a subcommand, closing stdin ends the menu but keeps the HTTP server
running until SIGINT/SIGTERM.
")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

/// CLI subcommands. Without one, both front-ends run.
#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve the HTTP API only.
    Serve,

    /// Run the interactive menu only.
    Interactive,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to create tokio runtime");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(run(cli.command));

    // A pending stdin read cannot be cancelled; don't wait on it forever.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = ?err, "Todolist exited with an error");
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Option<Command>) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        tasks_file = %config.tasks_file.display(),
        port = config.port,
        index_file = %config.index_file.display(),
        "Configuration loaded"
    );

    let store = TaskStore::open(config.tasks_file.clone()).await;

    match command {
        Some(Command::Interactive) => run_console(store).await.map(|_| ()),
        Some(Command::Serve) => {
            let listener = bind(config.port).await?;
            let app = create_router(AppState::new(config, store));
            serve(listener, app, shutdown_signal()).await
        }
        None => run_both(config, store).await,
    }
}

/// Serves HTTP in the background while the menu runs in the foreground.
///
/// Choosing "Exit" in the menu stops the server. If stdin closes instead (for
/// example under a service manager) the server keeps running until a shutdown
/// signal. A signal stops the server and abandons the menu.
async fn run_both(config: Config, store: TaskStore) -> Result<()> {
    let listener = bind(config.port).await?;
    let app = create_router(AppState::new(config, store.clone()));

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(serve(listener, app, async move {
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = stop_rx => info!("Menu closed, stopping server"),
        }
    }));

    tokio::select! {
        result = run_console(store) => {
            match result? {
                MenuExit::Chosen => {
                    let _ = stop_tx.send(());
                }
                MenuExit::InputClosed => {
                    info!("Input closed, HTTP server keeps running until shutdown signal");
                }
            }
            server.await.context("Server task panicked")?
        }
        result = &mut server => result.context("Server task panicked")?,
    }
}

async fn run_console(store: TaskStore) -> Result<MenuExit> {
    let mut console = Console::new(
        store,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    console.run().await.context("Terminal I/O failed")
}

async fn bind(port: u16) -> Result<TcpListener> {
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!(address = %bind_addr, "Server starting on http://localhost:{port}");
    Ok(listener)
}

async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing.
///
/// Logs go to stderr so they stay out of the menu on stdout.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
