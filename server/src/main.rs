use std::path::PathBuf;

use clap::Parser;
use tokio::io::{stdin, stdout};
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};

/// Groovy language server (spec §6 CLI surface).
#[derive(Parser, Debug)]
#[command(name = "groovy-lsp", version, about = "Core Groovy Language Server")]
struct Cli {
    /// Switch to socket transport instead of stdio.
    #[arg(short = 's', long)]
    socket: bool,

    /// Socket host (only meaningful with --socket).
    #[arg(short = 'h', long, default_value = "localhost")]
    host: String,

    /// Socket port (only meaningful with --socket); must be 1..65535.
    #[arg(short = 'p', long, default_value_t = 4389)]
    port: u16,

    /// Override workspace root; overrides GROOVY_LSP_WORKSPACE_ROOT.
    #[arg(short = 'w', long)]
    workspace: Option<PathBuf>,

    /// Parse args, log configuration, exit 0.
    #[arg(long)]
    dry_run: bool,
}

fn scheduler_threads() -> usize {
    std::env::var("GROOVY_LSP_SCHEDULER_THREADS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2)
}

fn max_threads() -> usize {
    std::env::var("GROOVY_LSP_MAX_THREADS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50)
}

fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<Option<PathBuf>, String> {
    let candidate = cli_workspace.or_else(|| std::env::var("GROOVY_LSP_WORKSPACE_ROOT").ok().map(PathBuf::from));
    match candidate {
        None => Ok(None),
        Some(path) => {
            if !path.exists() {
                return Err(format!("workspace path does not exist: {}", path.display()));
            }
            if !path.is_dir() {
                return Err(format!("workspace path is not a directory: {}", path.display()));
            }
            Ok(Some(path))
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.socket && !(1..=65535u32).contains(&(cli.port as u32)) {
        eprintln!("error: --port must be in 1..65535");
        std::process::exit(1);
    }

    let workspace = match resolve_workspace(cli.workspace.clone()) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let scheduler_threads = scheduler_threads();
    let max_threads = max_threads().max(scheduler_threads);

    if cli.dry_run {
        println!("socket: {}", cli.socket);
        println!("host: {}", cli.host);
        println!("port: {}", cli.port);
        println!("workspace: {:?}", workspace);
        println!("scheduler_threads: {scheduler_threads}");
        println!("max_threads: {max_threads}");
        std::process::exit(0);
    }

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(scheduler_threads)
        .max_blocking_threads(max_threads)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    runtime.block_on(run(cli));
}

async fn run(cli: Cli) {
    let (service, socket) = LspService::new(server::Backend::new);

    if cli.socket {
        let addr = format!("{}:{}", cli.host, cli.port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: failed to bind {addr}: {e}");
                std::process::exit(1);
            }
        };
        tracing::info!("listening on {addr}");
        let (stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("error: failed to accept connection: {e}");
                std::process::exit(1);
            }
        };
        let (read, write) = tokio::io::split(stream);
        Server::new(read, write, socket).serve(service).await;
    } else {
        Server::new(stdin(), stdout(), socket).serve(service).await;
    }
}
