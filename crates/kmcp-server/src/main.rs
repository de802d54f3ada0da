//! karmada-mcp-server: MCP server for the Karmada control plane
//!
//! Transports:
//!   karmada-mcp-server stdio                        # stdin/stdout
//!   karmada-mcp-server sse --addr 0.0.0.0:1234      # HTTP + Server-Sent Events
//!
//! Tool selection:
//!   karmada-mcp-server --toolsets cluster,policy --read-only stdio

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kmcp_client::ClientProviders;
use kmcp_server::{
    lifecycle::{shutdown_signal, Lifecycle},
    tools,
    transport::{SseTransport, StdioTransport},
    version, McpServer, Overrides, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "karmada-mcp-server")]
#[command(about = "MCP server for the Karmada control plane")]
#[command(version, long_version = version::long_version())]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the Karmada apiserver kubeconfig
    #[arg(long, global = true, env = "KARMADA_KUBECONFIG", value_name = "PATH")]
    karmada_kubeconfig: Option<PathBuf>,

    /// Context to use from the kubeconfig
    #[arg(long, global = true, env = "KARMADA_CONTEXT", value_name = "NAME")]
    karmada_context: Option<String>,

    /// Skip TLS verification of the Karmada apiserver
    #[arg(long, global = true, env = "KARMADA_SKIP_TLS_VERIFY")]
    skip_karmada_apiserver_tls_verify: bool,

    /// Comma separated toolsets to enable, or "all"
    #[arg(long, global = true, value_delimiter = ',', value_name = "LIST")]
    toolsets: Option<Vec<String>>,

    /// Restrict the server to read-only operations
    #[arg(long, global = true)]
    read_only: bool,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Seconds in-flight requests may take to finish after a shutdown signal
    #[arg(long, global = true, value_name = "SECS")]
    shutdown_grace_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve over stdin/stdout
    Stdio,
    /// Serve over HTTP with Server-Sent Events
    Sse(SseArgs),
}

#[derive(Args)]
struct SseArgs {
    /// Listen address [default: localhost:1234]
    #[arg(long, value_name = "ADDR")]
    addr: Option<String>,

    /// Path prefix for the SSE and message endpoints [default: /mcp]
    #[arg(long, value_name = "PATH")]
    base_path: Option<String>,

    /// Keep-alive interval for SSE streams [default: 15]
    #[arg(long, value_name = "SECS")]
    keep_alive_secs: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let g = &self.global;
        let mut overrides = Overrides {
            toolsets: g.toolsets.clone(),
            read_only: g.read_only,
            log_level: g.log_level.clone(),
            shutdown_grace_secs: g.shutdown_grace_secs,
            kubeconfig: g.karmada_kubeconfig.clone(),
            context: g.karmada_context.clone(),
            skip_tls_verify: g.skip_karmada_apiserver_tls_verify,
            ..Default::default()
        };
        if let Command::Sse(sse) = &self.command {
            overrides.sse_addr = sse.addr.clone();
            overrides.sse_base_path = sse.base_path.clone();
            overrides.sse_keep_alive_secs = sse.keep_alive_secs;
        }
        overrides
    }
}

fn init_tracing(level: &str) -> Result<()> {
    // stderr only: stdout carries the stdio transport
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log level")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.global.config.as_deref(), &cli.overrides())
        .context("failed to load settings")?;
    init_tracing(&settings.log_level)?;

    info!(
        version = version::VERSION,
        toolsets = ?settings.toolsets,
        read_only = settings.read_only,
        "Starting karmada-mcp-server"
    );

    let providers = ClientProviders::lazy(settings.client_settings());
    let mut group = tools::default_toolset_group(&providers)?;
    group.resolve_enablement(&settings.toolsets, settings.read_only)?;
    let dispatcher = group.register_all()?;

    let server = Arc::new(McpServer::new(dispatcher));
    let lifecycle = Lifecycle::new(settings.shutdown_grace());
    let stop = shutdown_signal();

    let outcome = match cli.command {
        Command::Stdio => lifecycle.run(StdioTransport::new(), server, stop).await,
        Command::Sse(_) => {
            let transport = SseTransport::new(settings.sse.addr.clone())
                .with_base_path(settings.sse.base_path.clone())
                .with_keep_alive(settings.keep_alive());
            lifecycle.run(transport, server, stop).await
        }
    };
    info!(transitions = ?lifecycle.transitions(), "Exiting");
    outcome
}
