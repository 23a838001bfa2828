use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dora_mcp::config::{load_config, ConfigOverrides, ServerConfig, TransportKind};
use dora_mcp::mcp::{http, run_stdio, McpServer};
use dora_mcp::repository::{PublicationRepository, RepositoryClient};

/// MCP server for the DORA publication repository.
#[derive(Parser)]
#[command(name = "dora-mcp", version, about = "MCP server for DORA publication search")]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true, env = "DORA_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Repository base URL (up to and including /islandora)
    #[arg(long, global = true, env = "DORA_BASE_URL")]
    base_url: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server
    Serve {
        /// Transport binding: stdio or http
        #[arg(short, long, env = "MCP_TRANSPORT")]
        transport: Option<TransportKind>,
        /// Bind host for the http transport
        #[arg(long, env = "MCP_HOST")]
        host: Option<String>,
        /// Bind port for the http transport
        #[arg(short, long, env = "MCP_PORT")]
        port: Option<u16>,
    },
    /// Run a single weighted search and print the records as JSON
    Query {
        /// Search term
        search: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr; stdout belongs to the stdio transport.
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

async fn run(cli: Cli) -> dora_mcp::errors::Result<()> {
    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    match cli.command {
        Commands::Serve {
            transport,
            host,
            port,
        } => {
            let config = file_config.with_overrides(ConfigOverrides {
                transport,
                host,
                port,
                base_url: cli.base_url,
            });
            config.validate()?;
            info!(transport = %config.transport, base_url = %config.base_url, "starting dora-mcp");

            let repository = Arc::new(RepositoryClient::new(&config.base_url)?);
            let server = McpServer::new(repository);
            match config.transport {
                TransportKind::Stdio => run_stdio(server).await?,
                TransportKind::Http => http::serve(server, &config.host, config.port).await?,
            }
        }
        Commands::Query { search } => {
            let config = file_config.with_overrides(ConfigOverrides {
                base_url: cli.base_url,
                ..Default::default()
            });
            config.validate()?;

            let client = RepositoryClient::new(&config.base_url)?;
            let records = client.search(&search).await?;
            if records.is_empty() {
                println!("No publications found for '{}'", search);
            } else {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }
    }
    Ok(())
}
