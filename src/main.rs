//! Resource dispatch server
//!
//! Serves the demonstration graph over HTTP, or prints its route table.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                RESOURCE DISPATCH                 │
//!                        │                                                  │
//!     Client Request     │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ───────────────────┼─▶│  http   │───▶│ dispatch │───▶│ node graph │   │
//!                        │  │ server  │    │  driver  │    │ (handlers) │   │
//!                        │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!                        │                                       │          │
//!     Client Response    │  ┌──────────┐                         │          │
//!     ◀──────────────────┼──│ buffered │◀────────────────────────┘          │
//!                        │  │ response │        map_url ▲                   │
//!                        │  └──────────┘                │                   │
//!                        │                      ┌───────┴──────┐            │
//!                        │                      │ route table  │◀─ startup  │
//!                        │                      │ (enumerate)  │   walk     │
//!                        │                      └──────────────┘            │
//!                        │  ┌────────────────────────────────────────────┐  │
//!                        │  │ config · logging · metrics                 │  │
//!                        │  └────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use resource_dispatch::config::{load_config, AppConfig};
use resource_dispatch::demo;
use resource_dispatch::dispatch::UrlMapper;
use resource_dispatch::enumerate::{self, RouteTable};
use resource_dispatch::observability::{logging, metrics};
use resource_dispatch::HttpServer;

#[derive(Parser)]
#[command(name = "resource-dispatch")]
#[command(about = "Path-consuming resource dispatch server", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dispatch graph over HTTP
    Serve,
    /// Print every resource id and its URL pattern
    Routes {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    logging::init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        root_prefix = ?config.dispatch.root_prefix,
        "Configuration loaded"
    );

    let app = demo::build_application()?;
    let terminals = enumerate::validate(&app.graph, app.root)?;
    tracing::debug!(terminals, nodes = app.graph.len(), "Dispatch graph validated");

    let mut routes = RouteTable::from_graph(&app.graph, app.root, config.dispatch.root_prefix.as_deref())?;
    demo::register_static(&mut routes)?;

    match cli.command {
        Commands::Routes { json } => {
            if json {
                println!("{}", routes.to_json()?);
            } else {
                for line in routes.render() {
                    println!("{}", line);
                }
            }
        }
        Commands::Serve => {
            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }
            metrics::record_route_table_size(routes.len());

            let listener = TcpListener::bind(&config.server.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");

            let server = HttpServer::new(config, Arc::new(app.graph), app.root, Arc::new(routes));
            server.run(listener).await?;

            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_routes_command() {
        let cli = Cli::try_parse_from(["resource-dispatch", "routes", "--json"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Routes { json: true }));

        let cli = Cli::try_parse_from(["resource-dispatch", "routes"]).unwrap();
        assert!(matches!(cli.command, Commands::Routes { json: false }));
    }

    #[test]
    fn test_serve_with_config() {
        let cli =
            Cli::try_parse_from(["resource-dispatch", "--config", "dispatch.toml", "serve"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("dispatch.toml")));
        assert!(matches!(cli.command, Commands::Serve));

        let cli = Cli::try_parse_from(["resource-dispatch", "-c", "other.toml", "serve"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn test_rejects_bad_invocations() {
        assert!(Cli::try_parse_from(["resource-dispatch"]).is_err());
        assert!(Cli::try_parse_from(["resource-dispatch", "launch"]).is_err());
        assert!(Cli::try_parse_from(["resource-dispatch", "serve", "--json"]).is_err());
    }
}
