//! pathvet gRPC Server
//!
//! A standalone server binary running the policy decision point over gRPC
//! with in-memory stores and the clingo solver. Production deployments
//! inject their own store and telemetry implementations; without a
//! telemetry endpoint the server answers validation requests as if no
//! readings were collected.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::signal;
use tonic::transport::Server;
use tracing::info;

use pathvet::solver::ClingoSolver;
use pathvet::store::{InMemoryIssuerStore, InMemoryMetaPolicyStore, InMemoryPolicyStore};
use pathvet::transport::PolicyManagerService;
use pathvet::{Hop, HopReading, PolicyManager, TelemetryError, TelemetryProvider, TimeInterval};

/// Server configuration
struct Config {
    /// Address to bind to
    addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:27002".parse().unwrap(),
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    let port: u16 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("error: invalid port number: {}", args[i + 1]);
                        std::process::exit(1);
                    });
                    config.addr.set_port(port);
                    i += 2;
                } else {
                    eprintln!("error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("pathvet-server - pathvet gRPC Server");
                println!();
                println!("USAGE:");
                println!("    pathvet-server [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -p, --port <PORT>         Port to listen on [default: 27002]");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

/// Telemetry stand-in for deployments without a reachable provider.
struct NoTelemetry;

#[async_trait]
impl TelemetryProvider for NoTelemetry {
    async fn readings_for_interval(
        &self,
        _interval: &TimeInterval,
        _hop: &Hop,
    ) -> Result<Vec<HopReading>, TelemetryError> {
        Ok(vec![])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = parse_args();

    let manager = Arc::new(PolicyManager::new(
        Arc::new(InMemoryPolicyStore::new()),
        Arc::new(InMemoryMetaPolicyStore::new()),
        Arc::new(InMemoryIssuerStore::new()),
        Arc::new(NoTelemetry),
        Arc::new(ClingoSolver::new()),
    ));

    let service = PolicyManagerService::new(manager);

    info!(addr = %config.addr, "pathvet server listening");

    Server::builder()
        .add_service(service.into_server())
        .serve_with_shutdown(config.addr, async {
            let _ = signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
