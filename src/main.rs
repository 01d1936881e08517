//! spark-ui-router - exposes Spark driver UIs through OpenShift Routes

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use k8s_openapi::api::core::v1::Service;
use kube::Client;

use spark_ui_router::compiler::compile_route;
use spark_ui_router::config::ControllerConfig;
use spark_ui_router::controller::RouteContext;
use spark_ui_router::runner::build_controllers;
use spark_ui_router::telemetry::{init_telemetry, TelemetryConfig};

/// spark-ui-router - creates a Route for every Spark driver UI Service
#[derive(Parser, Debug)]
#[command(name = "spark-ui-router", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches Services and Routes and keeps one Route per driver UI Service.
    Controller,

    /// Print the Route that would be created for a Service manifest and exit
    Render {
        /// Path to a Service YAML manifest
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        log_format: cli.config.log_format,
        ..Default::default()
    })?;

    cli.config.validate()?;

    match cli.command {
        Some(Commands::Render { file }) => render(&cli.config, file).await,
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

/// Compile a Route from a Service manifest without touching a cluster
async fn render(config: &ControllerConfig, file: PathBuf) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read Service manifest {:?}: {}", file, e))?;

    let service: Service = serde_yaml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse Service manifest: {}", e))?;

    let settings = config.route_settings();
    let name = service.metadata.name.as_deref().unwrap_or_default();
    if !settings.matches(name) {
        anyhow::bail!(
            "Service {:?} does not contain marker {:?}, no Route would be created",
            name,
            settings.service_marker
        );
    }

    let route = serde_yaml::to_string(&compile_route(&service, &settings))
        .map_err(|e| anyhow::anyhow!("Failed to serialize Route: {}", e))?;
    println!("{route}");
    Ok(())
}

/// Run the Service and Route controllers until a shutdown signal arrives
async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    tracing::info!(
        marker = %config.service_marker,
        port = %config.ui_port_name,
        namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        resync_secs = config.resync_interval_secs,
        route_check_failure = ?config.route_check_failure,
        tls = ?config.tls_termination,
        "Starting spark-ui-router controller"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let ctx = Arc::new(RouteContext::from_config(client.clone(), &config));

    tracing::info!("Starting controllers...");
    let controllers = build_controllers(client, ctx, config.watch_namespace.as_deref());
    futures::future::join_all(controllers).await;

    tracing::info!("Shutting down");
    Ok(())
}
