use cl_server::demo::{ChatConsumer, EchoConsumer, chat_handlers, echo_handlers};
use cl_server::error::{Result as ServerErrorResult, ServerError};
use cl_server::{AppState, build_router, logger};

use cl_layer::LayerRegistry;
use cl_ws::{ConsumerApp, Multiplexer};

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    // Load and validate configuration
    let config = cl_config::Config::load()?;
    config.validate()?;

    let log_file_path: Option<std::path::PathBuf> = if let Some(ref filename) = config.logging.file
    {
        let log_dir = cl_config::Config::config_dir()?.join(&config.logging.dir);
        std::fs::create_dir_all(&log_dir)?;
        Some(log_dir.join(filename))
    } else {
        None
    };

    // Initialize logger (before any other logging)
    logger::initialize(config.logging.level, log_file_path, config.logging.colored)?;

    info!("Starting cl-server v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    if config.server.metrics_port > 0 {
        install_metrics_exporter(&config.server.host, config.server.metrics_port)?;
    }

    // Channel layers are built lazily; fail fast on a broken default
    let registry = LayerRegistry::from_config(&config);
    let layer = registry.default_layer()?;
    info!("Channel layer '{}' ready", cl_config::DEFAULT_LAYER_ALIAS);

    let echo = ConsumerApp::new(|_| EchoConsumer, echo_handlers()?)
        .with_dispatch_config(&config.dispatch);
    let chat = ConsumerApp::new(ChatConsumer::from_scope, chat_handlers()?)
        .with_dispatch_config(&config.dispatch)
        .with_layer(layer.clone());
    let multiplexer = Multiplexer::from_config(&config.multiplex)
        .stream("echo", Arc::new(echo))
        .stream("chat", Arc::new(chat));

    let app = build_router(AppState {
        application: Arc::new(multiplexer),
        ws_path: config.server.ws_path.clone(),
    });

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        "Server listening on {} (WebSocket path {})",
        listener.local_addr()?,
        config.server.ws_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
                Err(e) => error!("Failed to listen for SIGINT: {}", e),
            }
        })
        .await?;

    if let Err(e) = layer.close().await {
        error!("Failed to close channel layer: {}", e);
    }
    info!("Graceful shutdown complete");

    Ok(())
}

fn install_metrics_exporter(host: &str, port: u16) -> ServerErrorResult<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| ServerError::Metrics {
            message: format!("Invalid metrics address {host}:{port}: {e}"),
        })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ServerError::Metrics {
            message: format!("Failed to install Prometheus exporter: {e}"),
        })?;

    info!("Prometheus metrics exported on {}", addr);
    Ok(())
}
