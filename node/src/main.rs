use clap::Parser;
use lora_node::{Args, MqttLink, Node};
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    info!(
        "Broker: {}:{}, Interval: {:?}",
        config.broker.host, config.broker.port, config.interval
    );

    let span = info_span!("node", device_id = %config.device_id);
    let link = MqttLink::new(config.client_id(), &config.broker);
    let mut node = match Node::new(config, link) {
        Ok(node) => node,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    if node.run(shutdown).instrument(span).await.is_err() {
        std::process::exit(1);
    }
}
