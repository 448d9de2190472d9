//! pawbook-payments: payments gRPC service
//!
//! Hosts the payment lifecycle for the pawbook marketplace: authorization
//! management, completion tracking, capture, and payout reconciliation.
//!
//! ## Configuration
//! - PAWBOOK_CONFIG (or `--config <path>`): YAML config file
//! - MONGODB_URI / MONGODB_DATABASE: document store
//! - PROCESSOR_BASE_URL / PROCESSOR_SECRET_KEY / PROCESSOR_ENVIRONMENT:
//!   payment processor credentials and mode
//! - SERVER_HOST / SERVER_PORT: gRPC binding
//! - PAWBOOK_LOG: tracing filter (default "info")

use std::sync::Arc;

use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use pawbook::config::Config;
use pawbook::interfaces::processor::PaymentProcessor;
use pawbook::processor::HttpProcessor;
use pawbook::proto::payments_server::PaymentsServer;
use pawbook::services::{
    IntentOrchestrator, PaymentsApi, ProvisioningService, SettlementService,
};
use pawbook::storage::init_storage;
use pawbook::utils::bootstrap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    bootstrap::init_tracing();

    let config_path = bootstrap::parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting pawbook-payments");

    let (bookings, profiles) = init_storage(&config.storage).await?;
    info!("Storage initialized");

    let processor: Arc<dyn PaymentProcessor> = Arc::new(HttpProcessor::new(&config.processor));
    let provisioning = Arc::new(ProvisioningService::new(
        Arc::clone(&processor),
        Arc::clone(&profiles),
        config.processor.environment,
    ));
    let orchestrator = Arc::new(IntentOrchestrator::new(
        Arc::clone(&processor),
        Arc::clone(&bookings),
        Arc::clone(&provisioning),
        config.fees,
    ));
    let settlement = Arc::new(SettlementService::new(
        Arc::clone(&processor),
        Arc::clone(&bookings),
        config.fees,
    ));

    let api = PaymentsApi::new(orchestrator, settlement, provisioning);

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<PaymentsServer<PaymentsApi>>()
        .await;

    let addr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(
        %addr,
        environment = %config.processor.environment,
        "Payments service listening"
    );

    Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(health_service)
        .add_service(PaymentsServer::new(api))
        .serve(addr)
        .await?;

    Ok(())
}
