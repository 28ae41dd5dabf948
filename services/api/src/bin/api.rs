//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{ExifMetadataAdapter, JsonStore, OpenAiEnrichmentAdapter, UploadDir},
    config::Config,
    error::ApiError,
    prompts::PromptTemplates,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use incident_core::ReportingService;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Prepare Storage ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let store = Arc::new(JsonStore::new(config.data_dir.clone()));
    store.init().await?;
    info!("Data directory ready at {}", config.data_dir.display());

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new();
    match &config.openai_api_key {
        Some(key) => openai_config = openai_config.with_api_key(key),
        None => warn!("OPENAI_API_KEY is not set; AI descriptions and advice will be unavailable"),
    }
    let openai_client = Client::with_config(openai_config);
    let enrichment = Arc::new(OpenAiEnrichmentAdapter::new(
        openai_client,
        config.ai_model.clone(),
    ));

    let prompts = Arc::new(PromptTemplates::load(&config.prompts_path, &config.public_base_url).await);

    let reporting = ReportingService::new(
        store,
        Arc::new(UploadDir::new(config.upload_dir.clone())),
        Arc::new(ExifMetadataAdapter::new()),
        enrichment,
        prompts,
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        reporting,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    // Merge the app router with the Swagger UI router for a complete application.
    let app = web::router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
