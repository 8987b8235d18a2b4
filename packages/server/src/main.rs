use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use server_core::{
    ai::openai::OpenAiAnalyst,
    build_router,
    jobs::{registry::JobRegistry, runner::{JobRunner, RunnerConfig}},
    AppConfig, AppState, WebDiscoverer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;

    let registry = Arc::new(JobRegistry::new());
    let analyst = Arc::new(
        OpenAiAnalyst::new(config.openai_api_key.clone()).with_model(config.model.clone()),
    );
    let discoverer = Arc::new(WebDiscoverer::new());
    let runner = Arc::new(JobRunner::new(
        registry.clone(),
        analyst,
        discoverer,
        RunnerConfig::from(&config),
    ));

    info!(
        model = %config.model,
        max_pages_per_job = config.max_pages_per_job,
        max_concurrent_jobs = config.max_concurrent_jobs,
        "Knowledge base service starting"
    );

    let state = AppState {
        registry,
        runner,
        config: Arc::new(config),
    };
    let bind_addr = state.config.bind_addr.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "Listening");
    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}
