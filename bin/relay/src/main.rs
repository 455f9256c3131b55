use chat_relay::config::RelayConfig;
use chat_relay::error::StartupError;
use chat_relay::relay::ChatRelay;
use chat_relay::routes::{AppState, PlatformToken, router};
use chat_relay_ai::{OpenAiCompatibleBackend, RetryOrchestrator};
use chat_relay_core::Result;
use chat_relay_credential::CredentialPool;
use rootcause::prelude::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = RelayConfig::from_env().map_err(|e| StartupError::Configuration {
        reason: e.to_string(),
    })?;
    config.validate()?;
    tracing::info!(?config, "Loaded configuration");

    if config.system_prompt.is_none() {
        tracing::warn!("RELAY_SYSTEM_PROMPT not set, using the default system prompt");
    }

    let pool = Arc::new(CredentialPool::new(config.credentials()?));

    let backend = OpenAiCompatibleBackend::new(
        &config.api_base_url,
        config.model.clone(),
        config.request_timeout(),
    )
    .context(StartupError::Backend)?;
    tracing::info!(endpoint = backend.endpoint(), model = %config.model, "Completion backend ready");

    let orchestrator = RetryOrchestrator::new(pool, backend, config.retry_policy());
    let relay = ChatRelay::new(orchestrator, config.system_prompt(), config.max_turns);
    let state = AppState::new(relay, PlatformToken::new(config.platform_token()?));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.bind_addr.clone(),
            reason: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            reason: e.to_string(),
        })?;

    tracing::info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
