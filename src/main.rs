use std::sync::Arc;

use loan_assist::config::Config;
use loan_assist::decision::LocalPolicy;
use loan_assist::engine::FlowEngine;
use loan_assist::messaging::WhatsAppClient;
use loan_assist::responder::{AnthropicResponder, SupportResponder};
use loan_assist::stores::LibSqlBackend;
use loan_assist::webhook::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    eprintln!("💸 Loan Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Health:  http://0.0.0.0:{}/healthz", config.port);

    // ── Storage ─────────────────────────────────────────────────────────
    let backend = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&config.db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
                std::process::exit(1);
            }),
    );
    eprintln!("   Database: {}", config.db_path);

    // ── Messaging ───────────────────────────────────────────────────────
    let messenger = Arc::new(WhatsAppClient::new(
        config.access_token.clone(),
        config.phone_number_id.clone(),
    ));
    if !messenger.enabled() {
        eprintln!("   Messaging: dry-run (no WHATSAPP_ACCESS_TOKEN)");
    }

    // ── Support responder (optional) ────────────────────────────────────
    let responder: Option<Arc<dyn SupportResponder>> = config
        .anthropic_api_key
        .clone()
        .map(|key| {
            Arc::new(AnthropicResponder::new(key, config.responder_model.clone()))
                as Arc<dyn SupportResponder>
        });
    if responder.is_none() {
        eprintln!("   Responder: disabled (support falls back to knowledge base)");
    }

    let engine = Arc::new(FlowEngine::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        messenger,
        Arc::new(LocalPolicy::default()),
        responder,
        config.engine_config(),
    ));

    let app = webhook::router(AppState {
        engine,
        verify_token: config.verify_token.clone(),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
