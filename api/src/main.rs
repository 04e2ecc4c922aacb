mod auth;
mod dto;
mod error;
mod routes;
mod state;

use std::env;
use std::sync::Arc;

use axum::{middleware, routing::post, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use rag_system::config::Config;
use rag_system::coordinator::Coordinator;
use rag_system::deadline::DeadlineRegistry;
use rag_system::embedding::{EmbeddingClient, HttpEmbeddingProvider};
use rag_system::extractor::image::{HttpOcr, NoopOcr};
use rag_system::extractor::pdf::{FallbackPdfExtractor, NativePdfExtractor, SidecarPdfExtractor};
use rag_system::llm::{ClaudeProvider, GeminiProvider};
use rag_system::orchestrator::Orchestrator;
use rag_system::web_context::NoopWebContext;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::load().expect("failed to load configuration");
    log::info!("configuration loaded; global_timer.enabled={}", config.global_timer.enabled);

    let coordinator = Arc::new(build_coordinator(config.clone()));
    let state = Arc::new(AppState {
        config: config.clone(),
        coordinator,
    });

    let app = Router::new()
        .route("/api/v1/hackrx/run", post(routes::hackrx::run))
        .route("/api/v1/process-pdf", post(routes::process_pdf::process_pdf))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware))
        .route("/health", axum::routing::get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    log::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("server exited unexpectedly");
}

/// Wires the core library's capability boundaries to the configured
/// transports. Provider endpoints and credentials come from the
/// environment directly (they're secrets, not ops config) per
/// SPEC_FULL.md §3's note on keeping them out of `config/default.toml`.
fn build_coordinator(config: Arc<Config>) -> Coordinator {
    let embedding_endpoint = env::var("EMBEDDING_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:8200/embed".to_string());
    let embedding_model = env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-small".to_string());
    let embedding_api_key = env::var("EMBEDDING_API_KEY").ok();
    let embedding_dimension: usize = env::var("EMBEDDING_DIMENSION")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1536);

    let primary_embeddings = Arc::new(HttpEmbeddingProvider {
        endpoint: embedding_endpoint,
        model: embedding_model,
        dimension: embedding_dimension,
        api_key: embedding_api_key,
    });
    let embedding_client = Arc::new(EmbeddingClient::with_config(
        primary_embeddings,
        None,
        config.embedding_batch.batch_size,
        config.embedding_batch.enabled,
        config.embedding_timeout_ms,
        config.question_embedding_timeout_ms,
    ));

    let native: Arc<dyn rag_system::extractor::PdfExtractor> = Arc::new(NativePdfExtractor);
    let sidecar: Arc<dyn rag_system::extractor::PdfExtractor> = Arc::new(SidecarPdfExtractor {
        base_url: config.text_extraction.python_service.url.clone(),
        timeout_ms: config.text_extraction.python_service.timeout_ms,
    });
    let (primary_pdf, fallback_pdf) = match config.text_extraction.pdf_method.as_str() {
        "python-pymupdf" => (sidecar, native),
        _ => (native, sidecar),
    };
    let pdf_extractor: Arc<dyn rag_system::extractor::PdfExtractor> =
        if config.text_extraction.fallback_enabled {
            Arc::new(FallbackPdfExtractor::new(primary_pdf, fallback_pdf))
        } else {
            primary_pdf
        };

    let ocr: Arc<dyn rag_system::extractor::OcrProvider> = match env::var("OCR_ENDPOINT") {
        Ok(endpoint) => Arc::new(HttpOcr { endpoint, mime_type: "image/png" }),
        Err(_) => Arc::new(NoopOcr),
    };

    let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
    let primary_llm = Arc::new(GeminiProvider {
        api_key: gemini_api_key,
        model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
    });
    let secondary_llm = env::var("CLAUDE_API_KEY").ok().map(|api_key| {
        Arc::new(ClaudeProvider {
            api_key,
            model: env::var("CLAUDE_MODEL").unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string()),
        }) as Arc<dyn rag_system::llm::LlmProvider>
    });

    let orchestrator = Arc::new(Orchestrator::new(
        primary_llm,
        secondary_llm,
        config.enable_llm_racing,
        config.streaming.clone(),
    ));

    Coordinator {
        config: config.clone(),
        deadlines: Arc::new(DeadlineRegistry::new()),
        http: reqwest::Client::new(),
        pdf_extractor,
        ocr,
        embedding_client,
        orchestrator,
        web_context: Arc::new(NoopWebContext),
    }
}
