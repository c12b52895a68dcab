use regseek::{
    api::routes::create_router, AnthropicClient, AppState, Config, EmbeddingProvider,
    GenerationProvider, IngestTracker, Ingestor, OpenAiEmbedder, PassageStore, PdfExtractor,
    PgStore, RagPipeline, RetrievalEngine, SessionStore, TextExtractor, TokenChunker,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "regseek=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let store = Arc::new(PgStore::connect(&config.database.url).await?);
    store.migrate(config.embedding.dimensions).await?;
    let passages: Arc<dyn PassageStore> = store.clone();
    let sessions: Arc<dyn SessionStore> = store.clone();

    let extractor: Arc<dyn TextExtractor> = Arc::new(PdfExtractor::new());
    let chunker = Arc::new(TokenChunker::new(
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    )?);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbedder::new(
        config.embedding.api_key.clone(),
        config.embedding.api_base.clone(),
        config.embedding.model.clone(),
        config.embedding.dimensions,
    ));
    let generator: Arc<dyn GenerationProvider> = Arc::new(AnthropicClient::new(
        config.generation.api_key.clone(),
        config.generation.api_base.clone(),
        config.generation.model.clone(),
        config.generation.max_tokens,
    ));

    let ingestor = Arc::new(Ingestor::new(
        extractor,
        chunker,
        embedder.clone(),
        passages.clone(),
        Arc::new(IngestTracker::new()),
    ));
    let retrieval = Arc::new(RetrievalEngine::new(embedder, passages.clone()));
    let pipeline = Arc::new(RagPipeline::new(
        retrieval,
        generator,
        sessions.clone(),
        config.chat.history_limit,
    ));

    let state = AppState {
        config: config.clone(),
        passages,
        sessions,
        ingestor,
        pipeline,
    };

    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "regseek server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
    }
}
