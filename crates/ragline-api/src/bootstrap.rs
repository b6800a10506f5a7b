//! Application assembly and lifecycle
//!
//! Construction is bottom-up: stores -> providers -> RAG service -> job
//! service -> dispatcher+workers -> HTTP server. Shutdown runs the same
//! chain in reverse: stop ingress, drain the pool under the grace period,
//! release externals, then exit (forcefully when the drain times out).

use crate::state::AppState;
use ragline_config::ApplicationConfig;
use ragline_embeddings::{Embedder, GeminiEmbedder};
use ragline_ingest::IngestOptions;
use ragline_jobs::{
    InMemoryJobStore, InMemoryMessageStore, JobService, JobStore, MessageStore, RedisJobStore,
    RedisMessageStore,
};
use ragline_llm::{GeminiProvider, LlmProvider};
use ragline_rag::{Rag, RagService, WorkerPool};
use ragline_vector_data::{QdrantStore, VectorStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Build every service and run the server until a shutdown signal.
///
/// # Errors
///
/// Fails when an external dependency that has no fallback (the vector
/// store) cannot be reached, or the listen address is unusable.
pub async fn run(config: ApplicationConfig) -> anyhow::Result<()> {
    let externals = CancellationToken::new();

    let (job_store, message_store) = connect_stores(&config).await;
    let jobs = Arc::new(JobService::new(&config.queue, job_store, message_store));

    let vector: Arc<dyn VectorStore> =
        Arc::new(QdrantStore::connect(&config.vector, &config.rag).await?);
    let embedder: Arc<dyn Embedder> = Arc::new(GeminiEmbedder::new(config.embedding.clone()));
    let llm: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(config.llm.clone(), &config.rag));
    let rag: Arc<dyn RagService> = Arc::new(Rag::new(
        vector,
        llm,
        embedder,
        config.rag.clone(),
        IngestOptions::from_config(&config.embedding, &config.vector),
    ));

    let pool = WorkerPool::new(
        Arc::clone(&jobs),
        rag,
        config.workers.clone(),
        externals.clone(),
    );
    pool.start();

    let metrics_handle = crate::metrics::install_recorder()?;
    let state = AppState::new(jobs, Arc::new(config.clone()), metrics_handle);
    let app = crate::routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "server is listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Ingress has stopped accepting; give in-flight jobs the grace period.
    let drained = pool.shutdown().await;
    externals.cancel();
    if !drained {
        error!("force shutdown: workers did not drain in time");
        std::process::exit(1);
    }
    info!("server stopped");
    Ok(())
}

async fn connect_stores(
    config: &ApplicationConfig,
) -> (Arc<dyn JobStore>, Arc<dyn MessageStore>) {
    match (
        RedisJobStore::connect(&config.stores).await,
        RedisMessageStore::connect(&config.stores).await,
    ) {
        (Ok(jobs), Ok(messages)) => {
            info!("connected to redis stores");
            (Arc::new(jobs), Arc::new(messages))
        }
        (jobs, messages) => {
            if let Err(e) = &jobs {
                error!(error = %e, "redis job store unavailable");
            }
            if let Err(e) = &messages {
                error!(error = %e, "redis message store unavailable");
            }
            error!("falling back to in-memory stores; job state will not survive restarts");
            (
                Arc::new(InMemoryJobStore::new()),
                Arc::new(InMemoryMessageStore::new()),
            )
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "failed to listen for SIGTERM"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
