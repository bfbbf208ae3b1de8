use crate::config::ConversionConfig;
use crate::converters::{CommandExecutor, ConverterRegistry};
use crate::handlers;
use crate::services::{ConversionService, LocalStorage, Storage, TaskStore};
use crate::workers::{ConversionJob, TaskSweeper, WorkerOrchestrator};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ConversionConfig,
    pub conversions: ConversionService,
    pub tasks: TaskStore,
    /// `None` when the worker pool is disabled.
    pub job_tx: Option<mpsc::Sender<ConversionJob>>,
}

type ServerFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

pub struct Application {
    port: u16,
    server: ServerFuture,
    worker_shutdown: Option<CancellationToken>,
    sweeper: Option<JoinHandle<()>>,
}

impl Application {
    pub async fn build(config: ConversionConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.upload_dir)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize upload directory at {}: {}",
                        config.storage.upload_dir.display(),
                        e
                    );
                    e
                })?,
        );

        let conversions = ConversionService::new(
            storage,
            Arc::new(ConverterRegistry::new(&config.converter)),
            CommandExecutor::new(config.converter.timeout()),
        );
        let tasks = TaskStore::new();

        let (job_tx, worker_shutdown, sweeper) = if config.worker.enabled {
            let (orchestrator, job_tx) =
                WorkerOrchestrator::new(config.worker.clone(), conversions.clone(), tasks.clone());
            let token = orchestrator.shutdown_token();
            orchestrator.start().await;

            let sweeper = TaskSweeper::new(&config.worker, conversions.clone(), tasks.clone());
            let sweeper = tokio::spawn(sweeper.run(token.clone()));

            (Some(job_tx), Some(token), Some(sweeper))
        } else {
            tracing::info!("Worker pool disabled by configuration");
            (None, None, None)
        };

        let state = AppState {
            config: config.clone(),
            conversions,
            tasks,
            job_tx,
        };

        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::pin(server.into_future()),
            worker_shutdown,
            sweeper,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until a shutdown signal, then stop the workers and wait for
    /// the sweeper to remove task workspaces.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let result = self.server.await;
        if let Some(token) = self.worker_shutdown {
            token.cancel();
        }
        if let Some(sweeper) = self.sweeper {
            if let Err(e) = sweeper.await {
                tracing::error!("Task sweeper panicked: {}", e);
            }
        }
        result
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/convert/word-to-pdf", post(handlers::word_to_pdf))
        .route("/convert/pdf-to-word", post(handlers::pdf_to_word))
        .route("/api/convert/word-to-pdf", post(handlers::submit_word_to_pdf))
        .route("/api/convert/pdf-to-word", post(handlers::submit_pdf_to_word))
        .route("/api/convert/pdf-to-doc", post(handlers::submit_pdf_to_doc))
        .route("/api/convert/task/status", get(handlers::task_status))
        .route(
            "/api/convert/task/:task_id/download",
            get(handlers::download_task),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
