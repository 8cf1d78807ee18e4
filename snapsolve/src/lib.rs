//! # snapsolve: Image-to-Math Solver Service
//!
//! `snapsolve` is a small HTTP service that accepts an uploaded image of a
//! mathematical expression, extracts text from it via optical character
//! recognition, attempts to interpret the text as a symbolic expression,
//! and responds with the original text plus a simplified form.
//!
//! ## Overview
//!
//! The entire service is one linear pipeline behind `POST /upload/`:
//!
//! 1. Validate the multipart upload (one file field named `image` with an
//!    `image/*` content type)
//! 2. Persist the bytes to the blob store under a per-request key
//! 3. Decode the stored file as an image
//! 4. Run OCR on the decoded image
//! 5. Parse and simplify the recognized text as a symbolic expression
//! 6. Delete the stored blob - on every path that reaches step 2,
//!    success or failure
//! 7. Respond with `{success, extracted_text, solution}`
//!
//! Validation and decode failures are client errors (400), OCR engine
//! failures are server errors (500), and text that does not parse as math
//! is a *soft* failure: the request still succeeds and the solution string
//! reads `"Could not solve: ..."`. OCR output is frequently not valid
//! math, so that outcome is ordinary data.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). The
//! pipeline's collaborators are injected trait objects carried in
//! [`AppState`], so each can be substituted independently in tests:
//!
//! - [`storage::BlobStore`] - transient upload persistence
//!   (local filesystem in production)
//! - [`ocr::OcrEngine`] - text extraction (Tesseract behind the
//!   `tesseract` cargo feature, or a fixed-text engine from config)
//! - [`symbolic::SymbolicEngine`] - expression parsing and simplification
//!   (built-in simplifier)
//!
//! There is no database, no queue, and no state shared across requests
//! beyond the blob store directory; stored blobs live only for the
//! duration of the request that created them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use snapsolve::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = snapsolve::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     snapsolve::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
pub mod ocr;
pub mod openapi;
pub mod storage;
pub mod symbolic;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod test;

use crate::ocr::OcrEngine;
use crate::storage::BlobStore;
use crate::symbolic::{Simplifier, SymbolicEngine};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across request handlers.
///
/// Carries the configuration and the three injected pipeline
/// collaborators. Handlers never construct collaborators themselves;
/// substituting any of them (e.g. a fixed-text OCR engine, a temp-dir
/// blob store) is a matter of building a different state.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn BlobStore>,
    pub ocr: Arc<dyn OcrEngine>,
    pub solver: Arc<dyn SymbolicEngine>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    if config.cors_allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::permissive());
    }

    let mut origins = Vec::new();
    for origin in &config.cors_allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    Ok(CorsLayer::new().allow_origin(origins))
}

/// Build the application router with all endpoints and middleware.
///
/// - `POST /upload/` with the configured body size limit
/// - `GET /health`
/// - `GET /docs` (rendered OpenAPI documentation)
/// - CORS and tracing layers
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;
    let max_upload_size = state.config.max_upload_size;

    let router = Router::new()
        .route(
            "/upload/",
            post(api::handlers::solve::upload).layer(DefaultBodyLimit::max(max_upload_size as usize)),
        )
        .route("/health", get(api::handlers::health::health))
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        );

    Ok(router)
}

/// Main application struct that owns the router and server lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] initializes the blob store
///    directory and the configured OCR engine
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all collaborators initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting snapsolve with configuration: {:#?}", config);

        let storage = storage::create_blob_store(&config.storage).await?;
        let ocr = ocr::create_ocr_engine(&config.ocr)?;
        let solver: Arc<dyn SymbolicEngine> = Arc::new(Simplifier);

        let state = AppState::builder()
            .config(config.clone())
            .storage(storage)
            .ocr(ocr)
            .solver(solver)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("snapsolve listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
