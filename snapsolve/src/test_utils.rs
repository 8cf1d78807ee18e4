//! Test utilities for integration testing (available with `test-utils` feature).

use crate::config::{Config, OcrConfig, StorageConfig};
use crate::ocr::{OcrEngine, OcrError};
use crate::symbolic::Simplifier;
use crate::{AppState, build_router, storage};
use axum_test::TestServer;
use std::path::Path;
use std::sync::Arc;

/// Handle onto the temp-dir blob store backing a test app. Dropping it
/// removes the directory.
pub struct TestContext {
    storage_dir: tempfile::TempDir,
}

impl TestContext {
    /// Number of blobs currently on disk.
    pub fn stored_blobs(&self) -> usize {
        count_files(self.storage_dir.path())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() { count_files(&path) } else { 1 }
                })
                .sum()
        })
        .unwrap_or(0)
}

pub fn create_test_config(storage_path: &Path, ocr_text: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        storage: StorageConfig::Local {
            path: storage_path.to_path_buf(),
        },
        ocr: OcrConfig::Static {
            text: ocr_text.to_string(),
        },
        ..Config::default()
    }
}

/// Build a test server whose OCR engine always returns `ocr_text`.
pub async fn create_test_app(ocr_text: &str) -> (TestServer, TestContext) {
    let dir = tempfile::tempdir().expect("Failed to create temp storage dir");
    let config = create_test_config(dir.path(), ocr_text);
    let ocr = crate::ocr::create_ocr_engine(&config.ocr).expect("Failed to create OCR engine");
    build_test_app(config, ocr, dir).await
}

/// Build a test server around an arbitrary OCR engine.
pub async fn create_test_app_with_engine(ocr: Arc<dyn OcrEngine>) -> (TestServer, TestContext) {
    let dir = tempfile::tempdir().expect("Failed to create temp storage dir");
    let config = create_test_config(dir.path(), "unused");
    build_test_app(config, ocr, dir).await
}

async fn build_test_app(config: Config, ocr: Arc<dyn OcrEngine>, dir: tempfile::TempDir) -> (TestServer, TestContext) {
    let storage = storage::create_blob_store(&config.storage)
        .await
        .expect("Failed to create blob store");

    let state = AppState::builder()
        .config(config)
        .storage(storage)
        .ocr(ocr)
        .solver(Arc::new(Simplifier))
        .build();

    let router = build_router(state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, TestContext { storage_dir: dir })
}

/// A small valid PNG, for uploads that must decode successfully.
pub fn png_image_bytes() -> Vec<u8> {
    let image = image::DynamicImage::new_rgb8(32, 32);
    let mut cursor = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    cursor.into_inner()
}

/// OCR engine that always fails; exercises the engine-failure path.
pub struct FailingOcr;

impl OcrEngine for FailingOcr {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn recognize(&self, _image: &image::DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::Recognition("simulated recognition failure".to_string()))
    }
}
