//! End-to-end request tests for the upload pipeline.
//!
//! These drive the real router over a temp-dir blob store with a
//! fixed-text OCR engine, and assert the wire contract: status codes,
//! response envelopes, and the no-orphaned-blob cleanup invariant.

use crate::api::models::solve::SolveResponse;
use crate::test_utils::{
    FailingOcr, create_test_app, create_test_app_with_engine, create_test_config, png_image_bytes,
};
use axum_test::multipart::{MultipartForm, Part};
use std::sync::Arc;

fn image_form(bytes: Vec<u8>, filename: &str, content_type: &str) -> MultipartForm {
    MultipartForm::new().add_part("image", Part::bytes(bytes).file_name(filename).mime_type(content_type))
}

#[test_log::test(tokio::test)]
async fn missing_image_field_is_rejected_without_storing() {
    let (server, ctx) = create_test_app("2 + 2").await;

    let form = MultipartForm::new().add_text("note", "no image here");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: SolveResponse = response.json();
    assert!(!body.success);
    assert_eq!(body.error.as_deref(), Some("No image uploaded."));
    assert!(body.extracted_text.is_none());
    assert!(body.solution.is_none());
    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn non_image_content_type_is_rejected_without_storing() {
    let (server, ctx) = create_test_app("2 + 2").await;

    let form = image_form(png_image_bytes(), "equation.txt", "text/plain");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: SolveResponse = response.json();
    assert!(!body.success);
    assert_eq!(body.error.as_deref(), Some("File is not an image."));
    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn undecodable_payload_is_rejected_and_cleaned_up() {
    let (server, ctx) = create_test_app("2 + 2").await;

    let form = image_form(b"these are not pixels".to_vec(), "fake.png", "image/png");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: SolveResponse = response.json();
    assert!(!body.success);
    assert_eq!(body.error.as_deref(), Some("Uploaded file is not a valid image."));
    // The blob was created before decoding; it must be gone by now
    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn ocr_engine_failure_is_a_server_error_and_cleaned_up() {
    let (server, ctx) = create_test_app_with_engine(Arc::new(FailingOcr)).await;

    let form = image_form(png_image_bytes(), "equation.png", "image/png");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 500);
    let body: SolveResponse = response.json();
    assert!(!body.success);
    let error = body.error.expect("error message expected");
    assert!(error.starts_with("OCR failed:"), "got: {error}");
    assert!(error.contains("simulated recognition failure"), "got: {error}");
    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn unsolvable_text_is_a_soft_failure() {
    let (server, ctx) = create_test_app("hello world!").await;

    let form = image_form(png_image_bytes(), "note.png", "image/png");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: SolveResponse = response.json();
    assert!(body.success);
    assert_eq!(body.extracted_text.as_deref(), Some("hello world!"));
    let solution = body.solution.expect("solution expected");
    assert!(solution.starts_with("Could not solve: "), "got: {solution}");
    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn arithmetic_is_solved_and_raw_text_is_preserved() {
    // Raw OCR output keeps its trailing newline; only the solver input is
    // trimmed
    let (server, ctx) = create_test_app("2 + 2\n").await;

    let form = image_form(png_image_bytes(), "equation.png", "image/png");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: SolveResponse = response.json();
    assert!(body.success);
    assert!(body.error.is_none());
    assert_eq!(body.extracted_text.as_deref(), Some("2 + 2\n"));
    assert_eq!(body.solution.as_deref(), Some("4"));
    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn repeated_uploads_with_the_same_filename_are_independent() {
    let (server, ctx) = create_test_app("2 + 2").await;

    for _ in 0..2 {
        let form = image_form(png_image_bytes(), "duplicate.png", "image/png");
        let response = server.post("/upload/").multipart(form).await;

        assert_eq!(response.status_code(), 200);
        let body: SolveResponse = response.json();
        assert!(body.success);
        assert_eq!(body.solution.as_deref(), Some("4"));
    }

    assert_eq!(ctx.stored_blobs(), 0);
}

#[test_log::test(tokio::test)]
async fn polynomial_round_trip() {
    let (server, _ctx) = create_test_app("x**2 + 2*x + 1").await;

    let form = image_form(png_image_bytes(), "polynomial.png", "image/png");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: SolveResponse = response.json();
    assert!(body.success);
    assert!(body.extracted_text.as_deref().unwrap().contains("x**2 + 2*x + 1"));
    // Already in simplified form: simplification is a fixed point here
    assert_eq!(body.solution.as_deref(), Some("x**2 + 2*x + 1"));
}

#[test_log::test(tokio::test)]
async fn health_endpoint_reports_ok() {
    let (server, _ctx) = create_test_app("2 + 2").await;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

#[test_log::test(tokio::test)]
async fn api_docs_are_served() {
    let (server, _ctx) = create_test_app("2 + 2").await;

    let response = server.get("/docs").await;
    assert_eq!(response.status_code(), 200);
}

#[test_log::test(tokio::test)]
async fn application_boots_from_config() {
    // Full Application::new path: creates the blob store directory and the
    // configured (static) OCR engine
    let dir = tempfile::tempdir().expect("Failed to create temp storage dir");
    let config = create_test_config(dir.path(), "1 + 2");

    let app = crate::Application::new(config).await.expect("Failed to create application");
    let server = app.into_test_server();

    let form = image_form(png_image_bytes(), "equation.png", "image/png");
    let response = server.post("/upload/").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: SolveResponse = response.json();
    assert_eq!(body.solution.as_deref(), Some("3"));
}
