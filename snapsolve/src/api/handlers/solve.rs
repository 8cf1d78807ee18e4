use crate::AppState;
use crate::api::models::solve::SolveResponse;
use crate::errors::{Error, Result};
use axum::{
    Json,
    extract::{Multipart, State},
};
use bytes::Bytes;

/// The one upload field the pipeline consumes.
struct UploadedImage {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

#[utoipa::path(
    post,
    path = "/upload/",
    tag = "solve",
    summary = "Solve the expression in an uploaded image",
    description = "Accepts a multipart form with a single file field named \"image\", runs OCR on it, \
                   and attempts to simplify the recognized text as a mathematical expression. \
                   Unrecognizable math is reported inside a successful response as a \
                   \"Could not solve: ...\" solution string.",
    request_body(
        content_type = "multipart/form-data",
        description = "One file field named \"image\" with an image/* content type"
    ),
    responses(
        (status = 200, description = "OCR ran; solution or could-not-solve message in the body", body = SolveResponse),
        (status = 400, description = "Missing, non-image, or undecodable upload", body = SolveResponse),
        (status = 500, description = "OCR engine failure", body = SolveResponse)
    )
)]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<SolveResponse>> {
    let mut upload: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        if field.name() != Some("image") {
            // Ignore unknown fields (forward compatibility)
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let bytes = field.bytes().await.map_err(|e| Error::BadRequest {
            message: format!("Failed to read image field: {}", e),
        })?;

        upload = Some(UploadedImage {
            filename,
            content_type,
            bytes,
        });
    }

    let Some(upload) = upload else {
        return Err(Error::MissingFile);
    };

    match upload.content_type.as_deref() {
        Some(content_type) if content_type.starts_with("image/") => {}
        other => {
            return Err(Error::NotAnImage {
                content_type: other.unwrap_or_default().to_string(),
            });
        }
    }

    let key = state.storage.save(&upload.filename, &upload.bytes).await?;
    tracing::info!(
        key = %key,
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        "Stored upload"
    );

    // From here on the blob exists; every exit path below must go through
    // the delete. The pipeline result is held until cleanup has run.
    let outcome = recognize_and_solve(&state, &key).await;

    if let Err(e) = state.storage.delete(&key).await {
        tracing::warn!(key = %key, error = %e, "Failed to delete stored upload");
    }

    let (extracted_text, solution) = outcome?;
    Ok(Json(SolveResponse::solved(extracted_text, solution)))
}

/// Decode + OCR + simplify. Decoding and recognition are CPU-bound and run
/// on the blocking pool.
async fn recognize_and_solve(state: &AppState, key: &str) -> Result<(String, String)> {
    let path = state.storage.resolve(key).await?;
    let ocr = state.ocr.clone();

    let text = tokio::task::spawn_blocking(move || -> Result<String> {
        // Sniff the format from the stored bytes; the client-supplied
        // extension is not trustworthy.
        let image = image::ImageReader::open(&path)
            .map_err(|e| anyhow::anyhow!("failed to open stored upload: {e}"))?
            .with_guessed_format()
            .map_err(|e| anyhow::anyhow!("failed to sniff image format: {e}"))?
            .decode()
            .map_err(Error::InvalidImage)?;
        Ok(ocr.recognize(&image)?)
    })
    .await
    .map_err(|e| anyhow::anyhow!("recognition task panicked: {e}"))??;

    tracing::debug!(key = %key, chars = text.len(), engine = state.ocr.name(), "OCR complete");

    // Solve failures are data, not errors: OCR text is frequently not
    // valid math.
    let solution = match state.solver.parse_and_simplify(text.trim()) {
        Ok(simplified) => simplified,
        Err(e) => {
            tracing::debug!(key = %key, error = %e, "Extracted text is not a solvable expression");
            format!("Could not solve: {}", e)
        }
    };

    Ok((text, solution))
}
