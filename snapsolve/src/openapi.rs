//! OpenAPI documentation definitions.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "snapsolve",
        description = "Upload an image of a mathematical expression; get back the recognized text and a simplified form."
    ),
    paths(
        crate::api::handlers::solve::upload,
        crate::api::handlers::health::health,
    ),
    components(schemas(
        crate::api::models::solve::SolveResponse,
        crate::api::models::health::HealthResponse,
    )),
    tags(
        (name = "solve", description = "Upload-OCR-solve pipeline"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;
