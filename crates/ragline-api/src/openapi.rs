//! OpenAPI document and Swagger UI wiring

use crate::adapter::{InitJobResponse, JobOutgoingError, JobResponse, JobResult, RagResponse};
use crate::routes::chat::ChatRequest;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ragline API",
        description = "Asynchronous chat RAG and document ingestion jobs",
        version = "0.2.0"
    ),
    paths(
        crate::routes::chat::chat_handler,
        crate::routes::status::status_handler,
        crate::routes::ingest::ingest_handler,
    ),
    components(schemas(
        ChatRequest,
        InitJobResponse,
        JobResponse,
        JobResult,
        RagResponse,
        JobOutgoingError,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi())
}
