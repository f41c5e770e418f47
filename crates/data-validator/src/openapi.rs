// OpenAPI document for the public API, served at `/openapi.json`.

use utoipa::OpenApi;

use crate::models::{CheckRequest, CheckResponse, ErrorBody};

pub const API_TITLE: &str = "Data Validator Agent";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Data Validator Agent",
        version = "1.0.0",
        description = "AI agent that validates data for other AI agents."
    ),
    paths(crate::routes::check),
    components(schemas(CheckRequest, CheckResponse, ErrorBody))
)]
pub struct ApiDoc;

/// Build the document, stating the configured price in the description.
pub fn document(price_per_request: f64) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.description = Some(format!(
        "AI agent that validates data for other AI agents. ${price_per_request:.2} per request."
    ));
    doc
}
