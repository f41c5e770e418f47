// Request and response bodies of the public HTTP API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /check`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckRequest {
    /// The data to validate.
    #[schema(example = "Bitcoin price is $100,000")]
    pub data: String,
}

/// Successful reply of `POST /check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckResponse {
    /// Validation result (CORRECT or WRONG with explanation).
    #[schema(example = "WRONG: Bitcoin has not reached $100,000")]
    pub result: String,
    /// Cost in USD.
    #[schema(example = 0.1)]
    pub price: f64,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}
