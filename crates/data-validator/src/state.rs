// Shared state handed to every request handler.

use std::sync::Arc;

use validator_llm::FactChecker;

#[derive(Clone)]
pub struct AppState {
    pub checker: Arc<dyn FactChecker>,
    /// USD reported back with every successful check.
    pub price_per_request: f64,
}

impl AppState {
    pub fn new(checker: Arc<dyn FactChecker>, price_per_request: f64) -> Self {
        Self {
            checker,
            price_per_request,
        }
    }

    /// Price as shown to humans, e.g. `$0.1`.
    pub fn price_label(&self) -> String {
        format!("${}", self.price_per_request)
    }
}
