use projection::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ProjectionRequest {
    pub investment_id: InvestmentId,
    #[serde(default)]
    pub options: Option<OptionMap>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Seed file for the in-memory investment book.
#[derive(Debug, Deserialize)]
pub struct InvestmentsFile {
    pub investments: Vec<Investment>,
}
