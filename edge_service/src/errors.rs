use projection::prelude::ProjectionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Projection(#[from] ProjectionError),
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Route not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Projection(ProjectionError::InvestmentNotFound(_))
            | ServiceError::NotFound(_) => 404,
            ServiceError::Projection(ProjectionError::StoreError(_))
            | ServiceError::Projection(ProjectionError::ThreadPool(_))
            | ServiceError::Io(_) => 500,
            _ => 400,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
