use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Unsupported distribution: {0}")]
    UnsupportedDistribution(String),
    #[error("Invalid trial count: {0}")]
    InvalidTrialCount(usize),
    #[error("Invalid step count: {0}")]
    InvalidStepCount(usize),
    #[error("Inconsistent path length: expected {expected}, found {found}")]
    InconsistentPathLength { expected: usize, found: usize },
    #[error("Empty trial set")]
    EmptyTrialSet,
    #[error("Malformed option {key}: {reason}")]
    MalformedOption { key: String, reason: String },
    #[error("Investment not found: {0}")]
    InvestmentNotFound(String),
    #[error("Run cancelled at trial {0}")]
    Cancelled(usize),
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
    #[error("Store error: {0}")]
    StoreError(String),
}

impl ProjectionError {
    pub fn malformed(key: &str, reason: impl Into<String>) -> Self {
        ProjectionError::MalformedOption {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for ProjectionError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        ProjectionError::ThreadPool(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

impl From<ProjectionError> for String {
    fn from(e: ProjectionError) -> Self {
        e.to_string()
    }
}
