#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Insufficient data for product {key}: {distinct_prices} distinct price(s), need at least 2")]
    InsufficientData { key: String, distinct_prices: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
