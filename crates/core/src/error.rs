use thiserror::Error;

pub type VeciResult<T> = Result<T, VeciError>;

#[derive(Error, Debug)]
pub enum VeciError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store fetch error: {0}")]
    Fetch(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
