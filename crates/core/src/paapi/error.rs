use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("PA-API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("PA-API HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("PA-API response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}
