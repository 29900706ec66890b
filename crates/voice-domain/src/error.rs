/// Shared error type used across the voice bridge crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database: {0}")]
    Database(String),

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("tool {name}: {message}")]
    Tool { name: String, message: String },

    #[error("session cache: {0}")]
    SessionCache(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
