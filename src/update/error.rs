use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not read local manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest host returned status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("invalid manifest: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("missing manifest location")]
    MissingManifest,

    #[error("missing entry path")]
    MissingEntry,

    #[error("invalid component metadata: {0}")]
    InvalidMetadata(String),
}
