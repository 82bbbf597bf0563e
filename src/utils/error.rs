use thiserror::Error;

pub type Result<T> = std::result::Result<T, P2PError>;

#[derive(Error, Debug)]
pub enum P2PError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Address already registered: {0}")]
    DuplicateRegistration(String),

    #[error("No registered client owns: {0}")]
    UnknownOwner(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Local file missing: {0}")]
    LocalFileMissing(String),

    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<std::io::Error> for P2PError {
    fn from(err: std::io::Error) -> Self {
        P2PError::IoError(err.to_string())
    }
}

impl From<rusqlite::Error> for P2PError {
    fn from(err: rusqlite::Error) -> Self {
        P2PError::StoreError(err.to_string())
    }
}

impl From<serde_json::Error> for P2PError {
    fn from(err: serde_json::Error) -> Self {
        P2PError::StoreError(format!("Failed to serialize records: {}", err))
    }
}
