use protocol::ErrorCode;
use thiserror::Error;

/// Errors returned by the command surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to send message: {0}")]
    SendFailed(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("failed to read messages: {0}")]
    ReadFailed(String),

    #[error("method not implemented: {0}")]
    NotImplemented(String),
}

impl Error {
    /// The wire code reported to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Error::SendFailed(_) => ErrorCode::SendFailed,
            Error::OperationFailed(_) => ErrorCode::OperationFailed,
            Error::ReadFailed(_) => ErrorCode::ReadFailed,
            Error::NotImplemented(_) => ErrorCode::NotImplemented,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
