use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any non-success response from the mail provider.
    #[error("{operation} failed: {message}")]
    RemoteApi {
        operation: &'static str,
        message: String,
    },

    #[error("label {0:?} not found in mailbox")]
    LabelNotFound(String),

    /// Malformed payload data or a payload missing the structure we rely on.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("refusing to write attachment with unsafe file name {0:?}")]
    UnsafeFileName(String),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn remote(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::RemoteApi {
            operation,
            message: err.to_string(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
