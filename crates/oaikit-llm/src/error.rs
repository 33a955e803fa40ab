use std::time::Duration;

/// Errors that can occur when building or dispatching a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required request field (`model`, `input`) is missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The streaming callback asked to stop before the exchange completed.
    #[error("stream aborted by callback")]
    StreamAborted,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sse error: {0}")]
    Sse(String),

    /// The background worker running an async call panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Failures raised by a network transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The write callback returned `false`.
    #[error("exchange aborted by write callback")]
    Aborted,

    #[error("http error: {0}")]
    Http(Box<dyn std::error::Error + Send + Sync>),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Aborted => Error::StreamAborted,
            other => Error::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_transport_maps_to_stream_aborted() {
        let err = Error::from(TransportError::Aborted);
        assert!(matches!(err, Error::StreamAborted));
    }

    #[test]
    fn status_transport_is_kept_verbatim() {
        let err = Error::from(TransportError::Status {
            status: 429,
            body: "slow down".into(),
        });
        match err {
            Error::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
