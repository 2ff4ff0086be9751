use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a reply is already streaming; wait for it or cancel it first")]
    SendInFlight,

    #[error("message is empty")]
    EmptyMessage,

    #[error("no reply is streaming")]
    NotSending,

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    Timestamp(#[from] time::error::Format),
}
