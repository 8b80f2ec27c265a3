use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connector `{0}` already started")]
    AlreadyStarted(String),

    #[error("connector `{0}` is closed")]
    Closed(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("send failed: {0}")]
    Send(String),
}
