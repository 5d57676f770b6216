/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away before the operation could complete.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The peer sent a message over the configured size limit.
    #[error("frame too large: {0}")]
    FrameTooLarge(String),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting or upgrading an incoming connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
