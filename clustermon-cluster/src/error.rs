#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("unknown peer endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("tls configuration error: {0}")]
    Tls(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
