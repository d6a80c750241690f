#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    #[error("could not connect to upstream: {0}")]
    UpstreamConnect(String),
    #[error("could not determine upstream target: {0}")]
    NoUpstreamTarget(String),
}
