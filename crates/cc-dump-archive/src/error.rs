#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive entry did not serialize to JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("archive file is malformed: {0}")]
    Malformed(String),
}
