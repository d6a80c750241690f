use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("reading archive: {0}")]
    Archive(#[from] cc_dump_archive::ArchiveError),
    #[error("entry body did not parse as the expected JSON shape: {0}")]
    Json(#[from] serde_json::Error),
}
