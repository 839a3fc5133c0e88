use thiserror::Error;

/// Failures while turning fetched JSON into typed snapshots. Reconciliation
/// itself never fails.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid snapshot shape: {0}")]
    InvalidShape(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
