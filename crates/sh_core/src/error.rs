use thiserror::Error;

/// Errors surfaced by the public construction and registry API.
///
/// Per-tick robustness faults (missing collaborator data, stale handles,
/// events arriving in the wrong state) are never errors: the affected
/// behavior is skipped for that tick and the rest of the simulation runs on.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(u32),

    #[error("Agent id already registered: {0}")]
    DuplicateAgent(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
