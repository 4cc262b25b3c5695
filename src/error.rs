#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read project: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid project.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("project has no stage target")]
    MissingStage,
}
