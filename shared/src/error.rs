use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("no image loaded")]
    NoImage,
    #[error("a box is already being drawn")]
    AlreadyDrawing,
    #[error("no box is being drawn")]
    NotDrawing,
    #[error("no boxes drawn")]
    NoBoxes,
    #[error("label text is empty")]
    EmptyLabels,
    #[error("failed to read image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
