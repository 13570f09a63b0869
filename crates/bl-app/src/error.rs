use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: HTTP {status}: {message}")]
    BackendError { status: u16, message: String },
    #[error("At least {required} images required for 3D generation, got {given}")]
    NotEnoughImages { required: usize, given: usize },
    #[error("API URL cannot be extended with a path: {0}")]
    BaseUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
