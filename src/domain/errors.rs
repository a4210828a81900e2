use thiserror::Error;

/// Errors for catalog-style operations (camera enumeration).
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// No capture candidate opened and produced a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpenError {
    #[error("no camera device available ({tried} candidates tried)")]
    NoDeviceAvailable { tried: usize },
}

/// A single failed read. Retried by the capture loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("transient read failure: {0}")]
    Transient(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectionError {
    /// The model could not be loaded. Permanent until the process restarts.
    #[error("detection model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("detection failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("camera is already running")]
    AlreadyRunning,
    #[error(transparent)]
    NoDeviceAvailable(#[from] OpenError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

/// Conditions that end the capture loop on their own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoopError {
    #[error("camera unavailable: recovery failed ({0})")]
    CameraUnavailable(String),
}
