use thiserror::Error;

/// Business errors returned by the lifecycle calls of the detector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("chains calculation is already running")]
    PipelineAlreadyRunning,

    #[error("bid provider is already running")]
    BidProviderAlreadyRunning,
}
