use thiserror::Error;

/// Failure of the geodesic primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("non-finite coordinate: ({lat}, {lng})")]
    NonFiniteCoordinate { lat: f64, lng: f64 },

    #[error("invalid distance: {0} km")]
    InvalidDistance(f64),

    #[error("{0}")]
    Other(String),
}

/// Configuration rejected at validation time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("step_limit must be at least 1, got {0}")]
    InvalidStepLimit(i64),

    #[error("unknown scheduler kind: {0}")]
    UnknownScheduler(String),

    #[error("queue capacity must be at least 1 when set")]
    ZeroQueueCapacity,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
