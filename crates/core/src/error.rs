/// Result alias that carries the custom [`SpatError`] type.
pub type Result<T> = std::result::Result<T, SpatError>;

/// Common error type for the core crate.
///
/// Geometric state updates never fail: out-of-range values are clamped and
/// non-finite values are dropped. This type covers structural misuse
/// (selectors and slots outside their range) and persistence.
#[derive(Debug, thiserror::Error)]
pub enum SpatError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Preset slots are numbered 1 to 50.
    #[error("preset slot {0} is outside the valid range 1..=50")]
    InvalidPresetSlot(i32),
    #[error("no preset saved in slot {0}")]
    MissingPreset(i32),
    /// Between one and eight sources can be active.
    #[error("cannot use {0} sources, the supported range is 1..=8")]
    InvalidSourceCount(usize),
    #[error("unknown position source link selector {0}")]
    UnknownPositionLink(i32),
    #[error("unknown elevation source link selector {0}")]
    UnknownElevationLink(i32),
    #[error("unknown trajectory type selector {0}")]
    UnknownTrajectoryType(i32),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl SpatError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SpatError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SpatError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
