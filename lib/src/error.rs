//! Error taxonomy shared by every pipeline stage.

/// Errors raised by sources, filters, the converter and the preset store.
///
/// The pipeline surfaces these to the subscriber unchanged; it never retries.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The source bitmap or media never became ready.
    #[error("load error: {0}")]
    Load(String),

    /// A filter or gradient received a non-finite or out-of-domain parameter.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Conversion config has a zero dimension or an empty charset.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A preset, gradient or config document is not parseable.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised between stages once a subscription has been disposed.
    /// `Subscription::run` turns it into `Completion::Disposed`.
    #[error("subscription disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, StreamError>;

impl StreamError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        StreamError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Rejects NaN and infinities.
    pub(crate) fn check_finite(name: &'static str, value: f32) -> Result<f32> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::invalid_parameter(name, format!("must be finite, got {value}")))
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(error: serde_json::Error) -> Self {
        StreamError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for StreamError {
    fn from(error: toml::de::Error) -> Self {
        StreamError::Serialization(error.to_string())
    }
}
