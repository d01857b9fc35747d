/// Convenience result type used across layerdoc.
pub type LayerdocResult<T> = Result<T, LayerdocError>;

/// Top-level error taxonomy used by document, history and codec APIs.
#[derive(thiserror::Error, Debug)]
pub enum LayerdocError {
    /// Caller input rejected before any state was touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The byte stream is not a readable document at all.
    #[error("format error: {0}")]
    Format(String),

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LayerdocError {
    /// Build a [`LayerdocError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LayerdocError::Format`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`LayerdocError::Codec`] value.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Build a [`LayerdocError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
