/// Convenience result type used across the crate.
pub type TilestackResult<T> = Result<T, TilestackError>;

/// Top-level error taxonomy used by tilestack APIs.
///
/// Every variant is fatal to the pipeline run that raised it. Absent pyramid tiles are not
/// errors at all: they render as zero pixels.
#[derive(thiserror::Error, Debug)]
pub enum TilestackError {
    /// Malformed container data: bad magic, truncation, frame-length mismatch or an
    /// unsupported pixel/compression code.
    #[error("format error: {0}")]
    Format(String),

    /// Mismatched dimensions or band counts between operator inputs, or a frame index
    /// beyond the end of a stack.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A pyramid tile coordinate outside `0 <= x,y < 2^level`.
    #[error("coordinate out of bounds for tile address (level={level}, x={x}, y={y})")]
    CoordinateOutOfBounds {
        /// Pyramid level.
        level: i32,
        /// Column index.
        x: i64,
        /// Row index.
        y: i64,
    },

    /// Missing files, unspawnable subprocesses and similar environment failures.
    #[error("resource error: {0}")]
    Resource(String),

    /// Bad command-line usage.
    #[error("usage error: {0}")]
    Usage(String),

    /// Errors when parsing or producing JSON documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TilestackError {
    /// Build a [`TilestackError::Format`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`TilestackError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`TilestackError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`TilestackError::Usage`] value.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Build a [`TilestackError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<std::io::Error> for TilestackError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

impl From<serde_json::Error> for TilestackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
