//! NDR error types

use thiserror::Error;

/// Upper bound on the conformance (element count) accepted for a single
/// array. Larger counts are rejected before any allocation happens.
pub const MAX_NDR_ARRAY_ELEMENTS: usize = 1 << 20;

/// NDR encoding/decoding errors
#[derive(Debug, Error)]
pub enum NdrError {
    /// Buffer underflow - not enough data
    #[error("buffer underflow: needed {needed} bytes, have {have}")]
    BufferUnderflow { needed: usize, have: usize },

    /// Array conformance above [`MAX_NDR_ARRAY_ELEMENTS`], or more referents
    /// than a decoder was allowed to build
    #[error("allocation limit exceeded: requested {requested}, limit {limit}")]
    AllocationLimitExceeded { requested: usize, limit: usize },

    /// A value was handed to the engine that does not fit the shape it was
    /// asked to encode, or a shape the engine cannot lay out.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl NdrError {
    /// True for errors caused by the calling code rather than by the bytes
    /// on the wire.
    pub fn is_engine_defect(&self) -> bool {
        matches!(self, NdrError::ShapeMismatch(_))
    }
}

/// Result type for NDR operations
pub type Result<T> = std::result::Result<T, NdrError>;
