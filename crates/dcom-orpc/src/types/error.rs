//! DCOM error types

use midl_ndr::NdrError;
use thiserror::Error;

/// Result type for DCOM operations
pub type Result<T> = std::result::Result<T, DcomError>;

/// DCOM-specific errors
#[derive(Error, Debug)]
pub enum DcomError {
    /// Underlying NDR error
    #[error("NDR error: {0}")]
    Ndr(#[from] NdrError),

    /// Invalid OBJREF format
    #[error("invalid OBJREF: {0}")]
    InvalidObjRef(String),

    /// OBJREF kind other than OBJREF_STANDARD
    #[error("unsupported OBJREF kind: 0x{0:08x}")]
    UnsupportedObjRefKind(u32),

    /// ORPCTHAT flags outside ORPCF_NULL, ORPCF_LOCAL and ORPCF_RESERVED1..4
    #[error("invalid ORPC flags: 0x{0:08x}")]
    InvalidOrpcFlags(u32),

    /// Invalid security binding
    #[error("invalid security binding: {0}")]
    InvalidSecurityBinding(String),

    /// Invalid string binding format
    #[error("invalid string binding: {0}")]
    InvalidStringBinding(String),

    /// Invalid data
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Coarse classification of a [`DcomError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes received are not a valid encoding
    MalformedWireData,
    /// Valid encoding of something this layer does not implement
    UnsupportedVariant,
    /// The caller handed the codec something it cannot lay out
    EngineDefect,
}

impl DcomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DcomError::Ndr(e) if e.is_engine_defect() => ErrorKind::EngineDefect,
            DcomError::UnsupportedObjRefKind(_) | DcomError::InvalidOrpcFlags(_) => ErrorKind::UnsupportedVariant,
            _ => ErrorKind::MalformedWireData,
        }
    }

    /// HRESULT to report when this error fails a call
    pub fn hresult(&self) -> u32 {
        match self.kind() {
            ErrorKind::MalformedWireData => hresult::RPC_E_INVALID_HEADER,
            ErrorKind::UnsupportedVariant => match self {
                DcomError::UnsupportedObjRefKind(_) => hresult::E_NOINTERFACE,
                _ => hresult::RPC_E_INVALID_HEADER,
            },
            ErrorKind::EngineDefect => hresult::E_FAIL,
        }
    }
}

/// HRESULT codes reported for codec failures
pub mod hresult {
    /// Unspecified error
    pub const E_FAIL: u32 = 0x80004005;
    /// No such interface supported
    pub const E_NOINTERFACE: u32 = 0x80004002;
    /// ORPC header could not be parsed
    pub const RPC_E_INVALID_HEADER: u32 = 0x80010111;
}
