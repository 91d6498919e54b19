//! Engine error types.

use std::fmt;

use thiserror::Error;

/// Broad class of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Read, write or fetch from unmapped memory.
    UnmappedAccess,
    /// Undefined or unpredictable instruction.
    UndefinedInstruction,
    /// Misaligned access.
    Alignment,
    /// Anything else the engine reports.
    Other,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedAccess => write!(f, "invalid memory access"),
            Self::UndefinedInstruction => write!(f, "undefined instruction"),
            Self::Alignment => write!(f, "alignment fault"),
            Self::Other => write!(f, "engine error"),
        }
    }
}

fn at(address: Option<u32>) -> String {
    address.map_or_else(String::new, |addr| format!(" at {addr:#010x}"))
}

/// Error reported by an execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid memory access{}", at(*.address))]
    UnmappedAccess { address: Option<u32> },

    #[error("undefined instruction{}", at(*.address))]
    UndefinedInstruction { address: Option<u32> },

    #[error("unaligned access{}", at(*.address))]
    Alignment { address: Option<u32> },

    #[error("read {actual} bytes at {address:#010x}, expected {expected}")]
    ShortRead {
        address: u32,
        expected: usize,
        actual: usize,
    },

    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    #[error("engine error {code}: {message}")]
    Other { code: i32, message: String },
}

impl EngineError {
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::UnmappedAccess { .. } => FaultKind::UnmappedAccess,
            Self::UndefinedInstruction { .. } => FaultKind::UndefinedInstruction,
            Self::Alignment { .. } => FaultKind::Alignment,
            Self::ShortRead { .. } | Self::UnknownRegister(_) | Self::Other { .. } => {
                FaultKind::Other
            }
        }
    }

    pub fn other(code: i32, message: impl Into<String>) -> Self {
        Self::Other {
            code,
            message: message.into(),
        }
    }
}
