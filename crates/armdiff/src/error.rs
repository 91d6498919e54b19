use armdiff_engine::{CpuMode, EngineError, FaultKind, PluginError};
use armdiff_state::LayoutError;
use thiserror::Error;

use crate::cases::CaseTableError;

/// An engine failed while executing the instruction under test.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{engine}: {source}")]
pub struct ExecutionFault {
    /// Label of the adapter whose engine faulted.
    pub engine: String,
    pub source: EngineError,
}

impl ExecutionFault {
    pub fn new(engine: impl Into<String>, source: EngineError) -> Self {
        Self {
            engine: engine.into(),
            source,
        }
    }

    pub const fn kind(&self) -> FaultKind {
        self.source.kind()
    }
}

/// Harness setup errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid memory layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("case table: {0}")]
    CaseTable(#[from] CaseTableError),
    #[error("engine plugin: {0}")]
    Plugin(#[from] PluginError),
    #[error("{adapter} adapter runs in {actual:?} mode, configured for {expected:?}")]
    ModeMismatch {
        adapter: String,
        expected: CpuMode,
        actual: CpuMode,
    },
    #[error("{adapter} adapter maps a different memory layout than the configuration")]
    LayoutMismatch { adapter: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
