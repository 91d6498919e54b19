//! Execution adapters.
//!
//! An adapter turns a `MachineState` plus an opcode into one engine's native
//! representation, runs exactly one instruction, and turns the engine's state
//! back into a fresh `MachineState`. Register and flag packing stays inside
//! each adapter so nothing downstream sees engine-specific layouts.

mod candidate;
mod reference;

use armdiff_engine::{CpuMode, EngineError};
use armdiff_state::{MachineState, MemoryLayout, MemoryWindow};

use crate::error::ExecutionFault;

pub use candidate::{CANDIDATE_FLAG_NAMES, CANDIDATE_REGISTER_NAMES, CandidateAdapter};
pub use reference::{ReferenceAdapter, pack_nzcv, unpack_nzcv};

/// Runs one instruction on one engine.
pub trait ExecutionAdapter {
    /// Name used to attribute values and faults in reports.
    fn label(&self) -> &str;

    /// Execute `opcode` at `input.pc()` and return the resulting state.
    ///
    /// `input` is never modified; every call starts from a fresh engine.
    fn execute(&self, opcode: &[u8], input: &MachineState) -> Result<MachineState, ExecutionFault>;

    /// Instruction set the engine is opened in.
    fn mode(&self) -> CpuMode;

    /// Memory layout the adapter maps, if it maps one itself.
    fn layout(&self) -> Option<&MemoryLayout> {
        None
    }
}

/// Wrap bytes read back from an engine into a window shaped like `input`.
///
/// Fails with `ShortRead` unless the engine returned exactly `input.len()`
/// bytes.
fn read_back(input: &MemoryWindow, bytes: Vec<u8>) -> Result<MemoryWindow, EngineError> {
    if bytes.len() != input.len() {
        return Err(EngineError::ShortRead {
            address: input.base(),
            expected: input.len(),
            actual: bytes.len(),
        });
    }
    Ok(MemoryWindow::new(input.base(), bytes))
}
