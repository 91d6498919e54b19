//! Candidate engine boundary.
//!
//! Mirrors the shape of an instruction-semantics engine API: registers and
//! flags addressed by symbolic name, sparse concrete memory areas, and a
//! `process` call that executes exactly one instruction.

use crate::error::EngineError;
use crate::reference::CpuMode;

/// A candidate emulator instance.
pub trait CandidateEngine {
    /// Write a register or flag by name (`r0`, `sp`, `c`, ...).
    ///
    /// # Errors
    ///
    /// Fails with `UnknownRegister` for a name the engine does not know.
    fn set_register(&mut self, name: &str, value: u32) -> Result<(), EngineError>;

    /// Read a register or flag by name.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownRegister` for a name the engine does not know.
    fn register(&self, name: &str) -> Result<u32, EngineError>;

    /// # Errors
    ///
    /// Fails if the engine rejects the write.
    fn set_memory_area(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Fails if the area cannot be read.
    fn memory_area(&self, addr: u32, len: usize) -> Result<Vec<u8>, EngineError>;

    /// Decode and execute the single instruction `opcode` located at `address`.
    ///
    /// # Errors
    ///
    /// Fails with the fault raised by the instruction.
    fn process(&mut self, address: u32, opcode: &[u8]) -> Result<(), EngineError>;
}

/// Opens fresh candidate engine instances.
pub trait CandidateFactory {
    type Engine: CandidateEngine;

    /// # Errors
    ///
    /// Fails if the engine cannot be created in `mode`.
    fn open(&self, mode: CpuMode) -> Result<Self::Engine, EngineError>;
}

impl<F, E> CandidateFactory for F
where
    F: Fn(CpuMode) -> Result<E, EngineError>,
    E: CandidateEngine,
{
    type Engine = E;

    fn open(&self, mode: CpuMode) -> Result<E, EngineError> {
        self(mode)
    }
}
