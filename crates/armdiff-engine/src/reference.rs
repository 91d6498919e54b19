//! Reference engine boundary.
//!
//! Mirrors the shape of a machine-level emulator API: explicit memory mapping,
//! numeric register identifiers, a packed status register, and execution
//! bounded by an end address and an instruction count.

use crate::error::EngineError;

/// Instruction-set state the engine decodes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuMode {
    #[default]
    Arm,
    Thumb,
}

impl CpuMode {
    /// Numeric selector passed across the plugin ABI.
    pub const fn id(self) -> u32 {
        match self {
            Self::Arm => 0,
            Self::Thumb => 1,
        }
    }
}

/// Register identifier understood by a reference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefReg {
    /// Core register r0-r15 by architectural number.
    Core(u8),
    /// Application status register; NZCV live in bits 31..28.
    Apsr,
}

impl RefReg {
    pub const SP: Self = Self::Core(13);
    pub const LR: Self = Self::Core(14);
    pub const PC: Self = Self::Core(15);

    /// Numeric identifier passed across the plugin ABI.
    pub const fn id(self) -> u32 {
        match self {
            Self::Core(n) => n as u32,
            Self::Apsr => 16,
        }
    }
}

/// A reference emulator instance.
pub trait ReferenceEngine {
    /// Map `size` bytes of zeroed memory at `base`.
    ///
    /// # Errors
    ///
    /// Fails if the region cannot be mapped.
    fn mem_map(&mut self, base: u32, size: u32) -> Result<(), EngineError>;

    /// Write bytes into mapped memory.
    ///
    /// # Errors
    ///
    /// Fails if any byte lies outside mapped memory.
    fn mem_write(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError>;

    /// Read `len` bytes of mapped memory.
    ///
    /// # Errors
    ///
    /// Fails if any byte lies outside mapped memory.
    fn mem_read(&self, addr: u32, len: usize) -> Result<Vec<u8>, EngineError>;

    /// # Errors
    ///
    /// Fails with `UnknownRegister` for an id the engine does not model.
    fn reg_write(&mut self, reg: RefReg, value: u32) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Fails with `UnknownRegister` for an id the engine does not model.
    fn reg_read(&self, reg: RefReg) -> Result<u32, EngineError>;

    /// Execute from `begin` until `until` is reached or `count` instructions
    /// have retired, whichever happens first.
    ///
    /// # Errors
    ///
    /// Fails with the fault raised by the executed instruction.
    fn emu_start(&mut self, begin: u32, until: u32, count: usize) -> Result<(), EngineError>;
}

/// Opens fresh reference engine instances.
pub trait ReferenceFactory {
    type Engine: ReferenceEngine;

    /// # Errors
    ///
    /// Fails if the engine cannot be created in `mode`.
    fn open(&self, mode: CpuMode) -> Result<Self::Engine, EngineError>;
}

impl<F, E> ReferenceFactory for F
where
    F: Fn(CpuMode) -> Result<E, EngineError>,
    E: ReferenceEngine,
{
    type Engine = E;

    fn open(&self, mode: CpuMode) -> Result<E, EngineError> {
        self(mode)
    }
}
