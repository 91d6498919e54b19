//! Adapter for reference engines (packed APSR, mapped memory).

use armdiff_engine::{CpuMode, EngineError, RefReg, ReferenceEngine, ReferenceFactory};
use armdiff_state::{
    Flag, Flags, MachineState, MemoryLayout, MemoryWindow, NUM_REGS, Reg, WindowId,
};
use tracing::debug;

use super::{ExecutionAdapter, read_back};
use crate::error::ExecutionFault;

const NZCV_MASK: u32 = 0xf000_0000;

const fn apsr_bit(flag: Flag) -> u32 {
    match flag {
        Flag::N => 31,
        Flag::Z => 30,
        Flag::C => 29,
        Flag::V => 28,
    }
}

/// Replace the NZCV bits of `apsr` with `flags`, keeping bits 27..0.
pub const fn pack_nzcv(apsr: u32, flags: Flags) -> u32 {
    let mut word = apsr & !NZCV_MASK;
    let mut i = 0;
    while i < Flag::ALL.len() {
        let flag = Flag::ALL[i];
        word |= flags.bit(flag) << apsr_bit(flag);
        i += 1;
    }
    word
}

/// Extract NZCV from bits 31..28 of `apsr`.
pub const fn unpack_nzcv(apsr: u32) -> Flags {
    Flags::new(
        (apsr >> apsr_bit(Flag::N)) & 1 == 1,
        (apsr >> apsr_bit(Flag::Z)) & 1 == 1,
        (apsr >> apsr_bit(Flag::C)) & 1 == 1,
        (apsr >> apsr_bit(Flag::V)) & 1 == 1,
    )
}

const fn core(reg: Reg) -> RefReg {
    RefReg::Core(reg.index() as u8)
}

/// Drives a [`ReferenceEngine`] through one instruction.
pub struct ReferenceAdapter<F> {
    factory: F,
    layout: MemoryLayout,
    mode: CpuMode,
    label: String,
}

impl<F: ReferenceFactory> ReferenceAdapter<F> {
    pub fn new(factory: F, layout: MemoryLayout) -> Self {
        Self {
            factory,
            layout,
            mode: CpuMode::Arm,
            label: "reference".to_string(),
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: CpuMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn load(
        &self,
        engine: &mut F::Engine,
        opcode: &[u8],
        input: &MachineState,
    ) -> Result<(), EngineError> {
        engine.mem_map(self.layout.code_base, self.layout.map_size)?;
        engine.mem_write(input.pc(), opcode)?;
        for id in WindowId::ALL {
            let window = input.window(id);
            engine.mem_write(window.base(), window.as_bytes())?;
        }

        for reg in Reg::ALL {
            engine.reg_write(core(reg), input.reg(reg))?;
        }
        let apsr = engine.reg_read(RefReg::Apsr)?;
        engine.reg_write(RefReg::Apsr, pack_nzcv(apsr, input.flags()))
    }

    fn extract(engine: &F::Engine, input: &MachineState) -> Result<MachineState, EngineError> {
        let mut regs = [0u32; NUM_REGS];
        for reg in Reg::ALL {
            regs[reg.index()] = engine.reg_read(core(reg))?;
        }
        let flags = unpack_nzcv(engine.reg_read(RefReg::Apsr)?);

        let read_window = |window: &MemoryWindow| -> Result<MemoryWindow, EngineError> {
            read_back(window, engine.mem_read(window.base(), window.len())?)
        };
        let stack = read_window(input.stack())?;
        let heap = read_window(input.heap())?;

        Ok(MachineState::new(regs, flags, stack, heap))
    }

    fn run(&self, opcode: &[u8], input: &MachineState) -> Result<MachineState, EngineError> {
        let mut engine = self.factory.open(self.mode)?;
        self.load(&mut engine, opcode, input)?;

        // The count bounds execution to one instruction; `until` sits one
        // word past the instruction so the engine commits the new PC.
        let pc = input.pc();
        let until = pc.wrapping_add(opcode.len() as u32).wrapping_add(4);
        debug!(engine = %self.label, pc, until, "emu_start");
        engine.emu_start(pc, until, 1)?;

        Self::extract(&engine, input)
    }
}

impl<F: ReferenceFactory> ExecutionAdapter for ReferenceAdapter<F> {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&self, opcode: &[u8], input: &MachineState) -> Result<MachineState, ExecutionFault> {
        self.run(opcode, input)
            .map_err(|source| ExecutionFault::new(&self.label, source))
    }

    fn mode(&self) -> CpuMode {
        self.mode
    }

    fn layout(&self) -> Option<&MemoryLayout> {
        Some(&self.layout)
    }
}
