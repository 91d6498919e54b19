//! Adapter for candidate engines (named registers and flags).

use armdiff_engine::{CandidateEngine, CandidateFactory, CpuMode, EngineError};
use armdiff_state::{Flag, Flags, MachineState, MemoryWindow, NUM_REGS, Reg, WindowId};
use tracing::debug;

use super::{ExecutionAdapter, read_back};
use crate::error::ExecutionFault;

/// Candidate-side register names, indexed by architectural register number.
pub const CANDIDATE_REGISTER_NAMES: [&str; NUM_REGS] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "r14",
    "pc",
];

/// Candidate-side flag register names in N, Z, C, V order.
pub const CANDIDATE_FLAG_NAMES: [&str; 4] = ["n", "z", "c", "v"];

const fn flag_name(flag: Flag) -> &'static str {
    match flag {
        Flag::N => CANDIDATE_FLAG_NAMES[0],
        Flag::Z => CANDIDATE_FLAG_NAMES[1],
        Flag::C => CANDIDATE_FLAG_NAMES[2],
        Flag::V => CANDIDATE_FLAG_NAMES[3],
    }
}

const fn reg_name(reg: Reg) -> &'static str {
    CANDIDATE_REGISTER_NAMES[reg.index()]
}

/// Drives a [`CandidateEngine`] through one instruction.
pub struct CandidateAdapter<F> {
    factory: F,
    mode: CpuMode,
    label: String,
}

impl<F: CandidateFactory> CandidateAdapter<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            mode: CpuMode::Arm,
            label: "candidate".to_string(),
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
        engine: &mut F::Engine,
        opcode: &[u8],
        input: &MachineState,
    ) -> Result<(), EngineError> {
        engine.set_memory_area(input.pc(), opcode)?;
        for id in WindowId::ALL {
            let window = input.window(id);
            engine.set_memory_area(window.base(), window.as_bytes())?;
        }

        for reg in Reg::ALL {
            engine.set_register(reg_name(reg), input.reg(reg))?;
        }
        for flag in Flag::ALL {
            engine.set_register(flag_name(flag), input.flags().bit(flag))?;
        }
        Ok(())
    }

    fn extract(engine: &F::Engine, input: &MachineState) -> Result<MachineState, EngineError> {
        let mut regs = [0u32; NUM_REGS];
        for reg in Reg::ALL {
            regs[reg.index()] = engine.register(reg_name(reg))?;
        }

        let mut flags = Flags::new(false, false, false, false);
        for flag in Flag::ALL {
            flags.set(flag, engine.register(flag_name(flag))? != 0);
        }

        let read_window = |window: &MemoryWindow| -> Result<MemoryWindow, EngineError> {
            read_back(window, engine.memory_area(window.base(), window.len())?)
        };
        let stack = read_window(input.stack())?;
        let heap = read_window(input.heap())?;

        Ok(MachineState::new(regs, flags, stack, heap))
    }

    fn run(&self, opcode: &[u8], input: &MachineState) -> Result<MachineState, EngineError> {
        let mut engine = self.factory.open(self.mode)?;
        Self::load(&mut engine, opcode, input)?;

        let pc = input.pc();
        debug!(engine = %self.label, pc, len = opcode.len(), "process");
        engine.process(pc, opcode)?;

        Self::extract(&engine, input)
    }
}

impl<F: CandidateFactory> ExecutionAdapter for CandidateAdapter<F> {
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
}
