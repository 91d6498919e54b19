//! Randomized, constrained initial states.
//!
//! Registers and flags that do not affect whether an instruction can execute
//! are drawn at random. Fields that an instruction's addressing mode depends
//! on are pinned, each with a recorded reason.

use rand::Rng;

use crate::memory::{MemoryLayout, MemoryWindow, WindowId};
use crate::state::{Flag, Flags, MachineState, NUM_REGS, Reg};

/// A field forced to a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinValue {
    Register(Reg, u32),
    Flag(Flag, bool),
}

/// A pinned field and why it is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub value: PinValue,
    pub reason: &'static str,
}

/// Stack window pattern: descending from 0xff.
pub const fn stack_pattern(offset: usize) -> u8 {
    0xff - (offset % 256) as u8
}

/// Heap window pattern: each byte holds its own offset.
pub const fn heap_pattern(offset: usize) -> u8 {
    (offset % 256) as u8
}

/// Builds initial machine states for a memory layout.
#[derive(Debug, Clone)]
pub struct StateInitializer {
    layout: MemoryLayout,
    pins: Vec<Pin>,
}

impl StateInitializer {
    /// Initializer with no pinned fields besides the program counter.
    pub const fn new(layout: MemoryLayout) -> Self {
        Self {
            layout,
            pins: Vec::new(),
        }
    }

    /// Fixture for the ARM load/store tests.
    ///
    /// `r1` points 40 bytes into the heap window and `r4` holds 8, so
    /// register-offset addressing stays inside the heap. Carry must be clear:
    /// with C set, `rrx` shifts a 1 into bit 31 of the offset and
    /// `[r1, -r4, rrx]` lands far outside mapped memory.
    pub fn arm32_loadstore(layout: MemoryLayout) -> Self {
        let heap = layout.heap_base;
        let stack = layout.stack_base;
        Self::new(layout)
            .pin_register(Reg::R0, 0xdead_beef, "recognisable load destination")
            .pin_register(Reg::R1, heap.wrapping_add(10 * 4), "base address inside the heap window")
            .pin_register(Reg::R3, 4, "small shift amount for register-shifted offsets")
            .pin_register(Reg::R4, 4 << 1, "offset register for [r1, -r4, rrx]")
            .pin_register(Reg::Sp, stack, "stack pointer at the stack window")
            .pin_flag(Flag::C, false, "carry set makes rrx offsets leave mapped memory")
    }

    #[must_use]
    pub fn pin_register(mut self, reg: Reg, value: u32, reason: &'static str) -> Self {
        self.pins.push(Pin {
            value: PinValue::Register(reg, value),
            reason,
        });
        self
    }

    #[must_use]
    pub fn pin_flag(mut self, flag: Flag, value: bool, reason: &'static str) -> Self {
        self.pins.push(Pin {
            value: PinValue::Flag(flag, value),
            reason,
        });
        self
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub const fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Build one fully populated state.
    ///
    /// Every register and flag is drawn from `rng` in a fixed order before
    /// pins are applied, so a seeded generator reproduces the same state.
    /// The program counter starts at the code base unless pinned.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> MachineState {
        let regs: [u32; NUM_REGS] = std::array::from_fn(|_| rng.next_u32());
        let flags = Flags::new(
            rng.gen_bool(0.5),
            rng.gen_bool(0.5),
            rng.gen_bool(0.5),
            rng.gen_bool(0.5),
        );

        let size = self.layout.window_size as usize;
        let stack = MemoryWindow::from_fn(
            self.layout.window_base(WindowId::Stack),
            size,
            stack_pattern,
        );
        let heap_base = self.layout.window_base(WindowId::Heap);
        let heap = MemoryWindow::from_fn(heap_base, size, heap_pattern);

        let mut state = MachineState::new(regs, flags, stack, heap);
        state.set_pc(self.layout.code_base);

        for pin in &self.pins {
            match pin.value {
                PinValue::Register(reg, value) => state.set_reg(reg, value),
                PinValue::Flag(flag, value) => state.set_flag(flag, value),
            }
        }
        state
    }
}
