//! ARM32 machine-state snapshot.
//!
//! Holds exactly the surface compared after one instruction: the sixteen core
//! registers, the NZCV condition flags and the two memory windows.

use std::fmt;

use crate::memory::{MemoryWindow, WindowId};

/// Number of core registers (r0-r12, sp, lr, pc).
pub const NUM_REGS: usize = 16;

/// Core register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    Sp,
    Lr,
    Pc,
}

impl Reg {
    /// All registers in declaration order.
    pub const ALL: [Self; NUM_REGS] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::Sp,
        Self::Lr,
        Self::Pc,
    ];

    /// Architectural register number (r13 = sp, r14 = lr, r15 = pc).
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < NUM_REGS {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::R0 => "r0",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
            Self::R6 => "r6",
            Self::R7 => "r7",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::Sp => "sp",
            Self::Lr => "lr",
            Self::Pc => "pc",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// Negative.
    N,
    /// Zero.
    Z,
    /// Carry.
    C,
    /// Overflow.
    V,
}

impl Flag {
    /// All flags in declaration order.
    pub const ALL: [Self; 4] = [Self::N, Self::Z, Self::C, Self::V];

    pub const fn name(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::Z => "z",
            Self::C => "c",
            Self::V => "v",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// NZCV condition flags.
///
/// Stored as booleans so a flag can only ever be 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    n: bool,
    z: bool,
    c: bool,
    v: bool,
}

impl Flags {
    pub const fn new(n: bool, z: bool, c: bool, v: bool) -> Self {
        Self { n, z, c, v }
    }

    pub const fn get(self, flag: Flag) -> bool {
        match flag {
            Flag::N => self.n,
            Flag::Z => self.z,
            Flag::C => self.c,
            Flag::V => self.v,
        }
    }

    pub const fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::N => self.n = value,
            Flag::Z => self.z = value,
            Flag::C => self.c = value,
            Flag::V => self.v = value,
        }
    }

    /// Flag as a 0/1 bit.
    pub const fn bit(self, flag: Flag) -> u32 {
        self.get(flag) as u32
    }
}

/// Complete execution snapshot for one instruction under test.
///
/// Equality is structural over every register, flag and window byte. There
/// is deliberately no `Default`: every field must be supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    regs: [u32; NUM_REGS],
    flags: Flags,
    stack: MemoryWindow,
    heap: MemoryWindow,
}

impl MachineState {
    pub const fn new(
        regs: [u32; NUM_REGS],
        flags: Flags,
        stack: MemoryWindow,
        heap: MemoryWindow,
    ) -> Self {
        Self {
            regs,
            flags,
            stack,
            heap,
        }
    }

    pub const fn reg(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    pub const fn set_reg(&mut self, reg: Reg, value: u32) {
        self.regs[reg.index()] = value;
    }

    pub const fn registers(&self) -> &[u32; NUM_REGS] {
        &self.regs
    }

    /// Address of the instruction under test.
    pub const fn pc(&self) -> u32 {
        self.regs[Reg::Pc.index()]
    }

    pub const fn set_pc(&mut self, pc: u32) {
        self.regs[Reg::Pc.index()] = pc;
    }

    pub const fn flags(&self) -> Flags {
        self.flags
    }

    pub const fn flag(&self, flag: Flag) -> bool {
        self.flags.get(flag)
    }

    pub const fn set_flag(&mut self, flag: Flag, value: bool) {
        self.flags.set(flag, value);
    }

    pub const fn stack(&self) -> &MemoryWindow {
        &self.stack
    }

    pub const fn heap(&self) -> &MemoryWindow {
        &self.heap
    }

    pub const fn window(&self, id: WindowId) -> &MemoryWindow {
        match id {
            WindowId::Stack => &self.stack,
            WindowId::Heap => &self.heap,
        }
    }

    pub const fn window_mut(&mut self, id: WindowId) -> &mut MemoryWindow {
        match id {
            WindowId::Stack => &mut self.stack,
            WindowId::Heap => &mut self.heap,
        }
    }

    /// Copy of this state relocated to a new program counter.
    #[must_use]
    pub fn with_pc(&self, pc: u32) -> Self {
        let mut next = self.clone();
        next.set_pc(pc);
        next
    }
}
