//! ARM32 machine state for differential instruction testing.
//!
//! This crate provides the `MachineState` snapshot shared by both engines in a
//! differential run, the memory layout the snapshot's windows live in, and the
//! `StateInitializer` that builds randomized-but-constrained starting states.
//!
//! ```ignore
//! use armdiff_state::{MemoryLayout, StateInitializer};
//! use rand::SeedableRng;
//!
//! let init = StateInitializer::arm32_loadstore(MemoryLayout::default());
//! let state = init.build(&mut rand::rngs::StdRng::seed_from_u64(7));
//! assert_eq!(state.pc(), 0x0010_0000);
//! ```

mod init;
mod memory;
mod state;

pub use init::{Pin, PinValue, StateInitializer, heap_pattern, stack_pattern};
pub use memory::{
    DEFAULT_CODE_BASE, DEFAULT_HEAP_BASE, DEFAULT_MAP_SIZE, DEFAULT_STACK_BASE,
    DEFAULT_WINDOW_SIZE, LayoutError, MemoryLayout, MemoryWindow, WindowId,
};
pub use state::{Flag, Flags, MachineState, NUM_REGS, Reg};
