//! Execution engine boundaries for armdiff.
//!
//! The harness never talks to an emulator directly. It goes through one of two
//! boundaries, each shaped like the native API of the engine family behind it:
//!
//! - [`ReferenceEngine`]: mapped memory, numeric register ids, packed APSR,
//!   count-bounded `emu_start`.
//! - [`CandidateEngine`]: named registers and flags, memory areas, and a
//!   `process` call that runs exactly one instruction.
//!
//! Engines are opened through factories so every execution starts from a
//! fresh instance. The [`plugin`] module provides factories backed by shared
//! libraries.

mod candidate;
mod error;
pub mod plugin;
mod reference;

pub use candidate::{CandidateEngine, CandidateFactory};
pub use error::{EngineError, FaultKind};
pub use plugin::{CandidatePlugin, PluginError, ReferencePlugin};
pub use reference::{CpuMode, RefReg, ReferenceEngine, ReferenceFactory};
