//! armdiff - differential single-instruction testing for ARM32 emulators
//!
//! Runs each instruction of a case table on a trusted reference engine and on
//! a candidate engine, starting both from the same randomized machine state,
//! and reports every register, flag and memory byte where they disagree.
//!
//! # Example
//!
//! ```ignore
//! use armdiff::{CandidateAdapter, Harness, HarnessConfig, ReferenceAdapter};
//! use armdiff::engine::{CandidatePlugin, ReferencePlugin};
//!
//! let config = HarnessConfig::default();
//! let layout = *config.layout();
//! let reference = ReferenceAdapter::new(ReferencePlugin::load("libref.so".as_ref())?, layout);
//! let candidate = CandidateAdapter::new(CandidatePlugin::load("libcand.so".as_ref())?);
//! let harness = Harness::new(config, reference, candidate)?;
//! let initial = harness.initial_state(&mut rand::thread_rng());
//! let report = harness.run(initial, &mut std::io::stdout())?;
//! std::process::exit(report.exit_code());
//! ```

pub use armdiff_engine as engine;
pub use armdiff_state as state;

pub use armdiff_engine::{CpuMode, EngineError, FaultKind};
pub use armdiff_state::{Flag, Flags, MachineState, MemoryLayout, MemoryWindow, Reg, WindowId};

pub mod adapter;
pub mod cases;
pub mod compare;
pub mod config;
mod error;
pub mod harness;
pub mod metrics;
pub mod report;

pub use adapter::{CandidateAdapter, ExecutionAdapter, ReferenceAdapter};
pub use cases::{CaseTableError, LOADSTORE, TestCase, load_case_file, parse_case_table};
pub use compare::{DivergenceReport, Field, FieldDiff, StateComparator};
pub use config::HarnessConfig;
pub use error::{Error, ExecutionFault, Result};
pub use harness::{CaseRun, Harness, RunOutcome, RunReport};
