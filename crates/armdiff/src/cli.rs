//! CLI definitions and argument types.

use std::path::PathBuf;

use armdiff::CpuMode;
use armdiff::state::{
    DEFAULT_CODE_BASE, DEFAULT_HEAP_BASE, DEFAULT_MAP_SIZE, DEFAULT_STACK_BASE,
    DEFAULT_WINDOW_SIZE, MemoryLayout,
};
use clap::Parser;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a divergence or engine fault.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for setup errors (bad case file, plugin, or layout).
pub const EXIT_SETUP_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "armdiff")]
#[command(about = "Differential testing of an ARM32 emulator against a reference engine")]
#[command(version)]
pub struct Cli {
    /// Reference engine plugin (exports armdiff_ref_*)
    #[arg(long, value_name = "LIB")]
    pub reference: PathBuf,

    /// Candidate engine plugin (exports armdiff_cand_*)
    #[arg(long, value_name = "LIB")]
    pub candidate: PathBuf,

    /// Case file ('<hex bytes> : <mnemonic>' per line); defaults to the
    /// built-in load/store table
    #[arg(long, value_name = "FILE")]
    pub cases: Option<PathBuf>,

    /// Seed for the randomized initial state (random if omitted)
    #[arg(long, value_parser = parse_u64)]
    pub seed: Option<u64>,

    /// Address the instructions are placed at
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_CODE_BASE)]
    pub code_base: u32,

    /// Base address of the stack window
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_STACK_BASE)]
    pub stack_base: u32,

    /// Base address of the heap window
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_HEAP_BASE)]
    pub heap_base: u32,

    /// Size of each compared memory window in bytes
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window_size: u32,

    /// Size of the region mapped from the code base
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_MAP_SIZE)]
    pub map_size: u32,

    /// Execute in Thumb mode
    #[arg(long)]
    pub thumb: bool,

    /// Show metrics summary after execution
    #[arg(long)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub silent: bool,
}

impl Cli {
    pub const fn layout(&self) -> MemoryLayout {
        MemoryLayout {
            code_base: self.code_base,
            stack_base: self.stack_base,
            heap_base: self.heap_base,
            map_size: self.map_size,
            window_size: self.window_size,
        }
    }

    pub const fn mode(&self) -> CpuMode {
        if self.thumb { CpuMode::Thumb } else { CpuMode::Arm }
    }

    /// Default tracing directive for the chosen verbosity.
    pub const fn log_directive(&self) -> &'static str {
        if self.verbose {
            "armdiff=debug"
        } else if self.silent {
            "armdiff=error"
        } else {
            "armdiff=warn"
        }
    }
}

fn split_radix(arg: &str) -> (&str, u32) {
    let arg = arg.trim();
    arg.strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
        .map_or((arg, 10), |hex| (hex, 16))
}

/// Parse a decimal or `0x`-prefixed hex number. Underscores are ignored.
pub fn parse_u32(arg: &str) -> Result<u32, String> {
    let (digits, radix) = split_radix(arg);
    u32::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|e| format!("invalid number '{arg}': {e}"))
}

pub fn parse_u64(arg: &str) -> Result<u64, String> {
    let (digits, radix) = split_radix(arg);
    u64::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|e| format!("invalid number '{arg}': {e}"))
}
