//! Harness configuration.

use armdiff_engine::CpuMode;
use armdiff_state::{MemoryLayout, StateInitializer};

use crate::cases::{LOADSTORE, TestCase};

/// Everything the harness needs besides the two engines.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Builds the initial state of the first case.
    pub initializer: StateInitializer,
    pub mode: CpuMode,
    /// Cases in execution order.
    pub cases: Vec<TestCase>,
}

impl HarnessConfig {
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            initializer: StateInitializer::arm32_loadstore(layout),
            mode: CpuMode::Arm,
            cases: LOADSTORE.to_vec(),
        }
    }

    #[must_use]
    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.cases = cases;
        self
    }

    #[must_use]
    pub fn with_initializer(mut self, initializer: StateInitializer) -> Self {
        self.initializer = initializer;
        self
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: CpuMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn layout(&self) -> &MemoryLayout {
        self.initializer.layout()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new(MemoryLayout::default())
    }
}
