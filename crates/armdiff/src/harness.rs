//! Differential test driver.
//!
//! Runs each case on both adapters from the same input state and compares
//! the results. The first divergence or engine fault stops the run.

use std::io::{self, Write};
use std::time::Instant;

use armdiff_state::MachineState;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::adapter::ExecutionAdapter;
use crate::cases::{CaseTableError, TestCase};
use crate::compare::{DivergenceReport, StateComparator};
use crate::config::HarnessConfig;
use crate::error::{Error, ExecutionFault, Result};
use crate::metrics::{self, CaseStatus};
use crate::report::{self, Divergence};

/// Output of one case that executed on both engines.
#[derive(Debug, Clone)]
pub struct CaseRun {
    pub reference: MachineState,
    pub candidate: MachineState,
    pub report: DivergenceReport,
}

impl CaseRun {
    pub fn passed(&self) -> bool {
        self.report.is_empty()
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every case passed.
    AllPassed,
    /// The engines disagreed on case `case`.
    Failed {
        case: usize,
        mnemonic: String,
        report: DivergenceReport,
    },
    /// An engine faulted on case `case`; nothing was compared.
    Aborted {
        case: usize,
        mnemonic: String,
        fault: ExecutionFault,
    },
}

/// Result of [`Harness::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Cases that passed before the run ended.
    pub passed: usize,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::AllPassed)
    }

    /// Process exit status: 0 when every case passed, 1 otherwise.
    pub const fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

fn check_adapter(config: &HarnessConfig, adapter: &impl ExecutionAdapter) -> Result<()> {
    if adapter.mode() != config.mode {
        return Err(Error::ModeMismatch {
            adapter: adapter.label().to_string(),
            expected: config.mode,
            actual: adapter.mode(),
        });
    }
    if adapter.layout().is_some_and(|layout| layout != config.layout()) {
        return Err(Error::LayoutMismatch {
            adapter: adapter.label().to_string(),
        });
    }
    Ok(())
}

/// Drives a reference and a candidate adapter over a case table.
pub struct Harness<R, C> {
    config: HarnessConfig,
    reference: R,
    candidate: C,
}

impl<R: ExecutionAdapter, C: ExecutionAdapter> Harness<R, C> {
    /// Create a harness.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory layout is invalid, the cases do not
    /// fit below the windows, there are no cases, or an adapter disagrees
    /// with the configured mode or layout.
    pub fn new(config: HarnessConfig, reference: R, candidate: C) -> Result<Self> {
        config.layout().validate()?;
        if config.cases.is_empty() {
            return Err(CaseTableError::Empty.into());
        }
        let code_len = config.cases.iter().map(|case| case.size() as u64).sum();
        config.layout().validate_code(code_len)?;
        check_adapter(&config, &reference)?;
        check_adapter(&config, &candidate)?;
        for pin in config.initializer.pins() {
            debug!(pin = ?pin.value, reason = pin.reason, "pinned");
        }
        Ok(Self {
            config,
            reference,
            candidate,
        })
    }

    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Build the initial state for the first case.
    pub fn initial_state<G: Rng + ?Sized>(&self, rng: &mut G) -> MachineState {
        self.config.initializer.build(rng)
    }

    fn timed<A: ExecutionAdapter>(
        adapter: &A,
        case: &TestCase,
        input: &MachineState,
    ) -> std::result::Result<MachineState, ExecutionFault> {
        let start = Instant::now();
        let result = adapter.execute(case.opcode(), input);
        metrics::record_engine_time(adapter.label(), start.elapsed().as_secs_f64());
        result
    }

    /// Execute one case on both engines and compare.
    ///
    /// # Errors
    ///
    /// Returns the first engine fault; the reference engine runs first.
    pub fn run_case(
        &self,
        case: &TestCase,
        input: &MachineState,
    ) -> std::result::Result<CaseRun, ExecutionFault> {
        let reference = Self::timed(&self.reference, case, input)?;
        let candidate = Self::timed(&self.candidate, case, input)?;
        let report = StateComparator::compare(&reference, &candidate);
        Ok(CaseRun {
            reference,
            candidate,
            report,
        })
    }

    /// Run every case in order, writing `[OK]`/`[KO]` lines to `out`.
    ///
    /// Each case starts from `initial` with the PC advanced past the opcodes
    /// of all earlier cases.
    ///
    /// # Errors
    ///
    /// Only fails if writing to `out` fails. Divergences and engine faults
    /// are reported in the returned [`RunReport`].
    pub fn run(&self, initial: MachineState, out: &mut impl Write) -> io::Result<RunReport> {
        info!(cases = self.config.cases.len(), "starting run");
        let mut input = initial;
        let mut pc = input.pc();

        for (index, case) in self.config.cases.iter().enumerate() {
            input.set_pc(pc);
            pc = pc.wrapping_add(case.size() as u32);
            let mnemonic = case.mnemonic();

            let run = match self.run_case(case, &input) {
                Ok(run) => run,
                Err(fault) => {
                    error!(case = mnemonic, %fault, "engine fault");
                    metrics::record_case(mnemonic, CaseStatus::Aborted);
                    report::write_fault(out, mnemonic, &fault)?;
                    return Ok(RunReport {
                        passed: index,
                        outcome: RunOutcome::Aborted {
                            case: index,
                            mnemonic: mnemonic.to_string(),
                            fault,
                        },
                    });
                }
            };

            if !run.passed() {
                warn!(case = mnemonic, fields = run.report.len(), "engines diverged");
                metrics::record_case(mnemonic, CaseStatus::Failed);
                report::write_divergence(
                    out,
                    &Divergence {
                        mnemonic,
                        input: &input,
                        reference_label: self.reference.label(),
                        reference: &run.reference,
                        candidate_label: self.candidate.label(),
                        candidate: &run.candidate,
                        report: &run.report,
                    },
                )?;
                return Ok(RunReport {
                    passed: index,
                    outcome: RunOutcome::Failed {
                        case: index,
                        mnemonic: mnemonic.to_string(),
                        report: run.report,
                    },
                });
            }

            metrics::record_case(mnemonic, CaseStatus::Passed);
            report::write_pass(out, mnemonic)?;
        }

        let passed = self.config.cases.len();
        info!(passed, "all cases passed");
        Ok(RunReport {
            passed,
            outcome: RunOutcome::AllPassed,
        })
    }
}
