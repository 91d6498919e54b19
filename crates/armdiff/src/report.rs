//! Console report.
//!
//! One `[OK]`/`[KO]` line per case on stdout, followed by tab-indented
//! diagnostics for the case that stopped the run.

use std::io::{self, Write};

use armdiff_state::{Flag, MachineState, Reg, WindowId};

use crate::compare::{DivergenceReport, Field};
use crate::error::ExecutionFault;

pub fn write_pass(out: &mut impl Write, mnemonic: &str) -> io::Result<()> {
    writeln!(out, "[OK] {mnemonic}")
}

/// `[KO]` line plus the fault that aborted the case.
pub fn write_fault(out: &mut impl Write, mnemonic: &str, fault: &ExecutionFault) -> io::Result<()> {
    writeln!(out, "[KO] {mnemonic}")?;
    writeln!(out, "\t{fault}")
}

/// Engine labels and states needed to render a divergence.
pub struct Divergence<'a> {
    pub mnemonic: &'a str,
    pub input: &'a MachineState,
    pub reference_label: &'a str,
    pub reference: &'a MachineState,
    pub candidate_label: &'a str,
    pub candidate: &'a MachineState,
    pub report: &'a DivergenceReport,
}

/// `[KO]` line, every mismatching byte and field, then the full register
/// table.
pub fn write_divergence(out: &mut impl Write, div: &Divergence<'_>) -> io::Result<()> {
    match div.report.summary() {
        Some(summary) => writeln!(out, "[KO] {} ({summary})", div.mnemonic)?,
        None => writeln!(out, "[KO] {}", div.mnemonic)?,
    }

    for window in WindowId::ALL {
        write_window(out, div, window)?;
    }

    for diff in div.report.state_mismatches() {
        writeln!(
            out,
            "\t{}: {:#010x} ({}) != {:#010x} ({})",
            diff.field, diff.expected, div.reference_label, diff.actual, div.candidate_label
        )?;
    }

    write_state_table(out, div)
}

fn write_window(out: &mut impl Write, div: &Divergence<'_>, window: WindowId) -> io::Result<()> {
    let length = div.report.window_length(window);
    let mut mismatches = div.report.window_mismatches(window).peekable();
    if length.is_none() && mismatches.peek().is_none() {
        return Ok(());
    }

    let input = div.input.window(window);
    writeln!(
        out,
        "\t{window}: in | {} | {}",
        div.reference_label, div.candidate_label
    )?;
    if let Some((expected, actual)) = length {
        writeln!(
            out,
            "\t{window} length: {} | {expected} | {actual}",
            input.len()
        )?;
    }
    for diff in mismatches {
        let Field::Memory { offset, .. } = diff.field else {
            continue;
        };
        let before = input.byte(offset).unwrap_or_default();
        writeln!(
            out,
            "\t{window}[{offset}] @ {:#010x}: {before:02x} | {:02x} | {:02x}",
            input.address_of(offset),
            diff.expected,
            diff.actual
        )?;
    }
    Ok(())
}

fn write_state_table(out: &mut impl Write, div: &Divergence<'_>) -> io::Result<()> {
    fn row(
        out: &mut impl Write,
        name: &str,
        input: u32,
        reference: u32,
        candidate: u32,
    ) -> io::Result<()> {
        let cmp = if reference == candidate { "==" } else { "!=" };
        writeln!(
            out,
            "\t{name:>3}: {input:08x} | {reference:08x} {cmp} {candidate:08x}"
        )
    }

    writeln!(
        out,
        "\t{:>3}  {:<8} | {} == {}",
        "", "in", div.reference_label, div.candidate_label
    )?;
    for reg in Reg::ALL {
        row(
            out,
            reg.name(),
            div.input.reg(reg),
            div.reference.reg(reg),
            div.candidate.reg(reg),
        )?;
    }
    for flag in Flag::ALL {
        row(
            out,
            flag.name(),
            div.input.flags().bit(flag),
            div.reference.flags().bit(flag),
            div.candidate.flags().bit(flag),
        )?;
    }
    Ok(())
}
