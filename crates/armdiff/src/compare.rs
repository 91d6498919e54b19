//! State comparison.
//!
//! Compares a reference and a candidate `MachineState` and records every
//! field that differs. Memory windows are scanned to the end rather than
//! stopping at the first bad byte: a single wrong store and a wrong effective
//! address leave very different mismatch shapes.

use std::fmt;

use armdiff_state::{Flag, MachineState, Reg, WindowId};

/// A single comparable field of a `MachineState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Byte length of a memory window.
    WindowLength(WindowId),
    /// One byte of a memory window.
    Memory { window: WindowId, offset: usize },
    Register(Reg),
    Flag(Flag),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowLength(window) => write!(f, "{window}.len"),
            Self::Memory { window, offset } => write!(f, "{window}[{offset}]"),
            Self::Register(reg) => write!(f, "{reg}"),
            Self::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

/// A field whose reference and candidate values differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: Field,
    /// Value produced by the reference engine.
    pub expected: u32,
    /// Value produced by the candidate engine.
    pub actual: u32,
}

/// Every differing field between two states, in a fixed order: stack, heap,
/// registers r0-pc, then flags N, Z, C, V. A window's length mismatch comes
/// before its byte mismatches.
///
/// An empty report means the states are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DivergenceReport {
    diffs: Vec<FieldDiff>,
}

impl DivergenceReport {
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDiff> {
        self.diffs.iter()
    }

    /// `(expected, actual)` for `field`, if it differs.
    pub fn get(&self, field: Field) -> Option<(u32, u32)> {
        self.diffs
            .iter()
            .find(|diff| diff.field == field)
            .map(|diff| (diff.expected, diff.actual))
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.diffs.iter().map(|diff| diff.field)
    }

    /// Byte mismatches inside one window, in offset order.
    pub fn window_mismatches(&self, window: WindowId) -> impl Iterator<Item = &FieldDiff> + '_ {
        self.diffs
            .iter()
            .filter(move |diff| {
                matches!(diff.field, Field::Memory { window: w, .. } if w == window)
            })
    }

    /// `(expected, actual)` byte length of `window`, if they differ.
    pub fn window_length(&self, window: WindowId) -> Option<(u32, u32)> {
        self.get(Field::WindowLength(window))
    }

    /// Windows with a mismatching byte or length.
    pub fn differing_windows(&self) -> Vec<WindowId> {
        WindowId::ALL
            .into_iter()
            .filter(|&id| {
                self.window_length(id).is_some() || self.window_mismatches(id).next().is_some()
            })
            .collect()
    }

    /// Register and flag mismatches.
    pub fn state_mismatches(&self) -> impl Iterator<Item = &FieldDiff> + '_ {
        self.diffs
            .iter()
            .filter(|diff| matches!(diff.field, Field::Register(_) | Field::Flag(_)))
    }

    /// Headline such as `heap differs!` when any window differs.
    pub fn summary(&self) -> Option<String> {
        let windows = self.differing_windows();
        match windows.as_slice() {
            [] => None,
            [one] => Some(format!("{one} differs!")),
            many => {
                let names: Vec<_> = many.iter().map(|w| w.name()).collect();
                Some(format!("{} differ!", names.join(" and ")))
            }
        }
    }

    fn push(&mut self, field: Field, expected: u32, actual: u32) {
        self.diffs.push(FieldDiff {
            field,
            expected,
            actual,
        });
    }
}

impl<'a> IntoIterator for &'a DivergenceReport {
    type Item = &'a FieldDiff;
    type IntoIter = std::slice::Iter<'a, FieldDiff>;

    fn into_iter(self) -> Self::IntoIter {
        self.diffs.iter()
    }
}

fn saturating_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Field-by-field comparison of two machine states.
pub struct StateComparator;

impl StateComparator {
    /// Compare `reference` against `candidate`.
    ///
    /// Windows of different lengths are reported as a length mismatch and
    /// their common prefix is still compared byte by byte.
    pub fn compare(reference: &MachineState, candidate: &MachineState) -> DivergenceReport {
        let mut report = DivergenceReport::default();

        for window in WindowId::ALL {
            let expected = reference.window(window).as_bytes();
            let actual = candidate.window(window).as_bytes();
            if expected.len() != actual.len() {
                report.push(
                    Field::WindowLength(window),
                    saturating_u32(expected.len()),
                    saturating_u32(actual.len()),
                );
            }
            for (offset, (&e, &a)) in expected.iter().zip(actual).enumerate() {
                if e != a {
                    report.push(Field::Memory { window, offset }, u32::from(e), u32::from(a));
                }
            }
        }

        for reg in Reg::ALL {
            let (e, a) = (reference.reg(reg), candidate.reg(reg));
            if e != a {
                report.push(Field::Register(reg), e, a);
            }
        }

        for flag in Flag::ALL {
            let (e, a) = (reference.flags().bit(flag), candidate.flags().bit(flag));
            if e != a {
                report.push(Field::Flag(flag), e, a);
            }
        }

        report
    }
}
