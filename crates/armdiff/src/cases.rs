//! Test-case tables.
//!
//! A case is one instruction encoding plus its disassembly text. The built-in
//! tables are `'static`; case files are parsed into owned cases.
//!
//! Case file format, one case per line:
//!
//! ```text
//! # ldrb with rotate-right-extended index
//! 64 00 51 e7 : ldrb r0, [r1, -r4, rrx]
//! \x64\x00\x51\xe7 : ldrb r0, [r1, -r4, rrx]
//! ```

use std::borrow::Cow;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// One instruction under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    opcode: Cow<'static, [u8]>,
    mnemonic: Cow<'static, str>,
}

impl TestCase {
    pub const fn from_static(opcode: &'static [u8], mnemonic: &'static str) -> Self {
        Self {
            opcode: Cow::Borrowed(opcode),
            mnemonic: Cow::Borrowed(mnemonic),
        }
    }

    pub fn new(opcode: impl Into<Vec<u8>>, mnemonic: impl Into<String>) -> Self {
        Self {
            opcode: Cow::Owned(opcode.into()),
            mnemonic: Cow::Owned(mnemonic.into()),
        }
    }

    pub fn opcode(&self) -> &[u8] {
        &self.opcode
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Encoding length in bytes; the PC advances by this much between cases.
    pub fn size(&self) -> usize {
        self.opcode.len()
    }
}

/// ARM load/store cases.
pub const LOADSTORE: &[TestCase] = &[TestCase::from_static(
    b"\x64\x00\x51\xe7",
    "ldrb r0, [r1, -r4, rrx]",
)];

/// Case table parse error.
#[derive(Debug, Error)]
pub enum CaseTableError {
    #[error("line {line}: expected '<hex bytes> : <mnemonic>', got '{text}'")]
    Malformed { line: usize, text: String },

    #[error("line {line}: invalid opcode bytes '{text}'")]
    BadOpcode { line: usize, text: String },

    #[error("case table is empty")]
    Empty,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

static LINE_PATTERN: OnceLock<Regex> = OnceLock::new();
static HEX_PATTERN: OnceLock<Regex> = OnceLock::new();

fn line_pattern() -> &'static Regex {
    LINE_PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?P<hex>[^:]+?)\s*:\s*(?P<mnemonic>\S.*?)\s*$").expect("valid regex")
    })
}

fn hex_pattern() -> &'static Regex {
    HEX_PATTERN.get_or_init(|| Regex::new(r"^(?:[0-9a-fA-F]{2})+$").expect("valid regex"))
}

fn parse_opcode(text: &str) -> Option<Vec<u8>> {
    let digits: String = text
        .replace("\\x", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !hex_pattern().is_match(&digits) {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

/// Parse a case table from text.
///
/// # Errors
///
/// Returns an error naming the first malformed line, or `Empty` if the text
/// holds no cases.
pub fn parse_case_table(text: &str) -> Result<Vec<TestCase>, CaseTableError> {
    let mut cases = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let caps = line_pattern()
            .captures(trimmed)
            .ok_or_else(|| CaseTableError::Malformed {
                line,
                text: trimmed.to_string(),
            })?;
        let hex = &caps["hex"];
        let opcode = parse_opcode(hex).ok_or_else(|| CaseTableError::BadOpcode {
            line,
            text: hex.to_string(),
        })?;
        cases.push(TestCase::new(opcode, &caps["mnemonic"]));
    }

    if cases.is_empty() {
        return Err(CaseTableError::Empty);
    }
    Ok(cases)
}

/// Read and parse a case file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_case_file(path: &Path) -> Result<Vec<TestCase>, CaseTableError> {
    let text = std::fs::read_to_string(path).map_err(|source| CaseTableError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_case_table(&text)
}
