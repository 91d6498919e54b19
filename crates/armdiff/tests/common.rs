//! In-memory engines for integration tests.
//!
//! Both engines share a tiny ARM interpreter covering the load/store
//! register-offset forms and `mov r0, r0`. They differ only in the boundary
//! they expose: `UnicornLike` maps memory and packs NZCV into APSR,
//! `TritonLike` keeps sparse memory and names every register and flag.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use armdiff::engine::{CandidateEngine, CpuMode, EngineError, RefReg, ReferenceEngine};
use armdiff::{Flag, Flags};

pub const LDRB_RRX: [u8; 4] = [0x64, 0x00, 0x51, 0xe7];
pub const MOV_R0_R0: [u8; 4] = [0x00, 0x00, 0xa0, 0xe1];

const PC: usize = 15;

trait Bus {
    fn load(&self, addr: u32) -> Result<u8, EngineError>;
    fn store(&mut self, addr: u32, value: u8) -> Result<(), EngineError>;
}

struct Cpu {
    regs: [u32; 16],
    flags: Flags,
}

fn shift_offset(value: u32, kind: u32, imm5: u32, carry: bool) -> u32 {
    match (kind, imm5) {
        (0, n) => value << n,
        (1, 0) => 0,
        (1, n) => value >> n,
        (2, 0) => ((value as i32) >> 31) as u32,
        (2, n) => ((value as i32) >> n) as u32,
        (3, 0) => (u32::from(carry) << 31) | (value >> 1),
        (_, n) => value.rotate_right(n),
    }
}

/// Execute one ARM instruction at `cpu.regs[15]`.
fn step(cpu: &mut Cpu, bus: &mut dyn Bus, opcode: &[u8]) -> Result<(), EngineError> {
    let pc = cpu.regs[PC];
    let undefined = EngineError::UndefinedInstruction { address: Some(pc) };
    let word = u32::from_le_bytes(opcode.try_into().map_err(|_| undefined.clone())?);

    if word == u32::from_le_bytes(MOV_R0_R0) {
        cpu.regs[PC] = pc.wrapping_add(4);
        return Ok(());
    }

    // cond=AL, single data transfer with register offset
    if word >> 28 != 0xe || (word >> 25) & 0b111 != 0b011 || word & 0x10 != 0 {
        return Err(undefined);
    }
    let pre = word & (1 << 24) != 0;
    let up = word & (1 << 23) != 0;
    let byte = word & (1 << 22) != 0;
    let writeback = word & (1 << 21) != 0;
    let is_load = word & (1 << 20) != 0;
    let rn = ((word >> 16) & 0xf) as usize;
    let rt = ((word >> 12) & 0xf) as usize;
    let imm5 = (word >> 7) & 0x1f;
    let kind = (word >> 5) & 0b11;
    let rm = (word & 0xf) as usize;

    let offset = shift_offset(cpu.regs[rm], kind, imm5, cpu.flags.get(Flag::C));
    let base = cpu.regs[rn];
    let offset_addr = if up {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    let addr = if pre { offset_addr } else { base };
    let width = if byte { 1 } else { 4 };

    if is_load {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().take(width).enumerate() {
            *b = bus.load(addr.wrapping_add(i as u32))?;
        }
        cpu.regs[rt] = u32::from_le_bytes(bytes);
    } else {
        let bytes = cpu.regs[rt].to_le_bytes();
        for (i, &b) in bytes.iter().take(width).enumerate() {
            bus.store(addr.wrapping_add(i as u32), b)?;
        }
    }
    if writeback || !pre {
        cpu.regs[rn] = offset_addr;
    }
    cpu.regs[PC] = pc.wrapping_add(4);
    Ok(())
}

// ============================================================================
// Reference-style engine
// ============================================================================

struct Region {
    base: u32,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct MappedMemory {
    regions: Vec<Region>,
}

impl MappedMemory {
    fn locate(&self, addr: u32) -> Option<(usize, usize)> {
        self.regions.iter().enumerate().find_map(|(i, r)| {
            let off = addr.wrapping_sub(r.base) as usize;
            (addr >= r.base && off < r.bytes.len()).then_some((i, off))
        })
    }
}

impl Bus for MappedMemory {
    fn load(&self, addr: u32) -> Result<u8, EngineError> {
        let (i, off) = self
            .locate(addr)
            .ok_or(EngineError::UnmappedAccess { address: Some(addr) })?;
        Ok(self.regions[i].bytes[off])
    }

    fn store(&mut self, addr: u32, value: u8) -> Result<(), EngineError> {
        let (i, off) = self
            .locate(addr)
            .ok_or(EngineError::UnmappedAccess { address: Some(addr) })?;
        self.regions[i].bytes[off] = value;
        Ok(())
    }
}

/// Engine with mapped memory and a packed APSR.
pub struct UnicornLike {
    regs: [u32; 16],
    /// Mode bits sit in the low byte; only NZCV are architectural here.
    apsr: u32,
    memory: MappedMemory,
    opened: Rc<Cell<usize>>,
}

impl UnicornLike {
    pub fn new() -> Self {
        Self {
            regs: [0; 16],
            apsr: 0x0000_01d3,
            memory: MappedMemory::default(),
            opened: Rc::new(Cell::new(0)),
        }
    }

    /// Factory counting how many engines it opened.
    pub fn factory(
        opened: Rc<Cell<usize>>,
    ) -> impl Fn(CpuMode) -> Result<Self, EngineError> {
        move |_mode| {
            opened.set(opened.get() + 1);
            Ok(Self {
                opened: Rc::clone(&opened),
                ..Self::new()
            })
        }
    }
}

impl ReferenceEngine for UnicornLike {
    fn mem_map(&mut self, base: u32, size: u32) -> Result<(), EngineError> {
        self.memory.regions.push(Region {
            base,
            bytes: vec![0; size as usize],
        });
        Ok(())
    }

    fn mem_write(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError> {
        for (i, &b) in data.iter().enumerate() {
            self.memory.store(addr.wrapping_add(i as u32), b)?;
        }
        Ok(())
    }

    fn mem_read(&self, addr: u32, len: usize) -> Result<Vec<u8>, EngineError> {
        (0..len)
            .map(|i| self.memory.load(addr.wrapping_add(i as u32)))
            .collect()
    }

    fn reg_write(&mut self, reg: RefReg, value: u32) -> Result<(), EngineError> {
        match reg {
            RefReg::Core(n) if n < 16 => self.regs[n as usize] = value,
            RefReg::Apsr => self.apsr = value,
            RefReg::Core(n) => return Err(EngineError::UnknownRegister(format!("r{n}"))),
        }
        Ok(())
    }

    fn reg_read(&self, reg: RefReg) -> Result<u32, EngineError> {
        match reg {
            RefReg::Core(n) if n < 16 => Ok(self.regs[n as usize]),
            RefReg::Apsr => Ok(self.apsr),
            RefReg::Core(n) => Err(EngineError::UnknownRegister(format!("r{n}"))),
        }
    }

    fn emu_start(&mut self, begin: u32, until: u32, count: usize) -> Result<(), EngineError> {
        assert_eq!(count, 1, "reference engine must be bounded to one instruction");
        assert!(until > begin);
        self.regs[PC] = begin;
        let opcode: Vec<u8> = self.mem_read(begin, 4)?;
        let flags = armdiff::adapter::unpack_nzcv(self.apsr);
        let mut cpu = Cpu {
            regs: self.regs,
            flags,
        };
        step(&mut cpu, &mut self.memory, &opcode)?;
        self.regs = cpu.regs;
        self.apsr = armdiff::adapter::pack_nzcv(self.apsr, cpu.flags);
        Ok(())
    }
}

// ============================================================================
// Candidate-style engine
// ============================================================================

#[derive(Default)]
struct SparseMemory {
    bytes: HashMap<u32, u8>,
}

impl Bus for SparseMemory {
    fn load(&self, addr: u32) -> Result<u8, EngineError> {
        self.bytes
            .get(&addr)
            .copied()
            .ok_or(EngineError::UnmappedAccess { address: Some(addr) })
    }

    fn store(&mut self, addr: u32, value: u8) -> Result<(), EngineError> {
        match self.bytes.get_mut(&addr) {
            Some(b) => {
                *b = value;
                Ok(())
            }
            None => Err(EngineError::UnmappedAccess { address: Some(addr) }),
        }
    }
}

const REG_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "r14",
    "pc",
];

fn flag_by_name(name: &str) -> Option<Flag> {
    Flag::ALL.into_iter().find(|f| f.name() == name)
}

/// Engine with named registers and flags and sparse memory.
pub struct TritonLike {
    regs: [u32; 16],
    flags: Flags,
    memory: SparseMemory,
    /// Address whose byte is incremented after every `process`.
    corrupt: Option<u32>,
    /// Cap on the bytes returned by `memory_area`.
    read_limit: Option<usize>,
}

impl TritonLike {
    pub fn new() -> Self {
        Self {
            regs: [0; 16],
            flags: Flags::new(false, false, false, false),
            memory: SparseMemory::default(),
            corrupt: None,
            read_limit: None,
        }
    }

    /// Candidate that writes one wrong byte at `addr` on every instruction.
    pub fn corrupting(addr: u32) -> Self {
        Self {
            corrupt: Some(addr),
            ..Self::new()
        }
    }

    /// Candidate whose memory reads return at most `len` bytes.
    pub fn truncating(len: usize) -> Self {
        Self {
            read_limit: Some(len),
            ..Self::new()
        }
    }
}

impl CandidateEngine for TritonLike {
    fn set_register(&mut self, name: &str, value: u32) -> Result<(), EngineError> {
        if let Some(i) = REG_NAMES.iter().position(|&n| n == name) {
            self.regs[i] = value;
        } else if let Some(flag) = flag_by_name(name) {
            self.flags.set(flag, value & 1 == 1);
        } else {
            return Err(EngineError::UnknownRegister(name.to_string()));
        }
        Ok(())
    }

    fn register(&self, name: &str) -> Result<u32, EngineError> {
        if let Some(i) = REG_NAMES.iter().position(|&n| n == name) {
            Ok(self.regs[i])
        } else if let Some(flag) = flag_by_name(name) {
            Ok(self.flags.bit(flag))
        } else {
            Err(EngineError::UnknownRegister(name.to_string()))
        }
    }

    fn set_memory_area(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError> {
        for (i, &b) in data.iter().enumerate() {
            self.memory.bytes.insert(addr.wrapping_add(i as u32), b);
        }
        Ok(())
    }

    fn memory_area(&self, addr: u32, len: usize) -> Result<Vec<u8>, EngineError> {
        let len = self.read_limit.map_or(len, |limit| len.min(limit));
        (0..len)
            .map(|i| self.memory.load(addr.wrapping_add(i as u32)))
            .collect()
    }

    fn process(&mut self, address: u32, opcode: &[u8]) -> Result<(), EngineError> {
        self.regs[PC] = address;
        let mut cpu = Cpu {
            regs: self.regs,
            flags: self.flags,
        };
        step(&mut cpu, &mut self.memory, opcode)?;
        self.regs = cpu.regs;
        self.flags = cpu.flags;

        if let Some(addr) = self.corrupt {
            let byte = self.memory.load(addr)?;
            self.memory.store(addr, byte.wrapping_add(1))?;
        }
        Ok(())
    }
}
