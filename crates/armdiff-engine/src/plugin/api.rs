//! Plugin C ABI: symbol names, function types, status codes.

use std::ffi::{c_char, c_void};

use libloading::{Library, Symbol};
use tracing::error;

use super::PluginError;
use crate::error::EngineError;

/// Call succeeded.
pub const STATUS_OK: i32 = 0;
/// Access to unmapped memory.
pub const STATUS_UNMAPPED: i32 = 1;
/// Undefined or unpredictable instruction.
pub const STATUS_UNDEFINED: i32 = 2;
/// Misaligned access.
pub const STATUS_ALIGNMENT: i32 = 3;
/// Register name or id not recognised.
pub const STATUS_UNKNOWN_REGISTER: i32 = 4;

pub type OpenFn = unsafe extern "C" fn(mode: u32) -> *mut c_void;
pub type CloseFn = unsafe extern "C" fn(handle: *mut c_void);
pub type MemMapFn = unsafe extern "C" fn(handle: *mut c_void, base: u32, size: u32) -> i32;
pub type MemWriteFn =
    unsafe extern "C" fn(handle: *mut c_void, addr: u32, data: *const u8, len: usize) -> i32;
pub type MemReadFn =
    unsafe extern "C" fn(handle: *mut c_void, addr: u32, out: *mut u8, len: usize) -> i32;
pub type RegWriteFn = unsafe extern "C" fn(handle: *mut c_void, reg: u32, value: u32) -> i32;
pub type RegReadFn = unsafe extern "C" fn(handle: *mut c_void, reg: u32, out: *mut u32) -> i32;
pub type EmuStartFn =
    unsafe extern "C" fn(handle: *mut c_void, begin: u32, until: u32, count: u64) -> i32;
pub type SetRegisterFn =
    unsafe extern "C" fn(handle: *mut c_void, name: *const c_char, value: u32) -> i32;
pub type GetRegisterFn =
    unsafe extern "C" fn(handle: *mut c_void, name: *const c_char, out: *mut u32) -> i32;
pub type ProcessFn =
    unsafe extern "C" fn(handle: *mut c_void, addr: u32, opcode: *const u8, len: usize) -> i32;

/// Functions exported by a reference engine plugin (`armdiff_ref_*`).
#[derive(Clone, Copy)]
pub struct RefApi {
    pub open: OpenFn,
    pub close: CloseFn,
    pub mem_map: MemMapFn,
    pub mem_write: MemWriteFn,
    pub mem_read: MemReadFn,
    pub reg_write: RegWriteFn,
    pub reg_read: RegReadFn,
    pub emu_start: EmuStartFn,
}

impl RefApi {
    pub unsafe fn load(lib: &Library) -> Result<Self, PluginError> {
        unsafe {
            Ok(Self {
                open: load_symbol(lib, b"armdiff_ref_open", "armdiff_ref_open")?,
                close: load_symbol(lib, b"armdiff_ref_close", "armdiff_ref_close")?,
                mem_map: load_symbol(lib, b"armdiff_ref_mem_map", "armdiff_ref_mem_map")?,
                mem_write: load_symbol(lib, b"armdiff_ref_mem_write", "armdiff_ref_mem_write")?,
                mem_read: load_symbol(lib, b"armdiff_ref_mem_read", "armdiff_ref_mem_read")?,
                reg_write: load_symbol(lib, b"armdiff_ref_reg_write", "armdiff_ref_reg_write")?,
                reg_read: load_symbol(lib, b"armdiff_ref_reg_read", "armdiff_ref_reg_read")?,
                emu_start: load_symbol(lib, b"armdiff_ref_emu_start", "armdiff_ref_emu_start")?,
            })
        }
    }
}

/// Functions exported by a candidate engine plugin (`armdiff_cand_*`).
#[derive(Clone, Copy)]
pub struct CandApi {
    pub open: OpenFn,
    pub close: CloseFn,
    pub set_register: SetRegisterFn,
    pub get_register: GetRegisterFn,
    pub set_memory: MemWriteFn,
    pub get_memory: MemReadFn,
    pub process: ProcessFn,
}

impl CandApi {
    pub unsafe fn load(lib: &Library) -> Result<Self, PluginError> {
        unsafe {
            Ok(Self {
                open: load_symbol(lib, b"armdiff_cand_open", "armdiff_cand_open")?,
                close: load_symbol(lib, b"armdiff_cand_close", "armdiff_cand_close")?,
                set_register: load_symbol(
                    lib,
                    b"armdiff_cand_set_register",
                    "armdiff_cand_set_register",
                )?,
                get_register: load_symbol(
                    lib,
                    b"armdiff_cand_get_register",
                    "armdiff_cand_get_register",
                )?,
                set_memory: load_symbol(lib, b"armdiff_cand_set_memory", "armdiff_cand_set_memory")?,
                get_memory: load_symbol(lib, b"armdiff_cand_get_memory", "armdiff_cand_get_memory")?,
                process: load_symbol(lib, b"armdiff_cand_process", "armdiff_cand_process")?,
            })
        }
    }
}

pub unsafe fn load_symbol<T: Copy>(
    lib: &Library,
    symbol: &'static [u8],
    label: &'static str,
) -> Result<T, PluginError> {
    unsafe {
        let sym: Symbol<T> = lib.get(symbol).map_err(|e| {
            error!(symbol = label, "symbol not found in plugin");
            PluginError::SymbolNotFound(label.to_string(), e)
        })?;
        Ok(*sym)
    }
}

/// Map a plugin status code onto an engine result.
pub fn check_status(status: i32, context: &str) -> Result<(), EngineError> {
    match status {
        STATUS_OK => Ok(()),
        STATUS_UNMAPPED => Err(EngineError::UnmappedAccess { address: None }),
        STATUS_UNDEFINED => Err(EngineError::UndefinedInstruction { address: None }),
        STATUS_ALIGNMENT => Err(EngineError::Alignment { address: None }),
        STATUS_UNKNOWN_REGISTER => Err(EngineError::UnknownRegister(context.to_string())),
        code => Err(EngineError::other(code, context)),
    }
}
