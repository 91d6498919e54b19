//! Engines loaded from shared libraries.
//!
//! A plugin exports a small C ABI (see [`api`]) wrapping a real emulator.
//! Each `open` call creates an independent engine instance; the library stays
//! loaded for as long as any factory or engine holds it.

pub mod api;

use std::ffi::{CString, c_void};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use libloading::Library;
use thiserror::Error;
use tracing::debug;

use crate::candidate::{CandidateEngine, CandidateFactory};
use crate::error::EngineError;
use crate::reference::{CpuMode, RefReg, ReferenceEngine, ReferenceFactory};
use api::{CandApi, RefApi, check_status};

/// Plugin loading error.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin library not found: {}", .0.display())]
    LibraryNotFound(PathBuf),

    #[error("failed to load plugin {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        source: libloading::Error,
    },

    #[error("failed to find symbol '{0}': {1}")]
    SymbolNotFound(String, libloading::Error),
}

fn load_library(path: &Path) -> Result<Arc<Library>, PluginError> {
    if !path.exists() {
        return Err(PluginError::LibraryNotFound(path.to_path_buf()));
    }
    let lib = unsafe { Library::new(path) }.map_err(|source| PluginError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded engine plugin");
    Ok(Arc::new(lib))
}

fn open_handle(open: api::OpenFn, mode: CpuMode) -> Result<NonNull<c_void>, EngineError> {
    let raw = unsafe { open(mode.id()) };
    NonNull::new(raw).ok_or_else(|| EngineError::other(-1, "plugin failed to open an engine"))
}

fn register_name(name: &str) -> Result<CString, EngineError> {
    CString::new(name).map_err(|_| EngineError::UnknownRegister(name.to_string()))
}

// ============================================================================
// Reference plugin
// ============================================================================

/// Factory for reference engines backed by a shared library.
pub struct ReferencePlugin {
    lib: Arc<Library>,
    api: RefApi,
}

impl ReferencePlugin {
    /// Load a reference plugin exporting the `armdiff_ref_*` symbols.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be loaded or a symbol is missing.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let lib = load_library(path)?;
        let api = unsafe { RefApi::load(&lib)? };
        Ok(Self { lib, api })
    }
}

impl ReferenceFactory for ReferencePlugin {
    type Engine = PluginReferenceEngine;

    fn open(&self, mode: CpuMode) -> Result<Self::Engine, EngineError> {
        let handle = open_handle(self.api.open, mode)?;
        Ok(PluginReferenceEngine {
            handle,
            api: self.api,
            _lib: Arc::clone(&self.lib),
        })
    }
}

/// One engine instance inside a reference plugin.
pub struct PluginReferenceEngine {
    handle: NonNull<c_void>,
    api: RefApi,
    _lib: Arc<Library>,
}

impl ReferenceEngine for PluginReferenceEngine {
    fn mem_map(&mut self, base: u32, size: u32) -> Result<(), EngineError> {
        let status = unsafe { (self.api.mem_map)(self.handle.as_ptr(), base, size) };
        check_status(status, "mem_map")
    }

    fn mem_write(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError> {
        let status =
            unsafe { (self.api.mem_write)(self.handle.as_ptr(), addr, data.as_ptr(), data.len()) };
        check_status(status, "mem_write")
    }

    fn mem_read(&self, addr: u32, len: usize) -> Result<Vec<u8>, EngineError> {
        let mut buf = vec![0u8; len];
        let status =
            unsafe { (self.api.mem_read)(self.handle.as_ptr(), addr, buf.as_mut_ptr(), len) };
        check_status(status, "mem_read")?;
        Ok(buf)
    }

    fn reg_write(&mut self, reg: RefReg, value: u32) -> Result<(), EngineError> {
        let status = unsafe { (self.api.reg_write)(self.handle.as_ptr(), reg.id(), value) };
        check_status(status, "reg_write")
    }

    fn reg_read(&self, reg: RefReg) -> Result<u32, EngineError> {
        let mut value = 0u32;
        let status = unsafe { (self.api.reg_read)(self.handle.as_ptr(), reg.id(), &raw mut value) };
        check_status(status, "reg_read")?;
        Ok(value)
    }

    fn emu_start(&mut self, begin: u32, until: u32, count: usize) -> Result<(), EngineError> {
        let status =
            unsafe { (self.api.emu_start)(self.handle.as_ptr(), begin, until, count as u64) };
        check_status(status, "emu_start")
    }
}

impl Drop for PluginReferenceEngine {
    fn drop(&mut self) {
        unsafe { (self.api.close)(self.handle.as_ptr()) };
    }
}

// ============================================================================
// Candidate plugin
// ============================================================================

/// Factory for candidate engines backed by a shared library.
pub struct CandidatePlugin {
    lib: Arc<Library>,
    api: CandApi,
}

impl CandidatePlugin {
    /// Load a candidate plugin exporting the `armdiff_cand_*` symbols.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be loaded or a symbol is missing.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let lib = load_library(path)?;
        let api = unsafe { CandApi::load(&lib)? };
        Ok(Self { lib, api })
    }
}

impl CandidateFactory for CandidatePlugin {
    type Engine = PluginCandidateEngine;

    fn open(&self, mode: CpuMode) -> Result<Self::Engine, EngineError> {
        let handle = open_handle(self.api.open, mode)?;
        Ok(PluginCandidateEngine {
            handle,
            api: self.api,
            _lib: Arc::clone(&self.lib),
        })
    }
}

/// One engine instance inside a candidate plugin.
pub struct PluginCandidateEngine {
    handle: NonNull<c_void>,
    api: CandApi,
    _lib: Arc<Library>,
}

impl CandidateEngine for PluginCandidateEngine {
    fn set_register(&mut self, name: &str, value: u32) -> Result<(), EngineError> {
        let c_name = register_name(name)?;
        let status =
            unsafe { (self.api.set_register)(self.handle.as_ptr(), c_name.as_ptr(), value) };
        check_status(status, name)
    }

    fn register(&self, name: &str) -> Result<u32, EngineError> {
        let c_name = register_name(name)?;
        let mut value = 0u32;
        let status = unsafe {
            (self.api.get_register)(self.handle.as_ptr(), c_name.as_ptr(), &raw mut value)
        };
        check_status(status, name)?;
        Ok(value)
    }

    fn set_memory_area(&mut self, addr: u32, data: &[u8]) -> Result<(), EngineError> {
        let status =
            unsafe { (self.api.set_memory)(self.handle.as_ptr(), addr, data.as_ptr(), data.len()) };
        check_status(status, "set_memory")
    }

    fn memory_area(&self, addr: u32, len: usize) -> Result<Vec<u8>, EngineError> {
        let mut buf = vec![0u8; len];
        let status =
            unsafe { (self.api.get_memory)(self.handle.as_ptr(), addr, buf.as_mut_ptr(), len) };
        check_status(status, "get_memory")?;
        Ok(buf)
    }

    fn process(&mut self, address: u32, opcode: &[u8]) -> Result<(), EngineError> {
        let status = unsafe {
            (self.api.process)(self.handle.as_ptr(), address, opcode.as_ptr(), opcode.len())
        };
        check_status(status, "process")
    }
}

impl Drop for PluginCandidateEngine {
    fn drop(&mut self) {
        unsafe { (self.api.close)(self.handle.as_ptr()) };
    }
}
