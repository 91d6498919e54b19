//! Memory windows and the fixed address layout they live in.
//!
//! A window is a fixed-size byte region at a fixed base address. Both engines
//! see the same windows before execution and both windows are read back
//! afterwards to catch any unintended memory effect.

use std::fmt;

use thiserror::Error;

/// Base address of the code region (also the start of the mapped region).
pub const DEFAULT_CODE_BASE: u32 = 0x0010_0000;

/// Base address of the stack window.
pub const DEFAULT_STACK_BASE: u32 = 0x0020_0000;

/// Base address of the heap window.
pub const DEFAULT_HEAP_BASE: u32 = 0x0030_0000;

/// Size of the mapped region starting at the code base (5 MiB).
pub const DEFAULT_MAP_SIZE: u32 = 5 * 1024 * 1024;

/// Size of each memory window.
pub const DEFAULT_WINDOW_SIZE: u32 = 0x100;

/// Identifies one of the two memory windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WindowId {
    Stack,
    Heap,
}

impl WindowId {
    /// Windows in comparison order.
    pub const ALL: [Self; 2] = [Self::Stack, Self::Heap];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Heap => "heap",
        }
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-length byte region at a fixed base address.
///
/// The length is set at construction and no method changes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryWindow {
    base: u32,
    bytes: Box<[u8]>,
}

impl MemoryWindow {
    pub fn new(base: u32, bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            base,
            bytes: bytes.into(),
        }
    }

    /// Create a window of `len` bytes where byte `i` is `pattern(i)`.
    pub fn from_fn(base: u32, len: usize, pattern: impl FnMut(usize) -> u8) -> Self {
        Self::new(base, (0..len).map(pattern).collect::<Vec<_>>())
    }

    pub const fn base(&self) -> u32 {
        self.base
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    /// Absolute address of the byte at `offset`.
    pub const fn address_of(&self, offset: usize) -> u32 {
        self.base.wrapping_add(offset as u32)
    }

    /// Copy `data` into the window starting at `offset`.
    ///
    /// Bytes past the end of the window are dropped.
    /// Returns the number of bytes written.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> usize {
        if offset >= self.bytes.len() {
            return 0;
        }
        let len = data.len().min(self.bytes.len() - offset);
        self.bytes[offset..offset + len].copy_from_slice(&data[..len]);
        len
    }
}

/// Layout configuration error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{0} window has zero size")]
    EmptyWindow(WindowId),

    #[error("mapped region of {size:#x} bytes at {base:#x} exceeds the 32-bit address space")]
    MapOverflow { base: u32, size: u32 },

    #[error("{window} window at {base:#x} lies outside the mapped region")]
    WindowOutsideMap { window: WindowId, base: u32 },

    #[error("stack window at {stack:#x} overlaps heap window at {heap:#x}")]
    WindowsOverlap { stack: u32, heap: u32 },

    #[error("{window} window covers the code base {code_base:#x}")]
    WindowCoversCode { window: WindowId, code_base: u32 },

    #[error("code at {code_base:#x}..{code_end:#x} overlaps the {window} window")]
    CodeOverlapsWindow {
        window: WindowId,
        code_base: u32,
        code_end: u64,
    },

    #[error("code at {code_base:#x}..{code_end:#x} runs past the mapped region")]
    CodeOutsideMap { code_base: u32, code_end: u64 },
}

/// Fixed base addresses shared by both engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Address of the first instruction; start of the mapped region.
    pub code_base: u32,
    pub stack_base: u32,
    pub heap_base: u32,
    /// Bytes mapped starting at `code_base`.
    pub map_size: u32,
    /// Bytes in each window.
    pub window_size: u32,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            code_base: DEFAULT_CODE_BASE,
            stack_base: DEFAULT_STACK_BASE,
            heap_base: DEFAULT_HEAP_BASE,
            map_size: DEFAULT_MAP_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl MemoryLayout {
    pub const fn window_base(&self, id: WindowId) -> u32 {
        match id {
            WindowId::Stack => self.stack_base,
            WindowId::Heap => self.heap_base,
        }
    }

    /// Exclusive end of the mapped region.
    pub const fn map_end(&self) -> u64 {
        self.code_base as u64 + self.map_size as u64
    }

    fn window_range(&self, id: WindowId) -> (u64, u64) {
        let base = u64::from(self.window_base(id));
        (base, base + u64::from(self.window_size))
    }

    /// Check that both windows are non-empty, disjoint, mapped, and clear of
    /// the code base.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.map_end() > 1 << 32 {
            return Err(LayoutError::MapOverflow {
                base: self.code_base,
                size: self.map_size,
            });
        }

        let code_base = u64::from(self.code_base);
        for id in WindowId::ALL {
            if self.window_size == 0 {
                return Err(LayoutError::EmptyWindow(id));
            }
            let (start, end) = self.window_range(id);
            if start < code_base || end > self.map_end() {
                return Err(LayoutError::WindowOutsideMap {
                    window: id,
                    base: self.window_base(id),
                });
            }
            if (start..end).contains(&code_base) {
                return Err(LayoutError::WindowCoversCode {
                    window: id,
                    code_base: self.code_base,
                });
            }
        }

        let (stack_start, stack_end) = self.window_range(WindowId::Stack);
        let (heap_start, heap_end) = self.window_range(WindowId::Heap);
        if stack_start < heap_end && heap_start < stack_end {
            return Err(LayoutError::WindowsOverlap {
                stack: self.stack_base,
                heap: self.heap_base,
            });
        }

        Ok(())
    }

    /// Check that `code_len` bytes of code starting at the code base stay
    /// inside the mapped region and clear of both windows.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::CodeOutsideMap`] or
    /// [`LayoutError::CodeOverlapsWindow`].
    pub fn validate_code(&self, code_len: u64) -> Result<(), LayoutError> {
        let code_start = u64::from(self.code_base);
        let code_end = code_start.saturating_add(code_len);
        if code_end > self.map_end() {
            return Err(LayoutError::CodeOutsideMap {
                code_base: self.code_base,
                code_end,
            });
        }
        for id in WindowId::ALL {
            let (start, end) = self.window_range(id);
            if code_start < end && start < code_end {
                return Err(LayoutError::CodeOverlapsWindow {
                    window: id,
                    code_base: self.code_base,
                    code_end,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_at_never_grows() {
        let mut window = MemoryWindow::new(0x1000, vec![0; 4]);
        assert_eq!(window.write_at(2, &[1, 2, 3, 4]), 2);
        assert_eq!(window.as_bytes(), &[0, 0, 1, 2]);
        assert_eq!(window.write_at(4, &[9]), 0);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_address_of() {
        let window = MemoryWindow::from_fn(DEFAULT_HEAP_BASE, 16, |i| i as u8);
        assert_eq!(window.address_of(12), 0x0030_000c);
        assert_eq!(window.byte(12), Some(12));
        assert_eq!(window.byte(16), None);
    }

    #[test]
    fn test_default_layout_is_valid() {
        assert_eq!(MemoryLayout::default().validate(), Ok(()));
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let layout = MemoryLayout {
            heap_base: DEFAULT_STACK_BASE + 0x80,
            ..MemoryLayout::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::WindowsOverlap { .. })
        ));
    }

    #[test]
    fn test_window_outside_map_rejected() {
        let layout = MemoryLayout {
            heap_base: DEFAULT_CODE_BASE + DEFAULT_MAP_SIZE - 0x10,
            ..MemoryLayout::default()
        };
        assert_eq!(
            layout.validate(),
            Err(LayoutError::WindowOutsideMap {
                window: WindowId::Heap,
                base: DEFAULT_CODE_BASE + DEFAULT_MAP_SIZE - 0x10,
            })
        );
    }

    #[test]
    fn test_window_over_code_rejected() {
        let layout = MemoryLayout {
            stack_base: DEFAULT_CODE_BASE,
            ..MemoryLayout::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::WindowCoversCode {
                window: WindowId::Stack,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_window_rejected() {
        let layout = MemoryLayout {
            window_size: 0,
            ..MemoryLayout::default()
        };
        assert_eq!(
            layout.validate(),
            Err(LayoutError::EmptyWindow(WindowId::Stack))
        );
    }

    #[test]
    fn test_window_inside_code_span_rejected() {
        let layout = MemoryLayout {
            stack_base: DEFAULT_CODE_BASE + 2,
            ..MemoryLayout::default()
        };
        assert_eq!(layout.validate(), Ok(()));
        assert_eq!(
            layout.validate_code(4),
            Err(LayoutError::CodeOverlapsWindow {
                window: WindowId::Stack,
                code_base: DEFAULT_CODE_BASE,
                code_end: u64::from(DEFAULT_CODE_BASE) + 4,
            })
        );
        assert_eq!(layout.validate_code(2), Ok(()));
    }

    #[test]
    fn test_code_past_map_rejected() {
        let layout = MemoryLayout::default();
        let up_to_stack = u64::from(DEFAULT_STACK_BASE - DEFAULT_CODE_BASE);
        assert_eq!(layout.validate_code(up_to_stack), Ok(()));
        assert!(matches!(
            layout.validate_code(u64::from(DEFAULT_MAP_SIZE) + 1),
            Err(LayoutError::CodeOutsideMap { .. })
        ));
    }
}
