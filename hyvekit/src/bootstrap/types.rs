//! Type definitions for the bootstrap pipeline.

use crate::backend::HypervisorBackend;
use crate::config::BootParams;
use hyvekit_shared::errors::{HyvekitError, HyvekitResult};
use std::ffi::{CStr, CString, NulError};
use std::sync::atomic::{AtomicBool, Ordering};

static BOOT_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Process-wide bootstrap exclusivity.
///
/// The hypervisor backend is process-global, so at most one bootstrap may be
/// in flight per process. Released on drop.
#[derive(Debug)]
pub struct BootLock {
    _private: (),
}

impl BootLock {
    pub fn acquire() -> HyvekitResult<Self> {
        BOOT_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                HyvekitError::InvalidState(
                    "another VM bootstrap is already active in this process".into(),
                )
            })?;
        Ok(Self { _private: () })
    }
}

impl Drop for BootLock {
    fn drop(&mut self) {
        BOOT_ACTIVE.store(false, Ordering::Release);
    }
}

/// Owner of every C string handed to the backend.
///
/// Backends may keep raw pointers to descriptor text (libxhyve does), so the
/// arena lives for the whole bootstrap-and-dispatch call and frees all
/// buffers when dropped, on success and failure alike. Each buffer is a
/// separate heap allocation, so growing the arena never moves earlier ones.
#[derive(Debug, Default)]
pub struct ArgArena {
    buffers: Vec<CString>,
}

impl ArgArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `s` into the arena as a NUL-terminated string.
    pub fn intern(&mut self, s: &str) -> Result<&CStr, NulError> {
        let buffer = CString::new(s)?;
        let index = self.buffers.len();
        self.buffers.push(buffer);
        Ok(self.buffers[index].as_c_str())
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl Drop for ArgArena {
    fn drop(&mut self) {
        tracing::trace!(buffers = self.buffers.len(), "Releasing backend argument buffers");
    }
}

/// Shared bootstrap pipeline context.
///
/// Holds the normalized parameters, the backend, the argument arena, and
/// the facts earlier stages learn from the backend.
pub struct BootContext<'a> {
    pub params: &'a BootParams,
    pub backend: &'a mut dyn HypervisorBackend,
    pub arena: &'a mut ArgArena,
    /// Guest memory in bytes (set by the memory size stage).
    pub memory_bytes: Option<u64>,
    /// Host vCPU ceiling (set by the vCPU limit stage).
    pub max_vcpus: Option<u32>,
}

impl<'a> BootContext<'a> {
    pub fn new(
        params: &'a BootParams,
        backend: &'a mut dyn HypervisorBackend,
        arena: &'a mut ArgArena,
    ) -> Self {
        Self {
            params,
            backend,
            arena,
            memory_bytes: None,
            max_vcpus: None,
        }
    }
}
