//! Test double shared by the integration tests.

#![allow(dead_code)]

use hyvekit::{GuestExit, HypervisorBackend, RawStatus};
use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::{Arc, Mutex};

/// One observed backend call: method name plus its rendered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub args: String,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    failures: HashMap<&'static str, i32>,
}

/// Records every call in order. Any fallible call can be told to fail
/// with a given raw code.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    state: Arc<Mutex<State>>,
    max_vcpus: u32,
    exit_status: i32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub const ENTRY_RIP: u64 = 0x10_0000;

    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            max_vcpus: 32,
            exit_status: 0,
        }
    }

    pub fn with_max_vcpus(mut self, max: u32) -> Self {
        self.max_vcpus = max;
        self
    }

    pub fn with_exit_status(mut self, status: i32) -> Self {
        self.exit_status = status;
        self
    }

    pub fn fail_on(self, method: &'static str, code: i32) -> Self {
        self.state.lock().unwrap().failures.insert(method, code);
        self
    }

    /// A second handle onto the same call log, for the test to keep.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn boxed(&self) -> Box<dyn HypervisorBackend> {
        Box::new(self.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn args_of(&self, method: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .map(|c| c.args)
            .collect()
    }

    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|c| c.method == method)
    }

    fn record(&self, method: &'static str, args: impl Into<String>) -> RawStatus {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method,
            args: args.into(),
        });
        match state.failures.get(method) {
            Some(code) => Err(*code),
            None => Ok(()),
        }
    }
}

fn text(s: &CStr) -> String {
    s.to_string_lossy().into_owned()
}

impl HypervisorBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn pci_parse_slot(&mut self, descriptor: &CStr) -> RawStatus {
        self.record("pci_parse_slot", text(descriptor))
    }

    fn lpc_device_parse(&mut self, descriptor: &CStr) -> RawStatus {
        self.record("lpc_device_parse", text(descriptor))
    }

    fn parse_memsize(&mut self, spec: &CStr) -> RawStatus<u64> {
        let spec = text(spec);
        self.record("parse_memsize", spec.clone())?;
        hyvekit::descriptor::parse_memsize(&spec).map_err(|_| libc::EINVAL)
    }

    fn firmware_parse(&mut self, descriptor: &CStr) -> RawStatus {
        self.record("firmware_parse", text(descriptor))
    }

    fn vm_create(&mut self) -> RawStatus {
        self.record("vm_create", "")
    }

    fn max_vcpus(&mut self) -> u32 {
        let _ = self.record("max_vcpus", "");
        self.max_vcpus
    }

    fn setup_memory(&mut self, bytes: u64) -> RawStatus {
        self.record("setup_memory", bytes.to_string())
    }

    fn init_msr(&mut self) -> RawStatus {
        self.record("init_msr", "")
    }

    fn init_mem(&mut self) {
        let _ = self.record("init_mem", "");
    }

    fn init_inout(&mut self) {
        let _ = self.record("init_inout", "");
    }

    fn pci_irq_init(&mut self) {
        let _ = self.record("pci_irq_init", "");
    }

    fn ioapic_init(&mut self) {
        let _ = self.record("ioapic_init", "");
    }

    fn rtc_init(&mut self, use_local_time: bool) {
        let _ = self.record("rtc_init", use_local_time.to_string());
    }

    fn sci_init(&mut self) {
        let _ = self.record("sci_init", "");
    }

    fn init_pci(&mut self) -> RawStatus {
        self.record("init_pci", "")
    }

    fn init_bvmcons(&mut self) {
        let _ = self.record("init_bvmcons", "");
    }

    fn mptable_build(&mut self, vcpus: u32) -> RawStatus {
        self.record("mptable_build", vcpus.to_string())
    }

    fn smbios_build(&mut self, instance_id: &CStr) -> RawStatus {
        self.record("smbios_build", text(instance_id))
    }

    fn acpi_build(&mut self, vcpus: u32) -> RawStatus {
        self.record("acpi_build", vcpus.to_string())
    }

    fn load_firmware(&mut self) -> RawStatus<u64> {
        self.record("load_firmware", "")?;
        Ok(Self::ENTRY_RIP)
    }

    fn vcpu_add(&mut self, from_vcpu: u32, vcpu: u32, rip: u64) -> RawStatus {
        self.record("vcpu_add", format!("{from_vcpu},{vcpu},{rip:#x}"))
    }

    fn dispatch(&mut self) -> GuestExit {
        let _ = self.record("dispatch", "");
        GuestExit {
            status: self.exit_status,
        }
    }
}
