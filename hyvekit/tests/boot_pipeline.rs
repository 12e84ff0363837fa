//! End-to-end bootstrap ordering and failure classification.

mod common;

use common::RecordingBackend;
use hyvekit::{
    BackendKind, BackendOptions, BootSpec, BootStage, HyvekitError, VmParams, boot, boot_pinned,
    create_backend,
};
use serial_test::serial;

const MIB: u64 = 1024 * 1024;

fn valid_params() -> VmParams {
    VmParams {
        vcpu_count: 2,
        memory_size: "1024".to_string(),
        boot_spec: BootSpec::kernel("/boot/vmlinuz", "/boot/initrd.img", "console=ttyS0"),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_empty_kernel_fails_before_vm_create() {
    let backend = RecordingBackend::new();
    let params = VmParams {
        vcpu_count: 0,
        memory_size: String::new(),
        boot_spec: BootSpec::kernel("", "", ""),
        ..Default::default()
    };

    let err = boot(params, backend.boxed()).unwrap_err();

    assert!(matches!(err, HyvekitError::InvalidBootParams { .. }));
    assert_eq!(err.stage(), Some(BootStage::BootSpec));
    assert_eq!(err.raw_code(), Some(libc::EINVAL));

    // Defaults reached the backend.
    assert_eq!(
        backend.args_of("pci_parse_slot"),
        vec!["2:0,virtio-net", "0:0,hostbridge", "31,lpc"]
    );
    assert_eq!(backend.args_of("lpc_device_parse"), vec!["com1,stdio"]);
    assert_eq!(backend.args_of("parse_memsize"), vec!["256"]);
    assert!(!backend.called("firmware_parse"));
    assert!(!backend.called("vm_create"));
}

#[test]
#[serial]
fn test_vcpu_limit_checked_after_vm_create() {
    let backend = RecordingBackend::new().with_max_vcpus(32);
    let params = VmParams {
        vcpu_count: 999_999,
        ..valid_params()
    };

    let err = boot(params, backend.boxed()).unwrap_err();

    match err {
        HyvekitError::VcpuLimitExceeded { requested, max } => {
            assert_eq!(requested, 999_999);
            assert_eq!(max, 32);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(backend.called("vm_create"));
    assert_eq!(backend.methods().last(), Some(&"max_vcpus"));
    assert!(!backend.called("setup_memory"));
}

#[test]
#[serial]
fn test_valid_boot_skips_disabled_tables() {
    let backend = RecordingBackend::new().with_exit_status(7);

    let exit = boot(valid_params(), backend.boxed()).unwrap();

    assert_eq!(exit.status, 7);
    assert!(!exit.success());
    assert_eq!(
        backend.methods(),
        vec![
            "pci_parse_slot",
            "pci_parse_slot",
            "pci_parse_slot",
            "lpc_device_parse",
            "parse_memsize",
            "firmware_parse",
            "vm_create",
            "max_vcpus",
            "setup_memory",
            "init_msr",
            "init_mem",
            "init_inout",
            "pci_irq_init",
            "ioapic_init",
            "rtc_init",
            "sci_init",
            "init_pci",
            "smbios_build",
            "load_firmware",
            "vcpu_add",
            "dispatch",
        ]
    );
    assert_eq!(
        backend.args_of("firmware_parse"),
        vec!["kexec,/boot/vmlinuz,/boot/initrd.img,console=ttyS0"]
    );
    assert_eq!(backend.args_of("setup_memory"), vec![(1024 * MIB).to_string()]);
    assert_eq!(backend.args_of("vcpu_add"), vec!["0,0,0x100000"]);
}

#[test]
#[serial]
fn test_optional_tables_sized_for_vcpus() {
    let backend = RecordingBackend::new();
    let params = VmParams {
        vcpu_count: 4,
        enable_acpi: true,
        enable_mptables: true,
        enable_bvm_console: true,
        ..valid_params()
    };

    boot(params, backend.boxed()).unwrap();

    let methods = backend.methods();
    let tail: Vec<_> = methods
        .iter()
        .skip_while(|m| **m != "init_pci")
        .copied()
        .collect();
    assert_eq!(
        tail,
        vec![
            "init_pci",
            "init_bvmcons",
            "mptable_build",
            "smbios_build",
            "acpi_build",
            "load_firmware",
            "vcpu_add",
            "dispatch",
        ]
    );
    assert_eq!(backend.args_of("mptable_build"), vec!["4"]);
    assert_eq!(backend.args_of("acpi_build"), vec!["4"]);
}

#[test]
#[serial]
fn test_memory_expression_reaches_backend_trimmed() {
    let backend = RecordingBackend::new();
    let params = VmParams {
        memory_size: " 1024 \n".to_string(),
        ..valid_params()
    };

    boot(params, backend.boxed()).unwrap();

    assert_eq!(backend.args_of("parse_memsize"), vec!["1024"]);
    assert_eq!(backend.args_of("setup_memory"), vec![(1024 * MIB).to_string()]);
}

#[test]
#[serial]
fn test_smbios_receives_instance_id() {
    let backend = RecordingBackend::new();
    let params = VmParams {
        instance_id: "6ba7b810-9dad-11d1-80b4-00c04fd430c8".to_string(),
        ..valid_params()
    };

    boot(params, backend.boxed()).unwrap();

    assert_eq!(
        backend.args_of("smbios_build"),
        vec!["6ba7b810-9dad-11d1-80b4-00c04fd430c8"]
    );
}

#[test]
#[serial]
fn test_rtc_clock_policy() {
    let local = RecordingBackend::new();
    boot(valid_params(), local.boxed()).unwrap();
    assert_eq!(local.args_of("rtc_init"), vec!["true"]);

    let utc = RecordingBackend::new();
    let params = VmParams {
        use_utc_clock: true,
        ..valid_params()
    };
    boot(params, utc.boxed()).unwrap();
    assert_eq!(utc.args_of("rtc_init"), vec!["false"]);
}

#[test]
#[serial]
fn test_failing_stage_stops_pipeline() {
    let cases: &[(&str, BootStage)] = &[
        ("pci_parse_slot", BootStage::PciSlots),
        ("lpc_device_parse", BootStage::LpcDevices),
        ("parse_memsize", BootStage::MemorySize),
        ("firmware_parse", BootStage::BootSpec),
        ("vm_create", BootStage::VmCreate),
        ("setup_memory", BootStage::MemorySetup),
        ("init_msr", BootStage::Chipset),
        ("init_pci", BootStage::PciBus),
        ("mptable_build", BootStage::MpTable),
        ("smbios_build", BootStage::Smbios),
        ("acpi_build", BootStage::Acpi),
        ("load_firmware", BootStage::BootstrapVcpu),
        ("vcpu_add", BootStage::BootstrapVcpu),
    ];

    for &(method, stage) in cases {
        let backend = RecordingBackend::new().fail_on(method, libc::EIO);
        let params = VmParams {
            enable_acpi: true,
            enable_mptables: true,
            ..valid_params()
        };

        let err = boot(params, backend.boxed()).unwrap_err();

        assert_eq!(err.stage(), Some(stage), "failing {method}");
        assert_eq!(err.raw_code(), Some(libc::EIO), "failing {method}");
        assert_eq!(backend.methods().last(), Some(&method), "failing {method}");
        assert_eq!(
            backend.methods().iter().filter(|m| **m == method).count(),
            1,
            "{method} retried"
        );
        assert!(!backend.called("dispatch"), "failing {method}");
    }
}

#[test]
#[serial]
fn test_bad_pci_descriptor_is_classified() {
    let backend = RecordingBackend::new().fail_on("pci_parse_slot", libc::EINVAL);
    let params = VmParams {
        pci_slots: vec!["2:0,not-a-device".to_string()],
        ..valid_params()
    };

    match boot(params, backend.boxed()).unwrap_err() {
        HyvekitError::PciSlot { descriptor, code } => {
            assert_eq!(descriptor, "2:0,not-a-device");
            assert_eq!(code, libc::EINVAL);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!backend.called("lpc_device_parse"));
}

#[test]
#[serial]
fn test_dry_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = dir.path().join("vmlinuz");
    let initrd = dir.path().join("initrd.img");
    std::fs::write(&kernel, b"kernel").unwrap();
    std::fs::write(&initrd, b"initrd").unwrap();

    let params = VmParams {
        vcpu_count: 2,
        memory_size: "2G".to_string(),
        enable_acpi: true,
        boot_spec: BootSpec::kernel(&kernel, &initrd, "console=ttyS0 acpi=on"),
        ..Default::default()
    };
    let backend = create_backend(BackendKind::DryRun, &BackendOptions::default()).unwrap();

    let exit = boot(params, backend).unwrap();
    assert!(exit.success());
}

#[test]
#[serial]
fn test_dry_run_missing_kernel() {
    let dir = tempfile::tempdir().unwrap();
    let params = VmParams {
        boot_spec: BootSpec::kernel(dir.path().join("missing"), "", ""),
        ..Default::default()
    };
    let backend = create_backend(BackendKind::DryRun, &BackendOptions::default()).unwrap();

    let err = boot(params, backend).unwrap_err();
    assert!(matches!(
        err,
        HyvekitError::InvalidBootParams { code, .. } if code == libc::ENOENT
    ));
}

#[test]
#[serial]
fn test_boot_pinned_runs_on_dedicated_thread() {
    let backend = RecordingBackend::new();
    let handle = backend.handle();
    let caller = std::thread::current().id();

    let task = boot_pinned(valid_params(), move || {
        assert_ne!(std::thread::current().id(), caller);
        Ok(handle.boxed())
    })
    .unwrap();

    let exit = task.join().unwrap().unwrap();
    assert!(exit.success());
    assert_eq!(backend.methods().last(), Some(&"dispatch"));
}

#[tokio::test]
#[serial]
async fn test_boot_pinned_wait() {
    let backend = RecordingBackend::new().with_max_vcpus(1);
    let handle = backend.handle();

    let task = boot_pinned(valid_params(), move || Ok(handle.boxed())).unwrap();

    let err = task.wait().await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        HyvekitError::VcpuLimitExceeded { requested: 2, max: 1 }
    ));
}
