//! Boot image description.

use hyvekit_shared::errors::{HyvekitError, HyvekitResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const KEXEC: &str = "kexec";
const FBSD: &str = "fbsd";

/// How the guest gets its first instructions.
///
/// Serialized with a `kind` tag:
///
/// ```json
/// { "kind": "kernel", "kernel": "vmlinuz", "initrd": "initrd.gz", "cmdline": "console=ttyS0" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BootSpec {
    /// Direct kernel boot.
    Kernel {
        #[serde(default)]
        kernel: PathBuf,
        #[serde(default)]
        initrd: PathBuf,
        #[serde(default)]
        cmdline: String,
    },
    /// Boot through a userboot loader from a boot volume.
    Loader {
        #[serde(default)]
        loader: PathBuf,
        #[serde(default)]
        volume: PathBuf,
        #[serde(default)]
        env: String,
    },
}

impl Default for BootSpec {
    fn default() -> Self {
        BootSpec::Kernel {
            kernel: PathBuf::new(),
            initrd: PathBuf::new(),
            cmdline: String::new(),
        }
    }
}

fn path_field<'a>(name: &str, path: &'a Path, required: bool) -> Result<&'a str, String> {
    let s = path
        .to_str()
        .ok_or_else(|| format!("{} path is not valid UTF-8", name))?;
    if required && s.is_empty() {
        return Err(format!("{} path is missing", name));
    }
    if s.contains(',') {
        return Err(format!("{} path '{}' contains a comma", name, s));
    }
    Ok(s)
}

impl BootSpec {
    pub fn kernel(
        kernel: impl Into<PathBuf>,
        initrd: impl Into<PathBuf>,
        cmdline: impl Into<String>,
    ) -> Self {
        BootSpec::Kernel {
            kernel: kernel.into(),
            initrd: initrd.into(),
            cmdline: cmdline.into(),
        }
    }

    pub fn loader(
        loader: impl Into<PathBuf>,
        volume: impl Into<PathBuf>,
        env: impl Into<String>,
    ) -> Self {
        BootSpec::Loader {
            loader: loader.into(),
            volume: volume.into(),
            env: env.into(),
        }
    }

    /// Encode into the backend's firmware descriptor.
    ///
    /// Fails with a human-readable reason when the variant is inconsistent,
    /// e.g. a kernel boot without a kernel image.
    pub fn encode(&self) -> Result<String, String> {
        match self {
            BootSpec::Kernel {
                kernel,
                initrd,
                cmdline,
            } => {
                let kernel = path_field("kernel", kernel, true)?;
                let initrd = path_field("initrd", initrd, false)?;
                Ok(format!("{KEXEC},{kernel},{initrd},{cmdline}"))
            }
            BootSpec::Loader {
                loader,
                volume,
                env,
            } => {
                let loader = path_field("loader", loader, true)?;
                let volume = path_field("boot volume", volume, true)?;
                Ok(format!("{FBSD},{loader},{volume},{env}"))
            }
        }
    }

    /// Files that must be readable for this boot to proceed.
    pub fn required_files(&self) -> Vec<&Path> {
        match self {
            BootSpec::Kernel { kernel, initrd, .. } => {
                let mut files = vec![kernel.as_path()];
                if !initrd.as_os_str().is_empty() {
                    files.push(initrd.as_path());
                }
                files
            }
            BootSpec::Loader { loader, volume, .. } => vec![loader.as_path(), volume.as_path()],
        }
    }
}

impl FromStr for BootSpec {
    type Err = HyvekitError;

    /// Parse `kexec,<kernel>,<initrd>,<cmdline>` or `fbsd,<loader>,<volume>,<env>`.
    ///
    /// The trailing field keeps any further commas and may be wrapped in
    /// double quotes.
    fn from_str(s: &str) -> HyvekitResult<Self> {
        let mut parts = s.splitn(4, ',');
        let kind = parts.next().unwrap_or_default();
        let first = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();
        let rest = rest
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .unwrap_or(rest);

        match kind {
            KEXEC => Ok(BootSpec::kernel(first, second, rest)),
            FBSD => Ok(BootSpec::loader(first, second, rest)),
            other => Err(HyvekitError::Config(format!(
                "unknown boot kind '{}' (expected '{}' or '{}')",
                other, KEXEC, FBSD
            ))),
        }
    }
}

impl fmt::Display for BootSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootSpec::Kernel {
                kernel,
                initrd,
                cmdline,
            } => write!(
                f,
                "{KEXEC},{},{},{}",
                kernel.display(),
                initrd.display(),
                cmdline
            ),
            BootSpec::Loader {
                loader,
                volume,
                env,
            } => write!(f, "{FBSD},{},{},{}", loader.display(), volume.display(), env),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_kernel() {
        let spec = BootSpec::kernel("/boot/vmlinuz", "/boot/initrd.gz", "console=ttyS0 acpi=off");
        assert_eq!(
            spec.encode().unwrap(),
            "kexec,/boot/vmlinuz,/boot/initrd.gz,console=ttyS0 acpi=off"
        );
    }

    #[test]
    fn test_encode_rejects_missing_kernel() {
        let err = BootSpec::default().encode().unwrap_err();
        assert!(err.contains("kernel path is missing"));
    }

    #[test]
    fn test_encode_rejects_comma_in_path() {
        let spec = BootSpec::loader("/boot/userboot.so", "/disks/a,b.img", "");
        assert!(spec.encode().unwrap_err().contains("comma"));
    }

    #[test]
    fn test_parse_quoted_cmdline() {
        let spec: BootSpec = "kexec,vmlinuz,initrd.gz,\"earlyprintk=serial console=ttyS0,115200\""
            .parse()
            .unwrap();
        assert_eq!(
            spec,
            BootSpec::kernel("vmlinuz", "initrd.gz", "earlyprintk=serial console=ttyS0,115200")
        );
    }

    #[test]
    fn test_parse_loader_and_unknown_kind() {
        let spec: BootSpec = "fbsd,userboot.so,disk.img,".parse().unwrap();
        assert_eq!(spec.required_files().len(), 2);
        assert!("uefi,fw.bin".parse::<BootSpec>().is_err());
    }

    #[test]
    fn test_required_files_skip_empty_initrd() {
        let spec = BootSpec::kernel("vmlinuz", "", "");
        assert_eq!(spec.required_files(), vec![Path::new("vmlinuz")]);
    }

    #[test]
    fn test_json_tagging() {
        let spec: BootSpec =
            serde_json::from_str(r#"{"kind":"loader","loader":"u.so","volume":"d.img"}"#).unwrap();
        assert_eq!(spec, BootSpec::loader("u.so", "d.img", ""));
    }
}
