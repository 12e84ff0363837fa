//! LPC device descriptors: `<device>[,<backend>]`.

use super::DescriptorError;
use std::fmt;
use std::str::FromStr;

/// Legacy devices that hang off the LPC bridge.
pub const LPC_DEVICES: &[&str] = &["com1", "com2", "bootrom"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpcDevice {
    pub device: String,
    /// Where the device is wired on the host (`stdio`, `autopty`, a path).
    pub backend: Option<String>,
}

fn is_device_name(name: &str) -> bool {
    LPC_DEVICES.iter().any(|d| d.eq_ignore_ascii_case(name))
}

impl FromStr for LpcDevice {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(DescriptorError::Empty);
        }

        let (device, backend) = match s.split_once(',') {
            Some((dev, backend)) => (dev, Some(backend)),
            None => (s, None),
        };

        if !is_device_name(device) {
            return Err(DescriptorError::UnknownDevice(device.to_string()));
        }
        if backend.is_some_and(str::is_empty) {
            return Err(DescriptorError::MissingBackend(device.to_string()));
        }

        Ok(LpcDevice {
            device: device.to_ascii_lowercase(),
            backend: backend.map(str::to_string),
        })
    }
}

impl fmt::Display for LpcDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            Some(ref backend) => write!(f, "{},{}", self.device, backend),
            None => f.write_str(&self.device),
        }
    }
}

/// Join device/backend pairs that arrive as separate entries.
///
/// `["com1", "stdio"]` becomes `["com1,stdio"]`. An entry is only joined
/// with its successor when it is a bare device name and the successor is a
/// bare word that is not itself a device name. Everything else passes
/// through untouched so the backend can reject it.
pub fn coalesce_lpc_entries(entries: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(entries.len());
    let mut iter = entries.iter().peekable();

    while let Some(entry) = iter.next() {
        let bare_device = !entry.contains(',') && is_device_name(entry);
        if bare_device
            && let Some(next) = iter.peek()
            && !next.is_empty()
            && !next.contains(',')
            && !is_device_name(next)
        {
            out.push(format!("{},{}", entry, next));
            iter.next();
            continue;
        }
        out.push(entry.clone());
    }

    out
}
