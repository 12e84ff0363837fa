//! PCI slot descriptors: `[<bus>:]<slot>[:<func>],<emulation>[,<options>]`.

use super::DescriptorError;
use std::fmt;
use std::str::FromStr;

pub const MAX_BUS: u64 = 255;
pub const MAX_SLOT: u64 = 31;
pub const MAX_FUNCTION: u64 = 7;

/// Device models the backend can attach to a PCI slot.
pub const KNOWN_EMULATIONS: &[&str] = &[
    "hostbridge",
    "amd_hostbridge",
    "lpc",
    "virtio-net",
    "virtio-tap",
    "virtio-vpnkit",
    "virtio-blk",
    "virtio-rnd",
    "virtio-9p",
    "virtio-sock",
    "ahci-hd",
    "ahci-cd",
    "uart",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciSlot {
    pub bus: u8,
    pub slot: u8,
    pub function: u8,
    pub emulation: String,
    pub options: Option<String>,
}

impl PciSlot {
    /// Bus/slot/function triple, used to detect double assignment.
    pub fn location(&self) -> (u8, u8, u8) {
        (self.bus, self.slot, self.function)
    }
}

fn parse_field(field: &'static str, value: &str, max: u64) -> Result<u8, DescriptorError> {
    let parsed: u64 = value
        .trim()
        .parse()
        .map_err(|_| DescriptorError::InvalidNumber {
            field,
            value: value.to_string(),
        })?;
    if parsed > max {
        return Err(DescriptorError::OutOfRange {
            field,
            value: parsed,
            max,
        });
    }
    Ok(parsed as u8)
}

impl FromStr for PciSlot {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(DescriptorError::Empty);
        }

        let (location, rest) = s.split_once(',').ok_or(DescriptorError::MissingEmulation)?;
        let (emulation, options) = match rest.split_once(',') {
            Some((emu, opts)) => (emu, Some(opts.to_string())),
            None => (rest, None),
        };

        let parts: Vec<&str> = location.split(':').collect();
        let (bus, slot, function) = match parts.as_slice() {
            [slot] => (0, parse_field("slot", slot, MAX_SLOT)?, 0),
            [slot, func] => (
                0,
                parse_field("slot", slot, MAX_SLOT)?,
                parse_field("function", func, MAX_FUNCTION)?,
            ),
            [bus, slot, func] => (
                parse_field("bus", bus, MAX_BUS)?,
                parse_field("slot", slot, MAX_SLOT)?,
                parse_field("function", func, MAX_FUNCTION)?,
            ),
            _ => {
                return Err(DescriptorError::InvalidNumber {
                    field: "slot",
                    value: location.to_string(),
                });
            }
        };

        if emulation.is_empty() {
            return Err(DescriptorError::MissingEmulation);
        }
        if !KNOWN_EMULATIONS.contains(&emulation) {
            return Err(DescriptorError::UnknownEmulation(emulation.to_string()));
        }

        Ok(PciSlot {
            bus,
            slot,
            function,
            emulation: emulation.to_string(),
            options,
        })
    }
}

impl fmt::Display for PciSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{},{}",
            self.bus, self.slot, self.function, self.emulation
        )?;
        if let Some(ref options) = self.options {
            write!(f, ",{}", options)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_topology() {
        let net: PciSlot = "2:0,virtio-net".parse().unwrap();
        assert_eq!(net.location(), (0, 2, 0));
        assert_eq!(net.emulation, "virtio-net");

        let lpc: PciSlot = "31,lpc".parse().unwrap();
        assert_eq!(lpc.location(), (0, 31, 0));
        assert_eq!(lpc.options, None);
    }

    #[test]
    fn test_parse_with_bus_and_options() {
        let blk: PciSlot = "1:4:2,virtio-blk,/tmp/disk.img,ro".parse().unwrap();
        assert_eq!(blk.location(), (1, 4, 2));
        assert_eq!(blk.options.as_deref(), Some("/tmp/disk.img,ro"));
        assert_eq!(blk.to_string(), "1:4:2,virtio-blk,/tmp/disk.img,ro");
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!("".parse::<PciSlot>(), Err(DescriptorError::Empty));
        assert_eq!(
            "3".parse::<PciSlot>(),
            Err(DescriptorError::MissingEmulation)
        );
        assert!(matches!(
            "32,lpc".parse::<PciSlot>(),
            Err(DescriptorError::OutOfRange { field: "slot", .. })
        ));
        assert!(matches!(
            "2:8,virtio-net".parse::<PciSlot>(),
            Err(DescriptorError::OutOfRange {
                field: "function",
                ..
            })
        ));
        assert!(matches!(
            "x,lpc".parse::<PciSlot>(),
            Err(DescriptorError::InvalidNumber { .. })
        ));
        assert_eq!(
            "2:0,floppy".parse::<PciSlot>(),
            Err(DescriptorError::UnknownEmulation("floppy".into()))
        );
    }
}
