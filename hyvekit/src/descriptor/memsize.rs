//! Memory size expressions: `<number>[K|M|G|T][B]`, bare numbers are MiB.

use super::DescriptorError;

pub const MIB: u64 = 1024 * 1024;

/// Parse a memory size expression into bytes.
pub fn parse_memsize(spec: &str) -> Result<u64, DescriptorError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(DescriptorError::Empty);
    }

    let split = spec
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(spec.len());
    let (digits, suffix) = spec.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| DescriptorError::InvalidNumber {
            field: "memory size",
            value: spec.to_string(),
        })?;

    let unit = match suffix.to_ascii_lowercase().as_str() {
        "" | "m" | "mb" => MIB,
        "k" | "kb" => 1024,
        "g" | "gb" => 1024 * MIB,
        "t" | "tb" => 1024 * 1024 * MIB,
        _ => return Err(DescriptorError::InvalidSuffix(suffix.to_string())),
    };

    value.checked_mul(unit).ok_or(DescriptorError::Overflow)
}
