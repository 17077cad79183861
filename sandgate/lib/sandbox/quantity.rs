//! Resource quantity parsing for CPU and memory strings.

use crate::{SandgateError, SandgateResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Parses a CPU quantity into millicores.
///
/// Accepts millicore form (`100m`, `1000m`), whole cores (`2`) and fractional
/// cores (`0.5`).
pub fn parse_cpu_millis(value: &str) -> SandgateResult<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SandgateError::validation("cpu quantity is empty"));
    }

    if let Some(millis) = value.strip_suffix('m') {
        return millis.parse::<u64>().map_err(|_| bad_cpu(value));
    }

    if !is_decimal(value) {
        return Err(bad_cpu(value));
    }

    let cores: f64 = value.parse().map_err(|_| bad_cpu(value))?;
    Ok((cores * 1000.0).round() as u64)
}

/// Parses a memory quantity into bytes.
///
/// Accepts a plain byte count or an integer with a `Ki`/`Mi`/`Gi`/`Ti`
/// (binary) or `K`/`M`/`G`/`T` (decimal) suffix, e.g. `128Mi` or `1G`.
pub fn parse_memory_bytes(value: &str) -> SandgateResult<u64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, suffix) = value.split_at(split);

    if digits.is_empty() {
        return Err(bad_memory(value));
    }
    let base: u64 = digits.parse().map_err(|_| bad_memory(value))?;

    let multiplier: u64 = match suffix {
        "" => 1,
        "Ki" => 1 << 10,
        "Mi" => 1 << 20,
        "Gi" => 1 << 30,
        "Ti" => 1 << 40,
        "K" => 1_000,
        "M" => 1_000_000,
        "G" => 1_000_000_000,
        "T" => 1_000_000_000_000,
        _ => return Err(bad_memory(value)),
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| SandgateError::validation(format!("memory quantity overflows: {value}")))
}

fn is_decimal(value: &str) -> bool {
    let mut seen_dot = false;
    for (i, c) in value.chars().enumerate() {
        match c {
            '.' => {
                if seen_dot || i == 0 || i == value.len() - 1 {
                    return false;
                }
                seen_dot = true;
            }
            c if c.is_ascii_digit() => {}
            _ => return false,
        }
    }
    true
}

fn bad_cpu(value: &str) -> SandgateError {
    SandgateError::validation(format!(
        "invalid cpu quantity {value:?}, expected forms like \"100m\" or \"2\""
    ))
}

fn bad_memory(value: &str) -> SandgateError {
    SandgateError::validation(format!(
        "invalid memory quantity {value:?}, expected forms like \"128Mi\" or \"1G\""
    ))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
