//! Poll interval parsing
//!
//! Accepts the duration strings Prometheus operators already use: a sequence
//! of decimal numbers each followed by a unit, e.g. `300ms`, `1.5s`, `2h45m`.
//! Supported units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare
//! `0` is allowed; any other number needs a unit.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

const MAX_FRACTION_DIGITS: usize = 18;

pub fn parse_interval(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty duration");
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.starts_with('-') {
        bail!("negative duration: {input}");
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = s;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len =
            rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            bail!("invalid duration: {input}");
        }

        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            bail!("missing unit in duration: {input}");
        }
        let scale =
            unit_nanos(unit).ok_or_else(|| anyhow!("unknown unit '{unit}' in duration: {input}"))?;

        total = total
            .checked_add(scaled_nanos(number, scale, input)?)
            .ok_or_else(|| anyhow!("duration out of range: {input}"))?;
        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| anyhow!("duration out of range: {input}"))?;
    Ok(Duration::from_nanos(nanos))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

fn scaled_nanos(number: &str, scale: u128, input: &str) -> Result<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if fraction.contains('.') {
        bail!("invalid duration: {input}");
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| anyhow!("invalid duration: {input}"))?
    };
    let mut nanos =
        whole.checked_mul(scale).ok_or_else(|| anyhow!("duration out of range: {input}"))?;

    // Digits past nanosecond precision cannot change the result.
    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let digits: u128 = fraction.parse().map_err(|_| anyhow!("invalid duration: {input}"))?;
        let divisor = 10u128.pow(fraction.len() as u32);
        nanos += digits * scale / divisor;
    }
    Ok(nanos)
}
