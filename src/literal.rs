//! Numeric literal grammars
//!
//! Time intervals, memory sizes and booleans as they appear in config files,
//! commandline flags, input-file directives and queuing system arguments.
//!
//! Time: `[[[days:]hours:]minutes:]seconds` or `integer[suffix]` with suffix one of
//! `s, m, h, d, w, y` (case-insensitive). Bare integers are seconds.
//!
//! Size: `number[suffix]` with suffix one of `b`, `k/kb/kib`, `m/mb/mib`,
//! `g/gb/gib`, `t/tb/tib` (case-insensitive, 1024-based). Bare numbers are bytes.

use crate::error::{LiteralError, LiteralKind};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const YEAR: u64 = 365 * DAY;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// Split a literal into its leading digit run and the remaining suffix.
fn split_number(raw: &str, allow_fraction: bool) -> (&str, &str) {
    let end = raw
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || (allow_fraction && *c == '.')))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw.split_at(end)
}

fn parse_integer(kind: LiteralKind, raw: &str, digits: &str) -> Result<u64, LiteralError> {
    digits
        .parse::<u64>()
        .map_err(|_| LiteralError::new(kind, raw, "expected an integer"))
}

fn scale(kind: LiteralKind, raw: &str, value: u64, factor: u64) -> Result<u64, LiteralError> {
    value
        .checked_mul(factor)
        .ok_or_else(|| LiteralError::new(kind, raw, "value out of range"))
}

/// Interpret a time interval literal and return the number of seconds.
pub fn parse_time(raw: &str) -> Result<u64, LiteralError> {
    let s = raw.trim();
    if s.contains(':') {
        return parse_colon_time(raw, s);
    }

    let (digits, unit) = split_number(s, false);
    if digits.is_empty() {
        return Err(LiteralError::new(
            LiteralKind::Time,
            raw,
            "expected integer before time suffix",
        ));
    }
    let n = parse_integer(LiteralKind::Time, raw, digits)?;

    let factor = match unit.to_ascii_lowercase().as_str() {
        "" | "s" => 1,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        "y" => YEAR,
        _ => {
            return Err(LiteralError::new(
                LiteralKind::Time,
                raw,
                "expected one of s,m,h,d,w,y as time suffix",
            ))
        }
    };
    scale(LiteralKind::Time, raw, n, factor)
}

fn parse_colon_time(raw: &str, s: &str) -> Result<u64, LiteralError> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 4 {
        return Err(LiteralError::new(
            LiteralKind::Time,
            raw,
            "expected at most [[[days:]hours:]minutes:]seconds",
        ));
    }

    // seconds, minutes, hours, days from the right
    let factors = [1, MINUTE, HOUR, DAY];
    let mut total: u64 = 0;
    for (part, factor) in parts.iter().rev().zip(factors) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LiteralError::new(
                LiteralKind::Time,
                raw,
                format!("component \"{}\" is not an integer", part),
            ));
        }
        let n = parse_integer(LiteralKind::Time, raw, part)?;
        let secs = scale(LiteralKind::Time, raw, n, factor)?;
        total = total
            .checked_add(secs)
            .ok_or_else(|| LiteralError::new(LiteralKind::Time, raw, "value out of range"))?;
    }
    Ok(total)
}

fn size_factor(unit: &str, word_bytes: Option<u64>) -> Option<u64> {
    let factor = match unit {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => GIB,
        "t" | "tb" | "tib" => TIB,
        _ => {
            let word = word_bytes?;
            let prefix = match unit {
                "w" => 1,
                "kw" => KIB,
                "mw" => MIB,
                "gw" => GIB,
                "tw" => TIB,
                _ => return None,
            };
            return prefix.checked_mul(word);
        }
    };
    Some(factor)
}

fn parse_size_impl(raw: &str, word_bytes: Option<u64>) -> Result<u64, LiteralError> {
    let s = raw.trim();
    let (number, unit) = split_number(s, true);
    if number.is_empty() || number == "." {
        return Err(LiteralError::new(
            LiteralKind::Size,
            raw,
            "expected integer before size suffix",
        ));
    }

    let unit = unit.to_ascii_lowercase();
    let factor = size_factor(&unit, word_bytes).ok_or_else(|| {
        let expected = if word_bytes.is_some() {
            "expected one of b,kb,kib,...,tb,tib or w,kw,mw,gw,tw as size suffix"
        } else {
            "expected one of b,kb,kib, ... tb, tib as size suffix"
        };
        LiteralError::new(LiteralKind::Size, raw, expected)
    })?;

    if number.contains('.') {
        let value: f64 = number
            .parse()
            .map_err(|_| LiteralError::new(LiteralKind::Size, raw, "expected a number"))?;
        let bytes = value * factor as f64;
        if !bytes.is_finite() || bytes >= u64::MAX as f64 {
            return Err(LiteralError::new(LiteralKind::Size, raw, "value out of range"));
        }
        return Ok(bytes as u64);
    }

    let n = parse_integer(LiteralKind::Size, raw, number)?;
    scale(LiteralKind::Size, raw, n, factor)
}

/// Interpret a size literal and return the number of bytes.
pub fn parse_size(raw: &str) -> Result<u64, LiteralError> {
    parse_size_impl(raw, None)
}

/// Like [`parse_size`], but additionally accepts the word suffixes
/// `w, kw, mw, gw, tw` using `word_bytes` bytes per word.
pub fn parse_size_with_words(raw: &str, word_bytes: u64) -> Result<u64, LiteralError> {
    parse_size_impl(raw, Some(word_bytes))
}

/// Interpret `true|false|1|0` (case-insensitive).
pub fn parse_bool(raw: &str) -> Result<bool, LiteralError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(LiteralError::new(
            LiteralKind::Bool,
            raw,
            "expected: true|false|0|1",
        )),
    }
}
