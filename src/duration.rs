//! Time durations such as `"12s"`, `"3h30m"` or `"-1.5h"`.
//!
//! Durations are signed nanosecond counts. The text form is a sequence of
//! decimal numbers, each with an optional fraction and a unit suffix
//! (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`).

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    #[error("missing unit in duration \"{0}\"")]
    MissingUnit(String),

    #[error("unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit { unit: String, input: String },
}

const NANOSECOND: u64 = 1;
const MICROSECOND: u64 = 1_000 * NANOSECOND;
const MILLISECOND: u64 = 1_000 * MICROSECOND;
const SECOND: u64 = 1_000 * MILLISECOND;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

const UNITS: [(&str, u64); 8] = [
    ("ns", NANOSECOND),
    ("us", MICROSECOND),
    ("µs", MICROSECOND),
    ("μs", MICROSECOND),
    ("ms", MILLISECOND),
    ("s", SECOND),
    ("m", MINUTE),
    ("h", HOUR),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration {
    nanos: i64,
}

impl Duration {
    pub const ZERO: Duration = Duration { nanos: 0 };

    pub fn from_nanos(nanos: i64) -> Self {
        Duration { nanos }
    }

    pub fn as_nanos(&self) -> i64 {
        self.nanos
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn checked_add(self, other: Duration) -> Option<Duration> {
        self.nanos.checked_add(other.nanos).map(Duration::from_nanos)
    }

    pub fn checked_sub(self, other: Duration) -> Option<Duration> {
        self.nanos.checked_sub(other.nanos).map(Duration::from_nanos)
    }

    pub fn checked_neg(self) -> Option<Duration> {
        self.nanos.checked_neg().map(Duration::from_nanos)
    }

    /// Scale by a float, truncating toward zero.
    pub fn mul_f64(self, factor: f64) -> Option<Duration> {
        let nanos = self.nanos as f64 * factor;
        nanos_from_f64(nanos)
    }

    /// Divide by a float, truncating toward zero.
    pub fn div_f64(self, divisor: f64) -> Option<Duration> {
        let nanos = self.nanos as f64 / divisor;
        nanos_from_f64(nanos)
    }
}

fn nanos_from_f64(nanos: f64) -> Option<Duration> {
    if nanos.is_finite() && nanos >= i64::MIN as f64 && nanos <= i64::MAX as f64 {
        Some(Duration::from_nanos(nanos.trunc() as i64))
    } else {
        None
    }
}

impl From<chrono::TimeDelta> for Duration {
    fn from(delta: chrono::TimeDelta) -> Self {
        Duration::from_nanos(delta.num_nanoseconds().unwrap_or(if delta < chrono::TimeDelta::zero() {
            i64::MIN
        } else {
            i64::MAX
        }))
    }
}

impl From<Duration> for chrono::TimeDelta {
    fn from(d: Duration) -> Self {
        chrono::TimeDelta::nanoseconds(d.nanos)
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationError::Invalid(input.to_string());

        let (negative, mut rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        if rest == "0" {
            return Ok(Duration::ZERO);
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut total: u64 = 0;
        while !rest.is_empty() {
            let first = rest.as_bytes()[0];
            if !(first == b'.' || first.is_ascii_digit()) {
                return Err(invalid());
            }

            let whole_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            let (whole_digits, after) = rest.split_at(whole_len);
            let whole: u64 = if whole_digits.is_empty() {
                0
            } else {
                whole_digits.parse().map_err(|_| invalid())?
            };

            let (frac_digits, after) = match after.strip_prefix('.') {
                Some(after) => {
                    let len = after.bytes().take_while(u8::is_ascii_digit).count();
                    after.split_at(len)
                }
                None => ("", after),
            };
            if whole_digits.is_empty() && frac_digits.is_empty() {
                return Err(invalid());
            }

            let unit_len = after
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(after.len());
            let (unit, after) = after.split_at(unit_len);
            if unit.is_empty() {
                return Err(DurationError::MissingUnit(input.to_string()));
            }
            let scale = UNITS
                .iter()
                .find(|(name, _)| *name == unit)
                .map(|(_, scale)| *scale)
                .ok_or_else(|| DurationError::UnknownUnit {
                    unit: unit.to_string(),
                    input: input.to_string(),
                })?;

            let mut value = whole.checked_mul(scale).ok_or_else(invalid)?;
            if !frac_digits.is_empty() {
                // keep at most 18 digits, the rest cannot change the result
                let kept = &frac_digits[..frac_digits.len().min(18)];
                let frac: u64 = kept.parse().map_err(|_| invalid())?;
                let denom = 10f64.powi(kept.len() as i32);
                value = value
                    .checked_add((frac as f64 * (scale as f64 / denom)) as u64)
                    .ok_or_else(invalid)?;
            }
            total = total.checked_add(value).ok_or_else(invalid)?;
            rest = after;
        }

        if negative {
            if total > i64::MAX as u64 + 1 {
                return Err(invalid());
            }
            Ok(Duration::from_nanos(-(total as i128) as i64))
        } else {
            i64::try_from(total)
                .map(Duration::from_nanos)
                .map_err(|_| invalid())
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.nanos < 0;
        let mut u = self.nanos.unsigned_abs();
        let mut out = String::new();

        if u < SECOND {
            if u == 0 {
                return f.write_str("0s");
            }
            let (frac, whole, unit) = if u < MICROSECOND {
                (String::new(), u, "ns")
            } else if u < MILLISECOND {
                let (frac, whole) = split_fraction(u, 3);
                (frac, whole, "µs")
            } else {
                let (frac, whole) = split_fraction(u, 6);
                (frac, whole, "ms")
            };
            out.push_str(&whole.to_string());
            out.push_str(&frac);
            out.push_str(unit);
        } else {
            let (frac, secs) = split_fraction(u, 9);
            u = secs;
            let seconds = u % 60;
            u /= 60;
            let mut parts = format!("{}{}s", seconds, frac);
            if u > 0 {
                let minutes = u % 60;
                u /= 60;
                parts = format!("{}m{}", minutes, parts);
                if u > 0 {
                    parts = format!("{}h{}", u, parts);
                }
            }
            out.push_str(&parts);
        }

        if negative {
            f.write_str("-")?;
        }
        f.write_str(&out)
    }
}

/// Split off the lowest `digits` decimal digits of `v` as a fraction with
/// trailing zeros removed (`".5"`, or empty), returning it with the rest.
fn split_fraction(v: u64, digits: u32) -> (String, u64) {
    let base = 10u64.pow(digits);
    let frac = v % base;
    if frac == 0 {
        return (String::new(), v / base);
    }
    let text = format!("{:0width$}", frac, width = digits as usize);
    (format!(".{}", text.trim_end_matches('0')), v / base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Duration {
        s.parse().unwrap()
    }

    #[test]
    fn parses_units_and_combinations() {
        assert_eq!(d("12s").as_nanos(), 12 * SECOND as i64);
        assert_eq!(d("3h30m").as_nanos(), (3 * HOUR + 30 * MINUTE) as i64);
        assert_eq!(d("-1.5h").as_nanos(), -((HOUR + 30 * MINUTE) as i64));
        assert_eq!(d("100ms").as_nanos(), 100 * MILLISECOND as i64);
        assert_eq!(d("2us").as_nanos(), 2_000);
        assert_eq!(d("2µs").as_nanos(), 2_000);
        assert_eq!(d("0").as_nanos(), 0);
        assert_eq!(d(".5s").as_nanos(), 500 * MILLISECOND as i64);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!("12".parse::<Duration>(), Err(DurationError::MissingUnit(_))));
        assert!(matches!("12x".parse::<Duration>(), Err(DurationError::UnknownUnit { .. })));
        assert!("".parse::<Duration>().is_err());
        assert!("s".parse::<Duration>().is_err());
        assert!(".s".parse::<Duration>().is_err());
        assert!("12Ki".parse::<Duration>().is_err());
    }

    #[test]
    fn formats_like_the_canonical_form() {
        assert_eq!(d("25s").to_string(), "25s");
        assert_eq!(d("90m").to_string(), "1h30m0s");
        assert_eq!(d("1.5ms").to_string(), "1.5ms");
        assert_eq!(d("500us").to_string(), "500µs");
        assert_eq!(d("0s").to_string(), "0s");
        assert_eq!(d("-2m3.5s").to_string(), "-2m3.5s");
        assert_eq!(d("42ns").to_string(), "42ns");
    }
}
