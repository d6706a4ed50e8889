//! Resource quantities such as `"12Ki"`, `"500m"` or `"1e3"`.
//!
//! A quantity is a signed decimal number of base units plus the notation it
//! was written in. Arithmetic results are rendered back in the notation of
//! the left operand, using the shortest exact suffix.

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use thiserror::Error;

/// Notation a quantity is written and rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Powers of 1024: `Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`
    BinarySI,
    /// Powers of 1000: `n`, `u`, `m`, `k`, `M`, `G`, `T`, `P`, `E`
    DecimalSI,
    /// Scientific notation: `1e3`, `5E-2`
    DecimalExponent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantities must match the regular expression '^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$'")]
    Syntax,

    #[error("quantity is out of range")]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    value: Decimal,
    format: Format,
}

const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ki", 10),
    ("Mi", 20),
    ("Gi", 30),
    ("Ti", 40),
    ("Pi", 50),
    ("Ei", 60),
];

const DECIMAL_SUFFIXES: [(&str, i32); 9] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

impl Quantity {
    pub fn new(value: Decimal, format: Format) -> Self {
        Quantity { value, format }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// True when the value holds a whole number of base units.
    pub fn is_integral(&self) -> bool {
        self.value.fract().is_zero()
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.value.to_f64()
    }

    /// Same notation, different value.
    pub fn with_value(&self, value: Decimal) -> Self {
        Quantity {
            value,
            format: self.format,
        }
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_len);
        let mut value = parse_number(number)?;
        if negative {
            value.set_sign_negative(true);
        }

        let (multiplier, format) = parse_suffix(suffix)?;
        let value = value
            .checked_mul(multiplier)
            .ok_or(QuantityError::OutOfRange)?;

        Ok(Quantity { value, format })
    }
}

fn parse_number(number: &str) -> Result<Decimal, QuantityError> {
    let (whole, frac) = match number.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (number, ""),
    };
    if whole.is_empty() && frac.is_empty() || frac.contains('.') {
        return Err(QuantityError::Syntax);
    }

    let digits = format!("{}{}", whole, frac);
    let digits = digits.trim_start_matches('0');
    let mantissa: i128 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| QuantityError::OutOfRange)?
    };
    Decimal::try_from_i128_with_scale(mantissa, frac.len() as u32)
        .map_err(|_| QuantityError::OutOfRange)
}

fn parse_suffix(suffix: &str) -> Result<(Decimal, Format), QuantityError> {
    if suffix.is_empty() {
        return Ok((Decimal::ONE, Format::DecimalSI));
    }
    if let Some((_, shift)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Ok((Decimal::from(1u64 << shift), Format::BinarySI));
    }
    if let Some((_, exp)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        let multiplier = pow10(*exp).ok_or(QuantityError::OutOfRange)?;
        return Ok((multiplier, Format::DecimalSI));
    }
    if let Some(exp) = suffix.strip_prefix(['e', 'E']) {
        let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(QuantityError::Syntax);
        }
        let exp: i32 = exp.parse().map_err(|_| QuantityError::OutOfRange)?;
        let multiplier = pow10(exp).ok_or(QuantityError::OutOfRange)?;
        return Ok((multiplier, Format::DecimalExponent));
    }
    Err(QuantityError::Syntax)
}

fn pow10(exp: i32) -> Option<Decimal> {
    if exp >= 0 {
        let power = 10i128.checked_pow(exp as u32)?;
        Decimal::try_from_i128_with_scale(power, 0).ok()
    } else if exp >= -28 {
        Some(Decimal::new(1, exp.unsigned_abs()))
    } else {
        None
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_zero() {
            return f.write_str("0");
        }
        if self.value.is_sign_negative() {
            f.write_str("-")?;
        }
        let magnitude = self.value.abs();

        if self.format == Format::BinarySI && magnitude.fract().is_zero() {
            if let Some((mantissa, suffix)) = binary_parts(magnitude) {
                return write!(f, "{}{}", mantissa, suffix);
            }
        }

        match decimal_parts(magnitude) {
            Some((mantissa, exp)) => {
                let mantissa = mantissa.normalize();
                match self.format {
                    Format::DecimalExponent if exp != 0 => write!(f, "{}e{}", mantissa, exp),
                    Format::DecimalExponent => write!(f, "{}", mantissa),
                    Format::BinarySI | Format::DecimalSI => {
                        let suffix = DECIMAL_SUFFIXES
                            .iter()
                            .find(|(_, e)| *e == exp)
                            .map(|(s, _)| *s)
                            .unwrap_or("");
                        write!(f, "{}{}", mantissa, suffix)
                    }
                }
            }
            None => write!(f, "{}", magnitude.normalize()),
        }
    }
}

/// Largest binary suffix that divides an integral magnitude exactly.
fn binary_parts(magnitude: Decimal) -> Option<(Decimal, &'static str)> {
    let units = magnitude.to_u64()?;
    BINARY_SUFFIXES
        .iter()
        .rev()
        .find(|(_, shift)| units >= 1u64 << shift && units % (1u64 << shift) == 0)
        .map(|(suffix, shift)| (Decimal::from(units >> shift), *suffix))
        .or(Some((magnitude.normalize(), "")))
}

/// Split a positive magnitude into an integral mantissa and a power-of-ten
/// exponent that is a multiple of three between -9 and 18. Digits below
/// nano are rounded up.
fn decimal_parts(magnitude: Decimal) -> Option<(Decimal, i32)> {
    let magnitude = if magnitude.normalize().scale() > 9 {
        magnitude.round_dp_with_strategy(9, RoundingStrategy::AwayFromZero)
    } else {
        magnitude
    }
    .normalize();

    let scale = magnitude.scale() as i32;
    let mut exp = -((scale + 2) / 3 * 3);
    let mut mantissa = magnitude.checked_mul(pow10(-exp)?)?;
    let thousand = Decimal::from(1000);
    while exp < 18 && !mantissa.is_zero() && (mantissa % thousand).is_zero() {
        mantissa /= thousand;
        exp += 3;
    }
    Some((mantissa, exp))
}
