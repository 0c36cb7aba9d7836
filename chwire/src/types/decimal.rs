use std::{fmt, str::FromStr};

/// Fixed point number, `mantissa * 10^-scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

/// Largest supported precision and scale.
pub const MAX_PRECISION: u8 = 38;

pub(crate) fn pow10(exp: u8) -> Option<i128> {
    10i128.checked_pow(exp.into())
}

impl Decimal {
    pub const fn new(mantissa: i128, scale: u8) -> Self {
        Self { mantissa, scale }
    }

    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub const fn scale(&self) -> u8 {
        self.scale
    }

    /// Number of decimal digits in the mantissa.
    pub fn digits(&self) -> u8 {
        let mut n = self.mantissa.unsigned_abs();
        let mut digits = 1;
        while n >= 10 {
            n /= 10;
            digits += 1;
        }
        digits
    }

    /// Change the scale, fails if digits would be lost or mantissa overflows.
    pub fn rescale(self, scale: u8) -> Option<Decimal> {
        use std::cmp::Ordering::*;
        let mantissa = match scale.cmp(&self.scale) {
            Equal => self.mantissa,
            Greater => self.mantissa.checked_mul(pow10(scale - self.scale)?)?,
            Less => {
                let div = pow10(self.scale - scale)?;
                if self.mantissa % div != 0 {
                    return None;
                }
                self.mantissa / div
            },
        };
        Some(Decimal { mantissa, scale })
    }

    /// Round a float to the given scale.
    pub fn from_f64(value: f64, scale: u8) -> Option<Decimal> {
        let scaled = (value * pow10(scale)? as f64).round();
        // `as` saturates, reject instead
        if !scaled.is_finite() || scaled.abs() >= i128::MAX as f64 {
            return None;
        }
        Some(Decimal { mantissa: scaled as i128, scale })
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale.into())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = usize::from(self.scale);
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        } else {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        }
    }
}

/// Error when parsing [`Decimal`] from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError;

impl std::error::Error for ParseDecimalError { }

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid decimal literal")
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Parse `[+-]digits[.digits]`, scale is the number of fraction digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, s) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int, frac) = s.split_once('.').unwrap_or((s, ""));
        if int.is_empty() && frac.is_empty() {
            return Err(ParseDecimalError);
        }

        let scale = u8::try_from(frac.len()).map_err(|_| ParseDecimalError)?;
        if scale > MAX_PRECISION {
            return Err(ParseDecimalError);
        }

        let mut mantissa = 0i128;
        for b in int.bytes().chain(frac.bytes()) {
            if !b.is_ascii_digit() {
                return Err(ParseDecimalError);
            }
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add((b - b'0').into()))
                .ok_or(ParseDecimalError)?;
        }

        Ok(Decimal { mantissa: if negative { -mantissa } else { mantissa }, scale })
    }
}
