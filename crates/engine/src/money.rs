use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::EngineError;

/// Signed money amount represented as **whole rupiah** (`i64`).
///
/// Use this type for **all** monetary values in the engine (balances, budget
/// figures, expense amounts) to avoid floating-point drift. Rupiah carries no
/// fractional unit in this system.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(1_500_000);
/// assert_eq!(amount.rupiah(), 1_500_000);
/// assert_eq!(amount.to_string(), "Rp1.500.000");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from whole rupiah.
    #[must_use]
    pub const fn new(rupiah: i64) -> Self {
        Self(rupiah)
    }

    /// Returns the raw value in rupiah.
    #[must_use]
    pub const fn rupiah(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Clamps negative amounts to zero.
    #[must_use]
    pub const fn clamp_zero(self) -> Money {
        if self.0 < 0 { Money(0) } else { self }
    }

    /// Divides by `divisor` rounding half away from zero at the unit level.
    ///
    /// Used for the daily-budget figure (`Kebutuhan / days in month`).
    /// `divisor` must be > 0; callers pass a day count.
    ///
    /// ```rust
    /// use engine::Money;
    ///
    /// assert_eq!(Money::new(100_000).div_round_half_up(31).rupiah(), 3_226);
    /// assert_eq!(Money::new(5).div_round_half_up(2).rupiah(), 3);
    /// ```
    #[must_use]
    pub fn div_round_half_up(self, divisor: i64) -> Money {
        debug_assert!(divisor > 0);
        if self.0 >= 0 {
            Money((self.0 + divisor / 2) / divisor)
        } else {
            Money(-((-self.0 + divisor / 2) / divisor))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        // Group thousands with dots, Indonesian style.
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        let offset = digits.len() % 3;
        for (i, c) in digits.chars().enumerate() {
            if i != 0 && (i + 3 - offset) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        write!(f, "{sign}Rp{grouped}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a whole-rupiah string, accepting optional `.` thousand
    /// separators and an optional leading `+`/`-`.
    ///
    /// Rejects empty strings, fractional amounts and stray characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let digits: String = rest.replace('.', "");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: i64 = digits.parse().map_err(|_| overflow())?;
        value.checked_mul(sign).map(Money).ok_or_else(overflow)
    }
}
