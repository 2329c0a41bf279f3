use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A signed amount in cents. Positive is income/credit, negative is
/// spending/debit. Integer cents keep dedup identity and summary totals
/// exact, which floating point amounts cannot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Cents(pub(crate) i64);

impl Cents {
    pub(crate) const ZERO: Cents = Cents(0);

    pub(crate) fn is_income(&self) -> bool {
        self.0 > 0
    }

    pub(crate) fn is_expense(&self) -> bool {
        self.0 < 0
    }

    pub(crate) fn abs(&self) -> Cents {
        Cents(self.0.abs())
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Parse a decorated decimal amount into cents. Accepts a currency symbol,
/// thousands separators and a leading sign; fraction digits beyond two
/// round half away from zero.
pub(crate) fn parse_cents(raw: &str) -> Option<Cents> {
    let cleaned = raw.trim().replace(['$', ','], "");
    if cleaned.is_empty() {
        return None;
    }

    let (sign, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, cleaned.strip_prefix('+').unwrap_or(cleaned.as_str())),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut cents = whole.checked_mul(100)?;

    let mut fraction_digits = fraction.chars().map(|c| c as i64 - '0' as i64);
    cents += fraction_digits.next().unwrap_or(0) * 10;
    cents += fraction_digits.next().unwrap_or(0);
    if fraction_digits.next().map_or(false, |d| d >= 5) {
        cents += 1;
    }

    Some(Cents(sign * cents))
}
