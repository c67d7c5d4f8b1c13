use std::cmp::Ordering;
use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For INR/EUR/USD, 1 unit = 100 cents, so ₹50.00 = 5000 cents.
pub type Cents = i64;

/// Largest amount a single expense may carry: one trillion currency units.
pub const MAX_AMOUNT_CENTS: Cents = 100_000_000_000_000;

/// Format cents as a plain decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Format cents with a currency symbol and thousands separators.
/// Example: (123456789, "₹") -> "₹1,234,567.89"
pub fn format_amount(cents: Cents, symbol: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!(
        "{}{}{}.{:02}",
        sign,
        symbol,
        group_thousands(abs_cents / 100),
        abs_cents % 100
    )
}

/// Round cents to whole currency units, ties to even.
/// Example: 12350 -> 124, 12250 -> 122, 12349 -> 123
pub fn round_to_units(cents: Cents) -> i64 {
    let units = cents / 100;
    let remainder = (cents % 100).abs();
    let away = if cents < 0 { units - 1 } else { units + 1 };
    match remainder.cmp(&50) {
        Ordering::Less => units,
        Ordering::Greater => away,
        Ordering::Equal if units % 2 == 0 => units,
        Ordering::Equal => away,
    }
}

fn group_thousands(units: u64) -> String {
    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Add amounts, clamping at the `Cents` bounds instead of wrapping.
pub fn sum_cents<I: IntoIterator<Item = Cents>>(amounts: I) -> Cents {
    amounts.into_iter().fold(0, Cents::saturating_add)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000, "1,250" -> 125000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input: String = input
        .trim_start_matches('-')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    let (units_str, decimal_str) = match input.split_once('.') {
        Some((units, decimal)) => (units, decimal),
        None => (input.as_str(), ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimal_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::OutOfRange)?
    };

    // Pad or truncate the fraction to 2 digits
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str[..1].parse::<i64>().unwrap_or(0) * 10,
        _ => decimal_str[..2].parse().unwrap_or(0),
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}
