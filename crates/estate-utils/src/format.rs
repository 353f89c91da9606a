//! Currency and number formatting

/// Round to a whole number and group thousands with commas
///
/// ```
/// assert_eq!(estate_utils::format_thousands(12_345_678.4), "12,345,678");
/// assert_eq!(estate_utils::format_thousands(-950.0), "-950");
/// ```
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Rupee amount with thousands separators, e.g. `₹12,000,000`
pub fn format_inr(value: f64) -> String {
    format!("₹{}", format_thousands(value))
}

/// Rupee amount in lakh/crore units, e.g. `₹1.20 Cr` or `₹36.00 L`
///
/// Amounts below one lakh fall back to [`format_inr`].
pub fn format_inr_compact(value: f64) -> String {
    const LAKH: f64 = 100_000.0;
    const CRORE: f64 = 10_000_000.0;

    let magnitude = value.abs();
    if magnitude >= CRORE {
        format!("₹{:.2} Cr", value / CRORE)
    } else if magnitude >= LAKH {
        format!("₹{:.2} L", value / LAKH)
    } else {
        format_inr(value)
    }
}
