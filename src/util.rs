// Utility helpers for parsing and basic numerics.
//
// All of the forgiving CSV cell handling lives here so the loader can stay
// a straight-line validation pass.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like cell into `f64` while being forgiving about
/// formatting noise that is common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Strict `YYYYMMDD` date parsing: exactly eight digits, nothing else.
pub fn parse_date_yyyymmdd(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice so callers never see NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// `n` evenly spaced points from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Ratio guarded against a zero or non-finite denominator.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let r = numerator / denominator;
    r.is_finite().then_some(r)
}

pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // `num-format` inserts the commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Share in `[0, 1]` rendered as a percentage, e.g. `0.8` -> `80.00%`.
pub fn format_pct(share: f64) -> String {
    format!("{}%", format_number(share * 100.0, 2))
}

pub fn format_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|n| format_number(n, decimals)).unwrap_or_default()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn dates_must_be_eight_digits() {
        assert_eq!(
            parse_date_yyyymmdd(Some("20240131")),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        assert_eq!(parse_date_yyyymmdd(Some("2024-01-31")), None);
        assert_eq!(parse_date_yyyymmdd(Some("20240231")), None);
        assert_eq!(parse_date_yyyymmdd(Some("2024131")), None);
    }

    #[test]
    fn linspace_hits_both_ends() {
        let xs = linspace(8.0, 24.0, 100);
        assert_eq!(xs.len(), 100);
        assert_eq!(xs[0], 8.0);
        assert_eq!(xs[99], 24.0);
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(linspace(3.0, 5.0, 1), vec![3.0]);
    }

    #[test]
    fn ratio_guards_zero() {
        assert_eq!(safe_ratio(1.0, 0.0), None);
        assert_eq!(safe_ratio(1.0, 4.0), Some(0.25));
    }

    #[test]
    fn formats_with_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_pct(0.8), "80.00%");
        assert_eq!(format_opt(None, 2), "");
    }
}
