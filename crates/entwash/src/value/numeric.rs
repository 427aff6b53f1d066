//! Numeric-string scanning shared by both string representations
//!
//! Two families of functions live here:
//!
//! - the *prefix scans* (`parse_long_prefix`, `parse_double_prefix`) used by
//!   `to_long`/`to_double`, which read the longest numeric prefix and never fail;
//! - the *whole-string* classifier (`numeric_kind`) used by comparisons, which
//!   only accepts strings that are numeric from start to end.

/// Result of classifying a byte string as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer that fits in `i64`
    Long(i64),
    /// Anything else numeric
    Double(f64),
}

impl Number {
    /// Widen to `f64`.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Long(n) => n as f64,
            Number::Double(d) => d,
        }
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Length of the longest float-shaped prefix starting at `start`, and
/// whether it contained a fraction or exponent.
///
/// Returns `(end, saw_digit, is_float)`.
fn scan_number(bytes: &[u8], start: usize) -> (usize, bool, bool) {
    let mut i = start;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let mut saw_digit = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        saw_digit = true;
    }

    let mut is_float = false;
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        let mut frac_digit = false;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            frac_digit = true;
        }
        if saw_digit || frac_digit {
            i = j;
            saw_digit = true;
            is_float = true;
        }
    }

    if saw_digit && i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
            is_float = true;
        }
    }

    (i, saw_digit, is_float)
}

fn skip_space(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| is_space(**b)).count()
}

/// Classify a whole string as numeric.
///
/// Accepts leading whitespace, an optional sign, digits with an optional
/// fraction and exponent, and nothing after. Integers that overflow `i64`
/// are reported as doubles.
pub fn numeric_kind(bytes: &[u8]) -> Option<Number> {
    let start = skip_space(bytes);
    let (end, saw_digit, is_float) = scan_number(bytes, start);
    if !saw_digit || end != bytes.len() {
        return None;
    }

    let text = std::str::from_utf8(&bytes[start..end]).ok()?;
    if !is_float {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Number::Long(n));
        }
    }
    text.parse::<f64>().ok().map(Number::Double)
}

/// Whether the whole string is numeric.
pub fn is_numeric(bytes: &[u8]) -> bool {
    numeric_kind(bytes).is_some()
}

/// Integer value of the longest leading run of digits.
///
/// Non-numeric input yields 0; overflow saturates.
pub fn parse_long_prefix(bytes: &[u8]) -> i64 {
    let mut i = skip_space(bytes);
    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    while let Some(b) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        let digit = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
        i += 1;
    }
    value
}

/// Float value of the longest numeric prefix. Non-numeric input yields 0.0.
pub fn parse_double_prefix(bytes: &[u8]) -> f64 {
    let start = skip_space(bytes);
    let (end, saw_digit, _) = scan_number(bytes, start);
    if !saw_digit {
        return 0.0;
    }
    std::str::from_utf8(&bytes[start..end])
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Format a double the way the runtime prints it: 14 significant digits,
/// trailing zeros removed, exponent form below `1e-4` and from `1e14` up.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NAN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if d == 0.0 {
        return if d.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to 14 significant digits first, then read the exponent back.
    let sci = format!("{:.13e}", d);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if !(-4..14).contains(&exp) {
        let mut m = trim_fraction(mantissa);
        if !m.contains('.') {
            m.push_str(".0");
        }
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}E{}{}", m, sign, exp.abs());
    }

    let decimals = (13 - exp).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, d))
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_kind_integers() {
        assert_eq!(numeric_kind(b"42"), Some(Number::Long(42)));
        assert_eq!(numeric_kind(b"-7"), Some(Number::Long(-7)));
        assert_eq!(numeric_kind(b"  12"), Some(Number::Long(12)));
        assert_eq!(numeric_kind(b"+3"), Some(Number::Long(3)));
    }

    #[test]
    fn test_numeric_kind_floats() {
        assert_eq!(numeric_kind(b"1.5"), Some(Number::Double(1.5)));
        assert_eq!(numeric_kind(b".5"), Some(Number::Double(0.5)));
        assert_eq!(numeric_kind(b"1."), Some(Number::Double(1.0)));
        assert_eq!(numeric_kind(b"1e3"), Some(Number::Double(1000.0)));
        assert_eq!(
            numeric_kind(b"99999999999999999999"),
            Some(Number::Double(1e20))
        );
    }

    #[test]
    fn test_numeric_kind_rejects_garbage() {
        assert_eq!(numeric_kind(b""), None);
        assert_eq!(numeric_kind(b"abc"), None);
        assert_eq!(numeric_kind(b"12abc"), None);
        assert_eq!(numeric_kind(b"1 "), None);
        assert_eq!(numeric_kind(b"."), None);
        assert_eq!(numeric_kind(b"-"), None);
        assert_eq!(numeric_kind(b"1e"), None);
    }

    #[test]
    fn test_parse_long_prefix() {
        assert_eq!(parse_long_prefix(b"12abc"), 12);
        assert_eq!(parse_long_prefix(b"  -34.9"), -34);
        assert_eq!(parse_long_prefix(b"abc"), 0);
        assert_eq!(parse_long_prefix(b""), 0);
        assert_eq!(parse_long_prefix(b"99999999999999999999"), i64::MAX);
        assert_eq!(parse_long_prefix(b"-99999999999999999999"), i64::MIN);
    }

    #[test]
    fn test_parse_double_prefix() {
        assert_eq!(parse_double_prefix(b"1.5xyz"), 1.5);
        assert_eq!(parse_double_prefix(b"2e2e2"), 200.0);
        assert_eq!(parse_double_prefix(b"3e"), 3.0);
        assert_eq!(parse_double_prefix(b"x1"), 0.0);
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(1.0), "1");
        assert_eq!(format_double(0.1), "0.1");
        assert_eq!(format_double(-2.5), "-2.5");
        assert_eq!(format_double(1e25), "1.0E+25");
        assert_eq!(format_double(1.5e-7), "1.5E-7");
        assert_eq!(format_double(123456.0), "123456");
        assert_eq!(format_double(1e14), "1.0E+14");
        assert_eq!(format_double(0.0001), "0.0001");
        assert_eq!(format_double(0.00001), "1.0E-5");
        assert_eq!(format_double(1.0 / 3.0), "0.33333333333333");
        assert_eq!(format_double(f64::INFINITY), "INF");
        assert_eq!(format_double(f64::NAN), "NAN");
    }
}
