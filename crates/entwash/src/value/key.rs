//! Array keys

use std::fmt;

use super::string::StringValue;

/// A canonical array key: an integer or a string.
///
/// Strings that look like integers (`"0"`, `"12"`, `"-3"`, but not
/// `"012"`, `"+1"`, `"-0"` or `" 1"`) are stored as integer keys.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    /// Integer key
    Int(i64),
    /// String key
    Str(StringValue),
}

impl ArrayKey {
    /// Canonicalize a string into a key.
    pub fn from_string(s: StringValue) -> Self {
        match integer_key(s.as_bytes()) {
            Some(n) => ArrayKey::Int(n),
            None => ArrayKey::Str(s),
        }
    }

    /// The integer, if this is an integer key.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArrayKey::Int(n) => Some(*n),
            ArrayKey::Str(_) => None,
        }
    }

    /// Check if this is a string key.
    pub fn is_str(&self) -> bool {
        matches!(self, ArrayKey::Str(_))
    }

    /// The key as a string.
    pub fn to_string_value(&self) -> StringValue {
        match self {
            ArrayKey::Int(n) => StringValue::binary(n.to_string()),
            ArrayKey::Str(s) => s.clone(),
        }
    }
}

/// Parse an integer-looking key: `0`, or an optional `-` followed by a
/// non-zero digit and more digits, fitting in `i64`.
pub(crate) fn integer_key(bytes: &[u8]) -> Option<i64> {
    let digits = bytes.strip_prefix(b"-").unwrap_or(bytes);
    match digits {
        [] => return None,
        [b'0'] => {
            return if digits.len() == bytes.len() {
                Some(0)
            } else {
                None
            }
        }
        [b'0', ..] => return None,
        _ => {}
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse::<i64>().ok()
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(n) => write!(f, "{}", n),
            ArrayKey::Str(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Debug for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(n) => write!(f, "{}", n),
            ArrayKey::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for ArrayKey {
    fn from(n: i64) -> Self {
        ArrayKey::Int(n)
    }
}

impl From<i32> for ArrayKey {
    fn from(n: i32) -> Self {
        ArrayKey::Int(i64::from(n))
    }
}

impl From<usize> for ArrayKey {
    fn from(n: usize) -> Self {
        ArrayKey::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        ArrayKey::from_string(StringValue::from(s))
    }
}

impl From<String> for ArrayKey {
    fn from(s: String) -> Self {
        ArrayKey::from_string(StringValue::from(s))
    }
}

impl From<StringValue> for ArrayKey {
    fn from(s: StringValue) -> Self {
        ArrayKey::from_string(s)
    }
}

impl From<&ArrayKey> for ArrayKey {
    fn from(k: &ArrayKey) -> Self {
        k.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_looking_strings() {
        assert_eq!(ArrayKey::from("0"), ArrayKey::Int(0));
        assert_eq!(ArrayKey::from("42"), ArrayKey::Int(42));
        assert_eq!(ArrayKey::from("-7"), ArrayKey::Int(-7));
    }

    #[test]
    fn test_non_canonical_strings_stay_strings() {
        for s in ["08", "-0", "+1", " 1", "1 ", "1.0", "", "-", "abc"] {
            assert!(ArrayKey::from(s).is_str(), "{:?} should be a string key", s);
        }
    }

    #[test]
    fn test_overflowing_integer_string_stays_string() {
        assert!(ArrayKey::from("9223372036854775808").is_str());
        assert_eq!(
            ArrayKey::from("9223372036854775807"),
            ArrayKey::Int(i64::MAX)
        );
    }

    #[test]
    fn test_binary_and_unicode_keys_match() {
        let a = ArrayKey::from(StringValue::binary(b"name"));
        let b = ArrayKey::from("name");
        assert_eq!(a, b);
    }
}
