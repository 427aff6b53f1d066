//! String values: byte strings and code-point strings

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::numeric::{self, Number};

/// An immutable runtime string.
///
/// Both representations compare, order and hash by their byte content
/// (unicode strings as UTF-8), so a binary string and a unicode string
/// holding the same characters are the same array key and are equal.
#[derive(Clone)]
pub enum StringValue {
    /// Byte-oriented string; `len()` counts bytes
    Binary(Rc<[u8]>),
    /// Code-point string; `len()` counts characters
    Unicode(Rc<str>),
}

impl StringValue {
    /// Create a byte string.
    pub fn binary(bytes: impl AsRef<[u8]>) -> Self {
        StringValue::Binary(Rc::from(bytes.as_ref()))
    }

    /// Create a unicode string.
    pub fn unicode(text: impl AsRef<str>) -> Self {
        StringValue::Unicode(Rc::from(text.as_ref()))
    }

    /// The empty byte string.
    pub fn empty() -> Self {
        StringValue::Binary(Rc::from(&b""[..]))
    }

    /// Raw bytes (UTF-8 for unicode strings).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StringValue::Binary(b) => b,
            StringValue::Unicode(s) => s.as_bytes(),
        }
    }

    /// Length in the string's own unit: bytes or code points.
    pub fn len(&self) -> usize {
        match self {
            StringValue::Binary(b) => b.len(),
            StringValue::Unicode(s) => s.chars().count(),
        }
    }

    /// Length in bytes.
    pub fn byte_len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Check if this is the code-point representation.
    pub fn is_unicode(&self) -> bool {
        matches!(self, StringValue::Unicode(_))
    }

    /// Text view, replacing invalid UTF-8 in byte strings.
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        match self {
            StringValue::Binary(b) => String::from_utf8_lossy(b),
            StringValue::Unicode(s) => Cow::Borrowed(s),
        }
    }

    /// Convert to the code-point representation.
    pub fn to_unicode(&self) -> StringValue {
        match self {
            StringValue::Binary(b) => StringValue::unicode(String::from_utf8_lossy(b)),
            StringValue::Unicode(_) => self.clone(),
        }
    }

    /// Convert to the byte representation.
    pub fn to_binary(&self) -> StringValue {
        match self {
            StringValue::Binary(_) => self.clone(),
            StringValue::Unicode(s) => StringValue::binary(s.as_bytes()),
        }
    }

    /// Truthiness: only `""` and `"0"` are false.
    pub fn to_bool(&self) -> bool {
        !matches!(self.as_bytes(), b"" | b"0")
    }

    /// Integer value of the numeric prefix.
    pub fn to_long(&self) -> i64 {
        numeric::parse_long_prefix(self.as_bytes())
    }

    /// Float value of the numeric prefix.
    pub fn to_double(&self) -> f64 {
        numeric::parse_double_prefix(self.as_bytes())
    }

    /// Whole-string numeric classification.
    pub fn numeric_kind(&self) -> Option<Number> {
        numeric::numeric_kind(self.as_bytes())
    }

    /// Whether the whole string is numeric.
    pub fn is_numeric(&self) -> bool {
        numeric::is_numeric(self.as_bytes())
    }
}

impl PartialEq for StringValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for StringValue {}

impl Hash for StringValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl PartialOrd for StringValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl fmt::Debug for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringValue::Binary(_) => write!(f, "b{:?}", self.to_str_lossy()),
            StringValue::Unicode(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for StringValue {
    fn from(s: &str) -> Self {
        StringValue::unicode(s)
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        StringValue::Unicode(Rc::from(s))
    }
}

impl From<&[u8]> for StringValue {
    fn from(b: &[u8]) -> Self {
        StringValue::binary(b)
    }
}

impl From<Vec<u8>> for StringValue {
    fn from(b: Vec<u8>) -> Self {
        StringValue::Binary(Rc::from(b))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════

/// Mutable string under construction.
///
/// `freeze()` produces an immutable [`StringValue`] in the builder's
/// representation.
#[derive(Debug, Clone, Default)]
pub struct StringBuilder {
    buf: Vec<u8>,
    unicode: bool,
}

impl StringBuilder {
    /// Start a byte string.
    pub fn binary() -> Self {
        Self {
            buf: Vec::new(),
            unicode: false,
        }
    }

    /// Start a unicode string.
    pub fn unicode() -> Self {
        Self {
            buf: Vec::new(),
            unicode: true,
        }
    }

    /// Append text.
    pub fn push_str(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Append raw bytes.
    pub fn push_bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    /// Append another string's content.
    pub fn push(&mut self, s: &StringValue) -> &mut Self {
        self.push_bytes(s.as_bytes())
    }

    /// Bytes appended so far.
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Finish the string.
    pub fn freeze(self) -> StringValue {
        if self.unicode {
            match String::from_utf8(self.buf) {
                Ok(s) => StringValue::from(s),
                Err(e) => StringValue::unicode(String::from_utf8_lossy(e.as_bytes())),
            }
        } else {
            StringValue::from(self.buf)
        }
    }
}

impl fmt::Write for StringBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}
