//! Tagged serialization format
//!
//! ```text
//! N;                      null
//! b:0;  b:1;              boolean
//! i:42;                   integer
//! d:0.5;  d:1.0E25;       double (also INF, -INF, NAN)
//! s:3:"abc";              byte string, length in bytes
//! U:3:"äbc";              unicode string, length in code points
//! a:2:{i:0;N;s:1:"k";b:1;}
//! O:3:"Foo":1:{s:1:"x";i:1;}
//! ```
//!
//! Decoding parses the whole input into a temporary tree before any
//! object is instantiated, so malformed input never touches the class
//! registry or the object counter.

use std::collections::HashSet;
use std::io::Write as _;

use super::array::ArrayValue;
use super::key::ArrayKey;
use super::string::StringValue;
use super::var::Slot;
use super::Value;
use crate::environment::Env;
use crate::error::UnserializeError;

// ═══════════════════════════════════════════════════════════════════════
// Encoding
// ═══════════════════════════════════════════════════════════════════════

/// Encode a value.
///
/// Callables and foreign values have no encoding and are written as `N;`,
/// as is any object or array reached again through a cycle.
pub fn serialize(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    Encoder::default().value(&mut out, value);
    out
}

#[derive(Default)]
struct Encoder {
    path: HashSet<usize>,
}

fn string(out: &mut Vec<u8>, s: &StringValue) {
    let tag = if s.is_unicode() { 'U' } else { 's' };
    let _ = write!(out, "{}:{}:\"", tag, s.len());
    out.extend_from_slice(s.as_bytes());
    out.extend_from_slice(b"\";");
}

fn key(out: &mut Vec<u8>, key: &ArrayKey) {
    match key {
        ArrayKey::Int(n) => {
            let _ = write!(out, "i:{};", n);
        }
        ArrayKey::Str(s) => string(out, s),
    }
}

fn double(out: &mut Vec<u8>, d: f64) {
    if d.is_nan() {
        out.extend_from_slice(b"d:NAN;");
    } else if d.is_infinite() {
        let sign = if d < 0.0 { "-" } else { "" };
        let _ = write!(out, "d:{}INF;", sign);
    } else {
        let _ = write!(out, "d:{};", double_text(d));
    }
}

/// Plain decimal inside `[1e-3, 1e7)`, otherwise `1.0E25` / `1.5E-7`.
fn double_text(d: f64) -> String {
    let abs = d.abs();
    if d == 0.0 || (1e-3..1e7).contains(&abs) {
        return d.to_string();
    }
    let sci = format!("{:e}", d);
    match sci.split_once('e') {
        Some((mantissa, exp)) if mantissa.contains('.') => format!("{}E{}", mantissa, exp),
        Some((mantissa, exp)) => format!("{}.0E{}", mantissa, exp),
        None => sci,
    }
}

impl Encoder {
    fn value(&mut self, out: &mut Vec<u8>, value: &Value) {
        match value {
            Value::Null => out.extend_from_slice(b"N;"),
            Value::Bool(b) => {
                let _ = write!(out, "b:{};", u8::from(*b));
            }
            Value::Long(n) => {
                let _ = write!(out, "i:{};", n);
            }
            Value::Double(d) => double(out, *d),
            Value::String(s) => string(out, s),
            Value::Array(a) => self.array(out, a),
            Value::Object(o) => {
                if !self.path.insert(o.addr()) {
                    out.extend_from_slice(b"N;");
                    return;
                }
                let name = o.class_name();
                let fields = o.fields();
                let _ = write!(out, "O:{}:\"{}\":{}:{{", name.len(), name, fields.len());
                for (field, v) in &fields {
                    string(out, &StringValue::binary(field));
                    self.value(out, v);
                }
                out.push(b'}');
                self.path.remove(&o.addr());
            }
            Value::Callable(c) => {
                tracing::warn!(callable = %c.name(), "Cannot serialize a callable; writing null");
                out.extend_from_slice(b"N;");
            }
            Value::Foreign(f) => {
                tracing::warn!(class = %f.class_name(), "Cannot serialize a host object; writing null");
                out.extend_from_slice(b"N;");
            }
        }
    }

    fn array(&mut self, out: &mut Vec<u8>, a: &ArrayValue) {
        if !self.path.insert(a.addr()) {
            out.extend_from_slice(b"N;");
            return;
        }
        let _ = write!(out, "a:{}:{{", a.len());
        for (k, slot) in a.iter() {
            key(out, k);
            match slot {
                Slot::Value(v) => self.value(out, v),
                Slot::Ref(var) => {
                    let v = var.get();
                    self.value(out, &v);
                }
            }
        }
        out.push(b'}');
        self.path.remove(&a.addr());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════════

/// Parsed but not yet instantiated value.
#[derive(Debug)]
enum Node {
    Scalar(Value),
    Array(Vec<(ArrayKey, Node)>),
    Object {
        class: String,
        fields: Vec<(String, Node)>,
    },
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

type ParseResult<T> = std::result::Result<T, UnserializeError>;

impl<'a> Parser<'a> {
    fn new(input: &'a [u8], max_depth: usize) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Enter an array or object body starting at `offset`.
    fn descend(&mut self, offset: usize) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(UnserializeError::TooDeep {
                offset,
                max: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> ParseResult<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(UnserializeError::UnexpectedEof { offset: self.pos })
    }

    fn bump(&mut self) -> ParseResult<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> ParseResult<()> {
        let offset = self.pos;
        let found = self.bump()?;
        if found != expected {
            return Err(UnserializeError::UnexpectedByte {
                offset,
                expected: expected as char,
                found: found as char,
            });
        }
        Ok(())
    }

    /// Bytes up to (not including) `end`, which is consumed.
    fn until(&mut self, end: u8) -> ParseResult<&'a [u8]> {
        let start = self.pos;
        let rest = &self.input[start..];
        let len = rest
            .iter()
            .position(|&b| b == end)
            .ok_or(UnserializeError::UnexpectedEof {
                offset: self.input.len(),
            })?;
        self.pos = start + len + 1;
        Ok(&rest[..len])
    }

    fn integer(&mut self, end: u8) -> ParseResult<i64> {
        let offset = self.pos;
        let text = self.until(end)?;
        std::str::from_utf8(text)
            .ok()
            .and_then(|t| t.parse::<i64>().ok())
            .ok_or(UnserializeError::InvalidNumber { offset })
    }

    fn length(&mut self) -> ParseResult<usize> {
        let offset = self.pos;
        let n = self.integer(b':')?;
        usize::try_from(n).map_err(|_| UnserializeError::InvalidNumber { offset })
    }

    fn double(&mut self) -> ParseResult<f64> {
        let offset = self.pos;
        let text = self.until(b';')?;
        let parsed = match text {
            b"NAN" => Some(f64::NAN),
            b"INF" => Some(f64::INFINITY),
            b"-INF" => Some(f64::NEG_INFINITY),
            _ => std::str::from_utf8(text).ok().and_then(|t| t.parse().ok()),
        };
        parsed.ok_or(UnserializeError::InvalidNumber { offset })
    }

    /// `"payload"` where `len` counts bytes.
    fn bytes(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        let offset = self.pos;
        self.expect(b'"')?;
        let end = self.pos + len;
        if end > self.input.len() {
            return Err(UnserializeError::InvalidLength { offset, length: len });
        }
        let payload = &self.input[self.pos..end];
        self.pos = end;
        self.expect(b'"')?;
        Ok(payload)
    }

    /// `"payload"` where `len` counts code points.
    fn chars(&mut self, len: usize) -> ParseResult<&'a str> {
        let offset = self.pos;
        self.expect(b'"')?;
        let rest = std::str::from_utf8(&self.input[self.pos..]).unwrap_or_else(|e| {
            // Stop at the first invalid byte; it cannot be inside the payload.
            let valid = &self.input[self.pos..self.pos + e.valid_up_to()];
            std::str::from_utf8(valid).unwrap_or_default()
        });
        let byte_len = match rest.char_indices().nth(len) {
            Some((i, _)) => i,
            None if rest.chars().count() == len => rest.len(),
            None => return Err(UnserializeError::InvalidLength { offset, length: len }),
        };
        let payload = &rest[..byte_len];
        self.pos += byte_len;
        self.expect(b'"')?;
        Ok(payload)
    }

    fn string(&mut self, tag: u8) -> ParseResult<StringValue> {
        let len = self.length()?;
        let s = if tag == b'U' {
            StringValue::unicode(self.chars(len)?)
        } else {
            StringValue::binary(self.bytes(len)?)
        };
        self.expect(b';')?;
        Ok(s)
    }

    fn key(&mut self) -> ParseResult<ArrayKey> {
        let offset = self.pos;
        match self.bump()? {
            b'i' => {
                self.expect(b':')?;
                Ok(ArrayKey::Int(self.integer(b';')?))
            }
            tag @ (b's' | b'U') => {
                self.expect(b':')?;
                Ok(ArrayKey::from_string(self.string(tag)?))
            }
            tag => Err(UnserializeError::UnknownTag {
                offset,
                tag: tag as char,
            }),
        }
    }

    fn node(&mut self) -> ParseResult<Node> {
        let offset = self.pos;
        let tag = self.bump()?;
        if tag == b'N' {
            self.expect(b';')?;
            return Ok(Node::Scalar(Value::Null));
        }
        self.expect(b':')?;
        let node = match tag {
            b'b' => {
                let at = self.pos;
                match self.integer(b';')? {
                    0 => Node::Scalar(Value::Bool(false)),
                    1 => Node::Scalar(Value::Bool(true)),
                    _ => return Err(UnserializeError::InvalidNumber { offset: at }),
                }
            }
            b'i' => Node::Scalar(Value::Long(self.integer(b';')?)),
            b'd' => Node::Scalar(Value::Double(self.double()?)),
            b's' | b'U' => Node::Scalar(Value::String(self.string(tag)?)),
            b'a' => {
                let n = self.length()?;
                self.expect(b'{')?;
                self.descend(offset)?;
                let mut entries = Vec::with_capacity(n.min(1024));
                for _ in 0..n {
                    let k = self.key()?;
                    entries.push((k, self.node()?));
                }
                self.expect(b'}')?;
                self.depth -= 1;
                Node::Array(entries)
            }
            b'O' => {
                let len = self.length()?;
                let class = String::from_utf8_lossy(self.bytes(len)?).into_owned();
                self.expect(b':')?;
                let n = self.length()?;
                self.expect(b'{')?;
                self.descend(offset)?;
                let mut fields = Vec::with_capacity(n.min(1024));
                for _ in 0..n {
                    let name = self.key()?.to_string();
                    fields.push((name, self.node()?));
                }
                self.expect(b'}')?;
                self.depth -= 1;
                Node::Object { class, fields }
            }
            other => {
                return Err(UnserializeError::UnknownTag {
                    offset,
                    tag: other as char,
                })
            }
        };
        Ok(node)
    }
}

fn build(env: &mut Env, node: Node) -> Value {
    match node {
        Node::Scalar(v) => v,
        Node::Array(entries) => {
            let mut array = ArrayValue::new();
            for (k, child) in entries {
                let v = build(env, child);
                array.put(k, v);
            }
            Value::Array(array)
        }
        Node::Object { class, fields } => {
            let def = env.classes().get_or_define(&class);
            let obj = def.init_instance(env);
            for (name, child) in fields {
                let v = build(env, child);
                obj.put_field(&name, v);
            }
            Value::Object(obj)
        }
    }
}

/// Decode a value.
///
/// Classes named in the input that are not registered are defined as
/// empty classes so the instance keeps its class name. Containers nested
/// deeper than [`EnvConfig::max_unserialize_depth`](crate::EnvConfig)
/// are rejected with [`UnserializeError::TooDeep`].
pub fn unserialize(env: &mut Env, input: &[u8]) -> Result<Value, UnserializeError> {
    let mut parser = Parser::new(input, env.config().max_unserialize_depth);
    let node = parser.node()?;
    if parser.pos != input.len() {
        return Err(UnserializeError::TrailingData { offset: parser.pos });
    }
    Ok(build(env, node))
}
