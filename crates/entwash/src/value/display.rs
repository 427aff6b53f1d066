//! Display and Debug implementations for Value, plus the debug dump formats
//! (`var_dump`, `print_r`, `var_export`)

use std::collections::HashSet;
use std::fmt::{self, Write};

use super::array::ArrayValue;
use super::key::ArrayKey;
use super::numeric::format_double;
use super::object::ObjectRef;
use super::string::StringValue;
use super::var::Slot;
use super::Value;
use crate::foreign::ForeignValue;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_value(self, f, &mut Vec::new())
    }
}

fn debug_value(v: &Value, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    match v {
        Value::Null => write!(f, "null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Long(n) => write!(f, "{}", n),
        Value::Double(d) => write!(f, "{:?}", d),
        Value::String(s) => write!(f, "{:?}", s),
        Value::Array(a) => {
            write!(f, "[")?;
            for (i, (key, slot)) in a.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?} => ", key)?;
                debug_slot(slot, f, path)?;
            }
            write!(f, "]")
        }
        Value::Object(o) => {
            if path.contains(&o.addr()) {
                return write!(f, "{}#{} {{..}}", o.class_name(), o.id());
            }
            path.push(o.addr());
            write!(f, "{}#{} {{", o.class_name(), o.id())?;
            for (i, (name, value)) in o.fields().iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {}: ", name)?;
                debug_value(value, f, path)?;
            }
            path.pop();
            write!(f, " }}")
        }
        Value::Callable(c) => write!(f, "{:?}", c),
        Value::Foreign(fv) => write!(f, "Foreign({})", fv.class_name()),
    }
}

fn debug_slot(slot: &Slot, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    match slot {
        Slot::Value(v) => debug_value(v, f, path),
        Slot::Ref(var) => {
            if path.contains(&var.addr()) {
                return write!(f, "&..");
            }
            path.push(var.addr());
            write!(f, "&")?;
            let result = debug_value(&var.get(), f, path);
            path.pop();
            result
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Dump Formats
// ═══════════════════════════════════════════════════════════════════════

/// Debug-dump writer.
///
/// Tracks the containers on the current path so cyclic graphs print a
/// `*RECURSION*` marker instead of looping, and stops descending at
/// `max_depth`.
#[derive(Debug, Clone)]
pub struct Dumper {
    /// Nesting depth after which containers are elided
    pub max_depth: usize,
    /// Whether byte strings are labelled `binary` rather than `string`
    pub unicode_semantics: bool,
}

impl Default for Dumper {
    fn default() -> Self {
        Self {
            max_depth: 64,
            unicode_semantics: true,
        }
    }
}

/// `var_dump` with default settings.
pub fn var_dump(value: &Value) -> String {
    Dumper::default().var_dump(value)
}

/// `print_r` with default settings.
pub fn print_r(value: &Value) -> String {
    Dumper::default().print_r(value)
}

/// `var_export` with default settings.
pub fn var_export(value: &Value) -> String {
    Dumper::default().var_export(value)
}

fn indent(out: &mut String, n: usize) {
    out.extend(std::iter::repeat(' ').take(n));
}

fn escape_bytes(out: &mut String, s: &StringValue) {
    match s {
        StringValue::Unicode(text) => {
            for c in text.chars() {
                if c.is_control() && (c as u32) < 0x80 {
                    let _ = write!(out, "\\x{:02x}", c as u32);
                } else {
                    out.push(c);
                }
            }
        }
        StringValue::Binary(bytes) => {
            for &b in bytes.iter() {
                if (0x20..0x7f).contains(&b) {
                    out.push(b as char);
                } else {
                    let _ = write!(out, "\\x{:02x}", b);
                }
            }
        }
    }
}

fn dump_key(out: &mut String, key: &ArrayKey) {
    match key {
        ArrayKey::Int(n) => {
            let _ = write!(out, "[{}]=>", n);
        }
        ArrayKey::Str(s) => {
            out.push_str("[\"");
            escape_bytes(out, s);
            out.push_str("\"]=>");
        }
    }
}

/// Tracks containers on the current dump path.
#[derive(Default)]
struct Path(HashSet<usize>);

impl Path {
    fn enter(&mut self, addr: usize) -> bool {
        self.0.insert(addr)
    }

    fn leave(&mut self, addr: usize) {
        self.0.remove(&addr);
    }
}

impl Dumper {
    /// Create a dumper.
    pub fn new(max_depth: usize, unicode_semantics: bool) -> Self {
        Self {
            max_depth,
            unicode_semantics,
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // var_dump
    // ───────────────────────────────────────────────────────────────────

    /// Render `value` in `var_dump` format.
    pub fn var_dump(&self, value: &Value) -> String {
        let mut out = String::new();
        self.dump_value(&mut out, value, 0, &mut Path::default());
        out
    }

    fn dump_value(&self, out: &mut String, value: &Value, depth: usize, path: &mut Path) {
        indent(out, depth * 2);
        match value {
            Value::Null => out.push_str("NULL\n"),
            Value::Bool(b) => {
                let _ = writeln!(out, "bool({})", b);
            }
            Value::Long(n) => {
                let _ = writeln!(out, "int({})", n);
            }
            Value::Double(d) => {
                let _ = writeln!(out, "float({})", format_double(*d));
            }
            Value::String(s) => {
                let label = if s.is_unicode() || !self.unicode_semantics {
                    "string"
                } else {
                    "binary"
                };
                let _ = write!(out, "{}({}) \"", label, s.len());
                escape_bytes(out, s);
                out.push_str("\"\n");
            }
            Value::Array(a) => self.dump_array(out, a, depth, path),
            Value::Object(o) => self.dump_object(out, o, depth, path),
            Value::Callable(c) => {
                let _ = writeln!(out, "object(Closure) ({}) {{", c.name());
                indent(out, depth * 2);
                out.push_str("}\n");
            }
            Value::Foreign(f) => self.dump_foreign(out, f, depth, path),
        }
    }

    fn dump_entries(
        &self,
        out: &mut String,
        entries: impl Iterator<Item = (ArrayKey, Value)>,
        depth: usize,
        path: &mut Path,
    ) {
        for (key, value) in entries {
            indent(out, (depth + 1) * 2);
            dump_key(out, &key);
            out.push('\n');
            self.dump_value(out, &value, depth + 1, path);
        }
        indent(out, depth * 2);
        out.push_str("}\n");
    }

    fn dump_array(&self, out: &mut String, a: &ArrayValue, depth: usize, path: &mut Path) {
        if depth >= self.max_depth || !path.enter(a.addr()) {
            out.push_str("*RECURSION*\n");
            return;
        }
        let _ = writeln!(out, "array({}) {{", a.len());
        self.dump_entries(out, a.entries().into_iter(), depth, path);
        path.leave(a.addr());
    }

    fn dump_object(&self, out: &mut String, o: &ObjectRef, depth: usize, path: &mut Path) {
        if depth >= self.max_depth || !path.enter(o.addr()) {
            out.push_str("*RECURSION*\n");
            return;
        }
        let class = o.class();
        let mut custom = String::new();
        let handled = class
            .print_delegates()
            .any(|d| d.var_dump(o, depth, &mut custom));
        if handled {
            out.push_str(&custom);
        } else {
            let _ = writeln!(
                out,
                "object({})#{} ({}) {{",
                class.name(),
                o.id(),
                o.field_count()
            );
            let fields = o
                .fields()
                .into_iter()
                .map(|(k, v)| (ArrayKey::Str(StringValue::from(k)), v));
            self.dump_entries(out, fields, depth, path);
        }
        path.leave(o.addr());
    }

    fn dump_foreign(&self, out: &mut String, f: &ForeignValue, depth: usize, path: &mut Path) {
        match f.snapshot() {
            Some(array) => self.dump_array(out, &array, depth, path),
            None => {
                let props = f.properties();
                let _ = writeln!(out, "object({}) ({}) {{", f.class_name(), props.len());
                let fields = props
                    .into_iter()
                    .map(|(k, v)| (ArrayKey::Str(StringValue::from(k)), v));
                self.dump_entries(out, fields, depth, path);
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // print_r
    // ───────────────────────────────────────────────────────────────────

    /// Render `value` in `print_r` format.
    pub fn print_r(&self, value: &Value) -> String {
        let mut out = String::new();
        self.print_value(&mut out, value, 0, &mut Path::default());
        out
    }

    fn print_value(&self, out: &mut String, value: &Value, depth: usize, path: &mut Path) {
        match value {
            Value::Array(a) => {
                if depth >= self.max_depth || !path.enter(a.addr()) {
                    out.push_str("Array\n *RECURSION*");
                    return;
                }
                out.push_str("Array\n");
                self.print_entries(out, a.entries().into_iter(), depth, path);
                path.leave(a.addr());
            }
            Value::Object(o) => {
                if depth >= self.max_depth || !path.enter(o.addr()) {
                    let _ = write!(out, "{} Object\n *RECURSION*", o.class_name());
                    return;
                }
                let class = o.class();
                let mut custom = String::new();
                if class
                    .print_delegates()
                    .any(|d| d.print_r(o, depth, &mut custom))
                {
                    out.push_str(&custom);
                } else {
                    let _ = writeln!(out, "{} Object", class.name());
                    let fields = o
                        .fields()
                        .into_iter()
                        .map(|(k, v)| (ArrayKey::Str(StringValue::from(k)), v));
                    self.print_entries(out, fields, depth, path);
                }
                path.leave(o.addr());
            }
            Value::Foreign(f) => match f.snapshot() {
                Some(array) => self.print_value(out, &Value::Array(array), depth, path),
                None => {
                    let _ = writeln!(out, "{} Object", f.class_name());
                    let fields = f
                        .properties()
                        .into_iter()
                        .map(|(k, v)| (ArrayKey::Str(StringValue::from(k)), v));
                    self.print_entries(out, fields, depth, path);
                }
            },
            other => out.push_str(&other.to_string_value().to_str_lossy()),
        }
    }

    fn print_entries(
        &self,
        out: &mut String,
        entries: impl Iterator<Item = (ArrayKey, Value)>,
        depth: usize,
        path: &mut Path,
    ) {
        let pad = depth * 8;
        indent(out, pad);
        out.push_str("(\n");
        for (key, value) in entries {
            indent(out, pad + 4);
            let _ = write!(out, "[{}] => ", key);
            self.print_value(out, &value, depth + 1, path);
            out.push('\n');
        }
        indent(out, pad);
        out.push_str(")\n");
    }

    // ───────────────────────────────────────────────────────────────────
    // var_export
    // ───────────────────────────────────────────────────────────────────

    /// Render `value` as source text that recreates it.
    pub fn var_export(&self, value: &Value) -> String {
        let mut out = String::new();
        self.export_value(&mut out, value, 0, &mut Path::default());
        out
    }

    fn export_value(&self, out: &mut String, value: &Value, depth: usize, path: &mut Path) {
        match value {
            Value::Null => out.push_str("NULL"),
            Value::Bool(b) => {
                let _ = write!(out, "{}", b);
            }
            Value::Long(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Double(d) => {
                let text = format_double(*d);
                out.push_str(&text);
                if d.is_finite() && !text.contains(['.', 'E']) {
                    out.push_str(".0");
                }
            }
            Value::String(s) => export_string(out, &s.to_str_lossy()),
            Value::Array(a) => {
                if depth >= self.max_depth || !path.enter(a.addr()) {
                    out.push_str("NULL");
                    return;
                }
                out.push_str("array (\n");
                self.export_entries(out, a.entries().into_iter(), depth, path);
                indent(out, depth * 2);
                out.push(')');
                path.leave(a.addr());
            }
            Value::Object(o) => {
                if depth >= self.max_depth || !path.enter(o.addr()) {
                    out.push_str("NULL");
                    return;
                }
                let _ = writeln!(out, "\\{}::__set_state(array(", o.class_name());
                let fields = o
                    .fields()
                    .into_iter()
                    .map(|(k, v)| (ArrayKey::Str(StringValue::from(k)), v));
                self.export_entries(out, fields, depth, path);
                indent(out, depth * 2);
                out.push_str("))");
                path.leave(o.addr());
            }
            Value::Callable(_) => out.push_str("NULL"),
            Value::Foreign(f) => match f.snapshot() {
                Some(array) => self.export_value(out, &Value::Array(array), depth, path),
                None => out.push_str("NULL"),
            },
        }
    }

    fn export_entries(
        &self,
        out: &mut String,
        entries: impl Iterator<Item = (ArrayKey, Value)>,
        depth: usize,
        path: &mut Path,
    ) {
        for (key, value) in entries {
            indent(out, (depth + 1) * 2);
            match &key {
                ArrayKey::Int(n) => {
                    let _ = write!(out, "{} => ", n);
                }
                ArrayKey::Str(s) => {
                    export_string(out, &s.to_str_lossy());
                    out.push_str(" => ");
                }
            }
            if matches!(value, Value::Array(_) | Value::Object(_)) {
                out.push('\n');
                indent(out, (depth + 1) * 2);
            }
            self.export_value(out, &value, depth + 1, path);
            out.push_str(",\n");
        }
    }
}

fn export_string(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}
