//! Native functions registered in every context

use super::Env;
use crate::error::{type_name, Result};
use crate::value::{serialize, unserialize, Argument, ArrayValue, NativeFunction, Value};

impl Env {
    /// Load the native prelude into this context.
    pub fn load_prelude(&mut self) {
        // Inspection
        self.define_function(NativeFunction::new("count", 1, builtin_count));
        self.define_function(NativeFunction::new("gettype", 1, builtin_gettype));
        self.define_function(NativeFunction::new("strlen", 1, builtin_strlen));
        self.define_function(NativeFunction::new("is_numeric", 1, builtin_is_numeric));

        // Serialization
        self.define_function(NativeFunction::new("serialize", 1, builtin_serialize));
        self.define_function(NativeFunction::new("unserialize", 1, builtin_unserialize));

        // Debug output
        self.define_function(NativeFunction::new("var_dump", -1, builtin_var_dump));
        self.define_function(NativeFunction::new("print_r", 2, builtin_print_r));

        // Arrays
        self.define_function(NativeFunction::by_ref("shuffle", 1, builtin_shuffle));
        self.define_function(NativeFunction::new("array_keys", 1, builtin_array_keys));
        self.define_function(NativeFunction::new("array_values", 1, builtin_array_values));
        self.define_function(NativeFunction::new("in_array", 3, builtin_in_array));
    }
}

/// Check the argument count, warning when too few were passed.
fn require(env: &mut Env, name: &str, args: usize, min: usize) -> bool {
    if args < min {
        env.warn(format!(
            "{}() expects at least {} parameter{}, {} given",
            name,
            min,
            if min == 1 { "" } else { "s" },
            args
        ));
        return false;
    }
    true
}

fn array_arg<'a>(env: &mut Env, name: &str, value: &'a Value) -> Option<&'a ArrayValue> {
    let array = value.as_array();
    if array.is_none() {
        env.warn(format!(
            "{}() expects parameter 1 to be array, {} given",
            name,
            type_name(value)
        ));
    }
    array
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Function Implementations
// ═══════════════════════════════════════════════════════════════════════

fn builtin_count(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "count", args.len(), 1) {
        return Ok(Value::Null);
    }
    let n = match &args[0] {
        Value::Null => 0,
        Value::Array(a) => a.len(),
        Value::Foreign(f) => f.len().unwrap_or(1),
        _ => 1,
    };
    Ok(Value::Long(n as i64))
}

fn builtin_gettype(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "gettype", args.len(), 1) {
        return Ok(Value::Null);
    }
    Ok(env.string(type_name(&args[0])))
}

fn builtin_strlen(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "strlen", args.len(), 1) {
        return Ok(Value::Null);
    }
    Ok(Value::Long(args[0].to_string_value().len() as i64))
}

fn builtin_is_numeric(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "is_numeric", args.len(), 1) {
        return Ok(Value::Null);
    }
    Ok(Value::Bool(args[0].is_numeric()))
}

fn builtin_serialize(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "serialize", args.len(), 1) {
        return Ok(Value::Null);
    }
    Ok(Value::binary(serialize(&args[0])))
}

fn builtin_unserialize(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "unserialize", args.len(), 1) {
        return Ok(Value::Null);
    }
    let input = args[0].to_string_value();
    match unserialize(env, input.as_bytes()) {
        Ok(value) => Ok(value),
        Err(err) => {
            env.warn(format!("unserialize(): {}", err));
            Ok(Value::Bool(false))
        }
    }
}

fn builtin_var_dump(env: &mut Env, args: &[Value]) -> Result<Value> {
    let dumper = env.dumper();
    for arg in args {
        let text = dumper.var_dump(arg);
        env.print(&text);
    }
    Ok(Value::Null)
}

fn builtin_print_r(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "print_r", args.len(), 1) {
        return Ok(Value::Null);
    }
    let text = env.dumper().print_r(&args[0]);
    if args.get(1).is_some_and(Value::to_bool) {
        return Ok(env.string(&text));
    }
    env.print(&text);
    Ok(Value::Bool(true))
}

fn builtin_shuffle(env: &mut Env, args: &[Argument]) -> Result<Value> {
    if !require(env, "shuffle", args.len(), 1) {
        return Ok(Value::Null);
    }
    let shuffled = match &args[0] {
        Argument::Ref(var) => {
            let rng = env.rng_mut();
            var.with_mut(|v| match v.as_array_mut() {
                Some(array) => {
                    array.shuffle(rng);
                    true
                }
                None => false,
            })
        }
        // A temporary: shuffling it has no visible effect.
        Argument::Value(v) => v.is_array(),
    };
    if !shuffled {
        env.warn(format!(
            "shuffle() expects parameter 1 to be array, {} given",
            type_name(&args[0].value())
        ));
    }
    Ok(Value::Bool(shuffled))
}

fn builtin_array_keys(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "array_keys", args.len(), 1) {
        return Ok(Value::Null);
    }
    Ok(match array_arg(env, "array_keys", &args[0]) {
        Some(array) => Value::list(array.keys().into_iter().map(Value::from)),
        None => Value::Null,
    })
}

fn builtin_array_values(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "array_values", args.len(), 1) {
        return Ok(Value::Null);
    }
    Ok(match array_arg(env, "array_values", &args[0]) {
        Some(array) => Value::list(array.values()),
        None => Value::Null,
    })
}

fn builtin_in_array(env: &mut Env, args: &[Value]) -> Result<Value> {
    if !require(env, "in_array", args.len(), 2) {
        return Ok(Value::Null);
    }
    let strict = args.get(2).is_some_and(Value::to_bool);
    Ok(match array_arg(env, "in_array", &args[1]) {
        Some(haystack) => {
            let found = if strict {
                haystack.contains_strict(&args[0])
            } else {
                haystack.contains(&args[0])
            };
            Value::Bool(found.is_some())
        }
        None => Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EnvConfig;
    use crate::value::{Invocable, Var};

    #[test]
    fn test_count() {
        let mut env = Env::new();
        let list = Value::list([Value::Long(1), Value::Long(2)]);
        assert_eq!(env.call_function("count", &[list]).unwrap(), Value::Long(2));
        assert_eq!(env.call_function("COUNT", &[Value::Null]).unwrap(), Value::Long(0));
    }

    #[test]
    fn test_gettype_names() {
        let mut env = Env::new();
        let name = |env: &mut Env, v: Value| {
            env.call_function("gettype", &[v])
                .unwrap()
                .to_string_value()
                .to_string()
        };
        assert_eq!(name(&mut env, Value::Null), "NULL");
        assert_eq!(name(&mut env, Value::Double(1.0)), "double");
        assert_eq!(name(&mut env, Value::empty_array()), "array");
    }

    #[test]
    fn test_strlen_counts_code_points_for_unicode() {
        let mut env = Env::new();
        let n = env.call_function("strlen", &[Value::string("äb")]).unwrap();
        assert_eq!(n, Value::Long(2));
        let n = env.call_function("strlen", &[Value::binary("äb")]).unwrap();
        assert_eq!(n, Value::Long(3));
    }

    #[test]
    fn test_unserialize_failure_warns_and_returns_false() {
        let mut env = Env::new();
        let out = env
            .call_function("unserialize", &[Value::from("i:oops;")])
            .unwrap();
        assert_eq!(out, Value::Bool(false));
        assert_eq!(env.warnings().len(), 1);
    }

    #[test]
    fn test_var_dump_writes_output() {
        let mut env = Env::new();
        env.call_function("var_dump", &[Value::Long(1), Value::Null])
            .unwrap();
        assert_eq!(env.take_output(), "int(1)\nNULL\n");
    }

    #[test]
    fn test_print_r_return_mode() {
        let mut env = Env::new();
        let out = env
            .call_function("print_r", &[Value::Long(5), Value::Bool(true)])
            .unwrap();
        assert_eq!(out, Value::from("5"));
        assert!(env.output().is_empty());
    }

    #[test]
    fn test_shuffle_through_reference_is_seeded() {
        let run = || {
            let mut env = Env::with_config(EnvConfig::new().with_seed(42));
            let var = Var::new(Value::list((1..=5).map(Value::Long)));
            let shuffle = env.get_function("shuffle").unwrap();
            shuffle
                .call_arguments(&mut env, &[Argument::Ref(var.clone())])
                .unwrap();
            var.get()
        };
        let first = run();
        assert_eq!(first, run());
        let values = first.as_array().unwrap().values();
        let mut sorted: Vec<i64> = values.iter().map(Value::to_long).collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_in_array_strictness() {
        let mut env = Env::new();
        let hay = Value::list([Value::from("1"), Value::Long(2)]);
        let loose = env
            .call_function("in_array", &[Value::Long(1), hay.clone()])
            .unwrap();
        let strict = env
            .call_function("in_array", &[Value::Long(1), hay, Value::Bool(true)])
            .unwrap();
        assert_eq!((loose, strict), (Value::Bool(true), Value::Bool(false)));
    }

    #[test]
    fn test_missing_argument_warns() {
        let mut env = Env::new();
        assert_eq!(env.call_function("strlen", &[]).unwrap(), Value::Null);
        assert_eq!(env.warnings().len(), 1);
    }
}
