//! Per-request execution context: variables, registries and side channels

mod frame;
mod prelude;

pub use frame::ScopeGuard;

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::context::EnvConfig;
use crate::error::{type_name, FatalError, Result, RuntimeError};
use crate::foreign::{ForeignClassDef, ForeignRegistry, ForeignValue, FromValue, HostClass};
use crate::value::{
    Callable, Capture, ClassDef, ClassRegistry, Closure, Dumper, Function, ObjectRef, StringValue,
    UserFunction, Value, Var, STD_CLASS,
};

/// A variable bound in a frame.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Variable name, without the sigil
    pub name: String,

    /// The cell holding the value; shared when the variable is a reference
    pub var: Var,
}

/// A non-fatal diagnostic recorded during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Message text
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Warning: {}", self.message)
    }
}

/// The execution context of one script run.
///
/// Variables live in a flat binding list split into frames; each call
/// pushes a frame and lookups only see the innermost one, so a function
/// body never reads its caller's locals. Class and host-class registries
/// are `Arc`-shared and may serve several contexts on different threads.
/// Everything else here belongs to this context alone.
///
/// # Example
///
/// ```
/// use entwash::{Env, Value};
///
/// let mut env = Env::new();
/// env.define("x", Value::Long(1));
///
/// env.push_frame();
/// assert_eq!(env.get("x"), None); // caller's locals are not visible
/// env.define("x", Value::Long(10));
/// assert_eq!(env.get("x"), Some(Value::Long(10)));
/// env.pop_frame();
///
/// assert_eq!(env.get("x"), Some(Value::Long(1)));
/// ```
pub struct Env {
    /// All bindings in a flat array (most recent at end)
    bindings: Vec<Binding>,

    /// Frame boundaries (indices into bindings)
    frames: Vec<usize>,

    /// Current call depth (for recursion limiting)
    call_depth: usize,

    config: EnvConfig,
    classes: Arc<ClassRegistry>,
    foreign: Arc<ForeignRegistry>,
    functions: HashMap<String, Function>,
    rng: StdRng,
    warnings: Vec<Warning>,
    output: String,
    next_object_id: u64,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("bindings", &self.bindings)
            .field("frames", &self.frames)
            .field("call_depth", &self.call_depth)
            .field("functions", &self.functions.len())
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl Env {
    /// Create a context with default settings and the native prelude.
    pub fn new() -> Self {
        Self::with_config(EnvConfig::default())
    }

    /// Create a context with custom settings and fresh registries.
    pub fn with_config(config: EnvConfig) -> Self {
        Self::with_registries(
            config,
            Arc::new(ClassRegistry::new()),
            Arc::new(ForeignRegistry::new()),
        )
    }

    /// Create a context sharing class registries with other contexts.
    pub fn with_registries(
        config: EnvConfig,
        classes: Arc<ClassRegistry>,
        foreign: Arc<ForeignRegistry>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut env = Self {
            bindings: Vec::new(),
            frames: vec![0], // Start with one frame (global scope)
            call_depth: 0,
            config,
            classes,
            foreign,
            functions: HashMap::new(),
            rng,
            warnings: Vec::new(),
            output: String::new(),
            next_object_id: 1,
        };
        env.load_prelude();
        env
    }

    /// The active settings.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management (Scope Entry/Exit)
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a new scope (push a frame).
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Exit the current scope (pop a frame).
    ///
    /// Does nothing at global scope.
    pub fn pop_frame(&mut self) {
        // Never pop the global frame
        if self.frames.len() > 1 {
            if let Some(boundary) = self.frames.pop() {
                self.bindings.truncate(boundary);
            }
        }
    }

    /// Get the current scope depth (number of frames).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if we're at global scope.
    pub fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    fn frame_start(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Call Depth Tracking (Stack Overflow Protection)
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a function call.
    ///
    /// Fails when the context has been interrupted or the depth limit is
    /// reached.
    pub fn enter_call(&mut self) -> Result<()> {
        if self.config.is_interrupted() {
            return Err(FatalError::Interrupted.into());
        }
        if self.call_depth >= self.config.max_call_depth {
            return Err(FatalError::StackOverflow {
                depth: self.call_depth,
                max: self.config.max_call_depth,
            }
            .into());
        }
        self.call_depth += 1;
        Ok(())
    }

    /// Exit a function call.
    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Get current call depth.
    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    // ═══════════════════════════════════════════════════════════════════
    // Variables
    // ═══════════════════════════════════════════════════════════════════

    fn position(&self, name: &str) -> Option<usize> {
        let start = self.frame_start();
        self.bindings[start..]
            .iter()
            .rposition(|b| b.name == name)
            .map(|i| start + i)
    }

    /// Bind `name` to a fresh cell in the current frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) -> Var {
        let var = Var::new(value);
        self.define_var(name, var.clone());
        var
    }

    /// Bind `name` to an existing cell (`$name =& ...`).
    pub fn define_var(&mut self, name: impl Into<String>, var: Var) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.bindings[i].var = var,
            None => self.bindings.push(Binding { name, var }),
        }
    }

    /// Read a variable in the current frame.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.position(name).map(|i| self.bindings[i].var.get())
    }

    /// The cell behind a variable in the current frame.
    pub fn get_var(&self, name: &str) -> Option<Var> {
        self.position(name).map(|i| self.bindings[i].var.clone())
    }

    /// The cell behind a variable, creating it as null if absent.
    pub fn get_or_define_var(&mut self, name: &str) -> Var {
        match self.get_var(name) {
            Some(var) => var,
            None => self.define(name, Value::Null),
        }
    }

    /// Write a variable, through its cell if it is bound, so references
    /// see the write.
    pub fn assign(&mut self, name: &str, value: Value) {
        match self.position(name) {
            Some(i) => self.bindings[i].var.set(value),
            None => {
                self.define(name, value);
            }
        }
    }

    /// Check if a variable is bound in the current frame.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a variable from the current frame (`unset($name)`).
    pub fn unset(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.bindings.remove(i);
        }
    }

    /// Names bound in the current frame.
    pub fn names_in_current_scope(&self) -> Vec<&str> {
        self.bindings[self.frame_start()..]
            .iter()
            .map(|b| b.name.as_str())
            .collect()
    }

    /// `$this` of the running method.
    pub fn this(&self) -> Result<ObjectRef> {
        match self.get("this") {
            Some(Value::Object(obj)) => Ok(obj),
            _ => Err(RuntimeError::NotAnObject("$this".to_string()).into()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Classes and Objects
    // ═══════════════════════════════════════════════════════════════════

    /// The shared class registry.
    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    /// Register a class.
    pub fn define_class(&mut self, def: ClassDef) -> Arc<ClassDef> {
        self.classes.register(def)
    }

    /// Find a class by case-insensitive name.
    pub fn lookup_class(&self, name: &str) -> Result<Arc<ClassDef>> {
        self.classes.lookup(name)
    }

    /// Instantiate a class and run its constructor.
    pub fn new_object(&mut self, class: &str, args: &[Value]) -> Result<ObjectRef> {
        let def = self.lookup_class(class)?;
        def.new_instance(self, args)
    }

    /// Allocate the next object identity number.
    pub fn next_object_id(&mut self) -> u64 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    /// A fresh `stdClass` instance.
    pub fn new_std_object(&mut self) -> ObjectRef {
        let class = self.classes.get_or_define(STD_CLASS);
        class.init_instance(self)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Functions and Callables
    // ═══════════════════════════════════════════════════════════════════

    /// Register a named function. A later definition replaces it.
    pub fn define_function(&mut self, func: impl Into<Function>) {
        let func = func.into();
        self.functions.insert(func.name().to_lowercase(), func);
    }

    /// Find a function by case-insensitive name.
    pub fn get_function(&self, name: &str) -> Result<Function> {
        self.functions
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()).into())
    }

    /// Call a named function.
    pub fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self.get_function(name)?;
        func.invoke(self, None, args)
    }

    /// Create a closure over variables of the current frame.
    ///
    /// Each capture is `(name, by_ref)`. By-value captures copy the
    /// variable now; by-reference captures share its cell, creating the
    /// variable if it does not exist yet. `$this` is bound when the
    /// current frame has one.
    pub fn create_closure(&mut self, function: Arc<UserFunction>, captures: &[(&str, bool)]) -> Value {
        let captures = captures
            .iter()
            .map(|&(name, by_ref)| {
                if by_ref {
                    Capture::ByRef {
                        name: name.to_string(),
                        var: self.get_or_define_var(name),
                    }
                } else {
                    let value = self.get(name).unwrap_or_default().copy();
                    Capture::ByValue {
                        name: name.to_string(),
                        value,
                    }
                }
            })
            .collect();
        let this = self.this().ok();
        Value::Callable(Callable::Closure(Rc::new(Closure::new(function, captures, this))))
    }

    /// Resolve a callable value: a callable, a function name, a
    /// `"Class::method"` string, or a `[target, "method"]` pair.
    pub fn to_callable(&self, value: &Value) -> Result<Callable> {
        let not_callable = || RuntimeError::NotCallable(type_name(value).to_string());
        match value {
            Value::Callable(c) => Ok(c.clone()),
            Value::String(s) => {
                let name = s.to_str_lossy();
                match name.split_once("::") {
                    Some((class, method)) => Ok(Callable::Static {
                        class: self.lookup_class(class)?,
                        name: method.to_string(),
                    }),
                    None => Ok(Callable::Function(self.get_function(&name)?)),
                }
            }
            Value::Array(a) if a.len() == 2 => {
                let (Some(target), Some(method)) = (a.get(0), a.get(1)) else {
                    return Err(not_callable().into());
                };
                let name = method.to_string_value().to_str_lossy().into_owned();
                match target {
                    Value::Object(receiver) => Ok(Callable::Method { receiver, name }),
                    Value::Foreign(target) => Ok(Callable::Foreign { target, name }),
                    Value::String(class) => Ok(Callable::Static {
                        class: self.lookup_class(&class.to_str_lossy())?,
                        name,
                    }),
                    _ => Err(not_callable().into()),
                }
            }
            _ => Err(not_callable().into()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Host Objects
    // ═══════════════════════════════════════════════════════════════════

    /// The shared host-class registry.
    pub fn foreign(&self) -> &Arc<ForeignRegistry> {
        &self.foreign
    }

    /// The descriptor of host type `T`.
    pub fn foreign_class<T: HostClass>(&self) -> Arc<ForeignClassDef> {
        self.foreign.get_or_describe::<T>()
    }

    /// Wrap a host value.
    pub fn wrap<T: HostClass>(&self, value: T) -> Value {
        Value::Foreign(self.foreign.wrap(value))
    }

    /// Construct host type `T` through its declared constructor.
    pub fn construct<T: HostClass>(&mut self, args: &[Value]) -> Result<Value> {
        let def = self.foreign_class::<T>();
        Ok(Value::Foreign(def.construct(self, args)?))
    }

    /// Convert to a host type. Null gives `None`; a value that does not
    /// convert gives `None` and a warning.
    pub fn marshal<T: FromValue>(&mut self, value: &Value) -> Option<T> {
        if value.is_null() {
            return None;
        }
        let converted = T::from_value(value);
        if converted.is_none() {
            self.warn(format!(
                "Cannot convert {} to {}",
                type_name(value),
                T::EXPECTED
            ));
        }
        converted
    }

    /// Convert to a host type; null and unconvertible values are errors.
    pub fn marshal_not_null<T: FromValue>(&self, value: &Value) -> Result<T> {
        if value.is_null() {
            return Err(RuntimeError::Conversion {
                expected: T::EXPECTED.to_string(),
                got: type_name(value).to_string(),
            }
            .into());
        }
        T::from_value(value).ok_or_else(|| {
            RuntimeError::Conversion {
                expected: T::EXPECTED.to_string(),
                got: type_name(value).to_string(),
            }
            .into()
        })
    }

    /// Expose a host list or map value directly.
    pub fn wrap_collection(&self, collection: ForeignValue) -> Value {
        Value::Foreign(collection)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Side Channels
    // ═══════════════════════════════════════════════════════════════════

    /// Record a warning and log it.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(call_depth = self.call_depth, "{}", message);
        self.warnings.push(Warning { message });
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Drain recorded warnings.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Append to the output buffer.
    pub fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// The output buffer so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Drain the output buffer.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// The context's random source.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// A string literal with the configured semantics.
    pub fn string(&self, text: &str) -> Value {
        if self.config.unicode_semantics {
            Value::String(StringValue::unicode(text))
        } else {
            Value::String(StringValue::binary(text))
        }
    }

    /// Dumper configured from the context settings.
    pub fn dumper(&self) -> Dumper {
        Dumper::new(self.config.max_dump_depth, self.config.unicode_semantics)
    }
}
