//! Class descriptors and the class registry

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::callable::{Function, NativeFunction};
use super::delegate::{ArrayDelegate, DelegateChain, PrintDelegate};
use super::object::ObjectRef;
use super::{ConstValue, Value};
use crate::environment::Env;
use crate::error::{Result, RuntimeError};

/// Name of the built-in empty class used for default objects.
pub const STD_CLASS: &str = "stdClass";

/// An immutable class descriptor.
///
/// Built once with a [`ClassBuilder`] and then shared (`Arc`) by every
/// instance and every execution context.
pub struct ClassDef {
    name: String,
    parent: Option<Arc<ClassDef>>,
    interfaces: Vec<String>,
    methods: HashMap<String, Function>,
    /// lowercase name -> declared name
    methods_lower: HashMap<String, String>,
    constants: HashMap<String, ConstValue>,
    fields: Vec<(String, ConstValue)>,
    array_delegates: DelegateChain<dyn ArrayDelegate>,
    print_delegates: DelegateChain<dyn PrintDelegate>,
}

impl ClassDef {
    /// Class name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent descriptor.
    pub fn parent(&self) -> Option<&Arc<ClassDef>> {
        self.parent.as_ref()
    }

    /// Parent class name.
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().map(ClassDef::name)
    }

    /// Declared interface names.
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    fn ancestors(&self) -> impl Iterator<Item = &ClassDef> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Method Resolution
    // ═══════════════════════════════════════════════════════════════════

    /// Exact-case lookup through the parent chain.
    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.ancestors().find_map(|c| c.methods.get(name))
    }

    /// Case-insensitive lookup through the parent chain.
    pub fn find_function_lower_case(&self, name: &str) -> Option<&Function> {
        let lower = name.to_lowercase();
        self.ancestors().find_map(|c| c.own_lower_case(&lower))
    }

    fn own_lower_case(&self, lower: &str) -> Option<&Function> {
        self.methods_lower
            .get(lower)
            .and_then(|declared| self.methods.get(declared))
    }

    /// Resolve a method. Each class in the chain is searched by exact case
    /// and then case-insensitively before its parent, so an override wins
    /// whatever case it was declared in.
    pub fn get_function(&self, name: &str) -> Result<&Function> {
        let lower = name.to_lowercase();
        self.ancestors()
            .find_map(|c| c.methods.get(name).or_else(|| c.own_lower_case(&lower)))
            .ok_or_else(|| {
                RuntimeError::UnknownMethod {
                    class: self.name.clone(),
                    method: name.to_string(),
                }
                .into()
            })
    }

    /// The constructor (`__construct`), if declared here or inherited.
    pub fn find_constructor(&self) -> Option<&Function> {
        self.find_function_lower_case("__construct")
    }

    // ═══════════════════════════════════════════════════════════════════
    // Constants
    // ═══════════════════════════════════════════════════════════════════

    /// Constant lookup through the parent chain.
    pub fn find_constant(&self, name: &str) -> Option<&ConstValue> {
        self.ancestors().find_map(|c| c.constants.get(name))
    }

    /// Resolve a constant or fail naming the class.
    pub fn get_constant(&self, name: &str) -> Result<Value> {
        self.find_constant(name)
            .map(ConstValue::to_value)
            .ok_or_else(|| {
                RuntimeError::UnknownConstant {
                    class: self.name.clone(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Hierarchy
    // ═══════════════════════════════════════════════════════════════════

    /// Whether this class is `name`, extends it, or implements it.
    /// Names compare case-insensitively.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestors().any(|c| {
            c.name.eq_ignore_ascii_case(name)
                || c.interfaces.iter().any(|i| i.eq_ignore_ascii_case(name))
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Instances
    // ═══════════════════════════════════════════════════════════════════

    /// Create an instance with declared field defaults, parents first.
    /// Does not run the constructor.
    pub fn init_instance(self: &Arc<Self>, env: &mut Env) -> ObjectRef {
        let obj = ObjectRef::new(Arc::clone(self), env.next_object_id());
        let chain: Vec<&ClassDef> = self.ancestors().collect();
        for class in chain.into_iter().rev() {
            for (name, default) in &class.fields {
                obj.put_field(name, default.to_value());
            }
        }
        obj
    }

    /// Create an instance and run its constructor with `args`.
    pub fn new_instance(self: &Arc<Self>, env: &mut Env, args: &[Value]) -> Result<ObjectRef> {
        let obj = self.init_instance(env);
        if let Some(ctor) = self.find_constructor().cloned() {
            ctor.invoke(env, Some(&obj), args)?;
        }
        Ok(obj)
    }

    /// Call a method without a receiver.
    pub fn call_static(&self, env: &mut Env, name: &str, args: &[Value]) -> Result<Value> {
        let func = self.get_function(name)?.clone();
        func.invoke(env, None, args)
    }

    /// Array-access delegates, own first then inherited.
    pub fn array_delegates(&self) -> impl Iterator<Item = &Arc<dyn ArrayDelegate>> {
        self.ancestors().flat_map(|c| c.array_delegates.iter())
    }

    /// Print delegates, own first then inherited.
    pub fn print_delegates(&self) -> impl Iterator<Item = &Arc<dyn PrintDelegate>> {
        self.ancestors().flat_map(|c| c.print_delegates.iter())
    }
}

impl std::fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent_name())
            .field("methods", &self.methods.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════

/// Builder for [`ClassDef`].
///
/// # Example
///
/// ```
/// use entwash::{ClassBuilder, Env, Value};
///
/// let mut env = Env::new();
/// let class = env.define_class(
///     ClassBuilder::new("Counter")
///         .constant("START", 1)
///         .field("n", 0)
///         .native_method("get", 0, |env, _args| {
///             let this = env.this()?;
///             Ok(this.get_field("n").unwrap_or_default())
///         })
///         .build(),
/// );
/// assert!(class.get_function("GET").is_ok());
/// assert_eq!(class.get_constant("START").unwrap(), Value::Long(1));
/// ```
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    /// Start a class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: ClassDef {
                name: name.into(),
                parent: None,
                interfaces: Vec::new(),
                methods: HashMap::new(),
                methods_lower: HashMap::new(),
                constants: HashMap::new(),
                fields: Vec::new(),
                array_delegates: DelegateChain::new(),
                print_delegates: DelegateChain::new(),
            },
        }
    }

    /// Set the parent class.
    pub fn extends(mut self, parent: Arc<ClassDef>) -> Self {
        self.def.parent = Some(parent);
        self
    }

    /// Declare an implemented interface.
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.def.interfaces.push(name.into());
        self
    }

    /// Add a method. A later method with the same name replaces it.
    pub fn method(mut self, name: impl Into<String>, func: Function) -> Self {
        let name = name.into();
        self.def.methods_lower.insert(name.to_lowercase(), name.clone());
        self.def.methods.insert(name, func);
        self
    }

    /// Add a native method; `$this` is available through [`Env::this`].
    pub fn native_method<F>(self, name: &str, arity: i32, f: F) -> Self
    where
        F: Fn(&mut Env, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let func = Function::Native(NativeFunction::new(name, arity, f));
        self.method(name, func)
    }

    /// Add a class constant.
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<ConstValue>) -> Self {
        self.def.constants.insert(name.into(), value.into());
        self
    }

    /// Declare a field with its default value.
    pub fn field(mut self, name: impl Into<String>, default: impl Into<ConstValue>) -> Self {
        self.def.fields.push((name.into(), default.into()));
        self
    }

    /// Add an array-access delegate to the end of the chain.
    pub fn array_delegate(mut self, delegate: Arc<dyn ArrayDelegate>) -> Self {
        self.def.array_delegates.push(delegate);
        self
    }

    /// Add a print delegate to the end of the chain.
    pub fn print_delegate(mut self, delegate: Arc<dyn PrintDelegate>) -> Self {
        self.def.print_delegates.push(delegate);
        self
    }

    /// Finish the class.
    pub fn build(self) -> ClassDef {
        self.def
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Thread-safe table of class descriptors, keyed case-insensitively.
///
/// Shared through `Arc` by any number of execution contexts.
pub struct ClassRegistry {
    classes: DashMap<String, Arc<ClassDef>>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Create a registry holding `stdClass`.
    pub fn new() -> Self {
        let registry = Self {
            classes: DashMap::new(),
        };
        registry.register(ClassBuilder::new(STD_CLASS).build());
        registry
    }

    /// Add or replace a class.
    pub fn register(&self, def: ClassDef) -> Arc<ClassDef> {
        let def = Arc::new(def);
        self.classes
            .insert(def.name.to_lowercase(), Arc::clone(&def));
        def
    }

    /// Find a class by name.
    pub fn get(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.classes
            .get(&name.to_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Find a class or fail.
    pub fn lookup(&self, name: &str) -> Result<Arc<ClassDef>> {
        self.get(name)
            .ok_or_else(|| RuntimeError::UnknownClass(name.to_string()).into())
    }

    /// Find a class, defining an empty one under that name if missing.
    /// Concurrent callers all receive the same descriptor.
    pub fn get_or_define(&self, name: &str) -> Arc<ClassDef> {
        if let Some(def) = self.get(name) {
            return def;
        }
        let def = Arc::new(ClassBuilder::new(name).build());
        Arc::clone(self.classes.entry(name.to_lowercase()).or_insert(def).value())
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no classes are registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Function {
        Function::Native(NativeFunction::new("noop", 0, |_, _| Ok(Value::Null)))
    }

    #[test]
    fn test_method_lookup_falls_back_to_lowercase() {
        let class = ClassBuilder::new("Foo").method("doThing", noop()).build();
        assert!(class.find_function("doThing").is_some());
        assert!(class.find_function("DOTHING").is_none());
        assert!(class.get_function("DOTHING").is_ok());
    }

    #[test]
    fn test_unknown_method_names_class_and_method() {
        let class = ClassBuilder::new("Foo").build();
        let err = class.get_function("missing").unwrap_err();
        assert_eq!(err.to_string(), "Call to undefined method Foo::missing()");
    }

    #[test]
    fn test_inherited_method_and_constant() {
        let parent = Arc::new(
            ClassBuilder::new("Base")
                .method("hello", noop())
                .constant("X", 1)
                .build(),
        );
        let child = ClassBuilder::new("Child").extends(parent).build();
        assert!(child.get_function("hello").is_ok());
        assert_eq!(child.get_constant("X").unwrap(), Value::Long(1));
        assert!(child.get_constant("Y").is_err());
    }

    #[test]
    fn test_is_a_walks_chain() {
        let base = Arc::new(ClassBuilder::new("Exception").build());
        let child = ClassBuilder::new("MyError")
            .extends(base)
            .implements("Countable")
            .build();
        assert!(child.is_a("exception"));
        assert!(child.is_a("MyError"));
        assert!(child.is_a("countable"));
        assert!(!child.is_a("Other"));
    }

    #[test]
    fn test_registry_is_case_insensitive() {
        let registry = ClassRegistry::new();
        assert!(registry.get("STDCLASS").is_some());
        registry.register(ClassBuilder::new("Point").build());
        assert_eq!(registry.lookup("point").unwrap().name(), "Point");
        assert!(registry.lookup("Nope").is_err());
    }

    #[test]
    fn test_get_or_define_is_idempotent() {
        let registry = ClassRegistry::new();
        let a = registry.get_or_define("Ghost");
        let b = registry.get_or_define("ghost");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
