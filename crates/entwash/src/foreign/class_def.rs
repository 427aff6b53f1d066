//! Host class descriptors and overload resolution
//!
//! A descriptor is built once per host type by running its
//! [`HostClass::describe`] against a [`HostClassBuilder`], then shared
//! through the [`ForeignRegistry`] by every wrapped instance.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use dashmap::DashMap;

use super::{ForeignValue, HostClass, HostInterface};
use crate::environment::Env;
use crate::error::{FatalError, Result, RuntimeError};
use crate::value::{ConstValue, Value};

type ErasedMethod = Arc<dyn Fn(&mut Env, &mut dyn Any, &[Value]) -> Result<Value> + Send + Sync>;
type ErasedCtor = Arc<dyn Fn(&mut Env, &[Value]) -> Result<Rc<RefCell<dyn Any>>> + Send + Sync>;
type ErasedGetter = Arc<dyn Fn(&mut dyn Any) -> Result<Value> + Send + Sync>;
type ErasedSetter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync>;
type ErasedFallbackGet = Arc<dyn Fn(&mut dyn Any, &str) -> Option<Value> + Send + Sync>;
type ErasedFallbackSet = Arc<dyn Fn(&mut dyn Any, &str, Value) -> Result<()> + Send + Sync>;
type ErasedIter = Arc<dyn Fn(&mut dyn Any) -> Vec<Value> + Send + Sync>;

fn downcast<'a, T: Any>(target: &'a mut dyn Any, class: &str) -> Result<&'a mut T> {
    target.downcast_mut::<T>().ok_or_else(|| {
        FatalError::UnsupportedOperation(format!("host object is not a {}", class)).into()
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Signatures and Overloads
// ═══════════════════════════════════════════════════════════════════════

/// Declared shape of a host method.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    /// Number of declared parameters
    pub arity: usize,
    /// Whether surplus arguments are accepted
    pub varargs: bool,
    /// Defaults for the trailing parameters, last parameter last
    pub defaults: Vec<ConstValue>,
}

impl Signature {
    /// A fixed-arity signature.
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            ..Self::default()
        }
    }

    /// Accept any number of arguments beyond the declared ones.
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Defaults for the trailing parameters.
    pub fn defaults(mut self, defaults: impl IntoIterator<Item = ConstValue>) -> Self {
        self.defaults = defaults.into_iter().collect();
        self
    }

    /// Default for parameter `index`, if one is declared.
    fn default_for(&self, index: usize) -> Option<&ConstValue> {
        let first = self.arity.saturating_sub(self.defaults.len());
        index
            .checked_sub(first)
            .and_then(|i| self.defaults.get(i))
    }
}

/// One overload of a host method.
#[derive(Clone)]
pub struct HostMethod {
    signature: Signature,
    imp: ErasedMethod,
}

impl HostMethod {
    /// The declared signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// How a call's argument count was matched to an overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Declared arity equals the argument count
    Exact,
    /// Missing trailing arguments are filled from defaults or null
    Padded,
    /// Surplus arguments go to a variadic overload
    Variadic,
    /// Surplus arguments are dropped
    Truncated,
}

/// All overloads sharing one method name, ordered by arity.
#[derive(Clone)]
pub struct MethodGroup {
    name: String,
    overloads: Vec<HostMethod>,
}

impl MethodGroup {
    fn new(name: String) -> Self {
        Self {
            name,
            overloads: Vec::new(),
        }
    }

    /// Add an overload; a second overload with the same arity and
    /// variadic flag is ignored.
    fn add(&mut self, method: HostMethod) {
        let sig = &method.signature;
        let taken = self
            .overloads
            .iter()
            .any(|m| m.signature.arity == sig.arity && m.signature.varargs == sig.varargs);
        if !taken {
            self.overloads.push(method);
            self.overloads
                .sort_by_key(|m| (m.signature.arity, m.signature.varargs));
        }
    }

    /// The method name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arities, ascending.
    pub fn arities(&self) -> Vec<usize> {
        self.overloads.iter().map(|m| m.signature.arity).collect()
    }

    /// Pick the overload for a call with `argc` arguments.
    ///
    /// In order: an exact arity match; the smallest arity above `argc`;
    /// the variadic overload with the highest arity; the highest arity.
    pub fn select(&self, argc: usize) -> Option<(&HostMethod, Selection)> {
        if let Some(m) = self.overloads.iter().find(|m| m.signature.arity == argc) {
            return Some((m, Selection::Exact));
        }
        if let Some(m) = self.overloads.iter().find(|m| m.signature.arity > argc) {
            return Some((m, Selection::Padded));
        }
        if let Some(m) = self.overloads.iter().rev().find(|m| m.signature.varargs) {
            return Some((m, Selection::Variadic));
        }
        self.overloads
            .last()
            .map(|m| (m, Selection::Truncated))
    }

    /// Resolve the overload, shape the arguments to it, and call it.
    pub fn invoke(&self, env: &mut Env, target: &mut dyn Any, args: &[Value]) -> Result<Value> {
        let (method, selection) = self.select(args.len()).ok_or_else(|| {
            RuntimeError::NotCallable(format!("{}() has no overloads", self.name))
        })?;
        let sig = &method.signature;
        let shaped: Vec<Value> = match selection {
            Selection::Exact | Selection::Variadic => args.to_vec(),
            Selection::Padded => {
                let mut shaped = args.to_vec();
                for i in args.len()..sig.arity {
                    match sig.default_for(i) {
                        Some(default) => shaped.push(default.to_value()),
                        None => {
                            env.warn(format!("Missing argument {} for {}()", i + 1, self.name));
                            shaped.push(Value::Null);
                        }
                    }
                }
                shaped
            }
            Selection::Truncated => {
                env.warn(format!(
                    "{}() expects at most {} arguments, {} given",
                    self.name,
                    sig.arity,
                    args.len()
                ));
                args[..sig.arity].to_vec()
            }
        };
        (method.imp)(env, target, &shaped)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Descriptor
// ═══════════════════════════════════════════════════════════════════════

/// Memoized description of one host type.
pub struct ForeignClassDef {
    name: String,
    parent: Option<Arc<ForeignClassDef>>,
    interfaces: Vec<String>,
    constants: HashMap<String, ConstValue>,
    methods: HashMap<String, MethodGroup>,
    constructor: Option<(Signature, ErasedCtor)>,
    getters: HashMap<String, ErasedGetter>,
    setters: HashMap<String, ErasedSetter>,
    fallback_get: Option<ErasedFallbackGet>,
    fallback_set: Option<ErasedFallbackSet>,
    iterator: Option<ErasedIter>,
}

impl ForeignClassDef {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent descriptor, if the type declared one.
    pub fn parent(&self) -> Option<&Arc<ForeignClassDef>> {
        self.parent.as_ref()
    }

    /// Implemented interfaces, own first.
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// `instanceof` check over the parent chain and interfaces.
    pub fn is_a(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.interfaces.iter().any(|i| i.eq_ignore_ascii_case(name))
            || self.parent.as_ref().is_some_and(|p| p.is_a(name))
    }

    /// Method group by case-insensitive name.
    pub fn find_method(&self, name: &str) -> Option<&MethodGroup> {
        self.methods.get(&name.to_lowercase())
    }

    /// Method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.values().map(MethodGroup::name).collect();
        names.sort_unstable();
        names
    }

    /// Constant value, including inherited and interface constants.
    pub fn get_constant(&self, name: &str) -> Result<Value> {
        self.constants
            .get(name)
            .map(ConstValue::to_value)
            .ok_or_else(|| {
                RuntimeError::UnknownConstant {
                    class: self.name.clone(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Whether the type can be constructed from scripts.
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Whether the type has a default iteration method.
    pub fn is_iterable(&self) -> bool {
        self.iterator.is_some()
    }

    /// Construct a new host instance.
    pub fn construct(self: &Arc<Self>, env: &mut Env, args: &[Value]) -> Result<ForeignValue> {
        let (sig, ctor) = self.constructor.as_ref().ok_or_else(|| {
            RuntimeError::NotCallable(format!("{} has no public constructor", self.name))
        })?;
        if args.len() < sig.arity && !sig.varargs {
            let mut padded = args.to_vec();
            for i in args.len()..sig.arity {
                padded.push(sig.default_for(i).map(ConstValue::to_value).unwrap_or_default());
            }
            let inner = ctor(env, &padded)?;
            return Ok(ForeignValue::from_parts(Arc::clone(self), inner));
        }
        let inner = ctor(env, args)?;
        Ok(ForeignValue::from_parts(Arc::clone(self), inner))
    }

    pub(crate) fn get_property(&self, target: &mut dyn Any, name: &str) -> Option<Value> {
        if let Some(getter) = self.getters.get(name) {
            return match getter(target) {
                Ok(v) => Some(v),
                Err(err) => {
                    tracing::debug!(class = %self.name, property = name, error = %err, "Host getter failed");
                    None
                }
            };
        }
        self.fallback_get.as_ref().and_then(|f| f(target, name))
    }

    pub(crate) fn set_property(&self, target: &mut dyn Any, name: &str, value: Value) -> bool {
        let result = match (self.setters.get(name), &self.fallback_set) {
            (Some(setter), _) => setter(target, value),
            (None, Some(fallback)) => fallback(target, name, value),
            (None, None) => return false,
        };
        if let Err(err) = result {
            tracing::debug!(class = %self.name, property = name, error = %err, "Host setter failed");
            return false;
        }
        true
    }

    /// Declared property names, sorted.
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.getters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn iterate(&self, target: &mut dyn Any) -> Option<Vec<Value>> {
        self.iterator.as_ref().map(|f| f(target))
    }
}

impl std::fmt::Debug for ForeignClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignClassDef")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .field("constants", &self.constants.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════

/// Collects the description of host type `T`.
///
/// Own entries take precedence over interface constants, which take
/// precedence over anything inherited. Within one level the first
/// declaration of a name wins.
pub struct HostClassBuilder<'r, T> {
    registry: &'r ForeignRegistry,
    parent: Option<Arc<ForeignClassDef>>,
    inherited_methods: Vec<(String, HostMethod)>,
    inherited_getters: Vec<(String, ErasedGetter)>,
    inherited_setters: Vec<(String, ErasedSetter)>,
    inherited_fallbacks: (Option<ErasedFallbackGet>, Option<ErasedFallbackSet>),
    inherited_iterator: Option<ErasedIter>,
    inherited_constants: HashMap<String, ConstValue>,
    interfaces: Vec<String>,
    interface_constants: Vec<(String, ConstValue)>,
    constants: Vec<(String, ConstValue)>,
    methods: Vec<(String, HostMethod)>,
    constructor: Option<(Signature, ErasedCtor)>,
    getters: Vec<(String, ErasedGetter)>,
    setters: Vec<(String, ErasedSetter)>,
    fallback_get: Option<ErasedFallbackGet>,
    fallback_set: Option<ErasedFallbackSet>,
    iterator: Option<ErasedIter>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<'r, T: HostClass> HostClassBuilder<'r, T> {
    fn new(registry: &'r ForeignRegistry) -> Self {
        Self {
            registry,
            parent: None,
            inherited_methods: Vec::new(),
            inherited_getters: Vec::new(),
            inherited_setters: Vec::new(),
            inherited_fallbacks: (None, None),
            inherited_iterator: None,
            inherited_constants: HashMap::new(),
            interfaces: Vec::new(),
            interface_constants: Vec::new(),
            constants: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            getters: Vec::new(),
            setters: Vec::new(),
            fallback_get: None,
            fallback_set: None,
            iterator: None,
            _marker: PhantomData,
        }
    }

    /// Declare a constant.
    pub fn constant(&mut self, name: &str, value: impl Into<ConstValue>) -> &mut Self {
        self.constants.push((name.to_string(), value.into()));
        self
    }

    /// Declare a fixed-arity method. Repeating a name adds an overload.
    pub fn method<F>(&mut self, name: &str, arity: usize, f: F) -> &mut Self
    where
        F: Fn(&mut Env, &mut T, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.method_with(name, Signature::new(arity), f)
    }

    /// Declare a method with a full signature.
    pub fn method_with<F>(&mut self, name: &str, signature: Signature, f: F) -> &mut Self
    where
        F: Fn(&mut Env, &mut T, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let imp: ErasedMethod = Arc::new(
            move |env: &mut Env, target: &mut dyn Any, args: &[Value]| {
                f(env, downcast::<T>(target, T::NAME)?, args)
            },
        );
        self.methods
            .push((name.to_string(), HostMethod { signature, imp }));
        self
    }

    /// Declare the constructor. Only the first declaration is kept.
    pub fn constructor<F>(&mut self, signature: Signature, f: F) -> &mut Self
    where
        F: Fn(&mut Env, &[Value]) -> Result<T> + Send + Sync + 'static,
    {
        if self.constructor.is_none() {
            let ctor: ErasedCtor = Arc::new(move |env: &mut Env, args: &[Value]| {
                let instance: Rc<RefCell<dyn Any>> = Rc::new(RefCell::new(f(env, args)?));
                Ok(instance)
            });
            self.constructor = Some((signature, ctor));
        }
        self
    }

    /// Expose a readable property.
    pub fn getter<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        let getter: ErasedGetter = Arc::new(move |target: &mut dyn Any| {
            f(downcast::<T>(target, T::NAME)?)
        });
        self.getters.push((name.to_string(), getter));
        self
    }

    /// Expose a writable property.
    pub fn setter<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let setter: ErasedSetter = Arc::new(move |target: &mut dyn Any, value: Value| {
            f(downcast::<T>(target, T::NAME)?, value)
        });
        self.setters.push((name.to_string(), setter));
        self
    }

    /// Read any property without a dedicated getter.
    pub fn fallback_getter<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&T, &str) -> Option<Value> + Send + Sync + 'static,
    {
        self.fallback_get = Some(Arc::new(move |target: &mut dyn Any, name: &str| {
            target.downcast_mut::<T>().and_then(|t| f(t, name))
        }));
        self
    }

    /// Write any property without a dedicated setter.
    pub fn fallback_setter<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut T, &str, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.fallback_set = Some(Arc::new(
            move |target: &mut dyn Any, name: &str, value: Value| {
                f(downcast::<T>(target, T::NAME)?, name, value)
            },
        ));
        self
    }

    /// Default iteration: the values a `foreach` over the object visits.
    pub fn iterator<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        self.iterator = Some(Arc::new(move |target: &mut dyn Any| {
            target.downcast_mut::<T>().map(|t| f(t)).unwrap_or_default()
        }));
        self
    }

    /// Inherit everything `P` declares, reached through `upcast`.
    pub fn inherits<P: HostClass>(&mut self, upcast: fn(&mut T) -> &mut P) -> &mut Self {
        let parent = self.registry.get_or_describe::<P>();

        for group in parent.methods.values() {
            for overload in &group.overloads {
                let inner = Arc::clone(&overload.imp);
                let imp: ErasedMethod = Arc::new(
                    move |env: &mut Env, target: &mut dyn Any, args: &[Value]| {
                        let t = downcast::<T>(target, T::NAME)?;
                        inner(env, upcast(t), args)
                    },
                );
                self.inherited_methods.push((
                    group.name.clone(),
                    HostMethod {
                        signature: overload.signature.clone(),
                        imp,
                    },
                ));
            }
        }
        for (name, getter) in &parent.getters {
            let inner = Arc::clone(getter);
            let lifted: ErasedGetter = Arc::new(move |target: &mut dyn Any| {
                let t = downcast::<T>(target, T::NAME)?;
                inner(upcast(t))
            });
            self.inherited_getters.push((name.clone(), lifted));
        }
        for (name, setter) in &parent.setters {
            let inner = Arc::clone(setter);
            let lifted: ErasedSetter = Arc::new(move |target: &mut dyn Any, value: Value| {
                let t = downcast::<T>(target, T::NAME)?;
                inner(upcast(t), value)
            });
            self.inherited_setters.push((name.clone(), lifted));
        }
        if let Some(inner) = parent.fallback_get.clone() {
            self.inherited_fallbacks.0 = Some(Arc::new(move |target: &mut dyn Any, name: &str| {
                let t = target.downcast_mut::<T>()?;
                inner(upcast(t), name)
            }));
        }
        if let Some(inner) = parent.fallback_set.clone() {
            self.inherited_fallbacks.1 = Some(Arc::new(
                move |target: &mut dyn Any, name: &str, value: Value| {
                    let t = downcast::<T>(target, T::NAME)?;
                    inner(upcast(t), name, value)
                },
            ));
        }
        if let Some(inner) = parent.iterator.clone() {
            self.inherited_iterator = Some(Arc::new(move |target: &mut dyn Any| {
                match target.downcast_mut::<T>() {
                    Some(t) => inner(upcast(t)),
                    None => Vec::new(),
                }
            }));
        }
        self.inherited_constants = parent.constants.clone();
        self.parent = Some(parent);
        self
    }

    /// Declare an implemented interface and take over its constants.
    pub fn implements<I: HostInterface>(&mut self) -> &mut Self {
        self.interfaces.push(I::NAME.to_string());
        for (name, value) in I::constants() {
            self.interface_constants.push((name.to_string(), value));
        }
        self
    }

    fn build(self) -> ForeignClassDef {
        let mut constants = self.inherited_constants;
        let mut layer = HashMap::new();
        for (name, value) in self.interface_constants {
            layer.entry(name).or_insert(value);
        }
        constants.extend(layer);
        let mut layer = HashMap::new();
        for (name, value) in self.constants {
            layer.entry(name).or_insert(value);
        }
        constants.extend(layer);

        // Own overloads are grouped first so they shadow inherited ones of
        // the same arity; other inherited arities join the group.
        let methods = group_methods(self.methods.into_iter().chain(self.inherited_methods));

        let mut getters: HashMap<String, ErasedGetter> = self.inherited_getters.into_iter().collect();
        getters.extend(first_wins(self.getters));
        let mut setters: HashMap<String, ErasedSetter> = self.inherited_setters.into_iter().collect();
        setters.extend(first_wins(self.setters));

        let mut interfaces = self.interfaces;
        if let Some(parent) = &self.parent {
            interfaces.extend(parent.interfaces.iter().cloned());
        }

        ForeignClassDef {
            name: T::NAME.to_string(),
            parent: self.parent,
            interfaces,
            constants,
            methods,
            constructor: self.constructor,
            getters,
            setters,
            fallback_get: self.fallback_get.or(self.inherited_fallbacks.0),
            fallback_set: self.fallback_set.or(self.inherited_fallbacks.1),
            iterator: self.iterator.or(self.inherited_iterator),
        }
    }
}

fn group_methods(
    methods: impl IntoIterator<Item = (String, HostMethod)>,
) -> HashMap<String, MethodGroup> {
    let mut groups: HashMap<String, MethodGroup> = HashMap::new();
    for (name, method) in methods {
        groups
            .entry(name.to_lowercase())
            .or_insert_with(|| MethodGroup::new(name.clone()))
            .add(method);
    }
    groups
}

fn first_wins<V>(entries: Vec<(String, V)>) -> HashMap<String, V> {
    let mut map = HashMap::new();
    for (name, value) in entries {
        map.entry(name).or_insert(value);
    }
    map
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Thread-safe cache of host class descriptors, one per Rust type.
#[derive(Default)]
pub struct ForeignRegistry {
    classes: DashMap<TypeId, Arc<ForeignClassDef>>,
}

impl ForeignRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor for `T`, describing it on first use.
    ///
    /// Describing runs without holding a lock. If two threads race, both
    /// build a descriptor and the first one inserted is kept.
    pub fn get_or_describe<T: HostClass>(&self) -> Arc<ForeignClassDef> {
        let id = TypeId::of::<T>();
        if let Some(def) = self.classes.get(&id) {
            return Arc::clone(def.value());
        }

        tracing::debug!(class = T::NAME, "Describing host class");
        let mut builder = HostClassBuilder::<T>::new(self);
        T::describe(&mut builder);
        let def = Arc::new(builder.build());

        let entry = self.classes.entry(id).or_insert(def);
        Arc::clone(entry.value())
    }

    /// Wrap a host value.
    pub fn wrap<T: HostClass>(&self, value: T) -> ForeignValue {
        let def = self.get_or_describe::<T>();
        let inner: Rc<RefCell<dyn Any>> = Rc::new(RefCell::new(value));
        ForeignValue::from_parts(def, inner)
    }

    /// Number of described types.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if nothing has been described yet.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl std::fmt::Debug for ForeignRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignRegistry")
            .field("classes", &self.classes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pad;

    impl HostClass for Pad {
        const NAME: &'static str = "Pad";

        fn describe(b: &mut HostClassBuilder<'_, Self>) {
            b.method("fill", 1, |_, _, args| Ok(Value::Long(args.len() as i64)))
                .method_with(
                    "fill",
                    Signature::new(3).defaults([ConstValue::from(7)]),
                    |_, _, args| Ok(Value::list(args.to_vec())),
                )
                .method("fill", 1, |_, _, _| Ok(Value::Null));
        }
    }

    #[test]
    fn test_selection_order() {
        let registry = ForeignRegistry::new();
        let def = registry.get_or_describe::<Pad>();
        let group = def.find_method("FILL").unwrap();
        assert_eq!(group.arities(), vec![1, 3]);
        assert_eq!(group.select(1).unwrap().1, Selection::Exact);
        let (m, sel) = group.select(2).unwrap();
        assert_eq!((m.signature().arity, sel), (3, Selection::Padded));
        let (m, sel) = group.select(0).unwrap();
        assert_eq!((m.signature().arity, sel), (1, Selection::Padded));
        let (m, sel) = group.select(5).unwrap();
        assert_eq!((m.signature().arity, sel), (3, Selection::Truncated));
    }

    #[test]
    fn test_defaults_cover_trailing_params() {
        let sig = Signature::new(3).defaults([ConstValue::from(1), ConstValue::from(2)]);
        assert!(sig.default_for(0).is_none());
        assert!(matches!(sig.default_for(1), Some(ConstValue::Long(1))));
        assert!(matches!(sig.default_for(2), Some(ConstValue::Long(2))));
    }

    #[test]
    fn test_descriptor_is_memoized() {
        let registry = ForeignRegistry::new();
        let a = registry.get_or_describe::<Pad>();
        let b = registry.get_or_describe::<Pad>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }
}
