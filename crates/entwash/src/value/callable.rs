//! Callable value types: native functions, user functions, closures and
//! bound methods

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

use super::array::ArrayValue;
use super::class::ClassDef;
use super::object::ObjectRef;
use super::var::{Argument, Var};
use super::{ConstValue, Value};
use crate::environment::Env;
use crate::error::{Result, RuntimeError};
use crate::foreign::ForeignValue;

/// Native function taking argument values.
pub type NativeFnPtr = Arc<dyn Fn(&mut Env, &[Value]) -> Result<Value> + Send + Sync>;

/// Native function taking arguments that may be references.
pub type NativeRefFnPtr = Arc<dyn Fn(&mut Env, &[Argument]) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
enum NativeImpl {
    Values(NativeFnPtr),
    Refs(NativeRefFnPtr),
}

/// A built-in function implemented in Rust.
#[derive(Clone)]
pub struct NativeFunction {
    /// Function name (for display/debugging)
    pub name: String,

    /// Arity (-1 for variadic)
    pub arity: i32,

    imp: NativeImpl,
}

impl NativeFunction {
    /// Wrap a function over argument values.
    pub fn new<F>(name: impl Into<String>, arity: i32, f: F) -> Self
    where
        F: Fn(&mut Env, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            imp: NativeImpl::Values(Arc::new(f)),
        }
    }

    /// Wrap a function that receives reference arguments as cells.
    pub fn by_ref<F>(name: impl Into<String>, arity: i32, f: F) -> Self
    where
        F: Fn(&mut Env, &[Argument]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            imp: NativeImpl::Refs(Arc::new(f)),
        }
    }

    fn call_with<A: Args + ?Sized>(&self, env: &mut Env, args: &A) -> Result<Value> {
        match &self.imp {
            NativeImpl::Values(f) => f(env, &args.values()),
            NativeImpl::Refs(f) => f(env, &args.arguments()),
        }
    }

    fn ptr(&self) -> *const () {
        match &self.imp {
            NativeImpl::Values(f) => Arc::as_ptr(f) as *const (),
            NativeImpl::Refs(f) => Arc::as_ptr(f) as *const (),
        }
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// User Functions
// ═══════════════════════════════════════════════════════════════════════

/// The executable body of a user function, supplied by the evaluator.
///
/// Parameters, captures and `$this` are already bound in the innermost
/// frame of `env` when `eval` runs.
pub trait Body: Send + Sync {
    /// Run the body and produce its return value.
    fn eval(&self, env: &mut Env) -> Result<Value>;
}

impl<F> Body for F
where
    F: Fn(&mut Env) -> Result<Value> + Send + Sync,
{
    fn eval(&self, env: &mut Env) -> Result<Value> {
        self(env)
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name without the sigil
    pub name: String,
    /// Default used when the argument is missing
    pub default: Option<ConstValue>,
    /// Collects all remaining arguments into an array
    pub variadic: bool,
    /// Binds the caller's cell when passed a reference
    pub by_ref: bool,
}

impl Param {
    /// A required by-value parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            variadic: false,
            by_ref: false,
        }
    }

    /// Give the parameter a default.
    pub fn with_default(mut self, value: impl Into<ConstValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Make the parameter variadic.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Make the parameter by-reference.
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    fn is_required(&self) -> bool {
        self.default.is_none() && !self.variadic
    }
}

/// A function written in the interpreted language.
pub struct UserFunction {
    /// Function name (`{closure}` for anonymous functions)
    pub name: String,
    /// Declared parameters
    pub params: Vec<Param>,
    /// Executable body
    pub body: Arc<dyn Body>,
}

impl UserFunction {
    /// Create a function.
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: impl Body + 'static) -> Self {
        Self {
            name: name.into(),
            params,
            body: Arc::new(body),
        }
    }

    /// Number of leading arguments a caller must supply.
    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .rposition(Param::is_required)
            .map_or(0, |i| i + 1)
    }
}

impl std::fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// A named function: native or user-defined.
#[derive(Clone, Debug)]
pub enum Function {
    /// Built-in
    Native(NativeFunction),
    /// Interpreted
    User(Arc<UserFunction>),
}

impl Function {
    /// The function's name.
    pub fn name(&self) -> &str {
        match self {
            Function::Native(n) => &n.name,
            Function::User(u) => &u.name,
        }
    }

    /// Invoke with an optional receiver bound as `$this`.
    pub fn invoke(&self, env: &mut Env, this: Option<&ObjectRef>, args: &[Value]) -> Result<Value> {
        self.invoke_with(env, this, &[], args)
    }

    /// Invoke with arguments that may be references.
    pub fn invoke_arguments(
        &self,
        env: &mut Env,
        this: Option<&ObjectRef>,
        args: &[Argument],
    ) -> Result<Value> {
        self.invoke_with(env, this, &[], args)
    }

    fn invoke_with<A: Args + ?Sized>(
        &self,
        env: &mut Env,
        this: Option<&ObjectRef>,
        captures: &[Capture],
        args: &A,
    ) -> Result<Value> {
        match self {
            Function::Native(native) => match this {
                None => native.call_with(env, args),
                Some(this) => {
                    let mut scope = env.scope_guard();
                    scope.define("this", Value::Object(this.clone()));
                    native.call_with(&mut scope, args)
                }
            },
            Function::User(func) => call_user(env, func, this, captures, args),
        }
    }

    fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => a.ptr() == b.ptr(),
            (Function::User(a), Function::User(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<NativeFunction> for Function {
    fn from(f: NativeFunction) -> Self {
        Function::Native(f)
    }
}

impl From<UserFunction> for Function {
    fn from(f: UserFunction) -> Self {
        Function::User(Arc::new(f))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Argument Binding
// ═══════════════════════════════════════════════════════════════════════

/// Positional arguments, as values or as possible references.
trait Args {
    fn count(&self) -> usize;
    fn value_at(&self, i: usize) -> Value;
    fn var_at(&self, i: usize, by_ref: bool) -> Var;
    fn values(&self) -> Cow<'_, [Value]>;
    fn arguments(&self) -> Cow<'_, [Argument]>;
}

impl Args for [Value] {
    fn count(&self) -> usize {
        self.len()
    }

    fn value_at(&self, i: usize) -> Value {
        self[i].clone()
    }

    fn var_at(&self, i: usize, _by_ref: bool) -> Var {
        Var::new(self[i].clone())
    }

    fn values(&self) -> Cow<'_, [Value]> {
        Cow::Borrowed(self)
    }

    fn arguments(&self) -> Cow<'_, [Argument]> {
        Cow::Owned(self.iter().cloned().map(Argument::Value).collect())
    }
}

impl Args for [Argument] {
    fn count(&self) -> usize {
        self.len()
    }

    fn value_at(&self, i: usize) -> Value {
        self[i].value()
    }

    fn var_at(&self, i: usize, by_ref: bool) -> Var {
        if by_ref {
            self[i].clone().into_var()
        } else {
            Var::new(self[i].value())
        }
    }

    fn values(&self) -> Cow<'_, [Value]> {
        Cow::Owned(self.iter().map(Argument::value).collect())
    }

    fn arguments(&self) -> Cow<'_, [Argument]> {
        Cow::Borrowed(self)
    }
}

fn call_user<A: Args + ?Sized>(
    env: &mut Env,
    func: &UserFunction,
    this: Option<&ObjectRef>,
    captures: &[Capture],
    args: &A,
) -> Result<Value> {
    env.enter_call()?;
    let result = {
        let mut scope = env.scope_guard();
        bind_and_eval(&mut scope, func, this, captures, args)
    };
    env.exit_call();
    result
}

fn bind_and_eval<A: Args + ?Sized>(
    env: &mut Env,
    func: &UserFunction,
    this: Option<&ObjectRef>,
    captures: &[Capture],
    args: &A,
) -> Result<Value> {
    let required = func.required_count();
    if args.count() < required {
        return Err(RuntimeError::ArityMismatch {
            name: func.name.clone(),
            expected: required,
            got: args.count(),
        }
        .into());
    }

    if let Some(this) = this {
        env.define("this", Value::Object(this.clone()));
    }
    for capture in captures {
        match capture {
            // fresh cell per call, seeded from the frozen value
            Capture::ByValue { name, value } => {
                env.define(name, value.clone());
            }
            Capture::ByRef { name, var } => env.define_var(name, var.clone()),
        }
    }

    for (i, param) in func.params.iter().enumerate() {
        if param.variadic {
            let rest: ArrayValue = (i..args.count()).map(|j| args.value_at(j)).collect();
            env.define(&param.name, Value::Array(rest));
            break;
        }
        if i < args.count() {
            env.define_var(&param.name, args.var_at(i, param.by_ref));
        } else {
            let default = param
                .default
                .as_ref()
                .map(ConstValue::to_value)
                .unwrap_or_default();
            env.define(&param.name, default);
        }
    }

    func.body.eval(env)
}

// ═══════════════════════════════════════════════════════════════════════
// Closures
// ═══════════════════════════════════════════════════════════════════════

/// A captured variable.
#[derive(Clone, Debug)]
pub enum Capture {
    /// Value frozen when the closure was created
    ByValue {
        /// Variable name
        name: String,
        /// Frozen value
        value: Value,
    },
    /// Cell shared with the defining scope
    ByRef {
        /// Variable name
        name: String,
        /// Shared cell
        var: Var,
    },
}

/// An anonymous function with captured variables and an optional `$this`.
pub struct Closure {
    /// The function body and parameters
    pub function: Arc<UserFunction>,
    /// Captured variables
    pub captures: Vec<Capture>,
    /// Bound receiver
    pub this: Option<ObjectRef>,
}

impl Closure {
    /// Create a closure.
    pub fn new(function: Arc<UserFunction>, captures: Vec<Capture>, this: Option<ObjectRef>) -> Self {
        Self {
            function,
            captures,
            this,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Callable
// ═══════════════════════════════════════════════════════════════════════

/// Anything that can be invoked.
#[derive(Clone)]
pub enum Callable {
    /// Named function
    Function(Function),
    /// Closure with captures
    Closure(Rc<Closure>),
    /// Method bound to a receiver
    Method {
        /// Receiver
        receiver: ObjectRef,
        /// Method name
        name: String,
    },
    /// Method called without a receiver
    Static {
        /// Declaring class
        class: Arc<ClassDef>,
        /// Method name
        name: String,
    },
    /// Method of a wrapped host object
    Foreign {
        /// Host object
        target: ForeignValue,
        /// Method name
        name: String,
    },
}

impl Callable {
    /// Display name (`Class::method`, function name, or `Closure`).
    pub fn name(&self) -> String {
        match self {
            Callable::Function(f) => f.name().to_string(),
            Callable::Closure(_) => "Closure".to_string(),
            Callable::Method { receiver, name } => format!("{}::{}", receiver.class_name(), name),
            Callable::Static { class, name } => format!("{}::{}", class.name(), name),
            Callable::Foreign { target, name } => format!("{}::{}", target.class_name(), name),
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => a.ptr_eq(b),
            (Callable::Closure(a), Callable::Closure(b)) => Rc::ptr_eq(a, b),
            (
                Callable::Method { receiver: r1, name: n1 },
                Callable::Method { receiver: r2, name: n2 },
            ) => r1.ptr_eq(r2) && n1.eq_ignore_ascii_case(n2),
            (
                Callable::Static { class: c1, name: n1 },
                Callable::Static { class: c2, name: n2 },
            ) => Arc::ptr_eq(c1, c2) && n1.eq_ignore_ascii_case(n2),
            (
                Callable::Foreign { target: t1, name: n1 },
                Callable::Foreign { target: t2, name: n2 },
            ) => t1.ptr_eq(t2) && n1 == n2,
            _ => false,
        }
    }

    fn dispatch<A: Args + ?Sized>(&self, env: &mut Env, args: &A) -> Result<Value> {
        match self {
            Callable::Function(f) => f.invoke_with(env, None, &[], args),
            Callable::Closure(c) => call_user(env, &c.function, c.this.as_ref(), &c.captures, args),
            Callable::Method { receiver, name } => {
                let class = receiver.class();
                let func = class.get_function(name)?;
                func.invoke_with(env, Some(receiver), &[], args)
            }
            Callable::Static { class, name } => {
                let func = class.get_function(name)?;
                func.invoke_with(env, None, &[], args)
            }
            Callable::Foreign { target, name } => target.call_method(env, name, &args.values()),
        }
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callable({})", self.name())
    }
}

impl From<NativeFunction> for Callable {
    fn from(f: NativeFunction) -> Self {
        Callable::Function(Function::Native(f))
    }
}

impl From<Function> for Callable {
    fn from(f: Function) -> Self {
        Callable::Function(f)
    }
}

impl From<Closure> for Callable {
    fn from(c: Closure) -> Self {
        Callable::Closure(Rc::new(c))
    }
}

/// Uniform call contract.
///
/// `call0`..`call5` are equivalent to `call_args` with a slice of the same
/// arguments.
pub trait Invocable {
    /// Call with any number of argument values.
    fn call_args(&self, env: &mut Env, args: &[Value]) -> Result<Value>;

    /// Call with arguments that may be references.
    fn call_arguments(&self, env: &mut Env, args: &[Argument]) -> Result<Value>;

    /// Call with no arguments.
    fn call0(&self, env: &mut Env) -> Result<Value> {
        self.call_args(env, &[])
    }

    /// Call with one argument.
    fn call1(&self, env: &mut Env, a1: Value) -> Result<Value> {
        self.call_args(env, &[a1])
    }

    /// Call with two arguments.
    fn call2(&self, env: &mut Env, a1: Value, a2: Value) -> Result<Value> {
        self.call_args(env, &[a1, a2])
    }

    /// Call with three arguments.
    fn call3(&self, env: &mut Env, a1: Value, a2: Value, a3: Value) -> Result<Value> {
        self.call_args(env, &[a1, a2, a3])
    }

    /// Call with four arguments.
    fn call4(&self, env: &mut Env, a1: Value, a2: Value, a3: Value, a4: Value) -> Result<Value> {
        self.call_args(env, &[a1, a2, a3, a4])
    }

    /// Call with five arguments.
    fn call5(
        &self,
        env: &mut Env,
        a1: Value,
        a2: Value,
        a3: Value,
        a4: Value,
        a5: Value,
    ) -> Result<Value> {
        self.call_args(env, &[a1, a2, a3, a4, a5])
    }
}

impl Invocable for Callable {
    fn call_args(&self, env: &mut Env, args: &[Value]) -> Result<Value> {
        self.dispatch(env, args)
    }

    fn call_arguments(&self, env: &mut Env, args: &[Argument]) -> Result<Value> {
        self.dispatch(env, args)
    }
}

impl Invocable for Function {
    fn call_args(&self, env: &mut Env, args: &[Value]) -> Result<Value> {
        self.invoke_with(env, None, &[], args)
    }

    fn call_arguments(&self, env: &mut Env, args: &[Argument]) -> Result<Value> {
        self.invoke_with(env, None, &[], args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_count() {
        let f = UserFunction::new(
            "f",
            vec![
                Param::new("a"),
                Param::new("b").with_default(1),
                Param::new("rest").variadic(),
            ],
            |_: &mut Env| Ok(Value::Null),
        );
        assert_eq!(f.required_count(), 1);
    }

    #[test]
    fn test_native_call() {
        let mut env = Env::new();
        let f = Callable::from(NativeFunction::new("count_args", -1, |_, args| {
            Ok(Value::Long(args.len() as i64))
        }));
        assert_eq!(f.call2(&mut env, Value::Null, Value::Null).unwrap(), Value::Long(2));
    }

    #[test]
    fn test_user_function_binds_params() {
        let mut env = Env::new();
        let f = Function::from(UserFunction::new(
            "sum",
            vec![Param::new("a"), Param::new("b").with_default(10)],
            |env: &mut Env| {
                let a = env.get("a").unwrap_or_default().to_long();
                let b = env.get("b").unwrap_or_default().to_long();
                Ok(Value::Long(a + b))
            },
        ));
        assert_eq!(f.call1(&mut env, Value::Long(1)).unwrap(), Value::Long(11));
        assert_eq!(
            f.call2(&mut env, Value::Long(1), Value::Long(2)).unwrap(),
            Value::Long(3)
        );
        assert!(f.call0(&mut env).is_err());
        assert_eq!(env.depth(), 1);
        assert_eq!(env.call_depth(), 0);
    }

    #[test]
    fn test_by_ref_param_writes_back() {
        let mut env = Env::new();
        let f = Function::from(UserFunction::new(
            "inc",
            vec![Param::new("n").by_ref()],
            |env: &mut Env| {
                let n = env.get("n").unwrap_or_default().to_long();
                env.assign("n", Value::Long(n + 1));
                Ok(Value::Null)
            },
        ));
        let var = Var::new(Value::Long(1));
        f.call_arguments(&mut env, &[Argument::Ref(var.clone())]).unwrap();
        assert_eq!(var.get(), Value::Long(2));

        // by value: caller's cell is untouched
        let other = Var::new(Value::Long(1));
        f.call_args(&mut env, &[other.get()]).unwrap();
        assert_eq!(other.get(), Value::Long(1));
    }

    #[test]
    fn test_variadic_collects_rest() {
        let mut env = Env::new();
        let f = Function::from(UserFunction::new(
            "v",
            vec![Param::new("first"), Param::new("rest").variadic()],
            |env: &mut Env| Ok(env.get("rest").unwrap_or_default()),
        ));
        let rest = f
            .call3(&mut env, Value::Long(1), Value::Long(2), Value::Long(3))
            .unwrap();
        match rest {
            Value::Array(a) => assert_eq!(a.values(), vec![Value::Long(2), Value::Long(3)]),
            other => panic!("expected array, got {:?}", other),
        }
    }
}
