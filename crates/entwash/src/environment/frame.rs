//! RAII scope guard for automatic frame cleanup

use super::Env;

/// RAII guard that pops a frame when dropped.
///
/// Calls push a frame through a guard so the frame is popped on every
/// exit path, including early returns through `?`.
///
/// # Example
///
/// ```
/// use entwash::{Env, Value};
///
/// let mut env = Env::new();
/// env.define("x", Value::Long(1));
///
/// {
///     let mut guard = env.scope_guard();
///     guard.define("y", Value::Long(2));
///     assert!(guard.contains("y"));
/// }
/// // guard dropped, frame popped, y is gone
/// assert!(!env.contains("y"));
/// assert!(env.contains("x"));
/// ```
pub struct ScopeGuard<'a> {
    env: &'a mut Env,
}

impl Env {
    /// Create a scope guard that pushes a frame now and pops it on drop.
    pub fn scope_guard(&mut self) -> ScopeGuard<'_> {
        self.push_frame();
        ScopeGuard { env: self }
    }
}

impl<'a> Drop for ScopeGuard<'a> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}

impl<'a> std::ops::Deref for ScopeGuard<'a> {
    type Target = Env;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl<'a> std::ops::DerefMut for ScopeGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}
