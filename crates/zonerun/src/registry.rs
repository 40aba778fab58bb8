//! # Function Registry
//!
//! Stores function literals under generated names so that a call can refer to
//! them as `(FUNCTION_MODULE, name)`. The isolate-side dispatcher resolves the
//! name back to source with [`FunctionRegistry::get`].
//!
//! Entries are never removed. An isolate may keep a generated name around for
//! as long as it lives, so growth is unbounded for the registry's lifetime.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use zonepack::Function;

/// Reserved module name for calls targeting a registered function literal.
pub const FUNCTION_MODULE: &str = "__function";

static GLOBAL: OnceLock<FunctionRegistry> = OnceLock::new();

/// Append-only map from generated name to function literal.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct FunctionRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    tag: u32,
    next: AtomicU64,
    functions: DashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tag: rand::random(),
                next: AtomicU64::new(1),
                functions: DashMap::new(),
            }),
        }
    }

    /// The process-wide registry used by zones built without one.
    pub fn global() -> &'static FunctionRegistry {
        GLOBAL.get_or_init(FunctionRegistry::new)
    }

    /// Stores `function` under a fresh name and returns the name.
    ///
    /// Names are never reused, even for identical sources.
    pub fn save(&self, function: &Function) -> String {
        let seq = self.inner.next.fetch_add(1, Ordering::Relaxed);
        let name = format!("fn_{:08x}_{}", self.inner.tag, seq);
        self.inner.functions.insert(name.clone(), function.clone());
        tracing::trace!(name = %name, "registered function literal");
        name
    }

    /// Looks up a function by generated name.
    pub fn get(&self, name: &str) -> Option<Function> {
        self.inner.functions.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.functions.is_empty()
    }

    /// Whether two handles share the same entries.
    pub fn same_registry(&self, other: &FunctionRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("tag", &format_args!("{:08x}", self.inner.tag))
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_generates_fresh_names() {
        let registry = FunctionRegistry::new();
        let f = Function::new("x => x + 1");

        let a = registry.save(&f);
        let b = registry.save(&f);

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&a), Some(f.clone()));
        assert_eq!(registry.get(&b), Some(f));
    }

    #[test]
    fn test_get_unknown_name() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("fn_missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = FunctionRegistry::new();
        let clone = registry.clone();
        let name = clone.save(&Function::new("() => 0"));

        assert!(registry.same_registry(&clone));
        assert!(registry.get(&name).is_some());
    }

    #[test]
    fn test_global_is_a_singleton() {
        assert!(FunctionRegistry::global().same_registry(FunctionRegistry::global()));
    }
}
