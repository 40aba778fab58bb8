//! # Transport Context
//!
//! Per-call bookkeeping for shared references.
//!
//! The caller creates an empty context for each outbound call, registers every
//! shared argument in it and moves it into the request. The respondent does the
//! same for its return value and publishes the result as a [`ContextHandle`],
//! which the caller turns back into a context with [`TransportContext::from_handle`].
//!
//! ## Invariants
//!
//! - Handles are assigned monotonically from 1 and never reused within a context.
//! - A shared allocation is registered at most once per context; registering it
//!   again returns the handle it already has.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::error::Error;
use crate::error::Result;
use crate::value::SharedRef;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a shared reference inside one context.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Where a context came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Created empty for an outbound call.
    Outbound,
    /// Rehydrated from the `ContextHandle` with this id.
    Inbound(u64),
}

/// Opaque token that carries a published context back to the caller.
#[derive(Clone, Debug)]
pub struct ContextHandle {
    id: u64,
    entries: Arc<BTreeMap<Handle, SharedRef>>,
}

impl ContextHandle {
    /// Process-unique id of the published context.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of shared references the token carries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry of the shared references a single call moves across the boundary.
#[derive(Debug)]
pub struct TransportContext {
    origin: Origin,
    entries: BTreeMap<Handle, SharedRef>,
    by_addr: HashMap<usize, Handle>,
    next_handle: u64,
}

impl TransportContext {
    /// Creates an empty context for an outbound call.
    pub fn new() -> Self {
        Self {
            origin: Origin::Outbound,
            entries: BTreeMap::new(),
            by_addr: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Rehydrates a context published by the respondent.
    pub fn from_handle(token: ContextHandle) -> Self {
        let entries = Arc::unwrap_or_clone(token.entries);
        let by_addr = entries.iter().map(|(h, r)| (r.addr(), *h)).collect();
        let next_handle = entries.keys().next_back().map_or(1, |h| h.0 + 1);

        Self {
            origin: Origin::Inbound(token.id),
            entries,
            by_addr,
            next_handle,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Registers a shared reference and returns its handle.
    ///
    /// The same allocation always maps to the same handle within this context.
    pub fn register_shared(&mut self, shared: &SharedRef) -> Handle {
        if let Some(handle) = self.by_addr.get(&shared.addr()) {
            return *handle;
        }

        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.by_addr.insert(shared.addr(), handle);
        self.entries.insert(handle, shared.clone());
        handle
    }

    /// Looks up a previously registered shared reference.
    pub fn resolve(&self, handle: Handle) -> Result<SharedRef> {
        self.entries
            .get(&handle)
            .cloned()
            .ok_or(Error::UnknownHandle(handle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered handles in ascending order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.keys().copied()
    }

    /// Publishes this context so it can be handed back across the boundary.
    pub fn into_handle(self) -> ContextHandle {
        ContextHandle {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            entries: Arc::new(self.entries),
        }
    }
}

impl Default for TransportContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_monotonic_handles() {
        let mut ctx = TransportContext::new();
        let a = ctx.register_shared(&SharedRef::new(1u8));
        let b = ctx.register_shared(&SharedRef::new(2u8));

        assert_eq!(a, Handle(1));
        assert_eq!(b, Handle(2));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.origin(), Origin::Outbound);
    }

    #[test]
    fn test_register_same_allocation_twice() {
        let mut ctx = TransportContext::new();
        let shared = SharedRef::new(vec![0u8; 16]);

        let first = ctx.register_shared(&shared);
        let second = ctx.register_shared(&shared.clone());

        assert_eq!(first, second);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_handle() {
        let ctx = TransportContext::new();
        assert_eq!(ctx.resolve(Handle(7)).unwrap_err(), Error::UnknownHandle(Handle(7)));
    }

    #[test]
    fn test_from_handle_keeps_references() {
        let shared = SharedRef::new(String::from("payload"));
        let mut respondent = TransportContext::new();
        let handle = respondent.register_shared(&shared);

        let token = respondent.into_handle();
        let id = token.id();
        let mut ctx = TransportContext::from_handle(token);

        assert_eq!(ctx.origin(), Origin::Inbound(id));
        assert!(ctx.resolve(handle).unwrap().ptr_eq(&shared));

        // Registration continues after the rehydrated handles.
        assert_eq!(ctx.register_shared(&shared), handle);
        assert_eq!(ctx.register_shared(&SharedRef::new(0u8)), Handle(handle.0 + 1));
    }

    #[test]
    fn test_published_ids_are_unique() {
        let a = TransportContext::new().into_handle();
        let b = TransportContext::new().into_handle();
        assert_ne!(a.id(), b.id());
        assert!(a.is_empty());
    }
}
