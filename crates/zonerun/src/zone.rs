//! # Zone
//!
//! The caller-facing facade over a native zone. Shapes calls into requests,
//! dispatches them, and wraps responses into lazy results.
//!
//! ## Invariants
//!
//! - A request is only handed to the native zone once every argument has been
//!   marshalled; a marshalling failure sends nothing.
//! - Each asynchronous call resolves exactly once, from the native completion.
//! - Sync and async variants classify failures identically.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use zonepack::Codec;
use zonepack::TransportContext;

use crate::builder::ZoneBuilder;
use crate::call::Broadcast;
use crate::call::Call;
use crate::call::Target;
use crate::error::Result;
use crate::native::NativeZone;
use crate::pending::Pending;
use crate::protocol::ExecuteRequest;
use crate::protocol::ExecuteResponse;
use crate::protocol::ResponseCode;
use crate::protocol::broadcast_outcome;
use crate::registry::FUNCTION_MODULE;
use crate::registry::FunctionRegistry;
use crate::result::ExecuteResult;

/// Kind of zone, as reported in its descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Isolate,
}

/// Serializable identity of a zone: `{"id": ..., "type": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ZoneKind,
}

/// A pool of isolates addressed through execute and broadcast calls.
pub struct Zone {
    id: String,
    native: Arc<dyn NativeZone>,
    registry: FunctionRegistry,
    codec: Arc<dyn Codec>,
}

impl Zone {
    /// Wraps `native` with the global function registry and the default codec.
    pub fn new(native: Arc<dyn NativeZone>) -> Self {
        ZoneBuilder::new(native).build()
    }

    pub fn builder(native: Arc<dyn NativeZone>) -> ZoneBuilder {
        ZoneBuilder::new(native)
    }

    pub(crate) fn from_parts(native: Arc<dyn NativeZone>, registry: FunctionRegistry, codec: Arc<dyn Codec>) -> Self {
        Self {
            id: native.id(),
            native,
            registry,
            codec,
        }
    }

    /// The zone id, fixed at construction.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn descriptor(&self) -> ZoneDescriptor {
        ZoneDescriptor {
            id: self.id.clone(),
            kind: ZoneKind::Isolate,
        }
    }

    /// Dispatches `call` and returns its eventual result.
    ///
    /// Marshalling failures settle the returned `Pending` immediately and never
    /// reach the native zone. No timeout is enforced here beyond the one carried
    /// in the request.
    pub fn execute(&self, call: Call) -> Pending<ExecuteResult> {
        let request = match self.build_request(call) {
            Ok(request) => request,
            Err(e) => return Pending::ready(Err(e)),
        };

        let (resolver, pending) = Pending::channel();
        let codec = Arc::clone(&self.codec);
        let zone_id = self.id.clone();

        self.native.execute(request, Box::new(move |response: ExecuteResponse| {
            if !response.is_success() {
                tracing::warn!(zone = %zone_id, code = response.code, "execute failed");
            }
            resolver.resolve(response.into_result(codec));
        }));

        pending
    }

    /// Like [`execute`](Self::execute), but blocks until the native zone responds.
    ///
    /// Must not be called from a context that has to stay responsive, such as a
    /// completion callback of the same zone.
    pub fn execute_sync(&self, call: Call) -> Result<ExecuteResult> {
        let request = self.build_request(call)?;
        let response = self.native.execute_sync(request);
        if !response.is_success() {
            tracing::warn!(zone = %self.id, code = response.code, "execute_sync failed");
        }
        response.into_result(Arc::clone(&self.codec))
    }

    /// Runs a source fragment on the zone's isolates.
    pub fn broadcast(&self, broadcast: Broadcast) -> Pending<()> {
        let source = match broadcast.to_source(self.codec.as_ref()) {
            Ok(source) => source,
            Err(e) => return Pending::ready(Err(e)),
        };
        tracing::debug!(zone = %self.id, len = source.len(), "dispatching broadcast");

        let (resolver, pending) = Pending::channel();
        self.native.broadcast(source, Box::new(move |code: ResponseCode| {
            resolver.resolve(broadcast_outcome(code));
        }));

        pending
    }

    /// Like [`broadcast`](Self::broadcast), but blocks until every isolate is done.
    pub fn broadcast_sync(&self, broadcast: Broadcast) -> Result<()> {
        let source = broadcast.to_source(self.codec.as_ref())?;
        tracing::debug!(zone = %self.id, len = source.len(), "dispatching broadcast_sync");
        broadcast_outcome(self.native.broadcast_sync(source))
    }

    fn build_request(&self, call: Call) -> Result<ExecuteRequest> {
        let (target, args, timeout) = call.into_parts();

        let mut transport_context = TransportContext::new();
        let arguments = args
            .iter()
            .map(|arg| self.codec.marshall(arg, &mut transport_context))
            .collect::<zonepack::Result<Vec<_>>>()?;

        let (module, function) = match target {
            Target::Named { module, function } => (module, function),
            Target::Function(function) => (FUNCTION_MODULE.to_string(), self.registry.save(&function)),
        };

        tracing::debug!(
            zone = %self.id,
            module = %module,
            function = %function,
            args = arguments.len(),
            shared = transport_context.len(),
            timeout,
            "dispatching execute"
        );

        Ok(ExecuteRequest {
            module,
            function,
            arguments,
            timeout,
            transport_context,
        })
    }
}

impl Serialize for Zone {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.descriptor().serialize(serializer)
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
