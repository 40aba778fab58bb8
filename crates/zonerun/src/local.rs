//! # Local Zone
//!
//! An in-process [`NativeZone`] that runs Rust handlers on the calling thread.
//!
//! It speaks the full protocol: arguments are unmarshalled against the
//! request's transport context, so shared references arrive as the very same
//! allocations, and return values are marshalled into a fresh respondent
//! context that travels back as the response's `ContextHandle`.
//!
//! Timeouts carried in requests are not enforced; handlers run to completion.

use std::sync::Arc;
use std::sync::Mutex;

use dashmap::DashMap;
use zonepack::Codec;
use zonepack::JsonCodec;
use zonepack::TransportContext;
use zonepack::Value;

use crate::native::Completion;
use crate::native::NativeZone;
use crate::protocol::ExecuteRequest;
use crate::protocol::ExecuteResponse;
use crate::protocol::ResponseCode;
use crate::protocol::SUCCESS;
use crate::registry::FUNCTION_MODULE;
use crate::registry::FunctionRegistry;

/// Response codes produced by [`LocalZone`].
pub mod code {
    use crate::protocol::ResponseCode;

    /// The handler returned an error.
    pub const HANDLER_FAILED: ResponseCode = 1;
    /// No handler is registered for the target.
    pub const TARGET_NOT_FOUND: ResponseCode = 2;
    /// An argument could not be unmarshalled.
    pub const BAD_ARGUMENTS: ResponseCode = 3;
    /// The return value could not be marshalled.
    pub const BAD_RESULT: ResponseCode = 4;
}

/// A function body: takes decoded arguments, returns a value or an error message.
pub type Handler = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

type BroadcastHandler = Arc<dyn Fn(&str) -> ResponseCode + Send + Sync>;

/// In-process zone backed by registered handlers.
pub struct LocalZone {
    id: String,
    codec: Arc<dyn Codec>,
    registry: FunctionRegistry,
    modules: DashMap<(String, String), Handler>,
    literals: DashMap<String, Handler>,
    on_broadcast: Option<BroadcastHandler>,
    broadcasts: Mutex<Vec<String>>,
}

impl LocalZone {
    /// Creates a zone that resolves function literals through `registry`.
    ///
    /// Pass the same registry to the [`Zone`](crate::zone::Zone) facade.
    /// Uses the default [`JsonCodec`] until [`with_codec`](Self::with_codec) is called.
    pub fn new(id: impl Into<String>, registry: FunctionRegistry) -> Self {
        Self {
            id: id.into(),
            codec: Arc::new(JsonCodec::new()),
            registry,
            modules: DashMap::new(),
            literals: DashMap::new(),
            on_broadcast: None,
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    /// Decodes arguments and encodes results with `codec`.
    ///
    /// Should match the codec of the facade in front of this zone.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Exposes `handler` as `module.function`.
    pub fn define<F>(&self, module: impl Into<String>, function: impl Into<String>, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.modules.insert((module.into(), function.into()), Arc::new(handler));
    }

    /// Uses `handler` as the body of every function literal with this exact source.
    pub fn define_literal<F>(&self, source: impl Into<String>, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.literals.insert(source.into(), Arc::new(handler));
    }

    /// Decides the response code of every broadcast. Defaults to success.
    pub fn on_broadcast<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> ResponseCode + Send + Sync + 'static,
    {
        self.on_broadcast = Some(Arc::new(handler));
        self
    }

    /// Sources broadcast so far, in arrival order.
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn handler(&self, module: &str, function: &str) -> Option<Handler> {
        if module == FUNCTION_MODULE {
            let literal = self.registry.get(function)?;
            return self.literals.get(literal.source()).map(|h| Arc::clone(h.value()));
        }
        self.modules
            .get(&(module.to_string(), function.to_string()))
            .map(|h| Arc::clone(h.value()))
    }

    fn dispatch(&self, request: ExecuteRequest) -> ExecuteResponse {
        let ExecuteRequest { module, function, arguments, transport_context, .. } = request;

        let Some(handler) = self.handler(&module, &function) else {
            return ExecuteResponse::failure(
                code::TARGET_NOT_FOUND,
                format!("function '{}' not found in module '{}'", function, module),
            );
        };

        let args = match arguments
            .iter()
            .map(|payload| self.codec.unmarshall(payload, &transport_context))
            .collect::<zonepack::Result<Vec<_>>>()
        {
            Ok(args) => args,
            Err(e) => return ExecuteResponse::failure(code::BAD_ARGUMENTS, e.to_string()),
        };

        let value = match handler(args.as_slice()) {
            Ok(value) => value,
            Err(message) => return ExecuteResponse::failure(code::HANDLER_FAILED, message),
        };

        let mut respondent = TransportContext::new();
        match self.codec.marshall(&value, &mut respondent) {
            Ok(payload) => ExecuteResponse::success(payload, Some(respondent.into_handle())),
            Err(e) => ExecuteResponse::failure(code::BAD_RESULT, e.to_string()),
        }
    }

    fn run_broadcast(&self, source: String) -> ResponseCode {
        let code = self.on_broadcast.as_ref().map_or(SUCCESS, |h| h(source.as_str()));
        self.broadcasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(source);
        code
    }
}

impl NativeZone for LocalZone {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn execute(&self, request: ExecuteRequest, on_complete: Completion<ExecuteResponse>) {
        on_complete(self.dispatch(request));
    }

    fn execute_sync(&self, request: ExecuteRequest) -> ExecuteResponse {
        self.dispatch(request)
    }

    fn broadcast(&self, source: String, on_complete: Completion<ResponseCode>) {
        on_complete(self.run_broadcast(source));
    }

    fn broadcast_sync(&self, source: String) -> ResponseCode {
        self.run_broadcast(source)
    }
}
