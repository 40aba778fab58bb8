//! Lazily decoded execute results.

use std::sync::Arc;
use std::sync::OnceLock;

use zonepack::Codec;
use zonepack::TransportContext;
use zonepack::Value;

use crate::error::Result;

/// The successful outcome of an execute call.
///
/// The payload is decoded on the first call to [`value`](Self::value) and the
/// outcome, success or failure, is cached for every later call.
pub struct ExecuteResult {
    payload: String,
    transport_context: TransportContext,
    codec: Arc<dyn Codec>,
    value: OnceLock<zonepack::Result<Value>>,
}

impl ExecuteResult {
    pub fn new(payload: impl Into<String>, transport_context: TransportContext, codec: Arc<dyn Codec>) -> Self {
        Self {
            payload: payload.into(),
            transport_context,
            codec,
            value: OnceLock::new(),
        }
    }

    /// The raw, undecoded return payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The context shared references in the payload resolve against.
    pub fn transport_context(&self) -> &TransportContext {
        &self.transport_context
    }

    /// Decodes the payload once and returns the cached outcome.
    pub fn value(&self) -> Result<&Value> {
        let decoded = self.value.get_or_init(|| {
            tracing::trace!(len = self.payload.len(), "decoding execute result");
            self.codec.unmarshall(&self.payload, &self.transport_context)
        });

        match decoded {
            Ok(value) => Ok(value),
            Err(e) => Err(e.clone().into()),
        }
    }

    /// Consumes the result, returning the decoded value.
    pub fn into_value(self) -> Result<Value> {
        let Self { payload, transport_context, codec, value } = self;
        let decoded = match value.into_inner() {
            Some(decoded) => decoded,
            None => codec.unmarshall(&payload, &transport_context),
        };
        Ok(decoded?)
    }
}

impl std::fmt::Debug for ExecuteResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteResult")
            .field("payload", &self.payload)
            .field("transport_context", &self.transport_context)
            .field("decoded", &self.value.get().is_some())
            .finish()
    }
}
