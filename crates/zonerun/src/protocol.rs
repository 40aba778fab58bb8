//! # Execute Protocol
//!
//! The messages exchanged with the native zone for one invocation.
//!
//! ## Invariants
//!
//! - `module` and `function` are always set; function literals use
//!   [`FUNCTION_MODULE`](crate::registry::FUNCTION_MODULE) and a generated name.
//! - A response is a success iff `code == SUCCESS`. On success only
//!   `return_value`/`context_handle` are meaningful, otherwise only `error_message`.

use std::sync::Arc;

use zonepack::Codec;
use zonepack::ContextHandle;
use zonepack::TransportContext;

use crate::error::Error;
use crate::error::Result;
use crate::result::ExecuteResult;

/// Native response code.
pub type ResponseCode = i32;

/// The only successful response code.
pub const SUCCESS: ResponseCode = 0;

/// One invocation handed to the native zone.
#[derive(Debug)]
pub struct ExecuteRequest {
    pub module: String,
    pub function: String,
    /// Marshalled arguments, in call order.
    pub arguments: Vec<String>,
    /// Milliseconds; 0 means no timeout. Enforced natively.
    pub timeout: u32,
    /// Shared references the arguments point at.
    pub transport_context: TransportContext,
}

/// The native zone's answer to an [`ExecuteRequest`].
#[derive(Clone, Debug)]
pub struct ExecuteResponse {
    pub code: ResponseCode,
    pub return_value: String,
    pub context_handle: Option<ContextHandle>,
    pub error_message: String,
}

impl ExecuteResponse {
    pub fn success(return_value: impl Into<String>, context_handle: Option<ContextHandle>) -> Self {
        Self {
            code: SUCCESS,
            return_value: return_value.into(),
            context_handle,
            error_message: String::new(),
        }
    }

    pub fn failure(code: ResponseCode, error_message: impl Into<String>) -> Self {
        Self {
            code,
            return_value: String::new(),
            context_handle: None,
            error_message: error_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS
    }

    /// Classifies the response, wrapping a success into a lazy result.
    pub(crate) fn into_result(self, codec: Arc<dyn Codec>) -> Result<ExecuteResult> {
        if !self.is_success() {
            return Err(Error::NativeExecutionFailure {
                code: self.code,
                message: self.error_message,
            });
        }

        let context = match self.context_handle {
            Some(token) => TransportContext::from_handle(token),
            None => TransportContext::new(),
        };
        Ok(ExecuteResult::new(self.return_value, context, codec))
    }
}

/// Classifies a broadcast response code.
pub(crate) fn broadcast_outcome(code: ResponseCode) -> Result<()> {
    if code == SUCCESS {
        Ok(())
    } else {
        Err(Error::NativeExecutionFailure {
            code,
            message: format!("broadcast failed with response code: {}", code),
        })
    }
}
