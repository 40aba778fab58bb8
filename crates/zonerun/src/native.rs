//! # Native Zone Contract
//!
//! The narrow interface to the isolate pool that actually runs code.
//!
//! ## Philosophy
//!
//! - **Opaque execution**: The pool decides which isolate runs a request and how
//!   timeouts are enforced. Nothing here schedules or evaluates.
//! - **Callback completion**: Asynchronous entry points take a [`Completion`]. Being
//!   `FnOnce`, a completion can deliver at most one response.

use crate::protocol::ExecuteRequest;
use crate::protocol::ExecuteResponse;
use crate::protocol::ResponseCode;

/// One-shot callback the native zone invokes when work completes.
pub type Completion<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// A pool of isolates that can execute requests.
///
/// This trait is object-safe (`Arc<dyn NativeZone>`).
pub trait NativeZone: Send + Sync + 'static {
    /// Stable identifier of the zone.
    fn id(&self) -> String;

    /// Starts executing `request` and calls `on_complete` once with the response.
    ///
    /// Must not block the caller for the duration of the execution.
    fn execute(&self, request: ExecuteRequest, on_complete: Completion<ExecuteResponse>);

    /// Executes `request`, blocking until the response is available.
    fn execute_sync(&self, request: ExecuteRequest) -> ExecuteResponse;

    /// Runs `source` on the zone's isolates and calls `on_complete` once with
    /// the aggregated response code.
    fn broadcast(&self, source: String, on_complete: Completion<ResponseCode>);

    /// Runs `source` on the zone's isolates, blocking until done.
    fn broadcast_sync(&self, source: String) -> ResponseCode;
}
