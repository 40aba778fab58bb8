//! # Zonerun
//!
//! Dispatches code into a zone of isolates and transports values across the
//! isolate boundary.
//!
//! A [`Zone`] shapes a [`Call`] into an [`ExecuteRequest`], hands it to a
//! [`NativeZone`], and wraps the answer into a lazily decoded [`ExecuteResult`].
//! Every entry point comes in an asynchronous form returning a [`Pending`] and
//! a blocking `_sync` form with identical semantics.

pub mod builder;
pub mod call;
pub mod error;
pub mod local;
pub mod mock_pool;
pub mod native;
pub mod pending;
pub mod protocol;
pub mod registry;
pub mod result;
pub mod zone;

pub use zonepack;

pub use builder::ZoneBuilder;
pub use call::Broadcast;
pub use call::Call;
pub use call::Target;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;
pub use local::LocalZone;
pub use native::Completion;
pub use native::NativeZone;
pub use pending::Pending;
pub use protocol::ExecuteRequest;
pub use protocol::ExecuteResponse;
pub use protocol::ResponseCode;
pub use registry::FUNCTION_MODULE;
pub use registry::FunctionRegistry;
pub use result::ExecuteResult;
pub use zone::Zone;
pub use zone::ZoneDescriptor;
pub use zone::ZoneKind;

#[cfg(test)]
mod tests;
