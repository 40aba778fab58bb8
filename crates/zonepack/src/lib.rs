//! # Zonepack
//!
//! Values and marshalling for calls that cross an isolate boundary.
//!
//! ## Philosophy
//!
//! - **Copy plain data, share the rest**: Primitives, arrays and objects travel as
//!   JSON text. Shared references never get copied; they are registered in a
//!   [`TransportContext`] and travel as handle tokens.
//! - **Per-call bookkeeping**: A context belongs to exactly one call. Handles mean
//!   nothing outside the context that issued them.
//! - **Fail, don't truncate**: Anything JSON cannot carry faithfully is rejected
//!   with [`Error::UnsupportedValue`].

pub mod codec;
pub mod context;
pub mod error;
pub mod value;

pub use codec::Codec;
pub use codec::JsonCodec;
pub use codec::encode_plain;
pub use codec::marshall;
pub use codec::unmarshall;
pub use context::ContextHandle;
pub use context::Handle;
pub use context::Origin;
pub use context::TransportContext;
pub use error::Error;
pub use error::Result;
pub use value::Function;
pub use value::SharedRef;
pub use value::Value;
