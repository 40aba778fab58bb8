//! # Zone Builder
//!
//! Fluent configuration for a [`Zone`].

use std::sync::Arc;

use zonepack::Codec;
use zonepack::JsonCodec;

use crate::native::NativeZone;
use crate::registry::FunctionRegistry;
use crate::zone::Zone;

/// Fluent builder for a zone facade over a native zone.
pub struct ZoneBuilder {
    native: Arc<dyn NativeZone>,
    registry: Option<FunctionRegistry>,
    codec: Option<Arc<dyn Codec>>,
}

impl ZoneBuilder {
    pub fn new(native: Arc<dyn NativeZone>) -> Self {
        Self {
            native,
            registry: None,
            codec: None,
        }
    }

    /// Registry used for function-literal calls. Defaults to [`FunctionRegistry::global`].
    pub fn registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Codec used for arguments and results. Defaults to [`JsonCodec`].
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Uses a [`JsonCodec`] with the given nesting limit.
    pub fn max_depth(self, max_depth: usize) -> Self {
        self.codec(Arc::new(JsonCodec::with_max_depth(max_depth)))
    }

    pub fn build(self) -> Zone {
        let registry = self
            .registry
            .unwrap_or_else(|| FunctionRegistry::global().clone());
        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(JsonCodec::new()));

        Zone::from_parts(self.native, registry, codec)
    }
}
