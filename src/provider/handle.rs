//! Owned provider handles released on drop

use super::{RawHandle, SecurityProvider};
use crate::logging::trace_entry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleKind {
    Credential,
    Context,
}

/// Provider handle with exactly-once release.
///
/// Teardown failures are logged and swallowed so they never mask the result
/// of whatever triggered the drop.
pub(crate) struct ProviderHandle {
    raw: RawHandle,
    kind: HandleKind,
    provider: Arc<dyn SecurityProvider>,
}

impl ProviderHandle {
    pub fn credential(raw: RawHandle, provider: Arc<dyn SecurityProvider>) -> Self {
        Self {
            raw,
            kind: HandleKind::Credential,
            provider,
        }
    }

    pub fn context(raw: RawHandle, provider: Arc<dyn SecurityProvider>) -> Self {
        Self {
            raw,
            kind: HandleKind::Context,
            provider,
        }
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Adopt the handle a provider returned for an existing context
    pub fn update(&mut self, raw: RawHandle) {
        if raw != self.raw {
            debug!(
                "provider moved {:?} handle from {:?} to {:?}",
                self.kind, self.raw, raw
            );
            self.raw = raw;
        }
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        let result = match self.kind {
            HandleKind::Context => {
                trace_entry("ProviderHandle::drop(context)");
                self.provider.delete_context(self.raw)
            }
            HandleKind::Credential => {
                trace_entry("ProviderHandle::drop(credential)");
                self.provider.delete_credential(self.raw)
            }
        };

        if let Err(e) = result {
            warn!(
                "releasing {:?} handle {:?} failed with error code 0x{:08X}: {}",
                self.kind, self.raw, e.status, e.message
            );
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .finish()
    }
}
