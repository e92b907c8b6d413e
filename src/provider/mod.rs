//! Security provider contract
//!
//! The driver never performs any cryptography itself. It sequences opaque
//! tokens produced and consumed by a platform security provider reached
//! through [`SecurityProvider`]. Every operation may block (for example on a
//! KDC round trip) and is treated as an opaque unit by the caller.

pub(crate) mod handle;

#[cfg(windows)]
pub mod windows;

use crate::error::{Error, Result};
use bitflags::bitflags;
use std::sync::Arc;
use thiserror::Error;

/// Raw provider handle, shaped like an SSPI `SecHandle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawHandle {
    pub lower: usize,
    pub upper: usize,
}

impl RawHandle {
    pub const fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }
}

/// A security package offered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name as reported by the provider
    pub name: String,
    /// Largest token the package can emit
    pub max_token_size: u32,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, max_token_size: u32) -> Self {
        Self {
            name: name.into(),
            max_token_size,
        }
    }
}

/// Failure reported by a provider call: native status plus diagnostic text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub status: u32,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Standard "`<operation>` failed with error code" diagnostic
    pub fn from_status(operation: &str, status: u32) -> Self {
        Self::new(
            status,
            format!("{} failed with error code: 0x{:X}.", operation, status),
        )
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Error::Provider {
            status: err.status,
            message: err.message,
        }
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

bitflags! {
    /// Context requirement flags passed to each handshake step (ISC_REQ_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContextRequirements: u32 {
        /// Server may impersonate the client on other hosts
        const DELEGATE = 0x00000001;
        /// Both sides must authenticate
        const MUTUAL_AUTH = 0x00000002;
        /// Detect replayed messages
        const REPLAY_DETECT = 0x00000004;
        /// Detect out-of-sequence messages
        const SEQUENCE_DETECT = 0x00000008;
        /// Encrypt messages
        const CONFIDENTIALITY = 0x00000010;
        /// Provider allocates output buffers
        const ALLOCATE_MEMORY = 0x00000100;
        /// Produce error tokens for the peer
        const EXTENDED_ERROR = 0x00004000;
        /// Sign messages
        const INTEGRITY = 0x00010000;
    }
}

impl Default for ContextRequirements {
    fn default() -> Self {
        ContextRequirements::DELEGATE
            | ContextRequirements::MUTUAL_AUTH
            | ContextRequirements::INTEGRITY
            | ContextRequirements::EXTENDED_ERROR
    }
}

/// Inputs to a single handshake step
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    /// Credential acquired for this session
    pub credential: RawHandle,
    /// Context from the previous round, `None` on the first round
    pub context: Option<RawHandle>,
    /// Service principal name of the target
    pub target_name: &'a str,
    /// Token received from the server, empty on the first round
    pub input: &'a [u8],
    pub requirements: ContextRequirements,
    /// Size of the output buffer the provider may fill
    pub output_capacity: usize,
}

/// Outcome of a handshake step that the provider did not reject outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStep {
    /// Raw provider status
    pub status: u32,
    /// Context established or updated by this round
    pub context: RawHandle,
    /// Bytes the provider wrote into the output buffer
    pub token: Vec<u8>,
}

/// Platform security negotiation facility consumed by the driver.
///
/// Handles are not thread-safe on the provider side; the driver guarantees
/// that a given handle is only used by one thread at a time.
pub trait SecurityProvider: Send + Sync {
    /// List every package the host offers
    fn enumerate_packages(&self) -> ProviderResult<Vec<PackageInfo>>;

    /// Acquire an outbound credential for the logged-in user
    fn acquire_credential(&self, package: &str) -> ProviderResult<RawHandle>;

    /// Run one handshake round
    fn initialize_context(&self, request: ContextRequest<'_>) -> ProviderResult<ContextStep>;

    /// Finalize an output token before it is sent
    fn complete_token(&self, context: RawHandle, token: &mut Vec<u8>) -> ProviderResult<()>;

    /// Release a context handle
    fn delete_context(&self, context: RawHandle) -> ProviderResult<()>;

    /// Release a credential handle
    fn delete_credential(&self, credential: RawHandle) -> ProviderResult<()>;
}

/// Provider backed by the host operating system
#[cfg(windows)]
pub fn platform_provider() -> Result<Arc<dyn SecurityProvider>> {
    Ok(Arc::new(windows::WindowsSspi::new()))
}

/// Provider backed by the host operating system
#[cfg(not(windows))]
pub fn platform_provider() -> Result<Arc<dyn SecurityProvider>> {
    Err(Error::UnsupportedPlatform(
        "SSPI is only available on Windows".to_string(),
    ))
}
