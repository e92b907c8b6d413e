//! Handshake tokens handed from the driver to the caller
//!
//! A step allocates its output token and moves it to the caller, who becomes
//! the sole owner and hands it back through [`Token::release`] once the bytes
//! have been written to the transport.

use crate::logging::trace_entry;
use bytes::Bytes;
use std::fmt;

/// Opaque handshake token ("blob")
#[derive(PartialEq, Eq, Default)]
pub struct Token {
    bytes: Bytes,
}

impl Token {
    /// Wrap bytes produced by a step
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Token with no bytes, returned alongside failures
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the bytes out, e.g. to queue them on a transport
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Hand the token back to the driver
    pub fn release(self) {
        trace_entry("Token::release");
        drop(self.bytes);
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Token {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("len", &self.len()).finish()
    }
}
