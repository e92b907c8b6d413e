//! Error types for the SSPI client driver

use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for driver API misuse and dispatch failures.
///
/// Handshake outcomes (including provider failures) are not reported through
/// this type; they travel as status/message pairs inside
/// [`StepResult`](crate::auth::StepResult) and
/// [`InitializeResult`](crate::auth::InitializeResult).
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Package catalog has not selected a package yet
    #[error("Initialization not completed.")]
    NotInitialized,

    /// A previous step on this session is still running on its worker
    #[error("Single invocation of get_next_blob per session may be in flight.")]
    StepInFlight,

    /// Security provider error outside of a handshake step
    #[error("Security provider error: {message} (0x{status:08X})")]
    Provider { status: u32, message: String },

    /// No security provider exists for this platform
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Background worker panicked or was shut down
    #[cfg(feature = "client")]
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// SSPI status codes (subset of SECURITY_STATUS) seen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SecurityStatus {
    /// The operation completed successfully
    Ok = 0x00000000,
    /// The handshake needs another round
    ContinueNeeded = 0x00090312,
    /// The token must be completed before it is sent
    CompleteNeeded = 0x00090313,
    /// The token must be completed and another round follows
    CompleteAndContinue = 0x00090314,
    /// Not enough memory
    InsufficientMemory = 0x80090300,
    /// The handle is invalid
    InvalidHandle = 0x80090301,
    /// The function is not supported
    UnsupportedFunction = 0x80090302,
    /// The target is unknown or unreachable
    TargetUnknown = 0x80090303,
    /// Internal provider error
    InternalError = 0x80090304,
    /// The requested security package does not exist
    PackageNotFound = 0x80090305,
    /// The token supplied is invalid
    InvalidToken = 0x80090308,
    /// The logon attempt failed
    LogonDenied = 0x8009030C,
    /// The credentials supplied to the package were not recognized
    UnknownCredentials = 0x8009030D,
    /// No credentials are available in the security package
    NoCredentials = 0x8009030E,
    /// The message was supplied out of sequence
    OutOfSequence = 0x80090310,
    /// No authority could be contacted for authentication
    NoAuthenticatingAuthority = 0x80090311,
    /// The supplied buffer is too small
    BufferTooSmall = 0x80090321,
    /// The target principal name is incorrect
    WrongPrincipal = 0x80090322,
    /// Clock skew between client and server is too great
    TimeSkew = 0x80090324,
}

impl TryFrom<u32> for SecurityStatus {
    type Error = u32;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            0x00000000 => Ok(SecurityStatus::Ok),
            0x00090312 => Ok(SecurityStatus::ContinueNeeded),
            0x00090313 => Ok(SecurityStatus::CompleteNeeded),
            0x00090314 => Ok(SecurityStatus::CompleteAndContinue),
            0x80090300 => Ok(SecurityStatus::InsufficientMemory),
            0x80090301 => Ok(SecurityStatus::InvalidHandle),
            0x80090302 => Ok(SecurityStatus::UnsupportedFunction),
            0x80090303 => Ok(SecurityStatus::TargetUnknown),
            0x80090304 => Ok(SecurityStatus::InternalError),
            0x80090305 => Ok(SecurityStatus::PackageNotFound),
            0x80090308 => Ok(SecurityStatus::InvalidToken),
            0x8009030C => Ok(SecurityStatus::LogonDenied),
            0x8009030D => Ok(SecurityStatus::UnknownCredentials),
            0x8009030E => Ok(SecurityStatus::NoCredentials),
            0x80090310 => Ok(SecurityStatus::OutOfSequence),
            0x80090311 => Ok(SecurityStatus::NoAuthenticatingAuthority),
            0x80090321 => Ok(SecurityStatus::BufferTooSmall),
            0x80090322 => Ok(SecurityStatus::WrongPrincipal),
            0x80090324 => Ok(SecurityStatus::TimeSkew),
            other => Err(other),
        }
    }
}

impl SecurityStatus {
    /// Raw status code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Check if this is a success status
    pub fn is_success(self) -> bool {
        self == SecurityStatus::Ok
    }

    /// Check if this is an error status
    pub fn is_error(self) -> bool {
        is_error_code(self as u32)
    }

    /// More handshake rounds follow this one
    pub fn is_continuation(self) -> bool {
        matches!(
            self,
            SecurityStatus::ContinueNeeded | SecurityStatus::CompleteAndContinue
        )
    }

    /// The output token must go through token completion before it is sent
    pub fn needs_completion(self) -> bool {
        matches!(
            self,
            SecurityStatus::CompleteNeeded | SecurityStatus::CompleteAndContinue
        )
    }

    /// One of the four statuses a handshake step may legitimately return
    pub fn is_handshake_progress(self) -> bool {
        self.is_success() || self.is_continuation() || self.needs_completion()
    }
}

/// Severity bit check on a raw status code
pub fn is_error_code(code: u32) -> bool {
    code & 0x80000000 == 0x80000000
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SecurityStatus::Ok => "Success",
            SecurityStatus::ContinueNeeded => "Continue needed",
            SecurityStatus::CompleteNeeded => "Complete needed",
            SecurityStatus::CompleteAndContinue => "Complete and continue",
            SecurityStatus::InsufficientMemory => "Insufficient memory",
            SecurityStatus::InvalidHandle => "Invalid handle",
            SecurityStatus::UnsupportedFunction => "Unsupported function",
            SecurityStatus::TargetUnknown => "Target unknown",
            SecurityStatus::InternalError => "Internal error",
            SecurityStatus::PackageNotFound => "Security package not found",
            SecurityStatus::InvalidToken => "Invalid token",
            SecurityStatus::LogonDenied => "Logon denied",
            SecurityStatus::UnknownCredentials => "Unknown credentials",
            SecurityStatus::NoCredentials => "No credentials",
            SecurityStatus::OutOfSequence => "Out of sequence",
            SecurityStatus::NoAuthenticatingAuthority => "No authenticating authority",
            SecurityStatus::BufferTooSmall => "Buffer too small",
            SecurityStatus::WrongPrincipal => "Wrong principal",
            SecurityStatus::TimeSkew => "Time skew",
        };
        write!(f, "{} (0x{:08X})", msg, *self as u32)
    }
}
