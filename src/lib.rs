//! SSPI Client Driver in Rust
//!
//! Drives the client side of a Negotiate / Kerberos / NTLM handshake by
//! exchanging opaque tokens with a server over a transport the caller owns.
//! The cryptography lives in the platform security provider; this crate
//! picks the package, owns the credential and context handles, and
//! sequences the rounds.
//!
//! ```no_run
//! # async fn run() -> sspi_client::Result<()> {
//! use sspi_client::client::SspiClient;
//!
//! let client = SspiClient::platform()?;
//! client.ensure_initialization().await?;
//!
//! let mut session = client.create_session("MSSQLSvc/db.example.com:1433", None)?;
//! let mut input = Vec::new();
//! loop {
//!     let step = session.get_next_blob(&input).await?;
//!     if step.is_error() {
//!         step.token.release();
//!         break;
//!     }
//!     // send step.token to the server, read its reply into `input`
//!     step.token.release();
//!     if step.done {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod error;
pub mod logging;
pub mod provider;
pub mod token;

#[cfg(feature = "client")]
pub mod client;


pub use auth::{make_spn, InitializeResult, SecurityPackage, StepResult};
pub use error::{Error, Result, SecurityStatus};
pub use logging::enable_debug_logging;
pub use token::Token;
