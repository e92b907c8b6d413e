//! Client-side security handshake
//!
//! Package discovery ([`PackageCatalog`]), the per-connection state machine
//! ([`AuthSession`]) and the canned stand-in used by tests.

pub mod canned;
pub mod catalog;
pub mod mechanism;
pub mod session;
pub mod spn;

pub use catalog::{InitializeResult, PackageCatalog};
pub use mechanism::SecurityPackage;
pub use session::{AuthSession, SessionState, StepResult, TestPolicy};
pub use spn::{make_spn, SQL_SERVER_SERVICE_CLASS};
