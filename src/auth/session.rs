//! Per-connection handshake state machine
//!
//! An [`AuthSession`] owns one credential handle and one context handle and
//! drives the token exchange one round per [`AuthSession::step`]. The caller
//! feeds each server token back in until the step reports `done` or an
//! error.
//!
//! ```text
//! Fresh ──step──▶ InProgress ──step──▶ Complete
//!   │                 │
//!   └──────┬──────────┘
//!          ▼
//!        Failed (sticky)
//! ```
//!
//! A credential failure on the first round leaves the session `Fresh` so the
//! caller may retry; every other failure is terminal.

use super::canned;
use super::catalog::PackageCatalog;
use super::SecurityPackage;
use crate::error::SecurityStatus;
use crate::logging::trace_entry;
use crate::provider::handle::ProviderHandle;
use crate::provider::{ContextRequest, ContextRequirements, RawHandle, SecurityProvider};
use crate::token::Token;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handshake progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No context yet
    Fresh,
    /// Context established, more rounds expected
    InProgress,
    /// Handshake finished successfully
    Complete,
    /// Handshake failed; no further steps reach the provider
    Failed,
}

/// Test-only switches, effective from the next step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestPolicy {
    /// Answer every step from the canned substitute
    pub canned_response: bool,
    /// Run token completion after every step
    pub force_complete: bool,
}

/// Outcome of one handshake step
#[derive(Debug)]
pub struct StepResult {
    /// Token to send to the server
    pub token: Token,
    /// No further rounds are needed
    pub done: bool,
    /// Raw provider status
    pub status: u32,
    /// Empty on success
    pub error_message: String,
}

impl StepResult {
    pub(crate) fn failure(status: u32, message: impl Into<String>) -> Self {
        Self {
            token: Token::empty(),
            done: false,
            status,
            error_message: message.into(),
        }
    }

    /// The driver reported an error for this step
    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }
}

/// Client side of one authentication handshake
pub struct AuthSession {
    id: Uuid,
    spn: String,
    package: Option<SecurityPackage>,
    requirements: ContextRequirements,
    provider: Arc<dyn SecurityProvider>,
    catalog: Arc<PackageCatalog>,
    state: SessionState,
    policy: TestPolicy,
    failure: Option<(u32, String)>,
    context: Option<ProviderHandle>,
    credential: Option<ProviderHandle>,
}

impl AuthSession {
    /// Create a session targeting `spn`.
    ///
    /// Without an explicit `package` the catalog default is used. No provider
    /// call happens until the first step.
    pub fn new(
        spn: impl Into<String>,
        package: Option<SecurityPackage>,
        provider: Arc<dyn SecurityProvider>,
        catalog: Arc<PackageCatalog>,
    ) -> Self {
        let spn = spn.into();
        let id = Uuid::new_v4();
        trace_entry("AuthSession::new");
        debug!(session = %id, spn = %spn, package = ?package, "created auth session");

        Self {
            id,
            spn,
            package,
            requirements: ContextRequirements::default(),
            provider,
            catalog,
            state: SessionState::Fresh,
            policy: TestPolicy::default(),
            failure: None,
            context: None,
            credential: None,
        }
    }

    /// Override the context requirement flags
    pub fn with_requirements(mut self, requirements: ContextRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spn(&self) -> &str {
        &self.spn
    }

    /// Explicitly requested package, if any
    pub fn package(&self) -> Option<SecurityPackage> {
        self.package
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy(&self) -> TestPolicy {
        self.policy
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn enable_canned_response(&mut self, enable: bool) {
        trace_entry("AuthSession::enable_canned_response");
        self.policy.canned_response = enable;
    }

    pub fn force_complete_auth(&mut self, force: bool) {
        trace_entry("AuthSession::force_complete_auth");
        self.policy.force_complete = force;
    }

    /// Run one handshake round.
    ///
    /// Pass an empty `input` on the first round and the server's last token
    /// afterwards. Blocking: the provider may talk to the network.
    pub fn step(&mut self, input: &[u8]) -> StepResult {
        trace_entry("AuthSession::step");

        if self.policy.canned_response {
            return canned::respond(input);
        }

        match self.state {
            SessionState::Failed => return self.replay_failure(),
            SessionState::Complete => {
                return StepResult::failure(
                    SecurityStatus::OutOfSequence.code(),
                    "Security context is already established.",
                )
            }
            SessionState::Fresh | SessionState::InProgress => {}
        }

        let (credential, capacity) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(result) => return result,
        };

        let existing = self.context.as_ref().map(ProviderHandle::raw);
        let request = ContextRequest {
            credential,
            context: existing,
            target_name: &self.spn,
            input: if existing.is_some() { input } else { &[] },
            requirements: self.requirements,
            output_capacity: capacity,
        };

        let mut step = match self.provider.initialize_context(request) {
            Ok(step) => step,
            Err(e) => return self.fail(e.status, e.message),
        };

        // Adopt before classifying so a rejected status still releases the
        // context the provider handed back.
        self.adopt_context(step.context);

        let status = match SecurityStatus::try_from(step.status) {
            Ok(status) if status.is_handshake_progress() => status,
            _ => {
                return self.fail(
                    step.status,
                    format!(
                        "InitializeSecurityContext failed with error code: 0x{:X}.",
                        step.status
                    ),
                )
            }
        };

        if step.token.len() > capacity {
            return self.fail(
                SecurityStatus::BufferTooSmall.code(),
                format!(
                    "Provider wrote {} bytes into a {} byte token buffer.",
                    step.token.len(),
                    capacity
                ),
            );
        }

        if self.policy.force_complete || status.needs_completion() {
            if let Err(e) = self.provider.complete_token(step.context, &mut step.token) {
                return self.fail(e.status, e.message);
            }
        }

        let done = !status.is_continuation();
        self.state = if done {
            info!(session = %self.id, "security context established");
            SessionState::Complete
        } else {
            SessionState::InProgress
        };
        debug!(
            session = %self.id,
            status = %status,
            token_len = step.token.len(),
            done,
            "handshake step finished"
        );

        StepResult {
            token: Token::from(step.token),
            done,
            status: step.status,
            error_message: String::new(),
        }
    }

    /// Resolve the credential and output buffer size for this round
    fn prepare(&mut self) -> Result<(RawHandle, usize), StepResult> {
        if let Some(credential) = &self.credential {
            let capacity = self.catalog.max_token_size().unwrap_or_default();
            return Ok((credential.raw(), capacity as usize));
        }

        let Some(package) = self
            .package
            .or_else(|| self.catalog.default_package().ok())
        else {
            return Err(self.fail(
                SecurityStatus::PackageNotFound.code(),
                "No security package was specified and no default package is available.",
            ));
        };

        let capacity = match self.catalog.max_token_size() {
            Ok(size) => size as usize,
            Err(_) => {
                return Err(self.fail(
                    SecurityStatus::PackageNotFound.code(),
                    format!(
                        "Security package {} requested before the package catalog was initialized.",
                        package
                    ),
                ))
            }
        };

        match self.provider.acquire_credential(package.name()) {
            Ok(raw) => {
                debug!(session = %self.id, package = %package, "acquired credential");
                self.credential = Some(ProviderHandle::credential(
                    raw,
                    Arc::clone(&self.provider),
                ));
                Ok((raw, capacity))
            }
            Err(e) => {
                // No context exists yet, so the caller may simply step again.
                warn!(session = %self.id, package = %package, "credential acquisition failed: {}", e);
                Err(StepResult::failure(e.status, e.message))
            }
        }
    }

    fn adopt_context(&mut self, raw: RawHandle) {
        match &mut self.context {
            Some(context) => context.update(raw),
            None => {
                self.context = Some(ProviderHandle::context(raw, Arc::clone(&self.provider)));
            }
        }
    }

    fn fail(&mut self, status: u32, message: impl Into<String>) -> StepResult {
        let message = message.into();
        error!(session = %self.id, "handshake failed (0x{:08X}): {}", status, message);
        self.state = SessionState::Failed;
        self.failure = Some((status, message.clone()));
        StepResult::failure(status, message)
    }

    fn replay_failure(&self) -> StepResult {
        match &self.failure {
            Some((status, message)) => StepResult::failure(*status, message.clone()),
            None => StepResult::failure(
                SecurityStatus::InternalError.code(),
                "Session has already failed.",
            ),
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        trace_entry("AuthSession::drop");
        // Context goes before the credential it was built from.
        drop(self.context.take());
        drop(self.credential.take());
    }
}
