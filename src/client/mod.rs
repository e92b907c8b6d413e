//! Async client API
//!
//! Every call that can block on the security provider is moved onto a tokio
//! blocking worker and its result delivered through the awaited future. One
//! future yields exactly one result.

use crate::auth::{
    AuthSession, InitializeResult, PackageCatalog, SecurityPackage, SessionState, StepResult,
};
use crate::error::{Error, Result, SecurityStatus};
use crate::logging::trace_entry;
use crate::provider::{self, ContextRequirements, SecurityProvider};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio::task;
use tracing::{debug, warn};
use uuid::Uuid;

/// Client configuration
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Context requirement flags for every session
    pub requirements: ContextRequirements,
    /// Package used when `create_session` is not given one; `None` defers
    /// to the catalog default
    pub default_package: Option<SecurityPackage>,
}

/// Entry point: package discovery and session creation
#[derive(Clone)]
pub struct SspiClient {
    provider: Arc<dyn SecurityProvider>,
    catalog: Arc<PackageCatalog>,
    config: Arc<ClientConfig>,
    init: Arc<OnceCell<InitializeResult>>,
}

impl SspiClient {
    /// Client over `provider` sharing the process-wide catalog
    pub fn new(provider: Arc<dyn SecurityProvider>) -> Self {
        Self::with_catalog(provider, PackageCatalog::global())
    }

    /// Client over `provider` with its own catalog
    pub fn with_catalog(provider: Arc<dyn SecurityProvider>, catalog: Arc<PackageCatalog>) -> Self {
        Self {
            provider,
            catalog,
            config: Arc::new(ClientConfig::default()),
            init: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Client over the host operating system's provider
    pub fn platform() -> Result<Self> {
        Ok(Self::new(provider::platform_provider()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<PackageCatalog> {
        &self.catalog
    }

    /// Enumerate host packages and select the default.
    ///
    /// Re-enumerates on every call; the recorded default never changes once
    /// set.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        trace_entry("SspiClient::initialize");

        let provider = Arc::clone(&self.provider);
        let catalog = Arc::clone(&self.catalog);
        let result = task::spawn_blocking(move || catalog.initialize(provider.as_ref())).await?;

        if let Some(default) = result.default_package() {
            debug!("initialized with default package {}", default);
        }
        Ok(result)
    }

    /// Run [`initialize`](Self::initialize) once and hand every caller the
    /// same result. Concurrent first callers share a single enumeration.
    pub async fn ensure_initialization(&self) -> Result<InitializeResult> {
        trace_entry("SspiClient::ensure_initialization");
        self.init
            .get_or_try_init(|| self.initialize())
            .await
            .cloned()
    }

    /// Create a session for `spn`.
    ///
    /// `package` is matched case-insensitively against negotiate, kerberos
    /// and ntlm. No provider call happens here.
    pub fn create_session(&self, spn: &str, package: Option<&str>) -> Result<ClientSession> {
        trace_entry("SspiClient::create_session");

        if spn.is_empty() {
            return Err(Error::InvalidParameter(
                "Empty string argument for 'spn'.".to_string(),
            ));
        }
        let package = match package {
            Some(name) => Some(name.parse::<SecurityPackage>()?),
            None => self.config.default_package,
        };

        let session = AuthSession::new(
            spn,
            package,
            Arc::clone(&self.provider),
            Arc::clone(&self.catalog),
        )
        .with_requirements(self.config.requirements);

        Ok(ClientSession {
            id: session.id(),
            session: Arc::new(Mutex::new(session)),
            client: self.clone(),
        })
    }
}

/// Async handle on one [`AuthSession`]
pub struct ClientSession {
    id: Uuid,
    // Locked by the blocking worker for the duration of a step
    session: Arc<Mutex<AuthSession>>,
    client: SspiClient,
}

impl ClientSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut AuthSession) -> T) -> Result<T> {
        let mut session = self.session.try_lock().map_err(|_| Error::StepInFlight)?;
        Ok(f(&mut session))
    }

    pub fn state(&self) -> Result<SessionState> {
        self.with_session(|session| session.state())
    }

    /// Run one handshake round on a blocking worker.
    ///
    /// Pass an empty `input` first, then each token the server sends back,
    /// until the result reports `done` or an error. A step whose future was
    /// dropped keeps running to completion; until it finishes, further calls
    /// return [`Error::StepInFlight`].
    pub async fn get_next_blob(&mut self, input: &[u8]) -> Result<StepResult> {
        trace_entry("ClientSession::get_next_blob");

        if !self.with_session(|session| session.policy().canned_response)? {
            let init = self.client.ensure_initialization().await?;
            if !init.is_success() {
                let status = if init.status == 0 {
                    SecurityStatus::PackageNotFound.code()
                } else {
                    init.status
                };
                return Ok(StepResult::failure(status, init.error_message));
            }
        }

        let mut session = Arc::clone(&self.session)
            .try_lock_owned()
            .map_err(|_| Error::StepInFlight)?;
        let input = input.to_vec();
        let joined = task::spawn_blocking(move || session.step(&input)).await;

        joined.map_err(|e| {
            warn!(session = %self.id, "handshake step did not complete: {}", e);
            Error::from(e)
        })
    }

    /// Answer every later step from the canned substitute (tests only)
    pub fn enable_canned_response(&mut self, enable: bool) -> Result<()> {
        self.with_session(|session| session.enable_canned_response(enable))
    }

    /// Run token completion after every later step (tests only)
    pub fn force_complete_auth(&mut self, force: bool) -> Result<()> {
        self.with_session(|session| session.force_complete_auth(force))
    }
}
