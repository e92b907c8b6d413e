//! Security package discovery and default selection
//!
//! The catalog asks the provider which packages the host offers, keeps the
//! ones on [`SecurityPackage::PRIORITY`] in priority order, and records the
//! first one as the default. The selection is written once and read-only
//! afterwards; later `initialize` calls re-enumerate but never replace it.

use super::SecurityPackage;
use crate::error::{Error, Result};
use crate::logging::trace_entry;
use crate::provider::{PackageInfo, SecurityProvider};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Outcome of a catalog initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeResult {
    /// Supported packages present on the host, in priority order
    pub available: Vec<String>,
    /// Index of the default package in `available`
    pub default_index: Option<usize>,
    /// Raw provider status
    pub status: u32,
    /// Empty on success
    pub error_message: String,
}

impl InitializeResult {
    pub fn is_success(&self) -> bool {
        self.status == 0 && self.default_index.is_some()
    }

    /// Default package name, if one was selected
    pub fn default_package(&self) -> Option<&str> {
        self.default_index
            .and_then(|i| self.available.get(i))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct Selection {
    available: Vec<SecurityPackage>,
    default: SecurityPackage,
    max_token_size: u32,
}

/// Packages matched against the priority list for one enumeration
struct Matched {
    available: Vec<SecurityPackage>,
    max_token_size: u32,
}

impl Matched {
    fn from_host(packages: &[PackageInfo]) -> Self {
        let mut available = Vec::new();
        let mut max_token_size = 0;

        for candidate in SecurityPackage::PRIORITY {
            for package in packages.iter().filter(|p| candidate.matches(&p.name)) {
                if !available.contains(&candidate) {
                    available.push(candidate);
                }
                // Sessions may pick any matched package, so size for the largest.
                max_token_size = max_token_size.max(package.max_token_size);
            }
        }

        Self {
            available,
            max_token_size,
        }
    }

    fn into_selection(self) -> Option<Selection> {
        let default = *self.available.first()?;
        Some(Selection {
            available: self.available,
            default,
            max_token_size: self.max_token_size,
        })
    }
}

fn no_supported_package_message() -> String {
    let [first, second, third] = SecurityPackage::PRIORITY;
    format!(
        "No supported security package ({}, {} or {}) available on client.",
        first, second, third
    )
}

/// Write-once registry of the host's usable security packages
#[derive(Debug, Default)]
pub struct PackageCatalog {
    selection: OnceLock<Selection>,
}

impl PackageCatalog {
    pub const fn new() -> Self {
        Self {
            selection: OnceLock::new(),
        }
    }

    /// Catalog shared by the whole process
    pub fn global() -> Arc<PackageCatalog> {
        static GLOBAL: OnceLock<Arc<PackageCatalog>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PackageCatalog::new())))
    }

    /// Enumerate host packages and record the default selection.
    ///
    /// Blocking; safe to call repeatedly and from several threads.
    pub fn initialize(&self, provider: &dyn SecurityProvider) -> InitializeResult {
        trace_entry("PackageCatalog::initialize");

        let packages = match provider.enumerate_packages() {
            Ok(packages) => packages,
            Err(e) => {
                warn!("security package enumeration failed: {}", e);
                return InitializeResult {
                    available: Vec::new(),
                    default_index: None,
                    status: e.status,
                    error_message: e.message,
                };
            }
        };

        let matched = Matched::from_host(&packages);
        let available: Vec<String> = matched
            .available
            .iter()
            .map(|p| p.name().to_string())
            .collect();

        let Some(fresh) = matched.into_selection() else {
            warn!(
                "none of the {} host packages is supported",
                packages.len()
            );
            return InitializeResult {
                available,
                default_index: None,
                status: 0,
                error_message: no_supported_package_message(),
            };
        };

        let selection = self.selection.get_or_init(|| {
            info!(
                "selected default security package {} (max token size {})",
                fresh.default, fresh.max_token_size
            );
            fresh.clone()
        });

        let default_index = available
            .iter()
            .position(|name| selection.default.matches(name));

        InitializeResult {
            available,
            default_index,
            status: 0,
            error_message: String::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.selection.get().is_some()
    }

    fn selection(&self) -> Result<&Selection> {
        self.selection.get().ok_or(Error::NotInitialized)
    }

    /// Package used by sessions that did not ask for one
    pub fn default_package(&self) -> Result<SecurityPackage> {
        self.selection().map(|s| s.default)
    }

    /// Supported packages recorded by the first successful initialization
    pub fn available_packages(&self) -> Result<Vec<SecurityPackage>> {
        self.selection().map(|s| s.available.clone())
    }

    /// Output buffer size for handshake steps
    pub fn max_token_size(&self) -> Result<u32> {
        self.selection().map(|s| s.max_token_size)
    }
}
