//! Security packages the driver knows how to use

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A recognized authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityPackage {
    /// SPNEGO: picks Kerberos when the target supports it, NTLM otherwise
    Negotiate,
    Kerberos,
    Ntlm,
}

impl SecurityPackage {
    /// Preference order used when selecting the default package
    pub const PRIORITY: [SecurityPackage; 3] = [
        SecurityPackage::Negotiate,
        SecurityPackage::Kerberos,
        SecurityPackage::Ntlm,
    ];

    /// Name as the security provider spells it
    pub fn name(self) -> &'static str {
        match self {
            SecurityPackage::Negotiate => "Negotiate",
            SecurityPackage::Kerberos => "Kerberos",
            SecurityPackage::Ntlm => "NTLM",
        }
    }

    /// Case-insensitive match against a provider package name
    pub fn matches(self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|p| p.matches(name))
    }
}

impl FromStr for SecurityPackage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| {
            Error::InvalidParameter(
                "'securityPackage' if specified must be one of 'negotiate' or 'kerberos' or 'ntlm'."
                    .to_string(),
            )
        })
    }
}

impl fmt::Display for SecurityPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
