//! Service principal name construction

use crate::error::{Error, Result};
use std::fmt::Display;

/// Service class registered by SQL Server instances
pub const SQL_SERVER_SERVICE_CLASS: &str = "MSSQLSvc";

/// Build `"<service_class>/<fqdn>:<instance_or_port>"`.
///
/// `instance_or_port` is either a TCP port or a named instance.
pub fn make_spn(service_class: &str, fqdn: &str, instance_or_port: impl Display) -> Result<String> {
    if service_class.is_empty() {
        return Err(Error::InvalidParameter(
            "Empty string argument for 'serviceClass'.".to_string(),
        ));
    }
    if fqdn.is_empty() {
        return Err(Error::InvalidParameter(
            "Empty string argument for 'fqdn'.".to_string(),
        ));
    }

    Ok(format!("{}/{}:{}", service_class, fqdn, instance_or_port))
}
