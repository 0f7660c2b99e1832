//! Test fixture utilities.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mssql_aad_auth::{
    AuthenticationMethod, AuthenticationParams, Authenticator, AuthenticatorConfig,
};

use crate::mock_client::MockClientFactory;

/// Public cloud authority host.
pub const AUTHORITY: &str = "https://login.microsoftonline.com";

/// Multi-tenant audience.
pub const COMMON: &str = "common";

/// Scope for Azure SQL Database.
pub const SQL_SCOPE: &str = "https://database.windows.net/.default";

/// A fixed timestamp `secs` seconds after the Unix epoch.
///
/// Out-of-range values clamp to the epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Interactive request against the common audience of the public cloud.
pub fn interactive_params(username: Option<&str>) -> AuthenticationParams {
    let params = AuthenticationParams::new(
        AuthenticationMethod::ActiveDirectoryInteractive,
        AUTHORITY,
        COMMON,
        [SQL_SCOPE],
    );
    match username {
        Some(username) => params.with_username(username),
        None => params,
    }
}

/// Authenticator with the default application identity over `factory`.
///
/// # Panics
///
/// Never in practice: the default identity always validates.
#[allow(clippy::expect_used)]
pub fn authenticator(factory: Arc<MockClientFactory>) -> Authenticator {
    Authenticator::new(AuthenticatorConfig::default(), factory)
        .expect("default configuration is valid")
}
