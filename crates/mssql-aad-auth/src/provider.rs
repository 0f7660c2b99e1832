//! Token provider seam for the database connection layer.
//!
//! During login to a server that requires federated authentication, the
//! server answers with FEDAUTHINFO: the security token service URL to sign
//! in against and the service principal name of the database resource.
//! [`FedAuthInfo`] turns that into [`AuthenticationParams`], and the
//! connection layer asks a [`TokenProvider`] for a token.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::authenticator::Authenticator;
use crate::error::{AuthError, Result};
use crate::params::{AccessToken, AuthenticationMethod, AuthenticationParams};

/// Suffix selecting all statically granted permissions of a resource.
const DEFAULT_SCOPE_SUFFIX: &str = "/.default";

/// Federated authentication info sent by the server during login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FedAuthInfo {
    /// Security token service URL, e.g.
    /// `https://login.microsoftonline.com/<tenant-id>`.
    pub sts_url: String,
    /// Service principal name of the database resource, e.g.
    /// `https://database.windows.net/`.
    pub spn: String,
}

impl FedAuthInfo {
    /// Create FEDAUTHINFO from its two fields.
    pub fn new(sts_url: impl Into<String>, spn: impl Into<String>) -> Self {
        Self {
            sts_url: sts_url.into(),
            spn: spn.into(),
        }
    }

    /// Split the STS URL into authority and audience at its last `/`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the URL has no non-empty
    /// segment after the host.
    pub fn authority_and_audience(&self) -> Result<(&str, &str)> {
        let url = self.sts_url.trim().trim_end_matches('/');
        let path_start = url.find("://").map_or(0, |i| i + 3);
        match url.rfind('/') {
            Some(idx) if idx > path_start && idx + 1 < url.len() => {
                Ok((&url[..idx], &url[idx + 1..]))
            }
            _ => Err(AuthError::Configuration(format!(
                "STS URL '{}' has no tenant segment",
                self.sts_url
            ))),
        }
    }

    /// The scope requested for the database resource.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the SPN is empty.
    pub fn scope(&self) -> Result<String> {
        let spn = self.spn.trim();
        if spn.is_empty() {
            return Err(AuthError::Configuration("empty server SPN".into()));
        }
        if spn.ends_with(DEFAULT_SCOPE_SUFFIX) {
            return Ok(spn.to_string());
        }
        Ok(format!("{}{DEFAULT_SCOPE_SUFFIX}", spn.trim_end_matches('/')))
    }
}

impl AuthenticationParams {
    /// Build request parameters from server-issued FEDAUTHINFO.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the STS URL has no tenant
    /// segment or the SPN is empty.
    pub fn from_fed_auth_info(
        method: AuthenticationMethod,
        info: &FedAuthInfo,
        username: Option<&str>,
    ) -> Result<Self> {
        let (authority, audience) = info.authority_and_audience()?;
        let params = Self::new(method, authority, audience, [info.scope()?]);
        Ok(match username {
            Some(username) => params.with_username(username),
            None => params,
        })
    }
}

/// Source of access tokens for database connections.
///
/// The connection layer holds an `Arc<dyn TokenProvider>` registered for
/// the authentication methods it reports as supported.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Check whether this provider handles `method`.
    fn is_supported(&self, method: AuthenticationMethod) -> bool;

    /// Acquire a token for a connection attempt.
    async fn acquire_token(
        &self,
        params: &AuthenticationParams,
        cancel: &CancellationToken,
    ) -> Result<AccessToken>;
}

#[async_trait]
impl TokenProvider for Authenticator {
    fn is_supported(&self, method: AuthenticationMethod) -> bool {
        method.is_supported()
    }

    async fn acquire_token(
        &self,
        params: &AuthenticationParams,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        self.get_token(params, cancel).await
    }
}
