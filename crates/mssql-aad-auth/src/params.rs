//! Token request parameters and the resulting access token.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::identity::{IdentityError, TokenResponse};

/// Active Directory authentication methods a database connection may request.
///
/// Only [`ActiveDirectoryInteractive`](Self::ActiveDirectoryInteractive) is
/// implemented by this provider; the remaining variants exist so that
/// requests for them can be recognised and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AuthenticationMethod {
    /// Interactive sign-in with cached-account reuse.
    ActiveDirectoryInteractive,
    /// Username and password.
    ActiveDirectoryPassword,
    /// Integrated Windows authentication against Active Directory.
    ActiveDirectoryIntegrated,
    /// Device code flow.
    ActiveDirectoryDeviceCodeFlow,
    /// Managed identity of the hosting resource.
    ActiveDirectoryManagedIdentity,
    /// Application credentials.
    ActiveDirectoryServicePrincipal,
}

impl AuthenticationMethod {
    const ALL: [Self; 6] = [
        Self::ActiveDirectoryInteractive,
        Self::ActiveDirectoryPassword,
        Self::ActiveDirectoryIntegrated,
        Self::ActiveDirectoryDeviceCodeFlow,
        Self::ActiveDirectoryManagedIdentity,
        Self::ActiveDirectoryServicePrincipal,
    ];

    /// Check if this provider can acquire tokens for the method.
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(self, Self::ActiveDirectoryInteractive)
    }

    /// Connection string keyword for the method.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::ActiveDirectoryInteractive => "Active Directory Interactive",
            Self::ActiveDirectoryPassword => "Active Directory Password",
            Self::ActiveDirectoryIntegrated => "Active Directory Integrated",
            Self::ActiveDirectoryDeviceCodeFlow => "Active Directory Device Code Flow",
            Self::ActiveDirectoryManagedIdentity => "Active Directory Managed Identity",
            Self::ActiveDirectoryServicePrincipal => "Active Directory Service Principal",
        }
    }

    /// Parse a connection string `Authentication` value.
    ///
    /// Matching ignores case and whitespace, so both
    /// `Active Directory Interactive` and `ActiveDirectoryInteractive` parse.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL.into_iter().find(|method| {
            let keyword: String = method
                .keyword()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            keyword.eq_ignore_ascii_case(&compact)
        })
    }
}

impl fmt::Display for AuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Parameters of a single token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationParams {
    method: AuthenticationMethod,
    authority: String,
    audience: String,
    scopes: Vec<String>,
    username: Option<String>,
}

impl AuthenticationParams {
    /// Create request parameters without a username.
    pub fn new(
        method: AuthenticationMethod,
        authority: impl Into<String>,
        audience: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            method,
            authority: authority.into(),
            audience: audience.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            username: None,
        }
    }

    /// Set the username used for account matching and as a login hint.
    ///
    /// A blank username is treated as absent.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.username = if username.trim().is_empty() {
            None
        } else {
            Some(username)
        };
        self
    }

    /// The requested authentication method.
    #[must_use]
    pub fn method(&self) -> AuthenticationMethod {
        self.method
    }

    /// Authority host URL.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Tenant or audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Requested scopes, in order.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Requested username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// A bearer access token with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_on: DateTime<Utc>,
}

impl AccessToken {
    /// Create an access token.
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Absolute expiry as reported by the identity client.
    #[must_use]
    pub fn expires_on(&self) -> DateTime<Utc> {
        self.expires_on
    }

    /// Check whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_on
    }

    /// Time remaining until expiry, or `None` if already expired.
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_on - now).to_std().ok().filter(|d| !d.is_zero())
    }

    /// Consume the token, returning the bearer string.
    #[must_use]
    pub fn into_token(self) -> String {
        self.token
    }
}

/// Normalize an identity-client response. The expiry is kept verbatim; a
/// blank token is rejected rather than handed to the connection layer.
impl TryFrom<TokenResponse> for AccessToken {
    type Error = IdentityError;

    fn try_from(response: TokenResponse) -> Result<Self, Self::Error> {
        if response.access_token.trim().is_empty() {
            return Err(IdentityError::with_code(
                "empty_token",
                "identity client returned an empty access token",
            ));
        }
        Ok(Self::new(response.access_token, response.expires_on))
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}
