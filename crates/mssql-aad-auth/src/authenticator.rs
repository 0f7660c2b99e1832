//! Token acquisition orchestration.
//!
//! ## Acquisition Flow
//!
//! 1. Reject methods other than Active Directory Interactive
//! 2. Get (or create) the identity client for `authority/audience`
//! 3. Enumerate the client's cached accounts
//! 4. Match the requested username against them
//! 5. With a match, try silent acquisition; fall back to interactive
//!    sign-in only when the silent attempt reports that interaction is
//!    required
//! 6. Without a username or without a match, sign in interactively
//!
//! Steps run strictly in order. Interactive sign-in never starts while a
//! silent attempt could still succeed, so the user is prompted at most once
//! per request.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::account::find_account;
use crate::config::AuthenticatorConfig;
use crate::error::{AcquisitionStage, AuthError, Result};
use crate::identity::{IdentityClient, IdentityClientFactory, SilentOutcome, TokenResponse};
use crate::params::{AccessToken, AuthenticationParams};
use crate::registry::AuthorityRegistry;

/// Acquires access tokens using cached accounts first and interactive
/// sign-in second.
///
/// An `Authenticator` is cheap to clone; clones share the same registry of
/// identity clients.
///
/// # Example
///
/// ```rust,ignore
/// use mssql_aad_auth::{
///     AuthenticationMethod, AuthenticationParams, Authenticator, AuthenticatorConfig,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// let authenticator = Authenticator::new(AuthenticatorConfig::from_env(), factory)?;
/// let params = AuthenticationParams::new(
///     AuthenticationMethod::ActiveDirectoryInteractive,
///     "https://login.microsoftonline.com",
///     "common",
///     ["https://database.windows.net/.default"],
/// )
/// .with_username("alice@contoso.com");
///
/// let token = authenticator.get_token(&params, &CancellationToken::new()).await?;
/// ```
#[derive(Clone)]
pub struct Authenticator {
    config: Arc<AuthenticatorConfig>,
    registry: Arc<AuthorityRegistry>,
}

impl Authenticator {
    /// Create an authenticator with its own client registry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the application identity is
    /// incomplete.
    pub fn new(
        config: AuthenticatorConfig,
        factory: Arc<dyn IdentityClientFactory>,
    ) -> Result<Self> {
        Self::with_registry(config, Arc::new(AuthorityRegistry::new(factory)))
    }

    /// Create an authenticator that shares an existing client registry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the application identity is
    /// incomplete.
    pub fn with_registry(
        config: AuthenticatorConfig,
        registry: Arc<AuthorityRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            registry,
        })
    }

    /// The application identity used for new identity clients.
    #[must_use]
    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    /// The registry of identity clients.
    #[must_use]
    pub fn registry(&self) -> &Arc<AuthorityRegistry> {
        &self.registry
    }

    /// Acquire an access token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnsupportedMethod`] for any method other than
    ///   Active Directory Interactive, before any client is created
    /// - [`AuthError::Configuration`] if no scopes were requested or the
    ///   identity client rejects the authority or application identity
    /// - [`AuthError::Acquisition`] if enumeration, silent acquisition (other
    ///   than "interaction required") or interactive sign-in fails
    /// - [`AuthError::Cancelled`] once `cancel` fires
    pub async fn get_token(
        &self,
        params: &AuthenticationParams,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        let method = params.method();
        if !method.is_supported() {
            tracing::warn!(%method, "rejecting unsupported authentication method");
            return Err(AuthError::UnsupportedMethod(method));
        }
        if params.scopes().is_empty() {
            return Err(AuthError::Configuration("no scopes requested".into()));
        }
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled {
                stage: AcquisitionStage::Construction,
            });
        }

        let client = self
            .registry
            .get_or_create(params.authority(), params.audience(), &self.config)?;

        let accounts = guard(cancel, AcquisitionStage::Enumeration, client.accounts())
            .await?
            .map_err(|e| AuthError::acquisition(AcquisitionStage::Enumeration, e))?;

        let username = params.username();
        tracing::debug!(
            authority = params.authority(),
            audience = params.audience(),
            accounts = accounts.len(),
            has_username = username.is_some(),
            "enumerated cached accounts"
        );

        let Some(username) = username else {
            return self.interactive(&*client, params, None, cancel).await;
        };

        let Some(account) = find_account(&accounts, Some(username)) else {
            tracing::debug!("no cached account matches the requested username");
            return self
                .interactive(&*client, params, Some(username), cancel)
                .await;
        };

        tracing::debug!("attempting silent acquisition");
        let outcome = guard(
            cancel,
            AcquisitionStage::Silent,
            client.acquire_token_silent(params.scopes(), account),
        )
        .await?;

        match outcome {
            SilentOutcome::Success(response) => {
                let token = normalize(AcquisitionStage::Silent, response)?;
                tracing::info!(
                    path = "silent",
                    expires_on = %token.expires_on(),
                    "access token acquired"
                );
                Ok(token)
            }
            SilentOutcome::InteractionRequired { reason } => {
                tracing::debug!(reason = %reason, "silent acquisition requires interaction");
                self.interactive(&*client, params, Some(username), cancel)
                    .await
            }
            SilentOutcome::Failure(e) => {
                tracing::warn!(error = %e, "silent acquisition failed");
                Err(AuthError::acquisition(AcquisitionStage::Silent, e))
            }
        }
    }

    async fn interactive(
        &self,
        client: &dyn IdentityClient,
        params: &AuthenticationParams,
        login_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        tracing::debug!(
            has_login_hint = login_hint.is_some(),
            "starting interactive sign-in"
        );
        let response = guard(
            cancel,
            AcquisitionStage::Interactive,
            client.acquire_token_interactive(params.scopes(), login_hint),
        )
        .await?
        .map_err(|e| {
            tracing::warn!(error = %e, "interactive sign-in failed");
            AuthError::acquisition(AcquisitionStage::Interactive, e)
        })?;

        let token = normalize(AcquisitionStage::Interactive, response)?;
        tracing::info!(
            path = "interactive",
            expires_on = %token.expires_on(),
            "access token acquired"
        );
        Ok(token)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

fn normalize(stage: AcquisitionStage, response: TokenResponse) -> Result<AccessToken> {
    AccessToken::try_from(response).map_err(|e| {
        tracing::warn!(%stage, error = %e, "identity client returned an unusable token");
        AuthError::acquisition(stage, e)
    })
}

/// Race a suspension point against cancellation.
async fn guard<F: Future>(
    cancel: &CancellationToken,
    stage: AcquisitionStage,
    fut: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::warn!(%stage, "token request cancelled");
            Err(AuthError::Cancelled { stage })
        }
        output = fut => Ok(output),
    }
}
