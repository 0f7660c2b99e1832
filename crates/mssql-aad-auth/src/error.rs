//! Authentication error types.

use std::fmt;

use thiserror::Error;

use crate::identity::IdentityError;
use crate::params::AuthenticationMethod;

/// Result type for token acquisition.
pub type Result<T> = std::result::Result<T, AuthError>;

/// The step of a token request that was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStage {
    /// Building the identity client for an authority.
    Construction,
    /// Listing the accounts known to the identity client.
    Enumeration,
    /// Silent acquisition against a cached account.
    Silent,
    /// Interactive sign-in.
    Interactive,
}

impl AcquisitionStage {
    /// Short name used in error messages and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Construction => "client construction",
            Self::Enumeration => "account enumeration",
            Self::Silent => "silent acquisition",
            Self::Interactive => "interactive acquisition",
        }
    }
}

impl fmt::Display for AcquisitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while acquiring an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested authentication method is not implemented by this provider.
    #[error("authentication method '{0}' is not supported")]
    UnsupportedMethod(AuthenticationMethod),

    /// Configuration was rejected, either locally or by the identity client
    /// while constructing an instance for an authority.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The identity client failed during the given stage.
    #[error("{stage} failed: {source}")]
    Acquisition {
        /// The stage that failed.
        stage: AcquisitionStage,
        /// Failure detail reported by the identity client.
        #[source]
        source: IdentityError,
    },

    /// The caller cancelled the request.
    #[error("token request cancelled during {stage}")]
    Cancelled {
        /// The stage that was in flight when cancellation was observed.
        stage: AcquisitionStage,
    },
}

impl AuthError {
    pub(crate) fn acquisition(stage: AcquisitionStage, source: IdentityError) -> Self {
        Self::Acquisition { stage, source }
    }

    /// Check whether this error came from caller cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check whether re-issuing the whole token request may succeed.
    ///
    /// Nothing is retried internally; this is a hint for the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Acquisition { .. })
    }

    /// The stage this error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<AcquisitionStage> {
        match self {
            Self::Acquisition { stage, .. } | Self::Cancelled { stage } => Some(*stage),
            Self::Configuration(_) => Some(AcquisitionStage::Construction),
            Self::UnsupportedMethod(_) => None,
        }
    }
}
