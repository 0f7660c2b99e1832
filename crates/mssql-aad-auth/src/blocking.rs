//! Blocking token acquisition for callers outside an async context.

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio_util::sync::CancellationToken;

use crate::authenticator::Authenticator;
use crate::error::{AuthError, Result};
use crate::params::{AccessToken, AuthenticationParams};

enum Executor {
    /// Taken on drop so the runtime can shut down without blocking.
    Owned(Option<Runtime>),
    Borrowed(Handle),
}

/// Blocking wrapper over [`Authenticator::get_token`].
///
/// Callable from plain threads and from worker threads of a multi-threaded
/// tokio runtime. On a current-thread runtime the request fails with
/// [`AuthError::Configuration`], since blocking there would stall the only
/// thread able to make progress.
pub struct BlockingAuthenticator {
    inner: Authenticator,
    executor: Executor,
}

impl BlockingAuthenticator {
    /// Wrap an authenticator with a private current-thread runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the runtime cannot be built.
    pub fn new(inner: Authenticator) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("mssql-aad-auth")
            .build()
            .map_err(|e| AuthError::Configuration(format!("cannot start runtime: {e}")))?;
        Ok(Self {
            inner,
            executor: Executor::Owned(Some(runtime)),
        })
    }

    /// Wrap an authenticator, running requests on a caller-managed runtime.
    #[must_use]
    pub fn with_handle(inner: Authenticator, handle: Handle) -> Self {
        Self {
            inner,
            executor: Executor::Borrowed(handle),
        }
    }

    /// The wrapped authenticator.
    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.inner
    }

    /// Acquire an access token, blocking the calling thread.
    ///
    /// Returns [`AuthError::Cancelled`] as soon as `cancel` fires, even if
    /// the identity client is still working on the request.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Authenticator::get_token`], plus
    /// [`AuthError::Configuration`] when called from a current-thread
    /// runtime.
    pub fn get_token_blocking(
        &self,
        params: &AuthenticationParams,
        cancel: &CancellationToken,
    ) -> Result<AccessToken> {
        let run = || {
            let fut = self.inner.get_token(params, cancel);
            match &self.executor {
                Executor::Owned(Some(runtime)) => runtime.block_on(fut),
                Executor::Owned(None) => {
                    Err(AuthError::Configuration("runtime has been shut down".into()))
                }
                Executor::Borrowed(handle) => handle.block_on(fut),
            }
        };

        match Handle::try_current() {
            Err(_) => run(),
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tracing::debug!("blocking token request on a runtime worker thread");
                tokio::task::block_in_place(run)
            }
            Ok(_) => Err(AuthError::Configuration(
                "blocking token acquisition cannot run on a current-thread runtime; \
                 use Authenticator::get_token instead"
                    .into(),
            )),
        }
    }
}

impl Drop for BlockingAuthenticator {
    fn drop(&mut self) {
        if let Executor::Owned(runtime) = &mut self.executor {
            if let Some(runtime) = runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}

impl std::fmt::Debug for BlockingAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let executor = match self.executor {
            Executor::Owned(_) => "owned",
            Executor::Borrowed(_) => "borrowed",
        };
        f.debug_struct("BlockingAuthenticator")
            .field("inner", &self.inner)
            .field("executor", &executor)
            .finish()
    }
}
