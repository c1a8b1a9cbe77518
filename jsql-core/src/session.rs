//! Session lifecycle: open, use, close.
//!
//! [`SessionManager::with_session`] is the only way the run touches a live
//! connection. Once `open` succeeds, `close` runs exactly once, whatever the
//! body returns. If `open` fails nothing is closed.

use crate::credentials::Credentials;
use crate::drivers::{ConnectionConfig, DatabaseSession, DriverRegistry};
use crate::error::redact_database_url;
use crate::Result;

/// Body result plus the outcome of the close that followed it.
#[derive(Debug)]
pub struct Scoped<T> {
    /// What the body returned
    pub result: Result<T>,
    /// What closing the session returned
    pub close: Result<()>,
}

impl<T> Scoped<T> {
    /// The body's result, discarding the close outcome.
    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Opens sessions through a driver registry.
#[derive(Debug, Default)]
pub struct SessionManager {
    registry: DriverRegistry,
    config: ConnectionConfig,
}

impl SessionManager {
    /// Creates a manager over `registry` with connection tuning `config`.
    pub fn new(registry: DriverRegistry, config: ConnectionConfig) -> Self {
        Self { registry, config }
    }

    /// The registry sessions are opened through.
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Opens a session for `credentials`.
    ///
    /// # Errors
    /// Returns a connection-category error if no driver accepts the address
    /// or the driver fails to connect
    pub async fn open(&self, credentials: &Credentials) -> Result<Box<dyn DatabaseSession>> {
        tracing::info!(
            "Opening session to {}",
            redact_database_url(credentials.endpoint())
        );
        let session = self.registry.connect(credentials, &self.config).await;
        if let Err(e) = &session {
            tracing::debug!("Failed to open session: {}", e);
        }
        session
    }

    /// Closes `session`, logging a failure instead of escalating it.
    pub async fn close(session: Box<dyn DatabaseSession>) -> Result<()> {
        let closed = session.close().await;
        match &closed {
            Ok(()) => tracing::info!("Session closed"),
            Err(e) => tracing::warn!("Failed to close session cleanly: {}", e),
        }
        closed
    }

    /// Opens a session, runs `body` on it, then closes it.
    ///
    /// # Errors
    /// The outer error is an `open` failure, in which case `body` never ran.
    /// Body and close failures are reported inside [`Scoped`].
    pub async fn with_session<T, F>(&self, credentials: &Credentials, body: F) -> Result<Scoped<T>>
    where
        F: AsyncFnOnce(&mut dyn DatabaseSession) -> Result<T>,
    {
        let mut session = self.open(credentials).await?;
        let result = body(&mut *session).await;
        if let Err(e) = &result {
            tracing::debug!("Session body failed, closing anyway: {}", e);
        }
        let close = Self::close(session).await;
        Ok(Scoped { result, close })
    }
}
