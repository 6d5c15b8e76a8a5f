//! Remote-agent handshake boundary.
//!
//! The handshake itself — establishing a secure-shell session and verifying
//! the in-guest agent is ready — is an external collaborator behind
//! [`AgentCoordinator`]. The driver supplies the target address, guest
//! credentials, platform tags, and an ordered hook list; it treats any
//! returned error as fatal to the whole run.

use std::net::IpAddr;

use async_trait::async_trait;

use cordon_core::RunConfig;

use crate::sync::TransferSession;
use crate::IsolateError;

/// Parameters the driver supplies for one handshake.
#[derive(Debug, Clone)]
pub struct HandshakeParams {
    /// Address the guest was assigned.
    pub addr: IpAddr,

    /// Guest account to authenticate as.
    pub username: String,

    /// Password for `username`.
    pub password: String,

    /// Target platform tag (e.g. `darwin`).
    pub os: String,

    /// Target architecture tag (e.g. `arm64`).
    pub arch: String,

    /// Require strict agent verification.
    pub strict: bool,
}

/// An established secure-shell session with the guest.
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// Open a secure file-transfer session on top of this shell session.
    ///
    /// # Errors
    /// Propagates the collaborator's transport error.
    async fn open_transfer(&self) -> Result<Box<dyn TransferSession>, IsolateError>;
}

/// A unit of work deferred until the handshake succeeds.
///
/// Hooks run in registration order, before control returns to the caller;
/// the first failure aborts the rest.
#[async_trait]
pub trait AgentHook: Send + Sync {
    /// Apply this hook over the established session.
    ///
    /// # Errors
    /// Any error fails the run.
    async fn apply(&self, session: &dyn AgentSession) -> Result<(), IsolateError>;
}

/// External coordinator performing the secure-shell readiness handshake.
///
/// Retry and backoff while establishing the session are the coordinator's
/// own concern. Implementations must invoke the hooks in order after the
/// handshake succeeds and fail fast on the first hook error.
#[async_trait]
pub trait AgentCoordinator: Send + Sync {
    /// Wait until the in-guest agent is reachable and ready, then run the
    /// hooks.
    ///
    /// # Errors
    /// Returns [`IsolateError::HandshakeFailed`] (or a hook's error
    /// verbatim); the driver treats either as fatal to the run.
    async fn wait_for_agent(
        &self,
        params: &HandshakeParams,
        config: &RunConfig,
        hooks: &[Box<dyn AgentHook>],
    ) -> Result<(), IsolateError>;
}
