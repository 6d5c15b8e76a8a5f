//! Ephemeral VM lifecycle driver for isolated task execution.
//!
//! Provisions a guest cloned from a base image, waits for network
//! readiness, coordinates the remote-agent handshake, mirrors the project
//! directory when configured, and tears the instance down afterwards.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod cleanup;
pub mod driver;
pub mod error;
pub mod handshake;
pub mod hypervisor;
pub mod readiness;
pub mod session;
pub mod sync;

pub use cleanup::{cleanup_orphans, CleanupReport};
pub use driver::{IsolationConfig, TaskIsolation};
pub use error::IsolateError;
pub use handshake::{AgentCoordinator, AgentHook, AgentSession, HandshakeParams};
pub use hypervisor::{CommandOutput, Hypervisor, TartCli};
pub use readiness::{wait_for_address, AddressProbe, PollOptions};
pub use session::VmSession;
pub use sync::{ProjectDirSync, TransferSession};
