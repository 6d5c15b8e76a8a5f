//! The task isolation driver.
//!
//! One [`TaskIsolation::run`] owns exactly one ephemeral VM: it parses
//! mounts, clones the base image under a fresh prefixed name, starts the
//! guest, waits for an address, hands control to the agent-handshake
//! coordinator (with the directory-sync hook registered when applicable),
//! and closes the session on every exit path.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cordon_core::{parse_mount_specs, platform, DirectoryMount, NamingScheme, RunConfig};

use crate::cleanup::{cleanup_orphans, CleanupReport};
use crate::handshake::{AgentCoordinator, AgentHook, HandshakeParams};
use crate::hypervisor::Hypervisor;
use crate::readiness::{wait_for_address, PollOptions};
use crate::session::VmSession;
use crate::sync::ProjectDirSync;
use crate::IsolateError;

/// Driver configuration. Every field has a working default except the base
/// image; construct with [`IsolationConfig::new`] and override as needed.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct IsolationConfig {
    /// Base image instances are cloned from.
    pub base_image: String,

    /// Guest account the agent handshake authenticates as.
    pub username: String,

    /// Password for `username`.
    pub password: String,

    /// Virtual CPUs per instance.
    pub cpu: u32,

    /// Guest memory in mebibytes.
    pub memory_mib: u32,

    /// Run the guest behind the hypervisor's isolated software network.
    pub softnet: bool,

    /// Prefix for temporary instance names. Cleanup deletes any instance
    /// carrying it, whoever created it.
    pub name_prefix: String,

    /// Target platform tag supplied to the handshake.
    pub os: String,

    /// Target architecture tag supplied to the handshake.
    pub arch: String,

    /// Require strict agent verification during the handshake.
    pub strict_handshake: bool,

    /// Readiness polling tuning.
    pub poll: PollOptions,
}

impl IsolationConfig {
    /// Defaults match a macOS arm64 guest image with the stock admin
    /// account.
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            username: "admin".to_owned(),
            password: "admin".to_owned(),
            cpu: 4,
            memory_mib: 8192,
            softnet: false,
            name_prefix: cordon_core::DEFAULT_NAME_PREFIX.to_owned(),
            os: "darwin".to_owned(),
            arch: "arm64".to_owned(),
            strict_handshake: true,
            poll: PollOptions::default(),
        }
    }
}

/// VM-backed task isolation driver.
pub struct TaskIsolation<H: Hypervisor, C: AgentCoordinator> {
    hypervisor: Arc<H>,
    coordinator: C,
    config: IsolationConfig,
    naming: NamingScheme,
}

impl<H: Hypervisor, C: AgentCoordinator> TaskIsolation<H, C> {
    /// Create a driver over the given hypervisor and handshake coordinator.
    pub fn new(hypervisor: H, coordinator: C, config: IsolationConfig) -> Self {
        let naming = NamingScheme::new(config.name_prefix.clone());
        Self {
            hypervisor: Arc::new(hypervisor),
            coordinator,
            config,
            naming,
        }
    }

    /// Run one isolated task to completion.
    ///
    /// Ordering: mounts parse before anything is provisioned; clone precedes
    /// start; start precedes address probing; a retrieved address precedes
    /// the handshake; the sync hook runs after the handshake and before
    /// success is returned. The cloned instance is closed unconditionally.
    ///
    /// # Errors
    /// [`IsolateError::Config`] if a mount spec is malformed (nothing was
    /// provisioned), [`IsolateError::Cancelled`] on cancellation, otherwise
    /// the isolation- or sync-tier failure of the stage that broke.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        run: &RunConfig,
    ) -> Result<(), IsolateError> {
        // A malformed spec must never leave a VM running with partial
        // mounts, so parsing happens before the clone.
        let mut mounts = Vec::new();
        if run.dirty_mode {
            if let Some(project_dir) = &run.project_dir {
                mounts.push(DirectoryMount::new(
                    platform::WORKING_DIR_TAG,
                    project_dir.clone(),
                    false,
                ));
            }
        }
        mounts.extend(parse_mount_specs(&run.mount_specs)?);

        let vm_name = self.naming.generate(&run.task_id);
        let mut session = VmSession::clone_from(
            Arc::clone(&self.hypervisor),
            &self.config.base_image,
            &vm_name,
            self.config.cpu,
            self.config.memory_mib,
            run.lazy_pull,
        )
        .await?;

        let result = self.drive(cancel, run, &mut session, &mounts).await;
        session.close().await;
        result
    }

    async fn drive(
        &self,
        cancel: &CancellationToken,
        run: &RunConfig,
        session: &mut VmSession<H>,
        mounts: &[DirectoryMount],
    ) -> Result<(), IsolateError> {
        let mut errors = session.start(self.config.softnet, mounts)?;

        info!(vm = session.ident(), "waiting for the guest to obtain an address");
        let addr = wait_for_address(&*session, &mut errors, cancel, &self.config.poll).await?;
        debug!(vm = session.ident(), addr = %addr, "running agent handshake");

        let mut hooks: Vec<Box<dyn AgentHook>> = Vec::new();
        if let Some(project_dir) = &run.project_dir {
            if !run.dirty_mode {
                hooks.push(Box::new(ProjectDirSync::new(project_dir.clone())));
            }
        }

        let params = HandshakeParams {
            addr,
            username: self.config.username.clone(),
            password: self.config.password.clone(),
            os: self.config.os.clone(),
            arch: self.config.arch.clone(),
            strict: self.config.strict_handshake,
        };

        self.coordinator.wait_for_agent(&params, run, &hooks).await
    }

    /// The working directory the guest should use for this run.
    #[must_use]
    pub fn working_directory(&self, dirty_mode: bool) -> String {
        platform::working_directory(dirty_mode)
    }

    /// Delete every orphaned instance carrying this driver's name prefix.
    ///
    /// Safe to invoke independently of any run.
    ///
    /// # Errors
    /// Propagates the listing failure or the first deletion failure.
    pub async fn cleanup(&self) -> Result<CleanupReport, IsolateError> {
        cleanup_orphans(self.hypervisor.as_ref(), &self.naming).await
    }
}
