//! VM session: owns one cloned guest's full lifecycle.
//!
//! Clone strictly precedes start; start strictly precedes any address probe.
//! Boot runs asynchronously in the hypervisor's `run` process while the
//! caller polls for an address; a fatal boot failure travels through the
//! error channel returned by [`VmSession::start`], not as a direct return
//! value, because the boot continues after `start` returns.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use cordon_core::DirectoryMount;

use crate::hypervisor::Hypervisor;
use crate::readiness::AddressProbe;
use crate::IsolateError;

/// One ephemeral guest cloned from a base image.
///
/// The session must be closed on every code path; [`VmSession::close`] is
/// idempotent and deletes the instance.
pub struct VmSession<H: Hypervisor> {
    hypervisor: Arc<H>,
    name: String,
    stop: CancellationToken,
    monitor: Option<JoinHandle<()>>,
    closed: bool,

    /// When the clone completed.
    pub created_at: DateTime<Utc>,
}

impl<H: Hypervisor> VmSession<H> {
    /// Clone `base_image` into a new instance named `name` and apply the
    /// requested resources.
    ///
    /// With `lazy_pull` unset the image is pulled eagerly first, so a
    /// missing image fails here rather than mid-clone.
    ///
    /// # Errors
    /// Returns [`IsolateError::CloneFailed`] naming the base image if the
    /// hypervisor rejects the pull, clone, or resource request.
    pub async fn clone_from(
        hypervisor: Arc<H>,
        base_image: &str,
        name: &str,
        cpu: u32,
        memory_mib: u32,
        lazy_pull: bool,
    ) -> Result<Self, IsolateError> {
        let clone_failed = |e: IsolateError| IsolateError::CloneFailed {
            image: base_image.to_owned(),
            reason: e.to_string(),
        };

        if !lazy_pull {
            hypervisor
                .output(&["pull", base_image])
                .await
                .map_err(clone_failed)?;
        }

        hypervisor
            .output(&["clone", base_image, name])
            .await
            .map_err(clone_failed)?;

        let cpu = cpu.to_string();
        let memory = memory_mib.to_string();
        hypervisor
            .output(&["set", name, "--cpu", &cpu, "--memory", &memory])
            .await
            .map_err(clone_failed)?;

        debug!(vm = %name, base = %base_image, "VM cloned");

        Ok(Self {
            hypervisor,
            name: name.to_owned(),
            stop: CancellationToken::new(),
            monitor: None,
            closed: false,
            created_at: Utc::now(),
        })
    }

    /// Begin guest boot asynchronously.
    ///
    /// Returns the fatal-error channel: at most one error is published, when
    /// the `run` process exits while the session is still open.
    ///
    /// # Errors
    /// Returns [`IsolateError::Io`] if the run process cannot be spawned.
    pub fn start(
        &mut self,
        softnet: bool,
        mounts: &[DirectoryMount],
    ) -> Result<mpsc::Receiver<IsolateError>, IsolateError> {
        let mut args = vec!["run".to_owned(), self.name.clone(), "--no-graphics".to_owned()];
        if softnet {
            args.push("--net-softnet".to_owned());
        }
        for mount in mounts {
            let mut dir = format!("--dir={}:{}", mount.name, mount.path.display());
            if mount.read_only {
                dir.push_str(":ro");
            }
            args.push(dir);
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let mut child = self.hypervisor.spawn(&arg_refs)?;
        debug!(vm = %self.name, softnet, mounts = mounts.len(), "VM starting");

        let (tx, rx) = mpsc::channel(1);
        let stderr = child.stderr.take();
        let stop = self.stop.clone();
        let vm = self.name.clone();

        self.monitor = Some(tokio::spawn(async move {
            let exited = async {
                // Stderr reaches EOF when the process exits, so draining it
                // first cannot hang and avoids a full pipe blocking the guest.
                let mut message = String::new();
                if let Some(mut pipe) = stderr {
                    let _ = pipe.read_to_string(&mut message).await;
                }
                (child.wait().await, message)
            };

            let outcome = tokio::select! {
                _ = stop.cancelled() => None,
                pair = exited => Some(pair),
            };

            match outcome {
                // Session closed; the run process is ours to stop.
                None => {
                    let _ = child.kill().await;
                }
                Some((status, message)) => {
                    let reason = match status {
                        Ok(status) => format!("run process exited with {status}: {}", message.trim()),
                        Err(e) => format!("waiting on run process failed: {e}"),
                    };
                    let _ = tx.send(IsolateError::VmFailed { vm, reason }).await;
                }
            }
        }));

        Ok(rx)
    }

    /// Probe the guest's current network state once.
    ///
    /// # Errors
    /// Returns [`IsolateError::AddressUnavailable`] while no address has
    /// been assigned. This is expected during boot and retried by the
    /// readiness poller.
    pub async fn retrieve_address(&self) -> Result<IpAddr, IsolateError> {
        let unavailable = |reason: String| IsolateError::AddressUnavailable {
            vm: self.name.clone(),
            reason,
        };

        let output = self
            .hypervisor
            .output(&["ip", &self.name])
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        output
            .stdout
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| unavailable(format!("'{}': {e}", output.stdout.trim())))
    }

    /// Identifier of this instance for logging and correlation.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.name
    }

    /// Release the guest: stop the run process and delete the instance.
    ///
    /// Idempotent; later calls are no-ops. Deletion failures are logged and
    /// swallowed so close can run on error paths without masking the
    /// original failure.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.stop.cancel();
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.await;
        }

        if let Err(e) = self.hypervisor.output(&["delete", &self.name]).await {
            warn!(vm = %self.name, error = %e, "failed to delete VM");
        } else {
            let lifetime = Utc::now().signed_duration_since(self.created_at);
            debug!(vm = %self.name, lifetime = %lifetime, "VM deleted");
        }
    }
}

#[async_trait]
impl<H: Hypervisor> AddressProbe for VmSession<H> {
    async fn retrieve_address(&self) -> Result<IpAddr, IsolateError> {
        VmSession::retrieve_address(self).await
    }

    fn ident(&self) -> &str {
        VmSession::ident(self)
    }
}
