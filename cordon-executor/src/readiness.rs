//! Network readiness polling.
//!
//! Address assignment (DHCP) has no completion signal at this layer, so the
//! poller retries a single-shot probe on a fixed interval. Each iteration
//! checks cancellation and the fatal-error channel before sleeping; only
//! those two conditions, or the optional deadline, end the loop
//! unsuccessfully. A failed probe is expected and logged at debug.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::IsolateError;

/// A single non-blocking probe of the guest's network state.
#[async_trait]
pub trait AddressProbe: Send + Sync {
    /// Probe for the guest's current address.
    ///
    /// # Errors
    /// [`IsolateError::AddressUnavailable`] while no address is assigned;
    /// the poller retries any error returned here.
    async fn retrieve_address(&self) -> Result<IpAddr, IsolateError>;

    /// Identifier used for log correlation.
    fn ident(&self) -> &str;
}

/// Tuning for [`wait_for_address`].
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Sleep between probes.
    pub interval: Duration,

    /// Overall deadline. `None` retries until cancelled, which matches the
    /// hypervisor's lack of a boot-completion signal; set it to bound runs
    /// that have no external cancellation.
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: None,
        }
    }
}

/// Block until the guest obtains an address, a fatal error is signalled,
/// the caller cancels, or the deadline elapses.
///
/// # Errors
/// [`IsolateError::Cancelled`] on cancellation, [`IsolateError::BootTimedOut`]
/// on deadline expiry, or the error received from `errors` verbatim.
pub async fn wait_for_address<P: AddressProbe + ?Sized>(
    probe: &P,
    errors: &mut mpsc::Receiver<IsolateError>,
    cancel: &CancellationToken,
    options: &PollOptions,
) -> Result<IpAddr, IsolateError> {
    let started = Instant::now();
    let deadline = options.deadline.map(|d| started + d);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(IsolateError::Cancelled),

            fatal = errors.recv() => {
                return Err(fatal.unwrap_or_else(|| IsolateError::VmFailed {
                    vm: probe.ident().to_owned(),
                    reason: "error channel closed".to_owned(),
                }));
            }

            () = sleep_until_deadline(deadline) => {
                return Err(IsolateError::BootTimedOut {
                    vm: probe.ident().to_owned(),
                    waited: started.elapsed(),
                });
            }

            () = tokio::time::sleep(options.interval) => {}
        }

        match probe.retrieve_address().await {
            Ok(addr) => {
                debug!(vm = probe.ident(), addr = %addr, "address retrieved");
                return Ok(addr);
            }
            Err(e) => {
                debug!(vm = probe.ident(), error = %e, "no address yet, retrying");
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Fails the first `failures` probes, then reports an address.
    struct ScriptedProbe {
        failures: usize,
        probes: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                probes: AtomicUsize::new(0),
            }
        }

        fn probe_count(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AddressProbe for ScriptedProbe {
        async fn retrieve_address(&self) -> Result<IpAddr, IsolateError> {
            let n = self.probes.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(IsolateError::AddressUnavailable {
                    vm: "test-vm".to_owned(),
                    reason: "still booting".to_owned(),
                })
            } else {
                Ok(IpAddr::V4(Ipv4Addr::new(192, 168, 64, 2)))
            }
        }

        fn ident(&self) -> &str {
            "test-vm"
        }
    }

    fn fast_options() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(5),
            deadline: None,
        }
    }

    #[tokio::test]
    async fn returns_address_after_transient_failures() {
        let probe = ScriptedProbe::new(3);
        let (_tx, mut errors) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let addr = wait_for_address(&probe, &mut errors, &cancel, &fast_options()).await;

        assert!(matches!(addr, Ok(a) if a == IpAddr::V4(Ipv4Addr::new(192, 168, 64, 2))));
        assert_eq!(probe.probe_count(), 4, "3 failures then 1 success");
    }

    #[tokio::test]
    async fn sleeps_between_probes() {
        let probe = ScriptedProbe::new(2);
        let (_tx, mut errors) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let options = PollOptions {
            interval: Duration::from_millis(20),
            deadline: None,
        };

        let started = std::time::Instant::now();
        let result = wait_for_address(&probe, &mut errors, &cancel, &options).await;
        assert!(result.is_ok());
        assert!(
            started.elapsed() >= Duration::from_millis(60),
            "must sleep before every probe, including the first"
        );
    }

    #[tokio::test]
    async fn fatal_error_preempts_probing() {
        let probe = ScriptedProbe::new(usize::MAX);
        let (tx, mut errors) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        tx.send(IsolateError::VmFailed {
            vm: "test-vm".to_owned(),
            reason: "guest process crashed".to_owned(),
        })
        .await
        .expect("channel send");

        let result = wait_for_address(&probe, &mut errors, &cancel, &fast_options()).await;

        assert!(matches!(result, Err(IsolateError::VmFailed { .. })));
        assert_eq!(probe.probe_count(), 0, "no probe after a fatal error");
    }

    #[tokio::test]
    async fn cancellation_before_first_probe_performs_zero_probes() {
        let probe = ScriptedProbe::new(usize::MAX);
        let (_tx, mut errors) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = wait_for_address(&probe, &mut errors, &cancel, &fast_options()).await;

        assert!(matches!(result, Err(IsolateError::Cancelled)));
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_during_polling_stops_the_loop() {
        let probe = ScriptedProbe::new(usize::MAX);
        let (_tx, mut errors) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let result = wait_for_address(&probe, &mut errors, &cancel, &fast_options()).await;
        assert!(matches!(result, Err(IsolateError::Cancelled)));
    }

    #[tokio::test]
    async fn deadline_expiry_times_out() {
        let probe = ScriptedProbe::new(usize::MAX);
        let (_tx, mut errors) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let options = PollOptions {
            interval: Duration::from_millis(5),
            deadline: Some(Duration::from_millis(40)),
        };

        let result = wait_for_address(&probe, &mut errors, &cancel, &options).await;
        assert!(matches!(result, Err(IsolateError::BootTimedOut { .. })));
    }
}
