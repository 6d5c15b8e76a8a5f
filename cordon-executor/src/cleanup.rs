//! Orphan instance cleanup.
//!
//! A crashed run leaves its instance behind. The naming prefix is the only
//! signal distinguishing driver-owned instances, so cleanup deletes every
//! listed instance the naming scheme owns. Intended as out-of-band
//! maintenance, independent of any run.

use cordon_core::NamingScheme;
use tracing::info;

use crate::hypervisor::{parse_instance_list, Hypervisor};
use crate::IsolateError;

/// Names reclaimed by one cleanup pass.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
}

/// Delete every instance whose name the scheme owns.
///
/// Stops at the first deletion failure; instances already deleted stay
/// deleted and are not reported.
///
/// # Errors
/// Propagates the listing failure or the first deletion failure.
pub async fn cleanup_orphans<H: Hypervisor + ?Sized>(
    hypervisor: &H,
    scheme: &NamingScheme,
) -> Result<CleanupReport, IsolateError> {
    let listing = hypervisor.output(&["list", "--format", "json"]).await?;
    let instances = parse_instance_list(&listing.stdout)?;

    let mut report = CleanupReport::default();
    for instance in instances {
        if !scheme.owns(&instance.name) {
            continue;
        }

        hypervisor.output(&["delete", &instance.name]).await?;
        info!(vm = %instance.name, "deleted orphaned instance");
        report.deleted.push(instance.name);
    }

    Ok(report)
}
