//! Maintenance entry point for the `cordon` driver.
//!
//! `cordon cleanup` deletes orphaned instances left behind by crashed runs.
//! Configuration comes from the environment: `CORDON_NAME_PREFIX` overrides
//! the instance-name prefix, `CORDON_TART_BIN` the hypervisor binary.

use std::path::PathBuf;

use cordon_core::{NamingScheme, DEFAULT_NAME_PREFIX};
use cordon_executor::{cleanup_orphans, TartCli};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("cleanup") => cleanup().await,
        Some(other) => {
            eprintln!("unknown command '{other}'");
            usage();
            std::process::exit(2);
        }
        None => {
            usage();
            std::process::exit(2);
        }
    }
}

async fn cleanup() {
    let prefix = std::env::var("CORDON_NAME_PREFIX")
        .unwrap_or_else(|_| DEFAULT_NAME_PREFIX.to_owned());
    let hypervisor = match std::env::var("CORDON_TART_BIN") {
        Ok(path) => TartCli::new(PathBuf::from(path)),
        Err(_) => TartCli::with_defaults(),
    };

    let scheme = NamingScheme::new(prefix);
    match cleanup_orphans(&hypervisor, &scheme).await {
        Ok(report) => {
            info!(count = report.deleted.len(), "cleanup finished");
            for name in &report.deleted {
                println!("{name}");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "cleanup failed");
            std::process::exit(1);
        }
    }
}

fn usage() {
    eprintln!("usage: cordon cleanup");
    eprintln!();
    eprintln!("environment:");
    eprintln!("  CORDON_NAME_PREFIX  instance-name prefix to reclaim (default '{DEFAULT_NAME_PREFIX}')");
    eprintln!("  CORDON_TART_BIN     hypervisor binary (default 'tart' from PATH)");
}
