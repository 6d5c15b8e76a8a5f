//! Instance naming for ephemeral VMs.
//!
//! Every instance this driver creates is named `<prefix><task_id>-<uuid>`.
//! The prefix is the *only* signal by which [`crate::naming::NamingScheme::owns`]
//! (and therefore orphan cleanup) distinguishes driver-owned instances from
//! user-owned ones.

use uuid::Uuid;

/// Default prefix for driver-owned instance names.
pub const DEFAULT_NAME_PREFIX: &str = "cordon-";

/// Derives collision-resistant temporary instance names from task ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    prefix: String,
}

impl NamingScheme {
    /// Create a scheme with the given fixed prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the fixed prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a fresh instance name for `task_id`.
    ///
    /// The UUIDv4 suffix carries 122 bits of entropy, so two concurrent
    /// generations with the same task id never collide in practice.
    #[must_use]
    pub fn generate(&self, task_id: &str) -> String {
        format!("{}{}-{}", self.prefix, task_id, Uuid::new_v4())
    }

    /// Whether `name` matches this driver's naming convention.
    ///
    /// Any matching instance is eligible for deletion by cleanup, regardless
    /// of which process created it.
    #[must_use]
    pub fn owns(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PREFIX)
    }
}
