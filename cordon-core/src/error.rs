/// Errors produced by the `cordon-core` crate.
///
/// These are all configuration-tier errors: a VM must never be cloned or
/// started while any of them is outstanding.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A mount spec did not have the `name:path[:ro|rw]` shape.
    #[error("malformed mount spec '{spec}': expected name:path[:ro|rw]")]
    MalformedMountSpec { spec: String },

    /// A mount spec carried a third field that is neither `ro` nor `rw`.
    #[error("mount spec '{spec}' has unrecognized mode '{mode}': expected 'ro' or 'rw'")]
    UnknownMountMode { spec: String, mode: String },

    /// A mount spec had an empty name or path field.
    #[error("mount spec '{spec}' has an empty {field}")]
    EmptyMountField { spec: String, field: &'static str },
}
