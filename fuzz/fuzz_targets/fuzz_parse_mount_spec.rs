//! Fuzz target: mount-spec parsing.
//!
//! Verifies the parser never panics on arbitrary input and that every
//! accepted spec satisfies the mount invariants.

#![no_main]

use cordon_core::parse_mount_spec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|spec: &str| {
    if let Ok(mount) = parse_mount_spec(spec) {
        assert!(!mount.name.is_empty(), "accepted mount must have a name");
        assert!(
            !mount.path.as_os_str().is_empty(),
            "accepted mount must have a path"
        );
    }
});
