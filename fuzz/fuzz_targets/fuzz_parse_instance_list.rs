//! Fuzz target: hypervisor `list --format json` output parsing.

#![no_main]

use cordon_executor::hypervisor::parse_instance_list;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Must never panic; malformed listings become typed errors.
    let _ = parse_instance_list(data);
});
